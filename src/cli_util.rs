use std::io::{self, Write};

use crate::parser::ParseError;
use crate::position::SourcePosition;
use crate::runtime::RuntimeError;

/// Report a failure to load the program: `<file>: <error>` plus context.
pub fn print_parse_error(file: &str, source: Option<&[u8]>, err: &ParseError) {
    let _ = write_parse_error(&mut io::stderr().lock(), file, source, err);
}

/// Report a failure while running: `error <error>` plus context.
pub fn print_runtime_error(source: Option<&[u8]>, err: &RuntimeError) {
    let _ = write_runtime_error(&mut io::stderr().lock(), source, err);
}

pub fn write_parse_error<W: Write>(
    out: &mut W,
    file: &str,
    source: Option<&[u8]>,
    err: &ParseError,
) -> io::Result<()> {
    writeln!(out, "{file}: {err}")?;
    match (source, err.pos()) {
        (Some(src), Some(pos)) => write_context(out, src, pos),
        _ => out.flush(),
    }
}

pub fn write_runtime_error<W: Write>(
    out: &mut W,
    source: Option<&[u8]>,
    err: &RuntimeError,
) -> io::Result<()> {
    writeln!(out, "error {err}")?;
    match source {
        Some(src) => write_context(out, src, err.pos()),
        None => out.flush(),
    }
}

/// Print the source line holding `pos` with a caret under the byte.
pub fn write_context<W: Write>(out: &mut W, source: &[u8], pos: SourcePosition) -> io::Result<()> {
    // The root block sits before any byte; there is nothing to point at.
    if pos.column == 0 {
        return out.flush();
    }

    // Lines longer than this are cut down to a window around the caret.
    const WINDOW: usize = 32;

    let Some(line) = source.split(|&b| b == b'\n').nth(pos.line - 1) else {
        return out.flush();
    };
    let caret = pos.column - 1;
    let start = caret.saturating_sub(WINDOW);
    let end = (caret + WINDOW + 1).min(line.len());
    if start >= end {
        return out.flush();
    }
    let slice = String::from_utf8_lossy(&line[start..end]).replace('\t', " ");

    writeln!(out, "  {}", slice.trim_end_matches('\r'))?;
    writeln!(out, "  {}^", " ".repeat(caret - start))?;
    out.flush()
}
