//! Tree-walking execution of a parsed program.
//!
//! The runtime maintains:
//! - a fixed-length tape of byte cells, zeroed on creation (30,000 by default),
//! - a cursor indexing into that tape,
//! - the input and output streams the program talks to,
//! - an optional trace sink that receives one line per executed node.

use std::fmt;
use std::io::{self, ErrorKind, Read, Write};

use crate::ast::{Block, Node};
use crate::config::Config;
use crate::position::SourcePosition;

/// Tape length used when nothing else is configured.
pub const DEFAULT_TAPE_LEN: usize = 30_000;

/// Largest tape accepted from configuration (16 MiB of cells).
pub const MAX_TAPE_LEN: usize = 16 * 1024 * 1024;

/// Value stored by `,` when the input is exhausted.
pub const EOF_SENTINEL: u8 = 0xFF;

/// Errors that can occur while running a program.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// A move took the cursor left of cell 0 or past the last cell.
    #[error("position {index} is out of range at {pos}")]
    OutOfRange { index: isize, pos: SourcePosition },

    /// Reading input or writing output failed.
    #[error("I/O error in {action} at {pos}: {source}")]
    Io {
        pos: SourcePosition,
        action: &'static str,
        #[source]
        source: io::Error,
    },
}

impl RuntimeError {
    pub fn pos(&self) -> SourcePosition {
        match self {
            RuntimeError::OutOfRange { pos, .. } | RuntimeError::Io { pos, .. } => *pos,
        }
    }
}

/// Interpreter state for one program run.
pub struct Runtime<R, W> {
    tape: Vec<u8>,
    cursor: usize,
    input: R,
    output: W,
    trace: Option<Box<dyn Write>>,
}

impl<R: Read, W: Write> Runtime<R, W> {
    /// Create a runtime with the default tape length.
    pub fn new(input: R, output: W) -> Self {
        Self::with_tape_len(DEFAULT_TAPE_LEN, input, output)
    }

    /// Create a runtime with a custom tape length.
    ///
    /// The length is clamped to `1..=MAX_TAPE_LEN`: the cursor needs at least
    /// one valid cell.
    pub fn with_tape_len(tape_len: usize, input: R, output: W) -> Self {
        Self {
            tape: vec![0; tape_len.clamp(1, MAX_TAPE_LEN)],
            cursor: 0,
            input,
            output,
            trace: None,
        }
    }

    /// Create a runtime sized and traced according to `config`. Trace lines go
    /// to stderr.
    pub fn from_config(config: &Config, input: R, output: W) -> Self {
        let mut rt = Self::with_tape_len(config.tape_len, input, output);
        if config.trace {
            rt.set_trace_sink(io::stderr());
        }
        rt
    }

    /// Send a line per executed node to `sink`.
    pub fn set_trace_sink<T>(&mut self, sink: T)
    where
        T: Write + 'static,
    {
        self.trace = Some(Box::new(sink));
    }

    pub fn tape(&self) -> &[u8] {
        &self.tape
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Value of the cell under the cursor.
    pub fn cell(&self) -> u8 {
        self.tape[self.cursor]
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Run a whole program, then flush the output stream.
    pub fn run(&mut self, program: &Block) -> Result<(), RuntimeError> {
        self.run_block(program)?;
        self.output.flush().map_err(|source| RuntimeError::Io {
            pos: program.pos,
            action: "flush",
            source,
        })?;
        tracing::debug!(cursor = self.cursor, cell = self.cell(), "program finished");
        Ok(())
    }

    /// Apply one node's effect.
    pub fn execute(&mut self, node: &Node) -> Result<(), RuntimeError> {
        // Blocks trace themselves in `run_block`.
        if !matches!(node, Node::Block(_)) {
            self.trace_line(node, node.pos());
        }
        match node {
            Node::Block(block) => self.run_block(block),
            Node::Loop(lp) => {
                while self.tape[self.cursor] != 0 {
                    self.run_block(&lp.body)?;
                }
                Ok(())
            }
            Node::Move { pos, delta } => self.move_cursor(*delta, *pos),
            Node::Update { delta, .. } => {
                let cell = &mut self.tape[self.cursor];
                *cell = cell.wrapping_add_signed(*delta);
                Ok(())
            }
            Node::Output { pos } => {
                let byte = [self.tape[self.cursor]];
                // Each byte reaches the sink before the next node runs.
                self.output
                    .write_all(&byte)
                    .and_then(|()| self.output.flush())
                    .map_err(|source| RuntimeError::Io {
                        pos: *pos,
                        action: "output",
                        source,
                    })
            }
            Node::Input { pos } => {
                self.tape[self.cursor] = self.read_byte(*pos)?;
                Ok(())
            }
        }
    }

    fn run_block(&mut self, block: &Block) -> Result<(), RuntimeError> {
        self.trace_line(block, block.pos);
        for node in block.nodes() {
            self.execute(node)?;
        }
        Ok(())
    }

    fn move_cursor(&mut self, delta: isize, pos: SourcePosition) -> Result<(), RuntimeError> {
        match self.cursor.checked_add_signed(delta) {
            Some(next) if next < self.tape.len() => {
                self.cursor = next;
                Ok(())
            }
            // Cursor stays on its last valid cell.
            _ => Err(RuntimeError::OutOfRange {
                index: self.cursor as isize + delta,
                pos,
            }),
        }
    }

    fn read_byte(&mut self, pos: SourcePosition) -> Result<u8, RuntimeError> {
        // Anything already written should be visible before we block on input.
        self.output.flush().map_err(|source| RuntimeError::Io {
            pos,
            action: "output",
            source,
        })?;

        let mut buf = [0u8; 1];
        loop {
            match self.input.read(&mut buf) {
                Ok(0) => return Ok(EOF_SENTINEL),
                Ok(_) => return Ok(buf[0]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(RuntimeError::Io {
                        pos,
                        action: "input",
                        source,
                    });
                }
            }
        }
    }

    fn trace_line(&mut self, what: &dyn fmt::Display, pos: SourcePosition) {
        if let Some(sink) = self.trace.as_mut() {
            // Observational only: a broken sink must not stop the run.
            let _ = writeln!(sink, "run {what} at {pos}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str;
    use std::cell::RefCell;
    use std::rc::Rc;

    type TestRuntime = Runtime<io::Cursor<Vec<u8>>, Vec<u8>>;

    fn run_code(
        code: &str,
        input: &[u8],
        tape_len: usize,
    ) -> (TestRuntime, Result<(), RuntimeError>) {
        let program = parse_str(code).expect("program should parse");
        let input = io::Cursor::new(input.to_vec());
        let mut rt = Runtime::with_tape_len(tape_len, input, Vec::new());
        let result = rt.run(&program);
        (rt, result)
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Holds written bytes back until `flush`; the flush fails once
    /// `flush_fails` is set.
    #[derive(Default)]
    struct HeldBack {
        pending: Vec<u8>,
        visible: Rc<RefCell<Vec<u8>>>,
        flush_fails: bool,
    }

    impl Write for HeldBack {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.pending.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            if self.flush_fails {
                return Err(io::Error::from(ErrorKind::BrokenPipe));
            }
            self.visible.borrow_mut().append(&mut self.pending);
            Ok(())
        }
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Read for BrokenPipe {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::from(ErrorKind::BrokenPipe))
        }
    }

    #[test]
    fn default_tape_is_zeroed() {
        let rt = Runtime::new(io::empty(), io::sink());
        assert_eq!(rt.tape().len(), DEFAULT_TAPE_LEN);
        assert!(rt.tape().iter().all(|&c| c == 0));
        assert_eq!(rt.cursor(), 0);
    }

    #[test]
    fn zero_tape_len_still_has_one_cell() {
        let rt = Runtime::with_tape_len(0, io::empty(), io::sink());
        assert_eq!(rt.tape().len(), 1);
    }

    #[test]
    fn wrapping_subtraction() {
        let (rt, result) = run_code("-", b"", 1);
        assert!(result.is_ok());
        assert_eq!(rt.tape()[0], 255);
    }

    #[test]
    fn wrapping_addition() {
        let code = "+".repeat(256); // 256 increments should wrap around
        let (rt, result) = run_code(&code, b"", 1);
        assert!(result.is_ok());
        assert_eq!(rt.tape()[0], 0);
    }

    #[test]
    fn full_turn_of_increments_restores_any_value() {
        for start in [0u8, 1, 127, 128, 254, 255] {
            let code = format!("{}{}", "+".repeat(start as usize), "+".repeat(256));
            let (rt, result) = run_code(&code, b"", 1);
            assert!(result.is_ok());
            assert_eq!(rt.cell(), start);
        }
    }

    #[test]
    fn left_pointer_out_of_bounds_errors() {
        let (rt, result) = run_code("<", b"", 10);
        assert!(matches!(result, Err(RuntimeError::OutOfRange { index: -1, .. })));
        assert_eq!(rt.cursor(), 0);
    }

    #[test]
    fn right_pointer_out_of_bounds_errors() {
        // With 3 cells (0..=2), the 3rd '>' attempts to move beyond index 2.
        let (rt, result) = run_code(">>>", b"", 3);
        let err = result.unwrap_err();
        assert!(matches!(err, RuntimeError::OutOfRange { index: 3, .. }));
        assert_eq!(err.pos().offset, 3);
        assert_eq!(rt.cursor(), 2);
    }

    #[test]
    fn failed_move_leaves_tape_untouched() {
        let (rt, result) = run_code("+>++>+++>>>>>", b"", 5);
        assert!(matches!(result, Err(RuntimeError::OutOfRange { index: 5, .. })));
        assert_eq!(rt.tape(), &[1, 2, 3, 0, 0]);
    }

    #[test]
    fn out_of_range_message_names_index_and_position() {
        let (_, result) = run_code("\n  <", b"", 10);
        assert_eq!(
            result.unwrap_err().to_string(),
            "position -1 is out of range at line 2, column 3 (offset 4)"
        );
    }

    #[test]
    fn loop_on_zero_cell_never_runs_body() {
        // Body would read input, write output and walk off the tape.
        let (rt, result) = run_code("[,.<<<]", b"x", 4);
        assert!(result.is_ok());
        assert!(rt.output().is_empty());
        assert!(rt.tape().iter().all(|&c| c == 0));
    }

    #[test]
    fn loop_guard_is_checked_after_whole_body() {
        // The first pass zeroes cell 0, then moves cell 1 back into it before
        // the guard is looked at again. Cell 2 counts passes.
        let (rt, result) = run_code("+>+<[->>+<[-<+>]<]", b"", 3);
        assert!(result.is_ok());
        assert_eq!(rt.tape(), &[0, 0, 2]);
    }

    #[test]
    fn multiplication_loop() {
        let (rt, result) = run_code("+++++[>+++++<-]>.", b"", 10);
        assert!(result.is_ok());
        assert_eq!(rt.output(), &vec![25u8]);
        assert_eq!(rt.tape()[0], 0);
    }

    #[test]
    fn echo_reads_and_writes_a_byte() {
        let (rt, result) = run_code(",.", &[65], 10);
        assert!(result.is_ok());
        assert_eq!(rt.into_output(), vec![65u8]);
    }

    #[test]
    fn end_of_input_stores_sentinel() {
        let (rt, result) = run_code(",.", b"", 10);
        assert!(result.is_ok());
        assert_eq!(rt.into_output(), vec![EOF_SENTINEL]);
    }

    #[test]
    fn input_read_failure_is_io_error() {
        let program = parse_str("+,").unwrap();
        let mut rt = Runtime::new(BrokenPipe, Vec::new());
        let err = rt.run(&program).unwrap_err();
        assert!(matches!(err, RuntimeError::Io { action: "input", .. }));
        assert_eq!(err.pos().offset, 2);
        assert_eq!(rt.cell(), 1);
    }

    #[test]
    fn output_write_failure_is_io_error() {
        let program = parse_str("+.").unwrap();
        let mut rt = Runtime::new(io::empty(), BrokenPipe);
        let err = rt.run(&program).unwrap_err();
        assert!(matches!(err, RuntimeError::Io { action: "output", .. }));
    }

    #[test]
    fn output_is_visible_before_the_next_node_runs() {
        // The run fails on `<`, after the byte was written.
        let program = parse_str("+.<").unwrap();
        let sink = HeldBack::default();
        let visible = sink.visible.clone();
        let mut rt = Runtime::new(io::empty(), sink);
        assert!(rt.run(&program).is_err());
        assert_eq!(*visible.borrow(), vec![1u8]);
    }

    #[test]
    fn output_flush_failure_points_at_the_output_node() {
        let program = parse_str("+\n +.+").unwrap();
        let sink = HeldBack { flush_fails: true, ..HeldBack::default() };
        let mut rt = Runtime::new(io::empty(), sink);
        let err = rt.run(&program).unwrap_err();
        assert!(matches!(err, RuntimeError::Io { action: "output", .. }));
        assert_eq!(err.pos(), SourcePosition { offset: 5, line: 2, column: 3 });
        assert_eq!(rt.cell(), 2);
    }

    #[test]
    fn first_failure_stops_the_run() {
        let (rt, result) = run_code("+.<+.", b"", 4);
        assert!(result.is_err());
        assert_eq!(rt.output(), &vec![1u8]);
        assert_eq!(rt.tape()[0], 1);
    }

    #[test]
    fn trace_prints_one_line_per_node_before_its_effect() {
        let program = parse_str("+[-]").unwrap();
        let trace = SharedBuf::default();
        let mut rt = Runtime::new(io::empty(), Vec::new());
        rt.set_trace_sink(trace.clone());
        rt.run(&program).unwrap();

        let text = String::from_utf8(trace.0.borrow().clone()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "run Block[2] at line 1, column 0 (offset 0)",
                "run Update(+1) at line 1, column 1 (offset 1)",
                "run Loop[1] at line 1, column 2 (offset 2)",
                "run Block[1] at line 1, column 2 (offset 2)",
                "run Update(-1) at line 1, column 3 (offset 3)",
            ]
        );
        assert_eq!(rt.tape()[0], 0);
    }

    #[test]
    fn broken_trace_sink_does_not_affect_the_run() {
        let program = parse_str("+++.").unwrap();
        let mut rt = Runtime::new(io::empty(), Vec::new());
        rt.set_trace_sink(BrokenPipe);
        assert!(rt.run(&program).is_ok());
        assert_eq!(rt.into_output(), vec![3u8]);
    }

    #[test]
    fn same_program_runs_on_independent_runtimes() {
        let program = parse_str(",+.").unwrap();
        let mut a = Runtime::new(&b"a"[..], Vec::new());
        let mut b = Runtime::new(&b"x"[..], Vec::new());
        a.run(&program).unwrap();
        b.run(&program).unwrap();
        assert_eq!(a.into_output(), b"b".to_vec());
        assert_eq!(b.into_output(), b"y".to_vec());
    }

    #[test]
    fn oversized_tape_len_is_clamped() {
        let rt = Runtime::with_tape_len(usize::MAX, io::empty(), io::sink());
        assert_eq!(rt.tape().len(), MAX_TAPE_LEN);
    }

    #[test]
    fn from_config_uses_tape_len() {
        let config = Config { tape_len: 7, ..Config::default() };
        let rt = Runtime::from_config(&config, io::empty(), io::sink());
        assert_eq!(rt.tape().len(), 7);
    }
}
