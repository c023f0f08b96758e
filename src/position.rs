use std::fmt;

/// Where a byte sits in the program source.
///
/// `offset` counts every byte consumed so far, `line` is one-based and
/// `column` restarts at zero after each newline. Nodes are stamped with the
/// position reached right after their opening byte was consumed, so the first
/// byte of a file is reported at offset 1, line 1, column 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourcePosition {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl SourcePosition {
    /// Position before any byte has been read.
    pub const fn start() -> Self {
        Self { offset: 0, line: 1, column: 0 }
    }

    /// Account for one more consumed byte.
    pub(crate) fn advance(&mut self, byte: u8) {
        self.offset += 1;
        self.column += 1;
        if byte == b'\n' {
            self.line += 1;
            self.column = 0;
        }
    }
}

impl Default for SourcePosition {
    fn default() -> Self {
        Self::start()
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {} (offset {})", self.line, self.column, self.offset)
    }
}
