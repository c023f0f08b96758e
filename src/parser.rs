//! Recursive-descent parser from a byte stream to a [`Block`] tree.
//!
//! Any byte outside `<>+-.,[]` is commentary: it is skipped but still moves
//! the source position along.

use std::fs::File;
use std::io::{self, BufReader, ErrorKind, Read};
use std::path::Path;

use crate::ast::{Block, Loop, Node};
use crate::position::SourcePosition;

/// Errors that can occur while turning source into a program tree.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// A `]` with no `[` to close at the top level.
    #[error("unexpected close bracket at {pos}")]
    UnexpectedClose { pos: SourcePosition },

    /// A `[` still open at end of input. Only reported in strict mode.
    #[error("unclosed open bracket at {pos}")]
    UnclosedOpen { pos: SourcePosition },

    /// Reading the source failed for a reason other than end of input.
    #[error("I/O error at {pos}: {source}")]
    Io {
        pos: SourcePosition,
        #[source]
        source: io::Error,
    },

    /// The program file could not be opened.
    #[error("{source}")]
    Open {
        #[source]
        source: io::Error,
    },
}

impl ParseError {
    /// Source position the error points at, if there is one.
    pub fn pos(&self) -> Option<SourcePosition> {
        match self {
            ParseError::UnexpectedClose { pos }
            | ParseError::UnclosedOpen { pos }
            | ParseError::Io { pos, .. } => Some(*pos),
            ParseError::Open { .. } => None,
        }
    }
}

/// Knobs for the parser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Report a `[` left open at end of input instead of closing it silently.
    pub strict_brackets: bool,
}

/// The eight instruction bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Left,
    Right,
    Increment,
    Decrement,
    Output,
    Input,
    Open,
    Close,
}

impl Token {
    pub fn from_byte(byte: u8) -> Option<Token> {
        match byte {
            b'<' => Some(Token::Left),
            b'>' => Some(Token::Right),
            b'+' => Some(Token::Increment),
            b'-' => Some(Token::Decrement),
            b'.' => Some(Token::Output),
            b',' => Some(Token::Input),
            b'[' => Some(Token::Open),
            b']' => Some(Token::Close),
            _ => None,
        }
    }
}

/// Single-use parser state over one input stream.
pub struct Parser<R> {
    input: R,
    pos: SourcePosition,
    options: ParseOptions,
    // First non-EOF read failure; once set, scanning stops.
    error: Option<io::Error>,
}

impl<R: Read> Parser<R> {
    pub fn new(input: R) -> Self {
        Self::with_options(input, ParseOptions::default())
    }

    pub fn with_options(input: R, options: ParseOptions) -> Self {
        Self {
            input,
            pos: SourcePosition::start(),
            options,
            error: None,
        }
    }

    /// Consume the whole stream and build the program tree.
    pub fn parse(mut self) -> Result<Block, ParseError> {
        let mut root = Block::new(self.pos);
        let outcome = self.parse_block(&mut root, None);

        // A read failure stops scanning, so it wins over anything found after.
        if let Some(source) = self.error.take() {
            return Err(ParseError::Io { pos: self.pos, source });
        }
        outcome?;

        tracing::debug!(
            instructions = root.instruction_count(),
            bytes = self.pos.offset,
            lines = self.pos.line,
            "parsed program"
        );
        Ok(root)
    }

    /// Fill `block` until a `]` or end of input. `opened_at` is the position
    /// of the `[` that started this block, `None` for the top level.
    fn parse_block(
        &mut self,
        block: &mut Block,
        opened_at: Option<SourcePosition>,
    ) -> Result<(), ParseError> {
        while let Some(token) = self.next_token() {
            let pos = self.pos;
            let node = match token {
                Token::Left => Node::Move { pos, delta: -1 },
                Token::Right => Node::Move { pos, delta: 1 },
                Token::Increment => Node::Update { pos, delta: 1 },
                Token::Decrement => Node::Update { pos, delta: -1 },
                Token::Output => Node::Output { pos },
                Token::Input => Node::Input { pos },
                Token::Open => {
                    let mut body = Block::new(pos);
                    self.parse_block(&mut body, Some(pos))?;
                    Node::Loop(Loop { pos, body })
                }
                Token::Close => {
                    return match opened_at {
                        Some(_) => Ok(()),
                        None => Err(ParseError::UnexpectedClose { pos }),
                    };
                }
            };
            block.push(node);
        }

        match opened_at {
            Some(open) if self.options.strict_brackets && self.error.is_none() => {
                Err(ParseError::UnclosedOpen { pos: open })
            }
            _ => Ok(()),
        }
    }

    /// Next instruction byte, or `None` at end of input or after a latched
    /// read error.
    fn next_token(&mut self) -> Option<Token> {
        let mut buf = [0u8; 1];
        while self.error.is_none() {
            match self.input.read(&mut buf) {
                Ok(0) => return None,
                Ok(_) => {
                    self.pos.advance(buf[0]);
                    if let Some(token) = Token::from_byte(buf[0]) {
                        return Some(token);
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => self.error = Some(e),
            }
        }
        None
    }
}

/// Parse a program from any byte stream.
pub fn parse<R: Read>(input: R, options: ParseOptions) -> Result<Block, ParseError> {
    Parser::with_options(input, options).parse()
}

/// Parse a program held in memory with default options.
pub fn parse_str(code: &str) -> Result<Block, ParseError> {
    Parser::new(code.as_bytes()).parse()
}

/// Open, parse and close a program file.
pub fn parse_file(path: impl AsRef<Path>, options: ParseOptions) -> Result<Block, ParseError> {
    let file = File::open(path.as_ref()).map_err(|source| ParseError::Open { source })?;
    // `file` is dropped (closed) when this returns, on success or failure.
    parse(BufReader::new(file), options)
}
