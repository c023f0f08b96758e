//! A Brainfuck parser and tree-walking interpreter.
//!
//! Source is parsed into a tree of [`Node`]s which is then executed directly
//! against a [`Runtime`]: a byte tape (default 30,000 cells) with a single
//! cursor.
//!
//! Features and behaviors:
//! - Memory tape initialized to 0; cells wrap on overflow and underflow.
//! - Strict pointer bounds: moving left from cell 0 or right past the end
//!   returns an error carrying the source position of the move.
//! - Input `,` reads a single byte; on EOF the current cell is set to 255.
//! - Output `.` writes the byte at the current cell.
//! - Any non-Brainfuck byte is a comment.
//! - A stray `]` is a syntax error; a `[` left open at end of input is
//!   closed silently unless strict bracket checking is on.
//!
//! Quick start:
//!
//! ```
//! use bf_tree::{parse_str, Runtime};
//!
//! let program = parse_str("+++++[>+++++<-]>.").expect("program should parse");
//! let mut rt = Runtime::new(std::io::empty(), Vec::new());
//! rt.run(&program).expect("program should run");
//! assert_eq!(rt.into_output(), vec![25]);
//! ```

pub mod ast;
pub mod cli_util;
pub mod commands;
pub mod config;
pub mod parser;
pub mod position;
pub mod runtime;

pub use ast::{Block, Loop, Node};
pub use config::Config;
pub use parser::{parse, parse_file, parse_str, ParseError, ParseOptions, Parser};
pub use position::SourcePosition;
pub use runtime::{Runtime, RuntimeError, DEFAULT_TAPE_LEN, EOF_SENTINEL};
