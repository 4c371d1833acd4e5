//! # Introduction
//!
//! luaparse turns Lua 5.3 source text into an abstract syntax tree whose nodes
//! all carry their source span. When the input is malformed it reports one
//! precise syntax error, for example:
//!
//! ```text
//! input:1:13: syntax error, expected 'end' to close the if statement
//! ```
//!
//! ## Pipeline
//!
//! ```text
//! Source → Parser (lexer cursor + grammar) → AST → Executable lines
//! ```
//!
//! 1. [`parser`] builds the AST. Errors are drawn from a fixed table of
//!    [`Label`]s, one per place the grammar can fail.
//! 2. [`lines`] lists the lines of a chunk that can stop execution, for
//!    line-oriented tracers and coverage tools.
//!
//! ## Example
//!
//! ```
//! use luaparse::{parse, AstNode};
//!
//! let chunk = parse("local x = 1 + 2", None).unwrap();
//! assert_eq!(chunk.tag(), "Block");
//! assert_eq!(chunk.children()[0].tag(), "Local");
//! ```

pub mod lines;
pub mod parser;

pub use parser::ast::{AstNode, BinOp, Number, Span, UnOp};
pub use parser::{parse, parse_with_config, Label, ParseError, ParserConfig};
