//! Lua source parser
//!
//! This module transforms Lua 5.3 source text into an Abstract Syntax Tree (AST):
//! - `lexer`: Lexical primitives that match tokens directly at the cursor
//! - `parse`: [`Parser`] struct and shared helpers
//! - [`ast`]: AST node definitions
//! - [`errors`]: The ordered table of syntax error labels and [`ParseError`]
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser, one function per precedence tier.
//! There is no separate tokenizing pass: the lexer is a cursor the grammar
//! advances, so a malformed literal is reported exactly where the grammar
//! first reaches it.
//!
//! Failures are labeled. Once a rule has committed (for example after `if`),
//! a missing piece raises a [`Label`] at the position where it was expected,
//! and the parse stops there. The driver below turns that label into a
//! `"<file>:<line>:<col>: syntax error, <message>"` error.

pub mod ast;
pub mod constants;
mod declarations;
pub mod errors;
mod expressions;
pub(crate) mod lexer;
mod parse;
mod statements;

use std::{panic, thread};

use tracing::{debug, warn};

use crate::parser::ast::AstNode;
use crate::parser::constants::{DEFAULT_FILENAME, STACK_BASE, STACK_PER_LEVEL};
pub use crate::parser::errors::{Label, ParseError};
pub use crate::parser::parse::{Parser, ParserConfig};

/// Parse `source` into its root `Block` with the default configuration.
///
/// `filename` only appears in error messages; it defaults to `"input"`.
pub fn parse(source: &str, filename: Option<&str>) -> Result<AstNode, ParseError> {
    parse_with_config(source, filename, &ParserConfig::default())
}

/// Parse `source` into its root `Block`.
///
/// The parse runs on a worker thread whose stack is sized for
/// `config.max_depth`, so input nested past the limit is reported as
/// [`ParseError::StackOverflow`] whatever stack the caller has.
pub fn parse_with_config(
    source: &str,
    filename: Option<&str>,
    config: &ParserConfig,
) -> Result<AstNode, ParseError> {
    let filename = filename.unwrap_or(DEFAULT_FILENAME);
    debug!(filename, bytes = source.len(), max_depth = config.max_depth, "parsing");

    let result = run_with_stack(stack_size(config.max_depth), || {
        Parser::with_config(source, config).parse_program(filename)
    });
    match &result {
        Ok(AstNode::Block { stats, .. }) => {
            debug!(filename, statements = stats.len(), "parsed");
        }
        Ok(_) => {}
        Err(err) => {
            let label = err.label().map_or("StackOverflow", Label::name);
            debug!(filename, label, error = %err, "parse failed");
        }
    }
    result
}

/// Stack needed to reach `max_depth` nesting levels.
fn stack_size(max_depth: usize) -> usize {
    max_depth
        .saturating_mul(STACK_PER_LEVEL)
        .saturating_add(STACK_BASE)
}

/// Run `job` on a scoped thread with `stack_size` bytes of stack, or on the
/// current thread when no such thread can be spawned.
fn run_with_stack<T: Send>(stack_size: usize, job: impl Fn() -> T + Sync) -> T {
    let job = &job;
    thread::scope(|scope| {
        let worker = thread::Builder::new()
            .name("luaparse".to_string())
            .stack_size(stack_size)
            .spawn_scoped(scope, job);
        match worker {
            Ok(handle) => handle
                .join()
                .unwrap_or_else(|payload| panic::resume_unwind(payload)),
            Err(err) => {
                warn!(stack_size, error = %err, "parsing on the calling thread");
                job()
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filename() {
        let err = parse("if true then", None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "input:1:13: syntax error, expected 'end' to close the if statement"
        );
    }

    #[test]
    fn test_custom_filename() {
        let err = parse("x = = 1", Some("main.lua")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "main.lua:1:5: syntax error, expected one or more expressions after '='"
        );
    }

    #[test]
    fn test_stack_grows_with_depth() {
        assert!(stack_size(400) > stack_size(200));
        assert_eq!(stack_size(0), STACK_BASE);
        assert_eq!(stack_size(usize::MAX), usize::MAX);
    }

    #[test]
    fn test_worker_result_reaches_caller() {
        assert_eq!(run_with_stack(STACK_BASE, || 21 * 2), 42);
    }

    #[test]
    fn test_calls_are_independent() {
        let config = ParserConfig::default().with_max_depth(2);
        assert!(parse_with_config("x = ((1))", None, &config).is_err());
        assert!(parse("x = ((1))", None).is_ok());
    }
}
