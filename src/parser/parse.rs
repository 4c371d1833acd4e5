//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and the helpers every grammar
//! rule shares: labeled expectation, the nesting guard and span bookkeeping.
//!
//! # Parser Architecture
//!
//! The Parser is a recursive descent parser with the following organization:
//! - This module: Parser struct, configuration, helper methods
//! - `statements`: blocks and statements (if, while, for, local, ...)
//! - `declarations`: function names, function bodies and parameter lists
//! - `expressions`: the operator tiers, suffixed expressions and tables
//!
//! # Rule results
//!
//! Every rule returns `PResult<Option<T>>` or `PResult<T>`:
//! - `Ok(None)` means the rule did not apply and consumed nothing, so the
//!   caller may try an alternative.
//! - `Err(Failure)` means the input is malformed at a point where no
//!   alternative exists. It unwinds straight to [`Parser::parse_program`].
//!
//! Committed rules turn a soft miss into a failure with [`Parser::expect`],
//! which anchors the failure at the position where matching was attempted.

use crate::parser::ast::{AstNode, Span};
use crate::parser::constants::DEFAULT_MAX_DEPTH;
use crate::parser::errors::{Failure, Label, PResult, ParseError};
use crate::parser::lexer::Lexer;

/// Parser settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserConfig {
    /// Deepest allowed nesting of expressions and blocks.
    pub max_depth: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ParserConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Recursive descent parser for Lua 5.3 source
///
/// A `Parser` recurses on the calling thread's stack. [`parse_with_config`]
/// runs it on a thread sized for the nesting limit.
///
/// [`parse_with_config`]: crate::parser::parse_with_config
pub struct Parser<'src> {
    pub(crate) lexer: Lexer<'src>,
    depth: usize,
    max_depth: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        Self::with_config(source, &ParserConfig::default())
    }

    pub fn with_config(source: &'src str, config: &ParserConfig) -> Self {
        Self {
            lexer: Lexer::new(source),
            depth: 0,
            max_depth: config.max_depth,
        }
    }

    /// Parse the whole chunk into its root `Block`
    pub fn parse_program(&mut self, filename: &str) -> Result<AstNode, ParseError> {
        self.parse_chunk()
            .map_err(|failure| ParseError::from_failure(failure, self.lexer.source(), filename))
    }

    fn parse_chunk(&mut self) -> PResult<AstNode> {
        self.lexer.skip_shebang();
        self.lexer.skip()?;

        let stats = self.parse_block_statements()?;
        if !self.lexer.is_at_end() {
            return Err(self.error(Label::Extra));
        }

        // The root block covers the whole chunk, trivia included
        let span = Span::new(1, self.lexer.source_len().max(1));
        Ok(AstNode::Block { stats, span })
    }

    // ===== Helper methods =====

    /// Failure labeled `label` at the current position.
    pub(crate) fn error(&self, label: Label) -> Failure {
        Failure::labeled(label, self.lexer.position())
    }

    /// Run `rule` and require that it matched.
    pub(crate) fn expect<T>(
        &mut self,
        rule: impl FnOnce(&mut Self) -> PResult<Option<T>>,
        label: Label,
    ) -> PResult<T> {
        match rule(self)? {
            Some(value) => Ok(value),
            None => Err(self.error(label)),
        }
    }

    pub(crate) fn expect_keyword(&mut self, keyword: &str, label: Label) -> PResult<()> {
        if self.lexer.keyword(keyword)? {
            Ok(())
        } else {
            Err(self.error(label))
        }
    }

    pub(crate) fn expect_symbol(&mut self, symbol: &str, label: Label) -> PResult<()> {
        if self.lexer.symbol(symbol)? {
            Ok(())
        } else {
            Err(self.error(label))
        }
    }

    /// Run `rule` one nesting level deeper.
    pub(crate) fn nested<T>(&mut self, rule: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        if self.depth >= self.max_depth {
            return Err(Failure::TooDeep {
                offset: self.lexer.position(),
                limit: self.max_depth,
            });
        }

        self.depth += 1;
        let result = rule(self);
        self.depth -= 1;
        result
    }

    /// Span from the 0-based offset `start` to the end of the last token.
    pub(crate) fn span_from(&self, start: usize) -> Span {
        Span::new(start + 1, self.lexer.last_end())
    }

    pub(crate) fn position(&self) -> usize {
        self.lexer.position()
    }

    /// True when the next token ends the enclosing block.
    pub(crate) fn at_block_end(&self) -> bool {
        self.lexer.is_at_end()
            || ["return", "end", "elseif", "else", "until"]
                .iter()
                .any(|keyword| self.lexer.check_keyword(keyword))
    }

    // ===== Terminals =====

    /// A name, as an `Id` node
    pub(crate) fn parse_id(&mut self) -> PResult<Option<AstNode>> {
        Ok(self
            .lexer
            .name()?
            .map(|(name, span)| AstNode::Id { name, span }))
    }

    /// A name, as a `String` node (field keys and method names)
    pub(crate) fn parse_string_id(&mut self) -> PResult<Option<AstNode>> {
        Ok(self
            .lexer
            .name()?
            .map(|(name, span)| AstNode::StringLiteral {
                value: name.into_bytes(),
                span,
            }))
    }

    pub(crate) fn parse_dots(&mut self) -> PResult<Option<AstNode>> {
        let start = self.position();
        if self.lexer.symbol("...")? {
            Ok(Some(AstNode::Dots {
                span: self.span_from(start),
            }))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> AstNode {
        Parser::new(source).parse_program("input").unwrap()
    }

    fn parse_err(source: &str) -> ParseError {
        Parser::new(source).parse_program("input").unwrap_err()
    }

    #[test]
    fn test_parse_empty_chunk() {
        match &parse_ok("") {
            AstNode::Block { stats, span } => {
                assert!(stats.is_empty());
                assert_eq!(*span, Span::new(1, 1));
            }
            _ => panic!("Expected block"),
        }
    }

    #[test]
    fn test_root_block_covers_trailing_trivia() {
        let source = "x = 1 -- done\n\n";
        match &parse_ok(source) {
            AstNode::Block { stats, span } => {
                assert_eq!(stats.len(), 1);
                assert_eq!(*span, Span::new(1, source.len()));
                assert_eq!(stats[0].span(), Span::new(1, 5));
            }
            _ => panic!("Expected block"),
        }
    }

    #[test]
    fn test_parse_local_function() {
        let block = parse_ok("local function f(a, b) return a + b end");
        let AstNode::Block { stats, .. } = &block else {
            panic!("Expected block");
        };

        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].tag(), "Localrec");
    }

    #[test]
    fn test_extra_input_after_return() {
        let err = parse_err("return 1 x = 2");
        assert_eq!(err.label(), Some(Label::Extra));
        assert_eq!(err.location(), (1, 10));
    }

    #[test]
    fn test_expect_anchors_at_attempt() {
        let mut parser = Parser::new("if then");
        parser.lexer.skip().unwrap();
        assert!(parser.lexer.keyword("if").unwrap());

        let failure = parser
            .expect(|p| p.parse_expression(), Label::ExprIf)
            .unwrap_err();
        assert_eq!(failure, Failure::labeled(Label::ExprIf, 3));
    }

    #[test]
    fn test_depth_limit_from_config() {
        let config = ParserConfig::default().with_max_depth(3);
        let mut parser = Parser::with_config("x = ((((1))))", &config);
        let err = parser.parse_program("input").unwrap_err();
        assert!(err.is_stack_overflow());

        let mut parser = Parser::with_config("x = (1)", &config);
        assert!(parser.parse_program("input").is_ok());
    }
}
