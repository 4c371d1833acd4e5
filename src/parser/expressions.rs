//! Expression parsing implementation
//!
//! Binary operators are parsed by one function per precedence tier, loosest
//! first. Each tier parses operands of the next tighter tier; a tier that
//! matches a single operand returns it unchanged.
//!
//! # Precedence (loosest to tightest)
//!
//! | Tier            | Operators                      | Assoc |
//! |-----------------|--------------------------------|-------|
//! | or              | `or`                           | left  |
//! | and             | `and`                          | left  |
//! | relational      | `~= == <= >= < >`              | left  |
//! | bitwise or      | `\|`                           | left  |
//! | bitwise xor     | `~`                            | left  |
//! | bitwise and     | `&`                            | left  |
//! | shift           | `<< >>`                        | left  |
//! | concat          | `..`                           | right |
//! | additive        | `+ -`                          | left  |
//! | multiplicative  | `* // / %`                     | left  |
//! | unary           | `not - # ~`                    | prefix|
//! | power           | `^`                            | right |
//!
//! The operand of `^` may itself carry a unary operator, so `2^-3` parses
//! and `-2^2` is `-(2^2)`.
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::errors::{Label, PResult};
use crate::parser::parse::Parser;

type Rule<'src, T> = fn(&mut Parser<'src>) -> PResult<Option<T>>;

impl<'src> Parser<'src> {
    /// Parse expression (top-level entry point)
    pub(crate) fn parse_expression(&mut self) -> PResult<Option<AstNode>> {
        self.nested(Self::parse_or)
    }

    /// Parse a comma-separated expression list; `label` covers a missing
    /// expression after a comma
    pub(crate) fn parse_expression_list(&mut self, label: Label) -> PResult<Option<Vec<AstNode>>> {
        let Some(first) = self.parse_expression()? else {
            return Ok(None);
        };

        let mut exprs = vec![first];
        while self.lexer.symbol(",")? {
            exprs.push(self.expect(Self::parse_expression, label)?);
        }
        Ok(Some(exprs))
    }

    /// Fold `operand (operator operand)*` to the left.
    fn chain_left(
        &mut self,
        operand: Rule<'src, AstNode>,
        operator: Rule<'src, BinOp>,
        label: Label,
    ) -> PResult<Option<AstNode>> {
        let Some(mut left) = operand(self)? else {
            return Ok(None);
        };

        while let Some(op) = operator(self)? {
            let right = self.expect(operand, label)?;
            left = fold_binary(left, Some((op, right)));
        }
        Ok(Some(left))
    }

    fn parse_or(&mut self) -> PResult<Option<AstNode>> {
        self.chain_left(Self::parse_and, Self::or_operator, Label::OrExpr)
    }

    fn parse_and(&mut self) -> PResult<Option<AstNode>> {
        self.chain_left(Self::parse_relational, Self::and_operator, Label::AndExpr)
    }

    fn parse_relational(&mut self) -> PResult<Option<AstNode>> {
        self.chain_left(
            Self::parse_bitwise_or,
            Self::relational_operator,
            Label::RelExpr,
        )
    }

    fn parse_bitwise_or(&mut self) -> PResult<Option<AstNode>> {
        self.chain_left(
            Self::parse_bitwise_xor,
            Self::bitwise_or_operator,
            Label::BOrExpr,
        )
    }

    fn parse_bitwise_xor(&mut self) -> PResult<Option<AstNode>> {
        self.chain_left(
            Self::parse_bitwise_and,
            Self::bitwise_xor_operator,
            Label::BXorExpr,
        )
    }

    fn parse_bitwise_and(&mut self) -> PResult<Option<AstNode>> {
        self.chain_left(
            Self::parse_shift,
            Self::bitwise_and_operator,
            Label::BAndExpr,
        )
    }

    fn parse_shift(&mut self) -> PResult<Option<AstNode>> {
        self.chain_left(Self::parse_concat, Self::shift_operator, Label::ShiftExpr)
    }

    /// Concatenation is right-associative: `a .. b .. c` is `a .. (b .. c)`
    fn parse_concat(&mut self) -> PResult<Option<AstNode>> {
        let Some(left) = self.parse_additive()? else {
            return Ok(None);
        };

        let tail = if self.lexer.check_symbol_not_followed("..", b'.') {
            self.lexer.symbol("..")?;
            let right = self.nested(|p| p.expect(Self::parse_concat, Label::ConcatExpr))?;
            Some((BinOp::Concat, right))
        } else {
            None
        };
        Ok(Some(fold_binary(left, tail)))
    }

    fn parse_additive(&mut self) -> PResult<Option<AstNode>> {
        self.chain_left(
            Self::parse_multiplicative,
            Self::additive_operator,
            Label::AddExpr,
        )
    }

    fn parse_multiplicative(&mut self) -> PResult<Option<AstNode>> {
        self.chain_left(
            Self::parse_unary,
            Self::multiplicative_operator,
            Label::MulExpr,
        )
    }

    /// Parse prefix operators, then a power expression
    fn parse_unary(&mut self) -> PResult<Option<AstNode>> {
        let start = self.position();
        let Some(op) = self.unary_operator()? else {
            return self.parse_power();
        };

        let operand = self.nested(|p| p.expect(Self::parse_unary, Label::UnaryExpr))?;
        Ok(Some(fold_unary(op, start + 1, operand)))
    }

    /// Exponentiation binds tighter than a unary operator on its left and
    /// looser than one on its right
    fn parse_power(&mut self) -> PResult<Option<AstNode>> {
        let Some(base) = self.parse_simple_expression()? else {
            return Ok(None);
        };

        let tail = if self.lexer.symbol("^")? {
            let exponent = self.nested(|p| p.expect(Self::parse_unary, Label::PowExpr))?;
            Some((BinOp::Pow, exponent))
        } else {
            None
        };
        Ok(Some(fold_binary(base, tail)))
    }

    // ===== Operators =====

    fn or_operator(&mut self) -> PResult<Option<BinOp>> {
        Ok(self.lexer.keyword("or")?.then_some(BinOp::Or))
    }

    fn and_operator(&mut self) -> PResult<Option<BinOp>> {
        Ok(self.lexer.keyword("and")?.then_some(BinOp::And))
    }

    fn relational_operator(&mut self) -> PResult<Option<BinOp>> {
        self.match_operator(&[
            ("~=", BinOp::Ne),
            ("==", BinOp::Eq),
            ("<=", BinOp::Le),
            (">=", BinOp::Ge),
            ("<", BinOp::Lt),
            (">", BinOp::Gt),
        ])
    }

    fn bitwise_or_operator(&mut self) -> PResult<Option<BinOp>> {
        self.match_operator(&[("|", BinOp::BitOr)])
    }

    // `~` followed by `=` is the inequality operator
    fn bitwise_xor_operator(&mut self) -> PResult<Option<BinOp>> {
        if self.lexer.check_symbol_not_followed("~", b'=') {
            self.lexer.symbol("~")?;
            Ok(Some(BinOp::BitXor))
        } else {
            Ok(None)
        }
    }

    fn bitwise_and_operator(&mut self) -> PResult<Option<BinOp>> {
        self.match_operator(&[("&", BinOp::BitAnd)])
    }

    fn shift_operator(&mut self) -> PResult<Option<BinOp>> {
        self.match_operator(&[("<<", BinOp::Shl), (">>", BinOp::Shr)])
    }

    fn additive_operator(&mut self) -> PResult<Option<BinOp>> {
        self.match_operator(&[("+", BinOp::Add), ("-", BinOp::Sub)])
    }

    fn multiplicative_operator(&mut self) -> PResult<Option<BinOp>> {
        self.match_operator(&[
            ("*", BinOp::Mul),
            ("//", BinOp::IDiv),
            ("/", BinOp::Div),
            ("%", BinOp::Mod),
        ])
    }

    fn unary_operator(&mut self) -> PResult<Option<UnOp>> {
        if self.lexer.keyword("not")? {
            return Ok(Some(UnOp::Not));
        }
        if self.lexer.symbol("-")? {
            return Ok(Some(UnOp::Neg));
        }
        if self.lexer.symbol("#")? {
            return Ok(Some(UnOp::Len));
        }
        if self.lexer.check_symbol_not_followed("~", b'=') {
            self.lexer.symbol("~")?;
            return Ok(Some(UnOp::BitNot));
        }
        Ok(None)
    }

    /// First symbol of `table` present at the cursor. Longer symbols must
    /// come before their prefixes.
    fn match_operator(&mut self, table: &[(&str, BinOp)]) -> PResult<Option<BinOp>> {
        for &(symbol, op) in table {
            if self.lexer.symbol(symbol)? {
                return Ok(Some(op));
            }
        }
        Ok(None)
    }

    // ===== Operands =====

    /// Literals, `...`, function literals, tables and suffixed expressions
    fn parse_simple_expression(&mut self) -> PResult<Option<AstNode>> {
        let start = self.position();

        if let Some((value, span)) = self.lexer.number()? {
            return Ok(Some(AstNode::NumberLiteral { value, span }));
        }
        if let Some((value, span)) = self.lexer.string()? {
            return Ok(Some(AstNode::StringLiteral { value, span }));
        }
        if self.lexer.keyword("nil")? {
            return Ok(Some(AstNode::Nil {
                span: self.span_from(start),
            }));
        }
        for (keyword, value) in [("false", false), ("true", true)] {
            if self.lexer.keyword(keyword)? {
                return Ok(Some(AstNode::BooleanLiteral {
                    value,
                    span: self.span_from(start),
                }));
            }
        }
        if let Some(dots) = self.parse_dots()? {
            return Ok(Some(dots));
        }
        if self.lexer.check_keyword("function") {
            return self.parse_function_literal().map(Some);
        }
        if self.lexer.check_symbol("{") {
            return self.parse_table().map(Some);
        }
        self.parse_suffixed_expression()
    }

    /// A name or parenthesized expression followed by any number of index,
    /// method call and call suffixes
    pub(crate) fn parse_suffixed_expression(&mut self) -> PResult<Option<AstNode>> {
        let Some(mut expr) = self.parse_primary_expression()? else {
            return Ok(None);
        };

        loop {
            let pos = expr.span().pos;

            if self.lexer.check_symbol_not_followed(".", b'.') {
                self.lexer.symbol(".")?;
                let key = self.expect(Self::parse_string_id, Label::NameIndex)?;
                expr = AstNode::Index {
                    span: Span::new(pos, key.span().end_pos),
                    object: Box::new(expr),
                    key: Box::new(key),
                };
            } else if self.lexer.check_symbol("[") && !self.lexer.check_long_bracket() {
                self.lexer.symbol("[")?;
                let key = self.expect(Self::parse_expression, Label::ExprIndex)?;
                self.expect_symbol("]", Label::CBracketIndex)?;
                expr = AstNode::Index {
                    object: Box::new(expr),
                    key: Box::new(key),
                    span: Span::new(pos, self.lexer.last_end()),
                };
            } else if self.lexer.check_symbol_not_followed(":", b':') {
                self.lexer.symbol(":")?;
                let method = self.expect(Self::parse_string_id, Label::NameMeth)?;
                let args = self.expect(Self::parse_call_arguments, Label::MethArgs)?;
                expr = AstNode::Invoke {
                    object: Box::new(expr),
                    method: Box::new(method),
                    args,
                    span: Span::new(pos, self.lexer.last_end()),
                };
            } else if let Some(args) = self.parse_call_arguments()? {
                expr = AstNode::Call {
                    func: Box::new(expr),
                    args,
                    span: Span::new(pos, self.lexer.last_end()),
                };
            } else {
                break;
            }
        }

        Ok(Some(expr))
    }

    fn parse_primary_expression(&mut self) -> PResult<Option<AstNode>> {
        if let Some(id) = self.parse_id()? {
            return Ok(Some(id));
        }

        let start = self.position();
        if !self.lexer.symbol("(")? {
            return Ok(None);
        }
        let expr = self.expect(Self::parse_expression, Label::ExprParen)?;
        self.expect_symbol(")", Label::CParenExpr)?;
        Ok(Some(AstNode::Paren {
            expr: Box::new(expr),
            span: self.span_from(start),
        }))
    }

    /// `(args)`, a table constructor or a string literal
    fn parse_call_arguments(&mut self) -> PResult<Option<Vec<AstNode>>> {
        if self.lexer.symbol("(")? {
            let args = self
                .parse_expression_list(Label::ArgList)?
                .unwrap_or_default();
            self.expect_symbol(")", Label::CParenArgs)?;
            return Ok(Some(args));
        }
        if self.lexer.check_symbol("{") {
            return Ok(Some(vec![self.parse_table()?]));
        }
        if let Some((value, span)) = self.lexer.string()? {
            return Ok(Some(vec![AstNode::StringLiteral { value, span }]));
        }
        Ok(None)
    }

    // ===== Tables =====

    /// Table constructor; the cursor is on `{`
    fn parse_table(&mut self) -> PResult<AstNode> {
        let start = self.position();
        self.lexer.symbol("{")?;

        let mut fields = Vec::new();
        while let Some(field) = self.parse_field()? {
            fields.push(field);
            if !(self.lexer.symbol(",")? || self.lexer.symbol(";")?) {
                break;
            }
        }

        self.expect_symbol("}", Label::CBraceTable)?;
        Ok(AstNode::Table {
            fields,
            span: self.span_from(start),
        })
    }

    /// `[key] = value`, `name = value` or a positional expression
    fn parse_field(&mut self) -> PResult<Option<AstNode>> {
        let start = self.position();

        if self.lexer.check_symbol("[") && !self.lexer.check_long_bracket() {
            self.lexer.symbol("[")?;
            let key = self.expect(Self::parse_expression, Label::ExprFKey)?;
            self.expect_symbol("]", Label::CBracketFKey)?;
            self.expect_symbol("=", Label::EqField)?;
            let value = self.expect(Self::parse_expression, Label::ExprField)?;
            return Ok(Some(self.pair(start, key, value)));
        }

        // `name =` is a named field, `name == x` a positional one
        let saved = self.lexer;
        if let Some(key) = self.parse_string_id()? {
            if self.lexer.check_symbol_not_followed("=", b'=') {
                self.lexer.symbol("=")?;
                let value = self.expect(Self::parse_expression, Label::ExprField)?;
                return Ok(Some(self.pair(start, key, value)));
            }
            self.lexer = saved;
        }

        self.parse_expression()
    }

    fn pair(&self, start: usize, key: AstNode, value: AstNode) -> AstNode {
        AstNode::Pair {
            key: Box::new(key),
            value: Box::new(value),
            span: self.span_from(start),
        }
    }
}
