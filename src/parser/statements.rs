//! Statement parsing implementation
//!
//! This module handles blocks and every Lua statement form:
//!
//! - Control flow: `if`, `while`, `repeat`, numeric and generic `for`, `do`
//! - Declarations: `local` names with optional initializers
//! - Jumps: `break`, `goto`, `::label::`, `return`
//! - Expression statements: calls and multiple assignment
//!
//! # Grammar
//!
//! ```text
//! block     ::= stat* retstat?
//! stat      ::= ';' | varlist '=' explist | call | label | 'break'
//!             | 'goto' Name | 'do' block 'end'
//!             | 'while' exp 'do' block 'end'
//!             | 'repeat' block 'until' exp
//!             | 'if' exp 'then' block ('elseif' exp 'then' block)* ('else' block)? 'end'
//!             | 'for' Name '=' exp ',' exp (',' exp)? 'do' block 'end'
//!             | 'for' namelist 'in' explist 'do' block 'end'
//!             | 'function' funcname funcbody
//!             | 'local' 'function' Name funcbody
//!             | 'local' namelist ('=' explist)?
//! retstat   ::= 'return' explist? ';'?
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::errors::{Failure, Label, PResult};
use crate::parser::parse::Parser;

impl<'src> Parser<'src> {
    /// Parse a nested block
    ///
    /// An empty block gets a one-byte span on the token that ends it.
    pub(crate) fn parse_block(&mut self) -> PResult<AstNode> {
        self.nested(|parser| {
            let start = parser.position();
            let stats = parser.parse_block_statements()?;
            let span = list_span(&stats).unwrap_or(Span::point(start + 1));
            Ok(AstNode::Block { stats, span })
        })
    }

    /// Parse statements up to the end of the enclosing block
    pub(crate) fn parse_block_statements(&mut self) -> PResult<Vec<AstNode>> {
        let mut stats = Vec::new();

        while !self.at_block_end() {
            if let Some(stat) = self.parse_statement()? {
                stats.push(stat);
            }
        }

        if self.lexer.check_keyword("return") {
            stats.push(self.parse_return_statement()?);
        }

        Ok(stats)
    }

    /// Parse a statement; `None` for an empty statement (`;`)
    fn parse_statement(&mut self) -> PResult<Option<AstNode>> {
        let start = self.position();

        let stat = if self.lexer.check_keyword("if") {
            self.parse_if_statement()?
        } else if self.lexer.check_keyword("do") {
            self.parse_do_statement()?
        } else if self.lexer.check_keyword("while") {
            self.parse_while_statement()?
        } else if self.lexer.check_keyword("repeat") {
            self.parse_repeat_statement()?
        } else if self.lexer.check_keyword("for") {
            self.parse_for_statement()?
        } else if self.lexer.check_keyword("local") {
            self.parse_local_statement()?
        } else if self.lexer.check_keyword("function") {
            self.parse_function_statement()?
        } else if self.lexer.keyword("break")? {
            AstNode::Break {
                span: self.span_from(start),
            }
        } else if self.lexer.check_symbol("::") {
            self.parse_label_statement()?
        } else if self.lexer.check_keyword("goto") {
            self.parse_goto_statement()?
        } else if self.lexer.symbol(";")? {
            return Ok(None);
        } else if let Some(stat) = self.parse_expression_statement(start)? {
            stat
        } else {
            return Err(Failure::labeled(Label::ExpStat, start));
        };

        Ok(Some(stat))
    }

    fn parse_if_statement(&mut self) -> PResult<AstNode> {
        let start = self.position();
        self.lexer.keyword("if")?;

        let mut branches = vec![self.parse_conditional_branch(Label::ExprIf, Label::ThenIf)?];
        while self.lexer.keyword("elseif")? {
            branches.push(self.parse_conditional_branch(Label::ExprEIf, Label::ThenEIf)?);
        }

        let else_branch = if self.lexer.keyword("else")? {
            Some(Box::new(self.parse_block()?))
        } else {
            None
        };

        self.expect_keyword("end", Label::EndIf)?;
        Ok(AstNode::If {
            branches,
            else_branch,
            span: self.span_from(start),
        })
    }

    /// `exp 'then' block` for `if` and each `elseif`
    fn parse_conditional_branch(
        &mut self,
        expr_label: Label,
        then_label: Label,
    ) -> PResult<(AstNode, AstNode)> {
        let condition = self.expect(Self::parse_expression, expr_label)?;
        self.expect_keyword("then", then_label)?;
        let block = self.parse_block()?;
        Ok((condition, block))
    }

    fn parse_do_statement(&mut self) -> PResult<AstNode> {
        let start = self.position();
        self.lexer.keyword("do")?;

        let body = self.parse_block()?;
        self.expect_keyword("end", Label::EndDo)?;
        Ok(AstNode::Do {
            body: Box::new(body),
            span: self.span_from(start),
        })
    }

    fn parse_while_statement(&mut self) -> PResult<AstNode> {
        let start = self.position();
        self.lexer.keyword("while")?;

        let condition = self.expect(Self::parse_expression, Label::ExprWhile)?;
        self.expect_keyword("do", Label::DoWhile)?;
        let body = self.parse_block()?;
        self.expect_keyword("end", Label::EndWhile)?;

        Ok(AstNode::While {
            condition: Box::new(condition),
            body: Box::new(body),
            span: self.span_from(start),
        })
    }

    fn parse_repeat_statement(&mut self) -> PResult<AstNode> {
        let start = self.position();
        self.lexer.keyword("repeat")?;

        let body = self.parse_block()?;
        self.expect_keyword("until", Label::UntilRep)?;
        let condition = self.expect(Self::parse_expression, Label::ExprRep)?;

        Ok(AstNode::Repeat {
            body: Box::new(body),
            condition: Box::new(condition),
            span: self.span_from(start),
        })
    }

    /// Numeric (`for i = a, b, c`) or generic (`for k, v in e`) loop
    fn parse_for_statement(&mut self) -> PResult<AstNode> {
        let start = self.position();
        self.lexer.keyword("for")?;

        let first = self.expect(Self::parse_id, Label::ForRange)?;

        if self.lexer.check_symbol_not_followed("=", b'=') {
            self.lexer.symbol("=")?;
            let from = self.expect(Self::parse_expression, Label::ExprFor1)?;
            self.expect_symbol(",", Label::CommaFor)?;
            let limit = self.expect(Self::parse_expression, Label::ExprFor2)?;
            let step = if self.lexer.symbol(",")? {
                Some(Box::new(self.expect(Self::parse_expression, Label::ExprFor3)?))
            } else {
                None
            };
            let body = self.parse_for_body()?;

            return Ok(AstNode::Fornum {
                var: Box::new(first),
                start: Box::new(from),
                limit: Box::new(limit),
                step,
                body: Box::new(body),
                span: self.span_from(start),
            });
        }

        let names = self.parse_name_list(first)?;
        self.expect_keyword("in", Label::InFor)?;
        let exprs = self.expect(|p| p.parse_expression_list(Label::ExprList), Label::EListFor)?;
        let exprs = expression_list(exprs, names.span().end_pos);
        let body = self.parse_for_body()?;

        Ok(AstNode::Forin {
            names: Box::new(names),
            exprs: Box::new(exprs),
            body: Box::new(body),
            span: self.span_from(start),
        })
    }

    /// `'do' block 'end'` shared by both loop forms
    fn parse_for_body(&mut self) -> PResult<AstNode> {
        self.expect_keyword("do", Label::DoFor)?;
        let body = self.parse_block()?;
        self.expect_keyword("end", Label::EndFor)?;
        Ok(body)
    }

    fn parse_local_statement(&mut self) -> PResult<AstNode> {
        let start = self.position();
        self.lexer.keyword("local")?;

        if self.lexer.check_keyword("function") {
            return self.parse_local_function(start);
        }

        let first = self.expect(Self::parse_id, Label::DefLocal)?;
        let names = self.parse_name_list(first)?;

        let values = if self.lexer.check_symbol_not_followed("=", b'=') {
            self.lexer.symbol("=")?;
            self.expect(|p| p.parse_expression_list(Label::ExprList), Label::EListLAssign)?
        } else {
            Vec::new()
        };

        Ok(AstNode::Local {
            exprs: Box::new(expression_list(values, names.span().end_pos)),
            names: Box::new(names),
            span: self.span_from(start),
        })
    }

    /// `Name (',' Name)*` after its first name. A comma with no name after
    /// it is left for the caller.
    pub(crate) fn parse_name_list(&mut self, first: AstNode) -> PResult<AstNode> {
        let mut names = vec![first];

        loop {
            let saved = self.lexer;
            if !self.lexer.symbol(",")? {
                break;
            }
            match self.parse_id()? {
                Some(name) => names.push(name),
                None => {
                    self.lexer = saved;
                    break;
                }
            }
        }

        let span = Span::between(names[0].span(), names[names.len() - 1].span());
        Ok(AstNode::NameList { names, span })
    }

    fn parse_label_statement(&mut self) -> PResult<AstNode> {
        let start = self.position();
        self.lexer.symbol("::")?;

        let (name, _) = self.expect(|p| p.lexer.name(), Label::LabelName)?;
        self.expect_symbol("::", Label::CloseLabel)?;
        Ok(AstNode::Label {
            name,
            span: self.span_from(start),
        })
    }

    fn parse_goto_statement(&mut self) -> PResult<AstNode> {
        let start = self.position();
        self.lexer.keyword("goto")?;

        let (label, _) = self.expect(|p| p.lexer.name(), Label::Goto)?;
        Ok(AstNode::Goto {
            label,
            span: self.span_from(start),
        })
    }

    fn parse_return_statement(&mut self) -> PResult<AstNode> {
        let start = self.position();
        self.lexer.keyword("return")?;

        let exprs = self
            .parse_expression_list(Label::RetList)?
            .unwrap_or_default();
        self.lexer.symbol(";")?;

        Ok(AstNode::Return {
            exprs,
            span: self.span_from(start),
        })
    }

    /// A call statement or a multiple assignment.
    ///
    /// Returns `None` when the statement is neither, so the caller can report
    /// an invalid statement at `start`.
    fn parse_expression_statement(&mut self, start: usize) -> PResult<Option<AstNode>> {
        let Some(expr) = self.parse_suffixed_expression()? else {
            return Ok(None);
        };

        if matches!(expr, AstNode::Call { .. } | AstNode::Invoke { .. }) {
            return Ok(Some(expr));
        }
        if !is_assignable(&expr) {
            return Ok(None);
        }

        let mut vars = vec![expr];
        while self.lexer.symbol(",")? {
            let var_start = self.position();
            match self.parse_suffixed_expression()? {
                Some(var) if is_assignable(&var) => vars.push(var),
                _ => return Err(Failure::labeled(Label::VarList, var_start)),
            }
        }

        if !self.lexer.check_symbol_not_followed("=", b'=') {
            return Ok(None);
        }
        self.lexer.symbol("=")?;
        let values = self.expect(|p| p.parse_expression_list(Label::ExprList), Label::EListAssign)?;

        let targets = AstNode::VarList {
            span: Span::between(vars[0].span(), vars[vars.len() - 1].span()),
            vars,
        };
        Ok(Some(AstNode::Set {
            values: Box::new(expression_list(values, targets.span().end_pos)),
            targets: Box::new(targets),
            span: self.span_from(start),
        }))
    }
}

/// Only names and index expressions can be assigned to.
fn is_assignable(expr: &AstNode) -> bool {
    matches!(expr, AstNode::Id { .. } | AstNode::Index { .. })
}

/// Wrap `exprs` in an `ExpList`; an empty list is anchored on `anchor`, the
/// last byte of whatever it follows.
pub(crate) fn expression_list(exprs: Vec<AstNode>, anchor: usize) -> AstNode {
    let span = list_span(&exprs).unwrap_or(Span::point(anchor));
    AstNode::ExpList { exprs, span }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(source: &str) -> Vec<AstNode> {
        match &Parser::new(source).parse_program("input").unwrap() {
            AstNode::Block { stats, .. } => stats.clone(),
            _ => panic!("Expected block"),
        }
    }

    fn failure(source: &str) -> (Label, (usize, usize)) {
        let err = Parser::new(source).parse_program("input").unwrap_err();
        (err.label().unwrap(), err.location())
    }

    #[test]
    fn test_statement_tags() {
        let source = "\
local a, b = 1
x, y.z = 1, 2
f(x)
o:m()
do end
while a do break end
repeat local c until c
if a then elseif b then else end
for i = 1, 10, 2 do end
for k, v in pairs(t) do end
function t.a.b:c() end
local function g() end
::top:: goto top
;
return 1";

        let tags: Vec<_> = stats(source).iter().map(|s| s.tag()).collect();
        assert_eq!(
            tags,
            vec![
                "Local", "Set", "Call", "Invoke", "Do", "While", "Repeat", "If", "Fornum",
                "Forin", "Set", "Localrec", "Label", "Goto", "Return"
            ]
        );
    }

    #[test]
    fn test_local_without_initializer() {
        let stats = stats("local x");
        let AstNode::Local { names, exprs, span } = &stats[0] else {
            panic!("Expected local");
        };

        assert_eq!(*span, Span::new(1, 7));
        assert_eq!(names.children().len(), 1);
        assert_eq!(
            exprs.as_ref(),
            &AstNode::ExpList {
                exprs: Vec::new(),
                span: Span::point(7)
            }
        );
    }

    #[test]
    fn test_if_branches() {
        let stats = stats("if a then x() elseif b then y() end");
        let AstNode::If {
            branches,
            else_branch,
            span,
        } = &stats[0]
        else {
            panic!("Expected if");
        };

        assert_eq!(branches.len(), 2);
        assert!(else_branch.is_none());
        assert_eq!(*span, Span::new(1, 35));
        assert_eq!(branches[1].0.as_name(), Some("b"));
    }

    #[test]
    fn test_empty_block_anchors_on_terminator() {
        let stats = stats("while x do end");
        let AstNode::While { body, .. } = &stats[0] else {
            panic!("Expected while");
        };
        assert_eq!(body.span(), Span::point(12));
    }

    #[test]
    fn test_numeric_for_step() {
        let stats = stats("for i = 1, 2 do end for j = 1, 2, -1 do end");
        assert!(matches!(&stats[0], AstNode::Fornum { step: None, .. }));
        assert!(matches!(&stats[1], AstNode::Fornum { step: Some(_), .. }));
    }

    #[test]
    fn test_statement_errors() {
        assert_eq!(failure("if true then"), (Label::EndIf, (1, 13)));
        assert_eq!(failure("if then end"), (Label::ExprIf, (1, 4)));
        assert_eq!(failure("if x end"), (Label::ThenIf, (1, 6)));
        assert_eq!(failure("while x end"), (Label::DoWhile, (1, 9)));
        assert_eq!(failure("repeat x()"), (Label::UntilRep, (1, 11)));
        assert_eq!(failure("for = 1"), (Label::ForRange, (1, 5)));
        assert_eq!(failure("for i = 1 do end"), (Label::CommaFor, (1, 11)));
        assert_eq!(failure("for a, b = 1 do end"), (Label::InFor, (1, 10)));
        assert_eq!(failure("for a in do end"), (Label::EListFor, (1, 10)));
        assert_eq!(failure("local 1"), (Label::DefLocal, (1, 7)));
        assert_eq!(failure("local x ="), (Label::EListLAssign, (1, 10)));
        assert_eq!(failure("x ="), (Label::EListAssign, (1, 4)));
        assert_eq!(failure("x, 1 = 2"), (Label::VarList, (1, 4)));
        assert_eq!(failure("::a"), (Label::CloseLabel, (1, 4)));
        assert_eq!(failure("goto 1"), (Label::Goto, (1, 6)));
        assert_eq!(failure("return 1,"), (Label::RetList, (1, 10)));
    }

    #[test]
    fn test_invalid_statement_start() {
        assert_eq!(failure("x"), (Label::ExpStat, (1, 1)));
        assert_eq!(failure("a.b"), (Label::ExpStat, (1, 1)));
        assert_eq!(failure("(f)"), (Label::ExpStat, (1, 1)));
        assert_eq!(failure("x = 1\n  = 2"), (Label::ExpStat, (2, 3)));
        assert_eq!(failure("x == 1"), (Label::ExpStat, (1, 1)));
    }
}
