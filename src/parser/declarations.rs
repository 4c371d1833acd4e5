//! Function declaration parsing implementation
//!
//! This module handles every way a function is defined:
//!
//! - Function statements: `function a.b.c:m(params) ... end`
//! - Local functions: `local function f(params) ... end`
//! - Function literals: `function(params) ... end`
//! - Parameter lists, including the vararg `...`
//!
//! # Grammar
//!
//! ```text
//! funcstat  ::= 'function' funcname funcbody
//! funcname  ::= Name ('.' Name)* (':' Name)?
//! funcbody  ::= '(' parlist? ')' block 'end'
//! parlist   ::= Name (',' Name)* (',' '...')? | '...'
//! ```
//!
//! Function statements are desugared into assignments: `function a.b() end`
//! becomes `Set { VarList[a.b], ExpList[Function] }`, and a `:` definition
//! gains an implicit first parameter `self`.
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::errors::{Label, PResult};
use crate::parser::parse::Parser;

impl<'src> Parser<'src> {
    /// Parse `function funcname funcbody` into a `Set`
    pub(crate) fn parse_function_statement(&mut self) -> PResult<AstNode> {
        let start = self.position();
        self.lexer.keyword("function")?;

        let (name, is_method) = self.parse_function_name()?;
        let function = self.parse_function_body(start, is_method)?;
        Ok(wrap_definition(
            AstNode::VarList {
                span: name.span(),
                vars: vec![name],
            },
            function,
            |targets, values, span| AstNode::Set {
                targets,
                values,
                span,
            },
            self.span_from(start),
        ))
    }

    /// Parse `local function Name funcbody` into a `Localrec`; the cursor is
    /// on `function` and `start` is the offset of `local`
    pub(crate) fn parse_local_function(&mut self, start: usize) -> PResult<AstNode> {
        let function_start = self.position();
        self.lexer.keyword("function")?;

        let name = self.expect(Self::parse_id, Label::NameLFunc)?;
        let function = self.parse_function_body(function_start, false)?;
        Ok(wrap_definition(
            AstNode::NameList {
                span: name.span(),
                names: vec![name],
            },
            function,
            |names, exprs, span| AstNode::Localrec { names, exprs, span },
            self.span_from(start),
        ))
    }

    /// Anonymous `function funcbody`; the cursor is on `function`
    pub(crate) fn parse_function_literal(&mut self) -> PResult<AstNode> {
        let start = self.position();
        self.lexer.keyword("function")?;
        self.parse_function_body(start, false)
    }

    /// `Name ('.' Name)* (':' Name)?`, and whether it ended with a method name
    fn parse_function_name(&mut self) -> PResult<(AstNode, bool)> {
        let base = self.expect(Self::parse_id, Label::FuncName)?;

        let mut keys = Vec::new();
        while self.lexer.check_symbol_not_followed(".", b'.') {
            self.lexer.symbol(".")?;
            keys.push(self.expect(Self::parse_string_id, Label::NameFunc1)?);
        }

        let is_method = self.lexer.check_symbol_not_followed(":", b':');
        if is_method {
            self.lexer.symbol(":")?;
            keys.push(self.expect(Self::parse_string_id, Label::NameFunc2)?);
        }

        Ok((fold_function_name(base, keys), is_method))
    }

    /// `'(' parlist ')' block 'end'`; `start` is the offset of `function`
    fn parse_function_body(&mut self, start: usize, is_method: bool) -> PResult<AstNode> {
        let paren = self.position();
        self.expect_symbol("(", Label::OParenPList)?;
        let mut params = self.parse_parameter_list()?;
        self.expect_symbol(")", Label::CParenPList)?;

        if is_method {
            insert_self(&mut params, paren + 1);
        }

        let body = self.parse_block()?;
        self.expect_keyword("end", Label::EndFunc)?;

        Ok(AstNode::Function {
            params,
            body: Box::new(body),
            is_method,
            span: self.span_from(start),
        })
    }

    fn parse_parameter_list(&mut self) -> PResult<Vec<AstNode>> {
        let mut params = Vec::new();

        if let Some(dots) = self.parse_dots()? {
            params.push(dots);
            return Ok(params);
        }
        let Some(first) = self.parse_id()? else {
            return Ok(params);
        };
        params.push(first);

        while self.lexer.symbol(",")? {
            if let Some(name) = self.parse_id()? {
                params.push(name);
            } else if let Some(dots) = self.parse_dots()? {
                params.push(dots);
                break;
            } else {
                return Err(self.error(Label::ParList));
            }
        }

        Ok(params)
    }
}

/// Fold `a`, `[b, c]` into `Index(Index(a, "b"), "c")`.
fn fold_function_name(base: AstNode, keys: Vec<AstNode>) -> AstNode {
    keys.into_iter().fold(base, |object, key| AstNode::Index {
        span: Span::between(object.span(), key.span()),
        object: Box::new(object),
        key: Box::new(key),
    })
}

/// Prepend the implicit `self` parameter, anchored on the `(` at `paren_pos`.
fn insert_self(params: &mut Vec<AstNode>, paren_pos: usize) {
    params.insert(
        0,
        AstNode::Id {
            name: "self".to_string(),
            span: Span::point(paren_pos),
        },
    );
}

/// Give the defined name and the function one list level each.
fn wrap_definition(
    names: AstNode,
    function: AstNode,
    build: impl FnOnce(Box<AstNode>, Box<AstNode>, Span) -> AstNode,
    span: Span,
) -> AstNode {
    let values = AstNode::ExpList {
        span: function.span(),
        exprs: vec![function],
    };
    build(Box::new(names), Box::new(values), span)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_stat(source: &str) -> AstNode {
        match &Parser::new(source).parse_program("input").unwrap() {
            AstNode::Block { stats, .. } => stats[0].clone(),
            _ => panic!("Expected block"),
        }
    }

    fn failure_label(source: &str) -> Label {
        Parser::new(source)
            .parse_program("input")
            .unwrap_err()
            .label()
            .unwrap()
    }

    fn param_names(function: &AstNode) -> Vec<String> {
        match function {
            AstNode::Function { params, .. } => params
                .iter()
                .map(|p| p.as_name().unwrap_or(p.tag()).to_string())
                .collect(),
            _ => panic!("Expected function"),
        }
    }

    #[test]
    fn test_method_definition_gets_self() {
        let stat = first_stat("function t:m(a) end");
        let AstNode::Set {
            targets, values, ..
        } = &stat
        else {
            panic!("Expected set");
        };

        let AstNode::VarList { vars, .. } = targets.as_ref() else {
            panic!("Expected var list");
        };
        assert_eq!(vars[0].tag(), "Index");

        let AstNode::ExpList { exprs, .. } = values.as_ref() else {
            panic!("Expected expression list");
        };
        assert_eq!(param_names(&exprs[0]), vec!["self", "a"]);
        assert!(matches!(
            &exprs[0],
            AstNode::Function { is_method: true, .. }
        ));

        let AstNode::Function { params, span, .. } = &exprs[0] else {
            unreachable!();
        };
        assert_eq!(params[0].span(), Span::point(13));
        assert_eq!(*span, Span::new(1, 19));
    }

    #[test]
    fn test_dotted_name_folds_left() {
        let stat = first_stat("function a.b.c() end");
        let AstNode::Set { targets, .. } = &stat else {
            panic!("Expected set");
        };
        let AstNode::VarList { vars, .. } = targets.as_ref() else {
            panic!("Expected var list");
        };

        let AstNode::Index { object, key, span } = &vars[0] else {
            panic!("Expected index");
        };
        assert_eq!(*span, Span::new(10, 14));
        assert_eq!(key.as_ref(), &AstNode::StringLiteral { value: b"c".to_vec(), span: Span::point(14) });
        assert_eq!(object.tag(), "Index");
    }

    #[test]
    fn test_plain_function_has_no_self() {
        let stat = first_stat("function f(...) end");
        let AstNode::Set { values, .. } = &stat else {
            panic!("Expected set");
        };
        let AstNode::ExpList { exprs, .. } = values.as_ref() else {
            panic!("Expected expression list");
        };
        assert_eq!(param_names(&exprs[0]), vec!["Dots"]);
    }

    #[test]
    fn test_local_function() {
        let stat = first_stat("local function f(a, ...) end");
        let AstNode::Localrec { names, exprs, span } = &stat else {
            panic!("Expected localrec");
        };

        assert_eq!(*span, Span::new(1, 28));
        assert_eq!(names.tag(), "NameList");
        let AstNode::ExpList { exprs, .. } = exprs.as_ref() else {
            panic!("Expected expression list");
        };
        assert_eq!(exprs[0].span(), Span::new(7, 28));
        assert_eq!(param_names(&exprs[0]), vec!["a", "Dots"]);
    }

    #[test]
    fn test_declaration_errors() {
        assert_eq!(failure_label("function () end"), Label::FuncName);
        assert_eq!(failure_label("function a.() end"), Label::NameFunc1);
        assert_eq!(failure_label("function a:() end"), Label::NameFunc2);
        assert_eq!(failure_label("function f end"), Label::OParenPList);
        assert_eq!(failure_label("function f(a end"), Label::CParenPList);
        assert_eq!(failure_label("function f(a,) end"), Label::ParList);
        assert_eq!(failure_label("function f() x = 1"), Label::EndFunc);
        assert_eq!(failure_label("local function () end"), Label::NameLFunc);
    }
}
