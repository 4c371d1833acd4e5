//! Syntax error labels and the public parse error
//!
//! Grammar rules never build message text. A failing rule reports a [`Label`]
//! and the byte offset where matching was attempted; only the driver in
//! [`crate::parser`] turns that pair into a [`ParseError`] with a line, a
//! column and the label's message.

use thiserror::Error;

/// Declares the ordered label table.
///
/// Each entry becomes a [`Label`] variant whose `Display` is the message, plus
/// an entry in [`Label::ALL`] and a symbolic name for [`Label::name`].
macro_rules! labels {
    ($($name:ident => $message:tt,)*) => {
        /// A labeled syntax failure, one per recoverable failure point of the grammar.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
        pub enum Label {
            $(
                #[error($message)]
                $name,
            )*
        }

        impl Label {
            /// Every label, in table order.
            pub const ALL: &'static [Label] = &[$(Label::$name),*];

            /// Symbolic name of the label, e.g. `"EndIf"`.
            pub fn name(self) -> &'static str {
                match self {
                    $(Label::$name => stringify!($name),)*
                }
            }
        }
    };
}

labels! {
    Extra => "unexpected character(s), expected EOF",
    ExpStat => "unexpected token, invalid start of statement",

    EndIf => "expected 'end' to close the if statement",
    ExprIf => "expected a condition after 'if'",
    ThenIf => "expected 'then' after the condition",
    ExprEIf => "expected a condition after 'elseif'",
    ThenEIf => "expected 'then' after the condition",

    EndDo => "expected 'end' to close the do block",
    ExprWhile => "expected a condition after 'while'",
    DoWhile => "expected 'do' after the condition",
    EndWhile => "expected 'end' to close the while loop",
    UntilRep => "expected 'until' at the end of the repeat loop",
    ExprRep => "expected a condition after 'until'",

    ForRange => "expected a numeric or generic range after 'for'",
    EndFor => "expected 'end' to close the for loop",
    ExprFor1 => "expected a starting expression for the numeric range",
    CommaFor => "expected ',' to split the start and end of the range",
    ExprFor2 => "expected an ending expression for the numeric range",
    ExprFor3 => "expected a step expression for the numeric range after ','",
    InFor => "expected '=' or 'in' after the variable(s)",
    EListFor => "expected one or more expressions after 'in'",
    DoFor => "expected 'do' after the range of the for loop",

    DefLocal => "expected a function definition or assignment after local",
    NameLFunc => "expected a function name after 'function'",
    EListLAssign => "expected one or more expressions after '='",
    EListAssign => "expected one or more expressions after '='",

    FuncName => "expected a function name after 'function'",
    NameFunc1 => "expected a function name after '.'",
    NameFunc2 => "expected a method name after ':'",
    OParenPList => "expected '(' for the parameter list",
    CParenPList => "expected ')' to close the parameter list",
    EndFunc => "expected 'end' to close the function body",
    ParList => "expected a variable name or '...' after ','",

    LabelName => "expected a label name after '::'",
    CloseLabel => "expected '::' after the label",
    Goto => "expected a label after 'goto'",
    RetList => "expected an expression after ',' in the return statement",

    VarList => "expected a variable name after ','",
    ExprList => "expected an expression after ','",

    OrExpr => "expected an expression after 'or'",
    AndExpr => "expected an expression after 'and'",
    RelExpr => "expected an expression after the relational operator",
    BOrExpr => "expected an expression after '|'",
    BXorExpr => "expected an expression after '~'",
    BAndExpr => "expected an expression after '&'",
    ShiftExpr => "expected an expression after the bit shift",
    ConcatExpr => "expected an expression after '..'",
    AddExpr => "expected an expression after the additive operator",
    MulExpr => "expected an expression after the multiplicative operator",
    UnaryExpr => "expected an expression after the unary operator",
    PowExpr => "expected an expression after '^'",

    ExprParen => "expected an expression after '('",
    CParenExpr => "expected ')' to close the expression",
    NameIndex => "expected a field name after '.'",
    ExprIndex => "expected an expression after '['",
    CBracketIndex => "expected ']' to close the indexing expression",
    NameMeth => "expected a method name after ':'",
    MethArgs => "expected some arguments for the method call (or '()')",

    ArgList => "expected an expression after ',' in the argument list",
    CParenArgs => "expected ')' to close the argument list",

    CBraceTable => "expected '}}' to close the table constructor",
    EqField => "expected '=' after the table key",
    ExprField => "expected an expression after '='",
    ExprFKey => "expected an expression after '[' for the table key",
    CBracketFKey => "expected ']' to close the table key",

    DigitHex => "expected one or more hexadecimal digits after '0x'",
    DigitDeci => "expected one or more digits after the decimal point",
    DigitExpo => "expected one or more digits for the exponent",

    Quote => "unclosed string",
    HexEsc => "expected exactly two hexadecimal digits after '\\x'",
    OBraceUEsc => "expected '{{' after '\\u'",
    DigitUEsc => "expected one or more hexadecimal digits for the UTF-8 code point",
    CBraceUEsc => "expected '}}' after the code point",
    UEscTooLarge => "UTF-8 value too large",
    DecEsc => "decimal escape too large",
    EscSeq => "invalid escape sequence",
    CloseLStr => "unclosed long string",
}

impl Label {
    /// Position of the label in [`Label::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// The human-readable message, identical to the `Display` output.
    pub fn message(self) -> String {
        self.to_string()
    }
}

/// Raw failure raised inside the grammar, resolved by the driver.
///
/// Offsets are 0-based byte offsets into the source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Failure {
    /// A committed rule could not continue.
    Labeled { label: Label, offset: usize },
    /// Nesting went past the configured depth limit.
    TooDeep { offset: usize, limit: usize },
}

impl Failure {
    pub(crate) fn labeled(label: Label, offset: usize) -> Self {
        Failure::Labeled { label, offset }
    }

    pub(crate) fn offset(&self) -> usize {
        match self {
            Failure::Labeled { offset, .. } | Failure::TooDeep { offset, .. } => *offset,
        }
    }
}

/// Result type shared by every grammar rule.
pub(crate) type PResult<T> = Result<T, Failure>;

/// A failed parse.
///
/// `line` and `column` are 1-based; `offset` is the 0-based byte offset of the
/// failure in the source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{filename}:{line}:{column}: syntax error, {label}")]
    Syntax {
        filename: String,
        line: usize,
        column: usize,
        offset: usize,
        label: Label,
    },

    #[error("{filename}:{line}:{column}: stack overflow, nesting exceeds {limit} levels")]
    StackOverflow {
        filename: String,
        line: usize,
        column: usize,
        offset: usize,
        limit: usize,
    },
}

impl ParseError {
    /// Build the public error for a grammar failure in `source`.
    pub(crate) fn from_failure(failure: Failure, source: &str, filename: &str) -> Self {
        let offset = failure.offset();
        let (line, column) = line_col(source, offset);
        let filename = filename.to_string();

        match failure {
            Failure::Labeled { label, .. } => ParseError::Syntax {
                filename,
                line,
                column,
                offset,
                label,
            },
            Failure::TooDeep { limit, .. } => ParseError::StackOverflow {
                filename,
                line,
                column,
                offset,
                limit,
            },
        }
    }

    /// The label of a syntax error; `None` for a stack overflow.
    pub fn label(&self) -> Option<Label> {
        match self {
            ParseError::Syntax { label, .. } => Some(*label),
            ParseError::StackOverflow { .. } => None,
        }
    }

    pub fn is_stack_overflow(&self) -> bool {
        matches!(self, ParseError::StackOverflow { .. })
    }

    /// 1-based line and column of the failure.
    pub fn location(&self) -> (usize, usize) {
        match self {
            ParseError::Syntax { line, column, .. }
            | ParseError::StackOverflow { line, column, .. } => (*line, *column),
        }
    }
}

/// 1-based line and column of a 0-based byte offset.
///
/// Offsets past the end of `source` are clamped to one past its last byte.
pub(crate) fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let bytes = source.as_bytes();
    let offset = offset.min(bytes.len());
    let before = &bytes[..offset];
    let line = 1 + before.iter().filter(|&&b| b == b'\n').count();
    let line_start = before
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |newline| newline + 1);
    (line, offset - line_start + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_table_is_ordered_and_complete() {
        assert_eq!(Label::ALL.len(), 77);
        for (index, label) in Label::ALL.iter().enumerate() {
            assert_eq!(label.index(), index);
            assert!(!label.message().is_empty());
        }
        assert_eq!(Label::ALL[0], Label::Extra);
        assert_eq!(Label::EndIf.name(), "EndIf");
    }

    #[test]
    fn test_label_messages() {
        assert_eq!(
            Label::EndIf.to_string(),
            "expected 'end' to close the if statement"
        );
        assert_eq!(Label::HexEsc.to_string(), "expected exactly two hexadecimal digits after '\\x'");
        assert_eq!(Label::CloseLStr.to_string(), "unclosed long string");
    }

    #[test]
    fn test_line_col() {
        let source = "local x\nlocal y\n\nz";
        assert_eq!(line_col(source, 0), (1, 1));
        assert_eq!(line_col(source, 6), (1, 7));
        assert_eq!(line_col(source, 7), (1, 8));
        assert_eq!(line_col(source, 8), (2, 1));
        assert_eq!(line_col(source, 16), (3, 1));
        assert_eq!(line_col(source, 17), (4, 1));
        assert_eq!(line_col(source, 18), (4, 2));
        assert_eq!(line_col(source, 100), (4, 2));
    }

    #[test]
    fn test_error_display() {
        let source = "if true then";
        let failure = Failure::Labeled {
            label: Label::EndIf,
            offset: source.len(),
        };
        let err = ParseError::from_failure(failure, source, "input");
        assert_eq!(
            err.to_string(),
            "input:1:13: syntax error, expected 'end' to close the if statement"
        );
        assert_eq!(err.label(), Some(Label::EndIf));
        assert!(!err.is_stack_overflow());
    }

    #[test]
    fn test_stack_overflow_display() {
        let failure = Failure::TooDeep {
            offset: 2,
            limit: 200,
        };
        let err = ParseError::from_failure(failure, "((((", "deep.lua");
        assert_eq!(
            err.to_string(),
            "deep.lua:1:3: stack overflow, nesting exceeds 200 levels"
        );
        assert!(err.is_stack_overflow());
        assert_eq!(err.label(), None);
    }
}
