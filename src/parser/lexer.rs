//! Lexer primitives for Lua source code
//!
//! There is no separate token stream. The parser drives a [`Lexer`] cursor and
//! asks it, at the current position, for a keyword, a symbol, a name, a number
//! or a string. Every successful match consumes the token plus any whitespace
//! and comments after it, so the cursor always rests on the start of the next
//! token. Lexical errors therefore surface in source order, exactly where the
//! grammar first reaches them.
//!
//! The cursor is `Copy`: saving and restoring it is how the parser looks ahead.

use super::ast::{Number, Span};
use super::constants::KEYWORDS;
use super::errors::{Failure, Label, PResult};

/// Cursor over the source buffer.
///
/// `pos` and `last_end` are 0-based byte offsets. `last_end` is one past the
/// last byte of the most recently consumed token, which is also the 1-based
/// offset of that byte.
#[derive(Debug, Clone, Copy)]
pub struct Lexer<'src> {
    source: &'src str,
    pos: usize,
    last_end: usize,
}

impl<'src> Lexer<'src> {
    /// Create a lexer positioned at the start of `source`.
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            pos: 0,
            last_end: 0,
        }
    }

    /// Current 0-based cursor offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// 1-based offset of the last byte of the last consumed token.
    pub fn last_end(&self) -> usize {
        self.last_end
    }

    pub fn source(&self) -> &'src str {
        self.source
    }

    pub fn source_len(&self) -> usize {
        self.source.len()
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    /// Skip a leading `#` line (e.g. `#!/usr/bin/env lua`).
    pub fn skip_shebang(&mut self) {
        if self.pos == 0 && self.peek() == Some(b'#') {
            while let Some(ch) = self.peek() {
                if ch == b'\n' {
                    break;
                }
                self.pos += 1;
            }
        }
    }

    /// Skip whitespace, line comments and long comments.
    ///
    /// Only an unclosed long comment can fail.
    pub fn skip(&mut self) -> PResult<()> {
        loop {
            match self.peek() {
                Some(ch) if is_space(ch) => self.pos += 1,
                Some(b'-') if self.peek_at(1) == Some(b'-') => {
                    let body = self.pos + 2;
                    if let Some(level) = self.long_bracket_level(body) {
                        let (_, end) = self.scan_long_bracket(body, level)?;
                        self.pos = end;
                    } else {
                        self.skip_line_comment();
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == b'\n' {
                break;
            }
            self.pos += 1;
        }
    }

    /// Does a reserved word start at the cursor (and not continue as a name)?
    pub fn check_keyword(&self, keyword: &str) -> bool {
        self.rest().starts_with(keyword.as_bytes())
            && !self
                .peek_at(keyword.len())
                .is_some_and(is_ident_continue)
    }

    /// Consume `keyword` if it starts at the cursor.
    pub fn keyword(&mut self, keyword: &str) -> PResult<bool> {
        if !self.check_keyword(keyword) {
            return Ok(false);
        }
        self.finish_token(self.pos + keyword.len())?;
        Ok(true)
    }

    /// Does `symbol` start at the cursor?
    pub fn check_symbol(&self, symbol: &str) -> bool {
        self.rest().starts_with(symbol.as_bytes())
    }

    /// Does `symbol` start at the cursor without being followed by `next`?
    pub fn check_symbol_not_followed(&self, symbol: &str, next: u8) -> bool {
        self.check_symbol(symbol) && self.peek_at(symbol.len()) != Some(next)
    }

    /// Consume `symbol` if it starts at the cursor.
    pub fn symbol(&mut self, symbol: &str) -> PResult<bool> {
        if !self.check_symbol(symbol) {
            return Ok(false);
        }
        self.finish_token(self.pos + symbol.len())?;
        Ok(true)
    }

    /// Consume a name that is not a reserved word.
    pub fn name(&mut self) -> PResult<Option<(String, Span)>> {
        let start = self.pos;
        let Some(end) = self.scan_name() else {
            return Ok(None);
        };
        let name = self.source[start..end].to_string();
        let span = self.finish_token(end)?;
        Ok(Some((name, span)))
    }

    /// End offset of the name at the cursor, if any.
    fn scan_name(&self) -> Option<usize> {
        if !self.peek().is_some_and(is_ident_start) {
            return None;
        }
        let mut end = self.pos + 1;
        while self.byte(end).is_some_and(is_ident_continue) {
            end += 1;
        }
        let word = &self.source[self.pos..end];
        if KEYWORDS.contains(&word) {
            None
        } else {
            Some(end)
        }
    }

    /// Consume a numeric literal: hex integer, float or decimal integer.
    pub fn number(&mut self) -> PResult<Option<(Number, Span)>> {
        let start = self.pos;
        match (self.peek(), self.peek_at(1)) {
            (Some(b'0'), Some(b'x' | b'X')) => self.hex_number(start).map(Some),
            (Some(ch), _) if ch.is_ascii_digit() => self.decimal_number(start).map(Some),
            (Some(b'.'), next) if next != Some(b'.') => self.decimal_number(start).map(Some),
            _ => Ok(None),
        }
    }

    fn hex_number(&mut self, start: usize) -> PResult<(Number, Span)> {
        let digits = start + 2;
        let mut end = digits;
        let mut value: u64 = 0;
        while let Some(digit) = self.byte(end).and_then(hex_value) {
            value = value.wrapping_mul(16).wrapping_add(u64::from(digit));
            end += 1;
        }
        if end == digits {
            return Err(Failure::labeled(Label::DigitHex, digits));
        }
        let span = self.finish_token(end)?;
        Ok((Number::Integer(value as i64), span))
    }

    fn decimal_number(&mut self, start: usize) -> PResult<(Number, Span)> {
        let mut end = self.skip_digits(start);
        let mut is_float = false;

        if self.byte(end) == Some(b'.') {
            let leading_dot = end == start;
            end += 1;
            let fraction_end = self.skip_digits(end);
            if leading_dot && fraction_end == end {
                return Err(Failure::labeled(Label::DigitDeci, end));
            }
            end = fraction_end;
            is_float = true;
        }

        if matches!(self.byte(end), Some(b'e' | b'E')) {
            end += 1;
            if matches!(self.byte(end), Some(b'+' | b'-')) {
                end += 1;
            }
            let exponent_end = self.skip_digits(end);
            if exponent_end == end {
                return Err(Failure::labeled(Label::DigitExpo, end));
            }
            end = exponent_end;
            is_float = true;
        }

        let text = &self.source[start..end];
        let value = if is_float {
            text.parse::<f64>().map(Number::Float)
        } else {
            // Integers too large for i64 become floats
            text.parse::<i64>()
                .map(Number::Integer)
                .or_else(|_| text.parse::<f64>().map(Number::Float))
        }
        .map_err(|_| Failure::labeled(Label::DigitDeci, start))?;

        let span = self.finish_token(end)?;
        Ok((value, span))
    }

    fn skip_digits(&self, mut at: usize) -> usize {
        while self.byte(at).is_some_and(|ch| ch.is_ascii_digit()) {
            at += 1;
        }
        at
    }

    /// Consume a short (quoted) or long (bracketed) string literal.
    pub fn string(&mut self) -> PResult<Option<(Vec<u8>, Span)>> {
        let start = self.pos;
        match self.peek() {
            Some(quote @ (b'"' | b'\'')) => {
                let (value, end) = self.scan_short_string(start, quote)?;
                let span = self.finish_token(end)?;
                Ok(Some((value, span)))
            }
            Some(b'[') => {
                let Some(level) = self.long_bracket_level(start) else {
                    return Ok(None);
                };
                let (value, end) = self.scan_long_bracket(start, level)?;
                let span = self.finish_token(end)?;
                Ok(Some((value, span)))
            }
            _ => Ok(None),
        }
    }

    /// Does a long bracket (`[[`, `[=[`, ...) open at the cursor?
    pub fn check_long_bracket(&self) -> bool {
        self.long_bracket_level(self.pos).is_some()
    }

    /// Scan a quoted string starting at the opening quote.
    ///
    /// Returns the decoded bytes and the offset just past the closing quote.
    fn scan_short_string(&self, start: usize, quote: u8) -> PResult<(Vec<u8>, usize)> {
        let mut value = Vec::new();
        let mut at = start + 1;

        loop {
            match self.byte(at) {
                None | Some(b'\n') | Some(b'\r') => {
                    return Err(Failure::labeled(Label::Quote, at));
                }
                Some(ch) if ch == quote => return Ok((value, at + 1)),
                Some(b'\\') => at = self.scan_escape(at + 1, &mut value)?,
                Some(ch) => {
                    value.push(ch);
                    at += 1;
                }
            }
        }
    }

    /// Decode one escape sequence; `at` points just past the backslash.
    fn scan_escape(&self, at: usize, out: &mut Vec<u8>) -> PResult<usize> {
        let Some(ch) = self.byte(at) else {
            return Err(Failure::labeled(Label::EscSeq, at));
        };

        let simple = match ch {
            b'a' => Some(0x07),
            b'b' => Some(0x08),
            b'f' => Some(0x0c),
            b'n' => Some(b'\n'),
            b'r' => Some(b'\r'),
            b't' => Some(b'\t'),
            b'v' => Some(0x0b),
            b'\\' => Some(b'\\'),
            b'"' => Some(b'"'),
            b'\'' => Some(b'\''),
            _ => None,
        };
        if let Some(byte) = simple {
            out.push(byte);
            return Ok(at + 1);
        }

        match ch {
            b'\n' | b'\r' => {
                // "\r\n" and "\n\r" count as a single line break
                out.push(b'\n');
                let next = at + 1;
                match self.byte(next) {
                    Some(other @ (b'\n' | b'\r')) if other != ch => Ok(next + 1),
                    _ => Ok(next),
                }
            }
            b'z' => {
                let mut next = at + 1;
                while self.byte(next).is_some_and(is_space) {
                    next += 1;
                }
                Ok(next)
            }
            b'x' => {
                let high = self.byte(at + 1).and_then(hex_value);
                let low = self.byte(at + 2).and_then(hex_value);
                match (high, low) {
                    (Some(high), Some(low)) => {
                        out.push(high * 16 + low);
                        Ok(at + 3)
                    }
                    _ => Err(Failure::labeled(Label::HexEsc, at + 1)),
                }
            }
            b'u' => self.scan_utf8_escape(at + 1, out),
            b'0'..=b'9' => {
                let mut next = at;
                let mut value: u32 = 0;
                while next < at + 3 {
                    match self.byte(next) {
                        Some(digit) if digit.is_ascii_digit() => {
                            value = value * 10 + u32::from(digit - b'0');
                            next += 1;
                        }
                        _ => break,
                    }
                }
                let byte =
                    u8::try_from(value).map_err(|_| Failure::labeled(Label::DecEsc, at))?;
                out.push(byte);
                Ok(next)
            }
            _ => Err(Failure::labeled(Label::EscSeq, at)),
        }
    }

    /// Decode `{XXX}` after `\u`; `at` points at the expected `{`.
    fn scan_utf8_escape(&self, at: usize, out: &mut Vec<u8>) -> PResult<usize> {
        if self.byte(at) != Some(b'{') {
            return Err(Failure::labeled(Label::OBraceUEsc, at));
        }
        let digits = at + 1;
        let mut next = digits;
        let mut code: u32 = 0;
        while let Some(digit) = self.byte(next).and_then(hex_value) {
            if code > (0x7FFF_FFFF >> 4) {
                return Err(Failure::labeled(Label::UEscTooLarge, digits));
            }
            code = (code << 4) | u32::from(digit);
            next += 1;
        }
        if next == digits {
            return Err(Failure::labeled(Label::DigitUEsc, digits));
        }
        if self.byte(next) != Some(b'}') {
            return Err(Failure::labeled(Label::CBraceUEsc, next));
        }
        push_utf8(code, out);
        Ok(next + 1)
    }

    /// Level of the long bracket opening at `at`, i.e. the number of `=`.
    fn long_bracket_level(&self, at: usize) -> Option<usize> {
        if self.byte(at) != Some(b'[') {
            return None;
        }
        let mut level = 0;
        while self.byte(at + 1 + level) == Some(b'=') {
            level += 1;
        }
        if self.byte(at + 1 + level) == Some(b'[') {
            Some(level)
        } else {
            None
        }
    }

    /// Scan a long bracket opening at `at` with the given level.
    ///
    /// Returns the raw contents and the offset just past the closing bracket.
    /// A line break right after the opening bracket is dropped.
    fn scan_long_bracket(&self, at: usize, level: usize) -> PResult<(Vec<u8>, usize)> {
        let bytes = self.source.as_bytes();
        let mut content_start = at + level + 2;
        match (self.byte(content_start), self.byte(content_start + 1)) {
            (Some(b'\r'), Some(b'\n')) | (Some(b'\n'), Some(b'\r')) => content_start += 2,
            (Some(b'\n' | b'\r'), _) => content_start += 1,
            _ => {}
        }

        let mut scan = content_start;
        while scan < bytes.len() {
            if bytes[scan] == b']' && self.closes_long_bracket(scan, level) {
                let value = bytes[content_start..scan].to_vec();
                return Ok((value, scan + level + 2));
            }
            scan += 1;
        }
        Err(Failure::labeled(Label::CloseLStr, bytes.len()))
    }

    fn closes_long_bracket(&self, at: usize, level: usize) -> bool {
        (1..=level).all(|offset| self.byte(at + offset) == Some(b'='))
            && self.byte(at + level + 1) == Some(b']')
    }

    /// Mark `[self.pos, end)` as a consumed token and skip trailing trivia.
    fn finish_token(&mut self, end: usize) -> PResult<Span> {
        let span = Span::new(self.pos + 1, end);
        self.pos = end;
        self.last_end = end;
        self.skip()?;
        Ok(span)
    }

    fn rest(&self) -> &'src [u8] {
        &self.source.as_bytes()[self.pos.min(self.source.len())..]
    }

    fn byte(&self, at: usize) -> Option<u8> {
        self.source.as_bytes().get(at).copied()
    }

    /// Peek at current byte without consuming
    fn peek(&self) -> Option<u8> {
        self.byte(self.pos)
    }

    /// Peek ahead n bytes
    fn peek_at(&self, n: usize) -> Option<u8> {
        self.byte(self.pos + n)
    }
}

fn is_space(ch: u8) -> bool {
    matches!(ch, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_ident_continue(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}

fn hex_value(ch: u8) -> Option<u8> {
    match ch {
        b'0'..=b'9' => Some(ch - b'0'),
        b'a'..=b'f' => Some(ch - b'a' + 10),
        b'A'..=b'F' => Some(ch - b'A' + 10),
        _ => None,
    }
}

/// Append `code` using the extended UTF-8 scheme (up to six bytes).
fn push_utf8(mut code: u32, out: &mut Vec<u8>) {
    if code < 0x80 {
        out.push(code as u8);
        return;
    }
    let mut continuation = [0u8; 5];
    let mut count = 0;
    // largest value that still fits in the first byte
    let mut first_max: u32 = 0x3f;
    loop {
        continuation[count] = 0x80 | (code & 0x3f) as u8;
        count += 1;
        code >>= 6;
        first_max >>= 1;
        if code <= first_max {
            break;
        }
    }
    out.push(((!first_max << 1) | code) as u8);
    out.extend(continuation[..count].iter().rev());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_string(source: &str) -> Vec<u8> {
        let mut lexer = Lexer::new(source);
        lexer.string().unwrap().unwrap().0
    }

    fn lex_number(source: &str) -> Number {
        let mut lexer = Lexer::new(source);
        lexer.number().unwrap().unwrap().0
    }

    fn string_error(source: &str) -> Failure {
        let mut lexer = Lexer::new(source);
        lexer.string().unwrap_err()
    }

    #[test]
    fn test_skip_whitespace_and_comments() {
        let mut lexer = Lexer::new("  -- line comment\n\t--[==[ long\n comment ]==]  x");
        lexer.skip().unwrap();
        assert_eq!(lexer.position(), 46);
        assert!(lexer.scan_name().is_some());
    }

    #[test]
    fn test_unclosed_long_comment() {
        let mut lexer = Lexer::new("--[[ never closed");
        assert_eq!(
            lexer.skip().unwrap_err(),
            Failure::labeled(Label::CloseLStr, 17)
        );
    }

    #[test]
    fn test_shebang() {
        let mut lexer = Lexer::new("#!/usr/bin/env lua\nreturn");
        lexer.skip_shebang();
        lexer.skip().unwrap();
        assert!(lexer.check_keyword("return"));
    }

    #[test]
    fn test_keyword_is_not_prefix_of_name() {
        let lexer = Lexer::new("iffy");
        assert!(!lexer.check_keyword("if"));
        assert!(lexer.scan_name().is_some());

        let lexer = Lexer::new("if x");
        assert!(lexer.check_keyword("if"));
        assert!(lexer.scan_name().is_none());
    }

    #[test]
    fn test_name_span_and_trailing_skip() {
        let mut lexer = Lexer::new("foo_1  -- c\n bar");
        let (name, span) = lexer.name().unwrap().unwrap();
        assert_eq!(name, "foo_1");
        assert_eq!(span, Span::new(1, 5));
        assert_eq!(lexer.last_end(), 5);
        assert_eq!(lexer.position(), 13);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(lex_number("42"), Number::Integer(42));
        assert_eq!(lex_number("3.14"), Number::Float(3.14));
        assert_eq!(lex_number("0x1A"), Number::Integer(26));
        assert_eq!(lex_number("0XfF"), Number::Integer(255));
        assert_eq!(lex_number("1e3"), Number::Float(1000.0));
        assert_eq!(lex_number("2E-1"), Number::Float(0.2));
        assert_eq!(lex_number(".5"), Number::Float(0.5));
        assert_eq!(lex_number("5."), Number::Float(5.0));
        assert_eq!(
            lex_number("9223372036854775808"),
            Number::Float(9223372036854775808.0)
        );
        assert_eq!(lex_number("0xffffffffffffffff"), Number::Integer(-1));
    }

    #[test]
    fn test_malformed_numbers() {
        let mut lexer = Lexer::new("0x");
        assert_eq!(lexer.number().unwrap_err(), Failure::labeled(Label::DigitHex, 2));

        let mut lexer = Lexer::new("1e+");
        assert_eq!(lexer.number().unwrap_err(), Failure::labeled(Label::DigitExpo, 3));

        let mut lexer = Lexer::new(".x");
        assert_eq!(lexer.number().unwrap_err(), Failure::labeled(Label::DigitDeci, 1));

        let mut lexer = Lexer::new("...");
        assert_eq!(lexer.number().unwrap(), None);
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(lex_string(r#""a\nb""#), b"a\nb");
        assert_eq!(lex_string(r#"'\a\b\f\r\t\v\\\"\''"#), b"\x07\x08\x0c\r\t\x0b\\\"'");
        assert_eq!(lex_string(r#""\65\066\0670""#), b"ABC0");
        assert_eq!(lex_string(r#""\x41\x7a""#), b"Az");
        assert_eq!(lex_string(r#""\u{48}\u{e9}""#), "H\u{e9}".as_bytes());
        assert_eq!(lex_string("\"a\\z  \n   b\""), b"ab");
        assert_eq!(lex_string("\"a\\\r\nb\""), b"a\nb");
        assert_eq!(lex_string(r#""\xff""#), vec![0xff]);
    }

    #[test]
    fn test_extended_utf8_escape() {
        assert_eq!(lex_string(r#""\u{10FFFF}""#), "\u{10FFFF}".as_bytes());
        assert_eq!(
            lex_string(r#""\u{7FFFFFFF}""#),
            vec![0xfd, 0xbf, 0xbf, 0xbf, 0xbf, 0xbf]
        );
    }

    #[test]
    fn test_string_escape_errors() {
        assert_eq!(string_error(r#""\q""#), Failure::labeled(Label::EscSeq, 2));
        assert_eq!(string_error(r#""\x4g""#), Failure::labeled(Label::HexEsc, 3));
        assert_eq!(string_error(r#""\u41""#), Failure::labeled(Label::OBraceUEsc, 3));
        assert_eq!(string_error(r#""\u{}""#), Failure::labeled(Label::DigitUEsc, 4));
        assert_eq!(string_error(r#""\u{41""#), Failure::labeled(Label::CBraceUEsc, 6));
        assert_eq!(
            string_error(r#""\u{80000000}""#),
            Failure::labeled(Label::UEscTooLarge, 4)
        );
        assert_eq!(string_error(r#""\256""#), Failure::labeled(Label::DecEsc, 2));
    }

    #[test]
    fn test_unclosed_short_string() {
        assert_eq!(string_error("\"abc"), Failure::labeled(Label::Quote, 4));
        assert_eq!(string_error("'abc\nd'"), Failure::labeled(Label::Quote, 4));
    }

    #[test]
    fn test_long_strings() {
        assert_eq!(lex_string("[[raw\\nstring]]"), b"raw\\nstring");
        assert_eq!(lex_string("[==[a]]b]=]c]==]"), b"a]]b]=]c");
        assert_eq!(lex_string("[[\nfirst\nsecond]]"), b"first\nsecond");
        assert_eq!(lex_string("[[\r\n\nx]]"), b"\nx");
    }

    #[test]
    fn test_long_string_level_mismatch() {
        assert_eq!(
            string_error("[==[text]=]"),
            Failure::labeled(Label::CloseLStr, 11)
        );
    }

    #[test]
    fn test_not_a_long_bracket() {
        let mut lexer = Lexer::new("[=x");
        assert_eq!(lexer.string().unwrap(), None);
        assert!(!lexer.check_long_bracket());
        assert!(Lexer::new("[=[").check_long_bracket());
    }
}
