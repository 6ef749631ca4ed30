//! Tokenizes a source string into a stream of [`Token`]s.
//!
//! Scans an in-memory `&str` directly rather than a `BufRead`, since the
//! host API takes a single in-memory string, not a file. Whitespace and
//! comments are elided in-line rather than reported and filtered by the
//! caller.

use crate::error::LexError;
use crate::token::{IntBase, Position, Token, TokenKind};

/// Operators recognized by the lexer, longest match first. Alphabetic
/// operators (`and`, `not`, `or`) are matched by `lex_ident` instead, since
/// they must not split identifiers like `andvar`.
const OPERATORS: &[&str] = &[
    "**", "+=", "-=", "*=", "/=", ">=", "<=", "==", "!=", "//", ":", "%", ">", "<", "-", "+", "*",
    "/", "(", "?", ".",
];

pub struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    offset: usize,
    line: usize,
    col: usize,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Lexer<'a> {
        Lexer { src, bytes: src.as_bytes(), offset: 0, line: 1, col: 1, done: false }
    }

    fn pos(&self) -> Position {
        Position { line: self.line, col: self.col, offset: self.offset }
    }

    fn peek_byte(&self) -> Option<u8> {
        self.bytes.get(self.offset).copied()
    }

    fn rest(&self) -> &'a str {
        &self.src[self.offset..]
    }

    /// Advances past `n` bytes, updating line/col bookkeeping.
    fn advance(&mut self, n: usize) {
        for b in &self.bytes[self.offset..self.offset + n] {
            if *b == b'\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
        self.offset += n;
    }

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek_byte() {
            if b == b' ' || b == b'\t' || b == b'\r' || b == b'\n' {
                self.advance(1);
            } else {
                break;
            }
        }
    }

    /// Produces the next token, or `None` once EOF has already been emitted.
    pub fn next_token(&mut self) -> Option<Result<Token, LexError>> {
        if self.done {
            return None;
        }
        self.skip_whitespace();
        let start = self.pos();

        let b = match self.peek_byte() {
            Some(b) => b,
            None => {
                self.done = true;
                return Some(Ok(Token::new(TokenKind::Eof, "", start)));
            }
        };

        // Single-quoted strings only; double-quoted is not a string delimiter.
        if b == b'\'' {
            return Some(self.lex_string(start));
        }

        if b == b'[' {
            self.advance(1);
            return Some(Ok(Token::new(TokenKind::SquareOpen, "[", start)));
        }
        if b == b']' {
            self.advance(1);
            return Some(Ok(Token::new(TokenKind::SquareClose, "]", start)));
        }

        // EndExpr tokens: `,` and `)`.
        if b == b',' || b == b')' {
            self.advance(1);
            return Some(Ok(Token::new(
                TokenKind::EndExpr(b as char),
                (b as char).to_string(),
                start,
            )));
        }

        if b.is_ascii_digit() || (b == b'.' && self.peek_is_digit_after_dot()) {
            return Some(self.lex_number(start));
        }

        if b.is_ascii_alphabetic() {
            return Some(Ok(self.lex_ident(start)));
        }

        for op in OPERATORS {
            if self.rest().starts_with(op) {
                self.advance(op.len());
                return Some(Ok(Token::new(TokenKind::Op(op), *op, start)));
            }
        }

        Some(Err(LexError { pos: start, msg: format!("unrecognized character '{}'", b as char) }))
    }

    fn peek_is_digit_after_dot(&self) -> bool {
        self.bytes.get(self.offset + 1).map(|b| b.is_ascii_digit()).unwrap_or(false)
    }

    fn lex_string(&mut self, start: Position) -> Result<Token, LexError> {
        self.advance(1); // opening quote
        let content_start = self.offset;
        loop {
            match self.peek_byte() {
                None => {
                    return Err(LexError { pos: start, msg: "unterminated string literal".into() })
                }
                Some(b'\'') => {
                    let content = self.src[content_start..self.offset].to_string();
                    self.advance(1); // closing quote
                    let text = format!("'{}'", content);
                    return Ok(Token::new(TokenKind::SingleString(content), text, start));
                }
                Some(_) => self.advance(1),
            }
        }
    }

    fn lex_number(&mut self, start: Position) -> Result<Token, LexError> {
        let rest = self.rest();
        if rest.starts_with("0x") || rest.starts_with("0X") {
            return self.lex_radix(start, IntBase::Hex, |c| c.is_ascii_hexdigit() || c == '_');
        }
        if rest.starts_with("0o") || rest.starts_with("0O") {
            return self.lex_radix(start, IntBase::Oct, |c| matches!(c, '0'..='7' | '_'));
        }
        if rest.starts_with("0b") || rest.starts_with("0B") {
            return self.lex_radix(start, IntBase::Bin, |c| matches!(c, '0' | '1' | '_'));
        }

        // Decimal int or float: \d*\.\d+(e\d+)? | 0 | [1-9][\d_]*
        let digits_start = self.offset;
        let mut i = self.offset;
        while i < self.bytes.len() && (self.bytes[i].is_ascii_digit() || self.bytes[i] == b'_') {
            i += 1;
        }
        let int_run_end = i;
        let mut is_float = false;
        if i < self.bytes.len() && self.bytes[i] == b'.' && i + 1 < self.bytes.len() && self.bytes[i + 1].is_ascii_digit()
        {
            is_float = true;
            i += 1;
            while i < self.bytes.len() && self.bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i < self.bytes.len() && (self.bytes[i] == b'e' || self.bytes[i] == b'E') {
                let mut j = i + 1;
                while j < self.bytes.len() && self.bytes[j].is_ascii_digit() {
                    j += 1;
                }
                if j > i + 1 {
                    i = j;
                }
            }
        } else if int_run_end - digits_start > 1 && self.bytes[digits_start] == b'0' {
            // The plain-integer grammar is `0 | [1-9][\d_]*`: a leading `0`
            // is only ever a standalone token. "007" lexes as the Int `0`
            // followed by two more Int `0`/`7` tokens, not one literal `7`.
            i = digits_start + 1;
        }
        let len = i - digits_start;
        if len == 0 {
            return Err(LexError { pos: start, msg: "malformed numeric literal".into() });
        }
        let text = self.src[digits_start..i].to_string();
        self.advance(len);
        if is_float {
            Ok(Token::new(TokenKind::Float(text.clone()), text, start))
        } else {
            Ok(Token::new(TokenKind::Int(IntBase::Dec, text.clone()), text, start))
        }
    }

    fn lex_radix(
        &mut self,
        start: Position,
        base: IntBase,
        valid: impl Fn(char) -> bool,
    ) -> Result<Token, LexError> {
        let digits_start = self.offset + 2; // past "0x"/"0o"/"0b"
        let mut i = digits_start;
        while i < self.bytes.len() && valid(self.bytes[i] as char) {
            i += 1;
        }
        if i == digits_start {
            return Err(LexError { pos: start, msg: "malformed numeric literal".into() });
        }
        let digits = self.src[digits_start..i].to_string();
        let text = self.src[self.offset..i].to_string();
        self.advance(i - self.offset);
        Ok(Token::new(TokenKind::Int(base, digits), text, start))
    }

    fn lex_ident(&mut self, start: Position) -> Token {
        let s = self.offset;
        let mut i = s;
        while i < self.bytes.len()
            && (self.bytes[i].is_ascii_alphanumeric() || self.bytes[i] == b'_')
        {
            i += 1;
        }
        let text = self.src[s..i].to_string();
        self.advance(i - s);

        match text.as_str() {
            "true" => Token::new(TokenKind::Bool(true), text, start),
            "false" => Token::new(TokenKind::Bool(false), text, start),
            "and" => Token::new(TokenKind::Op("and"), text, start),
            "or" => Token::new(TokenKind::Op("or"), text, start),
            "not" => Token::new(TokenKind::Op("not"), text, start),
            _ => Token::new(TokenKind::Ident(text.clone()), text, start),
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).map(|t| t.unwrap().kind).collect()
    }

    #[test]
    fn basic_arithmetic() {
        let ks = kinds("1 + 10");
        assert_eq!(
            ks,
            vec![
                TokenKind::Int(IntBase::Dec, "1".into()),
                TokenKind::Op("+"),
                TokenKind::Int(IntBase::Dec, "10".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn hex_oct_bin() {
        assert_eq!(kinds("0xFF")[0], TokenKind::Int(IntBase::Hex, "FF".into()));
        assert_eq!(kinds("0o17")[0], TokenKind::Int(IntBase::Oct, "17".into()));
        assert_eq!(kinds("0b101")[0], TokenKind::Int(IntBase::Bin, "101".into()));
    }

    #[test]
    fn float_literal() {
        assert_eq!(kinds("3.5")[0], TokenKind::Float("3.5".into()));
        assert_eq!(kinds(".5")[0], TokenKind::Float(".5".into()));
    }

    #[test]
    fn string_literal() {
        assert_eq!(kinds("'fizz'")[0], TokenKind::SingleString("fizz".into()));
    }

    #[test]
    fn greedy_operator_match() {
        assert_eq!(kinds(">=")[0], TokenKind::Op(">="));
        assert_eq!(kinds(">")[0], TokenKind::Op(">"));
    }

    #[test]
    fn unknown_char_errors() {
        let mut lx = Lexer::new("@");
        assert!(lx.next_token().unwrap().is_err());
    }

    #[test]
    fn keywords_are_ops_not_idents() {
        assert_eq!(kinds("and")[0], TokenKind::Op("and"));
        assert_eq!(kinds("andvar")[0], TokenKind::Ident("andvar".into()));
    }

    #[test]
    fn leading_zero_is_its_own_token_not_a_multi_digit_literal() {
        // "007" is three separate Int tokens, not one literal valued 7 —
        // the plain decimal grammar is `0 | [1-9][\d_]*`.
        let ks = kinds("007");
        assert_eq!(
            ks,
            vec![
                TokenKind::Int(IntBase::Dec, "0".into()),
                TokenKind::Int(IntBase::Dec, "0".into()),
                TokenKind::Int(IntBase::Dec, "7".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn leading_zero_float_is_unaffected() {
        assert_eq!(kinds("0.5")[0], TokenKind::Float("0.5".into()));
    }
}
