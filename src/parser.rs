//! A Pratt (operator-precedence / precedence-climbing) expression parser.
//!
//! This grammar is closed — nobody can declare a new operator inside an
//! expression string — so the binding-power tables are static
//! `lazy_static` maps rather than a runtime-configurable operator table.

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::ast::{BinOp, Expr, RawLiteral, UnOp};
use crate::error::{Error, ParseError};
use crate::lexer::Lexer;
use crate::token::{Position, Token, TokenKind};

lazy_static! {
    /// op text -> (binding power, UnOp)
    static ref PREFIX: HashMap<&'static str, (u8, UnOp)> = {
        let mut m = HashMap::new();
        m.insert("+", (15, UnOp::Plus));
        m.insert("-", (15, UnOp::Minus));
        m.insert("not", (7, UnOp::Not));
        m
    };

    /// op text -> (left bp, right bp, BinOp). `?` is handled separately.
    static ref INFIX: HashMap<&'static str, (u8, u8, BinOp)> = {
        let mut m = HashMap::new();
        m.insert("**", (18, 17, BinOp::Pow)); // right-associative
        m.insert("*", (13, 14, BinOp::Mul));
        m.insert("/", (13, 14, BinOp::Div));
        m.insert("//", (13, 14, BinOp::FloorDiv));
        m.insert("%", (13, 14, BinOp::Mod));
        m.insert("+", (11, 12, BinOp::Add));
        // Intentionally (12, 11), not (11, 12) like the other additive
        // operator: this makes binary `-` right-associative at this
        // precedence level, which is surprising but specified behavior.
        m.insert("-", (12, 11, BinOp::Sub));
        m.insert(">", (9, 10, BinOp::Gt));
        m.insert("<", (9, 10, BinOp::Lt));
        m.insert(">=", (9, 10, BinOp::Ge));
        m.insert("<=", (9, 10, BinOp::Le));
        m.insert("==", (9, 10, BinOp::Eq));
        m.insert("!=", (9, 10, BinOp::Ne));
        m.insert("and", (5, 6, BinOp::And));
        m.insert("or", (3, 4, BinOp::Or));
        m
    };

    /// `?` ternary binding power, kept apart from INFIX since it doesn't
    /// map to a single `BinOp`.
    static ref COND_BP: (u8, u8) = (2, 1);

    /// op text -> postfix binding power.
    static ref POSTFIX: HashMap<&'static str, u8> = {
        let mut m = HashMap::new();
        m.insert(".", 19);
        m.insert("[", 19);
        m.insert("(", 19);
        m
    };
}

pub fn parse(source: &str) -> Result<Expr, Error> {
    let tokens = tokenize(source)?;
    let mut p = Parser { tokens, pos: 0, source };
    let expr = p.parse_expr(0)?;
    p.expect_fully_consumed()?;
    Ok(expr)
}

fn tokenize(source: &str) -> Result<Vec<Token>, Error> {
    let mut out = Vec::new();
    for tok in Lexer::new(source) {
        let tok = tok.map_err(Error::Lex)?;
        let eof = tok.is_eof();
        out.push(tok);
        if eof {
            break;
        }
    }
    Ok(out)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    source: &'a str,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn error_at(&self, pos: Position, msg: impl Into<String>) -> ParseError {
        let line_text = self.source.lines().nth(pos.line.saturating_sub(1)).unwrap_or("").to_string();
        ParseError { pos, msg: msg.into(), line_text }
    }

    fn expect_fully_consumed(&mut self) -> Result<(), Error> {
        let tok = self.peek();
        if tok.is_eof() {
            Ok(())
        } else {
            Err(self.error_at(tok.pos, format!("unexpected trailing input '{}'", tok.text)).into())
        }
    }

    fn at_stop_token(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof | TokenKind::EndExpr(_) | TokenKind::SquareClose)
    }

    /// The core precedence-climbing loop.
    fn parse_expr(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let left = self.parse_primary(min_bp)?;

        // The callee of a bare `f(...)` call is always the leftmost
        // identifier of this primary, captured once here and threaded
        // unchanged through every postfix `(` below — never re-derived from
        // `left`, which gets overwritten by each postfix step. This is what
        // lets `f(1)(2)` and `a.b()(2)` both resolve their bare call back to
        // "f"/"a" instead of erroring on the second call.
        let leftmost_ident: Option<String> = match &left {
            Expr::Value(RawLiteral::Ident(name), _) => Some(name.clone()),
            _ => None,
        };
        let mut left = left;

        loop {
            if self.at_stop_token() {
                break;
            }
            let tok = self.peek().clone();
            let op_text = match &tok.kind {
                TokenKind::Op(s) => Some(*s),
                _ => None,
            };

            if let Some(op) = op_text {
                if let Some(&lp) = POSTFIX.get(op) {
                    if lp >= min_bp {
                        left = self.parse_postfix(left, op, tok.pos, leftmost_ident.as_deref())?;
                        continue;
                    }
                }
                if op == "?" {
                    let (lp, rp) = *COND_BP;
                    if lp >= min_bp {
                        self.advance();
                        let then = self.parse_expr(rp)?;
                        self.expect_op(":")?;
                        let els = self.parse_expr(rp)?;
                        left = Expr::Cond {
                            cond: Box::new(left),
                            then: Box::new(then),
                            els: Box::new(els),
                            pos: tok.pos,
                        };
                        continue;
                    }
                } else if let Some(&(lp, rp, binop)) = INFIX.get(op) {
                    if lp >= min_bp {
                        self.advance();
                        let right = self.parse_expr(rp)?;
                        left = Expr::BinOp {
                            op: binop,
                            left: Box::new(left),
                            right: Box::new(right),
                            pos: tok.pos,
                        };
                        continue;
                    }
                }
            }
            break;
        }

        Ok(left)
    }

    fn expect_op(&mut self, expected: &str) -> Result<(), ParseError> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Op(s) if s == expected => {
                self.advance();
                Ok(())
            }
            _ => Err(self.error_at(tok.pos, format!("expected '{}', found '{}'", expected, tok.text))),
        }
    }

    fn parse_primary(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let tok = self.peek().clone();
        match &tok.kind {
            TokenKind::SquareOpen => self.parse_array(),
            TokenKind::Op("(") => {
                self.advance();
                let inner = self.parse_expr(0)?;
                match self.peek().kind {
                    TokenKind::EndExpr(')') => {
                        self.advance();
                        Ok(inner)
                    }
                    _ => Err(self.error_at(tok.pos, "unmatched '('")),
                }
            }
            TokenKind::Op(s) => {
                if let Some(&(bp, unop)) = PREFIX.get(s) {
                    self.advance();
                    let val = self.parse_expr(bp)?;
                    Ok(Expr::UnOp { op: unop, val: Box::new(val), pos: tok.pos })
                } else {
                    Err(self.error_at(tok.pos, format!("unexpected token '{}'", tok.text)))
                }
            }
            TokenKind::Int(base, digits) => {
                self.advance();
                Ok(Expr::Value(RawLiteral::Int(*base, digits.clone()), tok.pos))
            }
            TokenKind::Float(text) => {
                self.advance();
                Ok(Expr::Value(RawLiteral::Float(text.clone()), tok.pos))
            }
            TokenKind::SingleString(s) => {
                self.advance();
                Ok(Expr::Value(RawLiteral::Str(s.clone()), tok.pos))
            }
            TokenKind::Bool(b) => {
                self.advance();
                Ok(Expr::Value(RawLiteral::Bool(*b), tok.pos))
            }
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Expr::Value(RawLiteral::Ident(name.clone()), tok.pos))
            }
            _ => {
                let _ = min_bp;
                Err(self.error_at(tok.pos, format!("unexpected token '{}'", tok.text)))
            }
        }
    }

    fn parse_postfix(
        &mut self,
        left: Expr,
        op: &str,
        pos: Position,
        leftmost_ident: Option<&str>,
    ) -> Result<Expr, ParseError> {
        match op {
            "[" => {
                self.advance(); // consume '['
                let index = self.parse_expr(0)?;
                match self.peek().kind {
                    TokenKind::SquareClose => {
                        self.advance();
                    }
                    _ => return Err(self.error_at(pos, "unmatched '['")),
                }
                Ok(Expr::IdxAccess { base: Box::new(left), index: Box::new(index), pos })
            }
            "." => {
                self.advance(); // consume '.'
                let name_tok = self.peek().clone();
                let field = match &name_tok.kind {
                    TokenKind::Ident(name) => name.clone(),
                    _ => return Err(self.error_at(name_tok.pos, "expected identifier after '.'")),
                };
                self.advance(); // consume the field/method name
                if matches!(self.peek().kind, TokenKind::Op("(")) {
                    let args = self.parse_paren_args()?;
                    Ok(Expr::Call { base: Some(Box::new(left)), method: field, args, pos })
                } else {
                    Ok(Expr::FieldAccess { base: Box::new(left), field, pos })
                }
            }
            "(" => {
                // '(' is NOT yet consumed here; `parse_paren_args` consumes it.
                // The callee is the leftmost identifier of the whole
                // expression, not `left` — `left` may already be a `Call`
                // or `FieldAccess` from an earlier postfix step.
                let name = match leftmost_ident {
                    Some(name) => name.to_string(),
                    None => return Err(self.error_at(pos, "call target must be an identifier")),
                };
                let args = self.parse_paren_args()?;
                Ok(Expr::Call { base: None, method: name, args, pos })
            }
            _ => unreachable!("postfix op table only contains '.', '[', '('"),
        }
    }

    /// Parses a parenthesized, comma-separated argument list. The opening
    /// `(` must still be unconsumed when this is called.
    fn parse_paren_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let open_pos = self.peek().pos;
        self.advance(); // consume '('
        let mut args = Vec::new();
        if matches!(self.peek().kind, TokenKind::EndExpr(')')) {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr(0)?);
            match self.peek().kind {
                TokenKind::EndExpr(',') => {
                    self.advance();
                }
                TokenKind::EndExpr(')') => {
                    self.advance();
                    break;
                }
                _ => return Err(self.error_at(open_pos, "unmatched '('")),
            }
        }
        Ok(args)
    }

    fn parse_array(&mut self) -> Result<Expr, ParseError> {
        let open_pos = self.peek().pos;
        self.advance(); // consume '['
        let mut elems = Vec::new();
        if matches!(self.peek().kind, TokenKind::SquareClose) {
            self.advance();
            return Ok(Expr::Array { elems, pos: open_pos });
        }
        loop {
            elems.push(self.parse_expr(0)?);
            match self.peek().kind {
                TokenKind::EndExpr(',') => {
                    self.advance();
                }
                TokenKind::SquareClose => {
                    self.advance();
                    break;
                }
                _ => return Err(self.error_at(open_pos, "unmatched '['")),
            }
        }
        Ok(Expr::Array { elems, pos: open_pos })
    }
}
