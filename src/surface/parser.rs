//! Text formula -> [`Expr`] parser
//!
//! Recursive descent over a small token stream. Grammar, lowest binding first:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('+' | '-') unary | power
//! power   := primary (('^' | '**') unary)?
//! primary := number | 'x' | 'y' | 'pi' | 'e'
//!          | name '(' expr (',' expr)* ')'
//!          | '(' expr ')'
//! ```
//!
//! `-x^2` parses as `-(x^2)` and `2^-1` is accepted. Column positions in
//! errors are 1-based.
//!
//! Input size is bounded: at most `MAX_TOKENS` tokens, `MAX_NESTING` levels of
//! parentheses / signs / exponents, and a finished tree no deeper than
//! `MAX_TREE_DEPTH`. Everything downstream (evaluation, derivatives, drop)
//! recurses over the tree, so deeper input is rejected here with an error

use std::f64::consts::{E, PI};

use crate::error::SurfaceError;
use crate::surface::expr::{Expr, Func};

const MAX_TOKENS: usize = 10_000;
const MAX_NESTING: usize = 256;
const MAX_TREE_DEPTH: usize = 512;

const TOO_DEEP: &str = "expression nested too deeply";

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    Comma,
    End,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    column: usize, // 1-based
}

fn tokenize(text: &str) -> Result<Vec<Token>, SurfaceError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let column = i + 1;

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || c == '.' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            // scientific notation: 1e-3, 2.5E4
            if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                let mut j = i + 1;
                if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                    j += 1;
                }
                if j < chars.len() && chars[j].is_ascii_digit() {
                    while j < chars.len() && chars[j].is_ascii_digit() {
                        j += 1;
                    }
                    i = j;
                }
            }
            let literal: String = chars[start..i].iter().collect();
            let value = literal.parse::<f64>().map_err(|_| SurfaceError::Parse {
                position: column,
                message: format!("invalid number `{literal}`"),
            })?;
            tokens.push(Token { kind: TokenKind::Number(value), column });
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let name: String = chars[start..i].iter().collect();
            tokens.push(Token { kind: TokenKind::Ident(name), column });
            continue;
        }

        let kind = match c {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' if chars.get(i + 1) == Some(&'*') => {
                i += 1;
                TokenKind::Caret
            }
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '^' => TokenKind::Caret,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ',' => TokenKind::Comma,
            other => {
                return Err(SurfaceError::Parse {
                    position: column,
                    message: format!("unexpected character `{other}`"),
                })
            }
        };
        tokens.push(Token { kind, column });
        i += 1;
    }

    tokens.push(Token { kind: TokenKind::End, column: chars.len() + 1 });
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
    depth: usize, // current recursion depth through `unary`
}

impl Parser {
    fn peek(&self) -> &Token {
        // tokenize always terminates the stream with End
        &self.tokens[self.cursor.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.cursor < self.tokens.len() - 1 {
            self.cursor += 1;
        }
        token
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T, SurfaceError> {
        Err(SurfaceError::Parse {
            position: self.peek().column,
            message: message.into(),
        })
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<(), SurfaceError> {
        if self.peek().kind == kind {
            self.advance();
            Ok(())
        } else {
            self.error(format!("expected {what}"))
        }
    }

    fn expr(&mut self) -> Result<Expr, SurfaceError> {
        let mut lhs = self.term()?;
        loop {
            match self.peek().kind {
                TokenKind::Plus => {
                    self.advance();
                    lhs = Expr::add(lhs, self.term()?);
                }
                TokenKind::Minus => {
                    self.advance();
                    lhs = Expr::sub(lhs, self.term()?);
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn term(&mut self) -> Result<Expr, SurfaceError> {
        let mut lhs = self.unary()?;
        loop {
            match self.peek().kind {
                TokenKind::Star => {
                    self.advance();
                    lhs = Expr::mul(lhs, self.unary()?);
                }
                TokenKind::Slash => {
                    self.advance();
                    lhs = Expr::div(lhs, self.unary()?);
                }
                _ => return Ok(lhs),
            }
        }
    }

    // every nesting path (parentheses, call arguments, signs, exponents)
    // goes through here
    fn unary(&mut self) -> Result<Expr, SurfaceError> {
        if self.depth >= MAX_NESTING {
            return self.error(TOO_DEEP);
        }
        self.depth += 1;
        let result = self.signed();
        self.depth -= 1;
        result
    }

    fn signed(&mut self) -> Result<Expr, SurfaceError> {
        match self.peek().kind {
            TokenKind::Minus => {
                self.advance();
                Ok(Expr::neg(self.unary()?))
            }
            TokenKind::Plus => {
                self.advance();
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Expr, SurfaceError> {
        let base = self.primary()?;
        if self.peek().kind == TokenKind::Caret {
            self.advance();
            let exponent = self.unary()?;
            return Ok(Expr::pow(base, exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, SurfaceError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Number(v) => Ok(Expr::constant(v)),
            TokenKind::LParen => {
                let inner = self.expr()?;
                self.expect(TokenKind::RParen, "`)`")?;
                Ok(inner)
            }
            TokenKind::Ident(name) => {
                if self.peek().kind == TokenKind::LParen {
                    self.advance();
                    let args = self.arguments()?;
                    return build_call(&name, token.column, args);
                }
                match name.as_str() {
                    "x" => Ok(Expr::x()),
                    "y" => Ok(Expr::y()),
                    "pi" => Ok(Expr::constant(PI)),
                    "e" | "E" => Ok(Expr::constant(E)),
                    _ => Err(SurfaceError::Parse {
                        position: token.column,
                        message: format!("unknown symbol `{name}`"),
                    }),
                }
            }
            TokenKind::End => Err(SurfaceError::Parse {
                position: token.column,
                message: "unexpected end of expression".to_string(),
            }),
            _ => Err(SurfaceError::Parse {
                position: token.column,
                message: "expected a number, variable or function".to_string(),
            }),
        }
    }

    // after the opening parenthesis
    fn arguments(&mut self) -> Result<Vec<Expr>, SurfaceError> {
        let mut args = vec![self.expr()?];
        while self.peek().kind == TokenKind::Comma {
            self.advance();
            args.push(self.expr()?);
        }
        self.expect(TokenKind::RParen, "`,` or `)`")?;
        Ok(args)
    }
}

fn build_call(name: &str, column: usize, mut args: Vec<Expr>) -> Result<Expr, SurfaceError> {
    let arity = |expected: &'static str, found: usize| SurfaceError::Arity {
        name: name.to_string(),
        expected,
        found,
    };

    match name {
        "pow" => {
            if args.len() != 2 {
                return Err(arity("2", args.len()));
            }
            let exponent = args.pop().unwrap_or_else(|| Expr::constant(1.0));
            let base = args.pop().unwrap_or_else(|| Expr::constant(1.0));
            Ok(Expr::pow(base, exponent))
        }
        // log(a) is natural, log(a, b) is base b
        "log" if args.len() == 2 => {
            let base = args.pop().unwrap_or_else(|| Expr::constant(E));
            let value = args.pop().unwrap_or_else(|| Expr::constant(1.0));
            Ok(Expr::div(Expr::call(Func::Ln, value), Expr::call(Func::Ln, base)))
        }
        _ => {
            let func = Func::from_name(name).ok_or_else(|| SurfaceError::UnknownFunction {
                name: name.to_string(),
                position: column,
            })?;
            if args.len() != 1 {
                let expected = if name == "log" { "1 or 2" } else { "1" };
                return Err(arity(expected, args.len()));
            }
            let arg = args.pop().unwrap_or_else(|| Expr::constant(0.0));
            Ok(Expr::call(func, arg))
        }
    }
}

/// Parse a formula in `x` and `y`
pub fn parse_expression(text: &str) -> Result<Expr, SurfaceError> {
    let tokens = tokenize(text)?;
    if let Some(token) = tokens.get(MAX_TOKENS) {
        return Err(SurfaceError::Parse {
            position: token.column,
            message: format!("expression too long, limit is {MAX_TOKENS} tokens"),
        });
    }
    let mut parser = Parser { tokens, cursor: 0, depth: 0 };

    if parser.peek().kind == TokenKind::End {
        return parser.error("empty expression");
    }

    let expr = parser.expr()?;
    if parser.peek().kind != TokenKind::End {
        return parser.error("unexpected trailing input");
    }
    if expr.depth() > MAX_TREE_DEPTH {
        return Err(SurfaceError::Parse { position: 1, message: TOO_DEEP.to_string() });
    }
    Ok(expr)
}
