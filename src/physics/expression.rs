//! A small arithmetic expression language for dispersion relations.
//!
//! Expressions are parsed once into an [`Expr`] tree whose symbols are
//! resolved to slot indices. Evaluation is generic over [`DualNum`], so the
//! same tree gives plain `f64` energies and forward-mode derivatives through
//! `num_dual` dual numbers.

use num_dual::DualNum;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("unexpected character '{ch}' at position {position}")]
    UnexpectedChar { ch: char, position: usize },
    #[error("invalid number literal '{literal}' at position {position}")]
    InvalidNumber { literal: String, position: usize },
    #[error("unexpected token '{found}' at position {position}")]
    UnexpectedToken { found: String, position: usize },
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unknown function '{name}'")]
    UnknownFunction { name: String },
    #[error("unknown symbol '{name}'")]
    UnknownSymbol { name: String },
}

/// Built-in single-argument functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Exp,
    Ln,
    Sqrt,
}

impl Function {
    pub const NAMES: [&'static str; 13] = [
        "sin", "cos", "tan", "asin", "acos", "atan", "sinh", "cosh", "tanh", "exp", "log", "ln",
        "sqrt",
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        let f = match name {
            "sin" => Function::Sin,
            "cos" => Function::Cos,
            "tan" => Function::Tan,
            "asin" => Function::Asin,
            "acos" => Function::Acos,
            "atan" => Function::Atan,
            "sinh" => Function::Sinh,
            "cosh" => Function::Cosh,
            "tanh" => Function::Tanh,
            "exp" => Function::Exp,
            "log" | "ln" => Function::Ln,
            "sqrt" => Function::Sqrt,
            _ => return None,
        };
        Some(f)
    }

    fn apply<T: DualNum<f64> + Copy>(self, x: T) -> T {
        match self {
            Function::Sin => x.sin(),
            Function::Cos => x.cos(),
            Function::Tan => x.tan(),
            Function::Asin => x.asin(),
            Function::Acos => x.acos(),
            Function::Atan => x.atan(),
            Function::Sinh => x.sinh(),
            Function::Cosh => x.cosh(),
            Function::Tanh => x.tanh(),
            Function::Exp => x.exp(),
            Function::Ln => x.ln(),
            Function::Sqrt => x.sqrt(),
        }
    }
}

/// Named constants understood by the parser.
pub const CONSTANTS: [(&str, f64); 2] = [("pi", std::f64::consts::PI), ("E", std::f64::consts::E)];

/// Returns true if `name` is a function or constant name of the language.
pub fn is_builtin(name: &str) -> bool {
    Function::from_name(name).is_some() || CONSTANTS.iter().any(|(c, _)| *c == name)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    /// Index into the symbol slice passed to [`Expr::eval`].
    Symbol(usize),
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Call(Function, Box<Expr>),
}

impl Expr {
    /// Parse `source`, resolving identifiers against `symbols` (slot order).
    pub fn parse(source: &str, symbols: &[&str]) -> Result<Expr, ParseError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            symbols,
        };
        let expr = parser.expression()?;
        match parser.peek() {
            None => Ok(expr),
            Some(tok) => Err(ParseError::UnexpectedToken {
                found: tok.kind.to_string(),
                position: tok.position,
            }),
        }
    }

    /// Evaluate with `values[i]` bound to symbol slot `i`.
    pub fn eval<T: DualNum<f64> + Copy>(&self, values: &[T]) -> T {
        match self {
            Expr::Number(x) => T::from(*x),
            Expr::Symbol(slot) => values[*slot],
            Expr::Neg(a) => -a.eval(values),
            Expr::Add(a, b) => a.eval(values) + b.eval(values),
            Expr::Sub(a, b) => a.eval(values) - b.eval(values),
            Expr::Mul(a, b) => a.eval(values) * b.eval(values),
            Expr::Div(a, b) => a.eval(values) / b.eval(values),
            Expr::Pow(base, exponent) => {
                let b = base.eval(values);
                match exponent.constant_value() {
                    Some(n) if n.fract() == 0.0 && n.abs() <= i32::MAX as f64 => b.powi(n as i32),
                    Some(n) => b.powf(n),
                    None => (b.ln() * exponent.eval(values)).exp(),
                }
            }
            Expr::Call(f, arg) => f.apply(arg.eval(values)),
        }
    }

    /// Value of a subtree that contains no symbols.
    fn constant_value(&self) -> Option<f64> {
        match self {
            Expr::Number(x) => Some(*x),
            Expr::Neg(a) => a.constant_value().map(|x| -x),
            _ => None,
        }
    }

    /// Whether symbol slot `slot` appears anywhere in the tree.
    pub fn depends_on(&self, slot: usize) -> bool {
        match self {
            Expr::Number(_) => false,
            Expr::Symbol(s) => *s == slot,
            Expr::Neg(a) | Expr::Call(_, a) => a.depends_on(slot),
            Expr::Add(a, b)
            | Expr::Sub(a, b)
            | Expr::Mul(a, b)
            | Expr::Div(a, b)
            | Expr::Pow(a, b) => a.depends_on(slot) || b.depends_on(slot),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Pow,
    LParen,
    RParen,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Number(x) => write!(f, "{x}"),
            TokenKind::Ident(name) => write!(f, "{name}"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::Star => write!(f, "*"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::Pow => write!(f, "**"),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
        }
    }
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    position: usize,
}

fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        let start = i;
        let kind = match ch {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '/' => TokenKind::Slash,
            '^' => TokenKind::Pow,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '*' => {
                if chars.get(i + 1) == Some(&'*') {
                    i += 1;
                    TokenKind::Pow
                } else {
                    TokenKind::Star
                }
            }
            c if c.is_ascii_digit() || c == '.' => {
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // exponent part, e.g. 1.5e-3
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
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| ParseError::InvalidNumber {
                        literal: literal.clone(),
                        position: start,
                    })?;
                tokens.push(Token {
                    kind: TokenKind::Number(value),
                    position: start,
                });
                continue;
            }
            c if c.is_alphabetic() || c == '_' => {
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token {
                    kind: TokenKind::Ident(chars[start..i].iter().collect()),
                    position: start,
                });
                continue;
            }
            c => return Err(ParseError::UnexpectedChar { ch: c, position: i }),
        };
        tokens.push(Token {
            kind,
            position: start,
        });
        i += 1;
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    symbols: &'a [&'a str],
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Token, ParseError> {
        let tok = self.tokens.get(self.pos).cloned().ok_or(ParseError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(tok)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek().map(|t| &t.kind) == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        let tok = self.next()?;
        if tok.kind == kind {
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken {
                found: tok.kind.to_string(),
                position: tok.position,
            })
        }
    }

    fn expression(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.term()?;
        loop {
            if self.eat(&TokenKind::Plus) {
                lhs = Expr::Add(Box::new(lhs), Box::new(self.term()?));
            } else if self.eat(&TokenKind::Minus) {
                lhs = Expr::Sub(Box::new(lhs), Box::new(self.term()?));
            } else {
                return Ok(lhs);
            }
        }
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.unary()?;
        loop {
            if self.eat(&TokenKind::Star) {
                lhs = Expr::Mul(Box::new(lhs), Box::new(self.unary()?));
            } else if self.eat(&TokenKind::Slash) {
                lhs = Expr::Div(Box::new(lhs), Box::new(self.unary()?));
            } else {
                return Ok(lhs);
            }
        }
    }

    // Unary minus binds looser than the power operator: -k**2 == -(k**2).
    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&TokenKind::Minus) {
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        if self.eat(&TokenKind::Plus) {
            return self.unary();
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr, ParseError> {
        let base = self.primary()?;
        if self.eat(&TokenKind::Pow) {
            let exponent = self.unary()?;
            return Ok(Expr::Pow(Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let tok = self.next()?;
        match tok.kind {
            TokenKind::Number(x) => Ok(Expr::Number(x)),
            TokenKind::LParen => {
                let inner = self.expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::Ident(name) => {
                if self.eat(&TokenKind::LParen) {
                    let function = Function::from_name(&name)
                        .ok_or(ParseError::UnknownFunction { name: name.clone() })?;
                    let arg = self.expression()?;
                    self.expect(TokenKind::RParen)?;
                    return Ok(Expr::Call(function, Box::new(arg)));
                }
                if let Some(slot) = self.symbols.iter().position(|s| *s == name) {
                    return Ok(Expr::Symbol(slot));
                }
                CONSTANTS
                    .iter()
                    .find(|(c, _)| *c == name)
                    .map(|(_, value)| Expr::Number(*value))
                    .ok_or(ParseError::UnknownSymbol { name })
            }
            other => Err(ParseError::UnexpectedToken {
                found: other.to_string(),
                position: tok.position,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use num_dual::Dual64;

    fn eval_f64(source: &str, symbols: &[&str], values: &[f64]) -> f64 {
        Expr::parse(source, symbols).expect("parse").eval(values)
    }

    #[test]
    fn precedence_follows_python_conventions() {
        assert_relative_eq!(eval_f64("1 + 2 * 3", &[], &[]), 7.0);
        assert_relative_eq!(eval_f64("-x**2", &["x"], &[3.0]), -9.0);
        assert_relative_eq!(eval_f64("2**3**2", &[], &[]), 512.0);
        assert_relative_eq!(eval_f64("2^-1", &[], &[]), 0.5);
        assert_relative_eq!(eval_f64("(1 - 4) / 2 / 3", &[], &[]), -0.5);
    }

    #[test]
    fn functions_constants_and_scientific_literals() {
        let value = eval_f64("-2*t*(cos(kx*a) + cos(ky*a)) + 1.5e-1", &["kx", "ky", "a", "t"], &[
            0.0, std::f64::consts::PI, 1.0, 10.0,
        ]);
        assert_relative_eq!(value, 0.15, epsilon = 1e-12);
        assert_relative_eq!(eval_f64("sqrt(E**2) * cos(pi)", &[], &[]), -std::f64::consts::E);
    }

    #[test]
    fn dual_evaluation_gives_derivative() {
        let expr = Expr::parse("x**2 * sin(y)", &["x", "y"]).unwrap();
        let y = 0.3_f64;
        let d = expr.eval(&[Dual64::new(2.0, 1.0), Dual64::new(y, 0.0)]);
        assert_relative_eq!(d.re, 4.0 * y.sin(), epsilon = 1e-14);
        assert_relative_eq!(d.eps, 4.0 * y.sin(), epsilon = 1e-14);
    }

    #[test]
    fn symbolic_exponent_is_differentiated() {
        let expr = Expr::parse("x**y", &["x", "y"]).unwrap();
        let d = expr.eval(&[Dual64::new(2.0, 0.0), Dual64::new(3.0, 1.0)]);
        assert_relative_eq!(d.re, 8.0, epsilon = 1e-12);
        assert_relative_eq!(d.eps, 8.0 * 2.0_f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn reports_errors() {
        assert_eq!(
            Expr::parse("kx + q", &["kx"]),
            Err(ParseError::UnknownSymbol { name: "q".into() })
        );
        assert_eq!(
            Expr::parse("foo(kx)", &["kx"]),
            Err(ParseError::UnknownFunction { name: "foo".into() })
        );
        assert_eq!(Expr::parse("kx +", &["kx"]), Err(ParseError::UnexpectedEnd));
        assert!(matches!(
            Expr::parse("kx $ 2", &["kx"]),
            Err(ParseError::UnexpectedChar { ch: '$', .. })
        ));
        assert!(matches!(
            Expr::parse("(kx", &["kx"]),
            Err(ParseError::UnexpectedEnd)
        ));
        assert!(matches!(
            Expr::parse("kx kx", &["kx"]),
            Err(ParseError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn tracks_symbol_dependence() {
        let expr = Expr::parse("kx**2 + a", &["kx", "ky", "a"]).unwrap();
        assert!(expr.depends_on(0));
        assert!(!expr.depends_on(1));
        assert!(expr.depends_on(2));
    }
}
