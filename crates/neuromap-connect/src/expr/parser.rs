//! Recursive-descent parser with Python operator precedence
//!
//! ```text
//! compare := bitor [cmp_op bitor]
//! bitor   := bitand ('|' bitand)*
//! bitand  := arith ('&' arith)*
//! arith   := term (('+' | '-') term)*
//! term    := unary (('*' | '/' | '//' | '%') unary)*
//! unary   := ('-' | '+' | '~') unary | power
//! power   := primary ['**' unary]
//! primary := NUMBER | name [call | index] | '(' compare ')'
//! name    := IDENT ('.' IDENT)*
//! ```

use super::ast::{BinaryOp, CompareOp, Constant, Expr, Function, UnaryOp, MAX_AXIS};
use super::lexer::{tokenize, Token, TokenKind};
use crate::error::{ConnectError, Result};

/// Longest accepted expression source, in characters
pub const MAX_EXPRESSION_LEN: usize = 4096;

/// Deepest accepted nesting of sub-expressions
pub const MAX_DEPTH: usize = 64;

/// Module prefixes accepted in front of function and constant names
const MODULE_PREFIXES: [&str; 3] = ["math", "numpy", "np"];

/// Parse `source` into an expression tree, binding `variable` as the distance
pub fn parse(source: &str, variable: &str) -> Result<Expr> {
    let length = source.chars().count();
    if length > MAX_EXPRESSION_LEN {
        return Err(ConnectError::expression(
            truncate(source),
            MAX_EXPRESSION_LEN,
            format!("expression is {} characters, limit is {}", length, MAX_EXPRESSION_LEN),
        ));
    }
    if source.trim().is_empty() {
        return Err(ConnectError::expression(source, 1, "expression is empty"));
    }

    let tokens = tokenize(source)?;
    let mut parser = Parser {
        source,
        variable,
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.compare()?;
    let trailing = parser.peek();
    if trailing.kind != TokenKind::Eof {
        return Err(parser.error_at(trailing.column, "unexpected trailing input"));
    }
    Ok(expr)
}

fn truncate(source: &str) -> String {
    source.chars().take(32).chain("...".chars()).collect()
}

struct Parser<'a> {
    source: &'a str,
    variable: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Token {
        self.tokens[self.pos.min(self.tokens.len() - 1)].clone()
    }

    fn advance(&mut self) -> Token {
        let token = self.peek();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if &self.peek().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token> {
        let token = self.peek();
        if token.kind == kind {
            Ok(self.advance())
        } else {
            Err(self.error_at(token.column, format!("expected {}", what)))
        }
    }

    fn error_at(&self, column: usize, reason: impl Into<String>) -> ConnectError {
        ConnectError::expression(self.source, column, reason)
    }

    fn enter(&mut self, column: usize) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error_at(column, format!("nesting deeper than {}", MAX_DEPTH)));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn compare(&mut self) -> Result<Expr> {
        let column = self.peek().column;
        self.enter(column)?;
        let lhs = self.bitor()?;
        let result = match compare_op(&self.peek().kind) {
            Some(op) => {
                self.advance();
                let rhs = self.bitor()?;
                let next = self.peek();
                if compare_op(&next.kind).is_some() {
                    return Err(self.error_at(
                        next.column,
                        "chained comparisons are not supported, combine with '&' instead",
                    ));
                }
                Expr::Compare(op, Box::new(lhs), Box::new(rhs))
            }
            None => lhs,
        };
        self.leave();
        Ok(result)
    }

    fn bitor(&mut self) -> Result<Expr> {
        let mut lhs = self.bitand()?;
        while self.eat(&TokenKind::Pipe) {
            let rhs = self.bitand()?;
            lhs = Expr::Binary(BinaryOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn bitand(&mut self) -> Result<Expr> {
        let mut lhs = self.arith()?;
        while self.eat(&TokenKind::Amp) {
            let rhs = self.arith()?;
            lhs = Expr::Binary(BinaryOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn arith(&mut self) -> Result<Expr> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn term(&mut self) -> Result<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::SlashSlash => BinaryOp::FloorDiv,
                TokenKind::Percent => BinaryOp::Mod,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary(&mut self) -> Result<Expr> {
        let token = self.peek();
        let op = match token.kind {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Pos,
            TokenKind::Tilde => UnaryOp::Not,
            _ => return self.power(),
        };
        self.advance();
        self.enter(token.column)?;
        let inner = self.unary()?;
        self.leave();
        Ok(Expr::Unary(op, Box::new(inner)))
    }

    fn power(&mut self) -> Result<Expr> {
        let base = self.primary()?;
        if self.eat(&TokenKind::StarStar) {
            let column = self.peek().column;
            self.enter(column)?;
            let exponent = self.unary()?;
            self.leave();
            return Ok(Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr> {
        let token = self.advance();
        match token.kind {
            TokenKind::Number(v) => Ok(Expr::Number(v)),
            TokenKind::LParen => {
                let inner = self.compare()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::Ident(first) => self.name(first, token.column),
            TokenKind::Eof => Err(self.error_at(token.column, "unexpected end of expression")),
            other => Err(self.error_at(token.column, format!("unexpected token {:?}", other))),
        }
    }

    fn name(&mut self, first: String, column: usize) -> Result<Expr> {
        let mut parts = vec![first];
        while self.eat(&TokenKind::Dot) {
            match self.advance() {
                Token {
                    kind: TokenKind::Ident(part),
                    ..
                } => parts.push(part),
                other => return Err(self.error_at(other.column, "expected a name after '.'")),
            }
        }

        let (module, name) = match parts.as_slice() {
            [name] => (None, name.as_str()),
            [module, name] if MODULE_PREFIXES.contains(&module.as_str()) => {
                (Some(module.as_str()), name.as_str())
            }
            _ => {
                return Err(self.error_at(
                    column,
                    format!("unknown identifier '{}'", parts.join(".")),
                ))
            }
        };

        if self.peek().kind == TokenKind::LParen {
            let function = Function::lookup(name).ok_or_else(|| {
                self.error_at(column, format!("function '{}' is not allowed", parts.join(".")))
            })?;
            return self.call(function, column);
        }

        if module.is_none() && name == self.variable {
            if self.eat(&TokenKind::LBracket) {
                return self.axis(column);
            }
            return Ok(Expr::Variable);
        }

        if let Some(constant) = Constant::lookup(name) {
            return Ok(Expr::Constant(constant));
        }

        if Function::lookup(name).is_some() {
            return Err(self.error_at(column, format!("function '{}' must be called", name)));
        }

        Err(self.error_at(column, format!("unknown identifier '{}'", parts.join("."))))
    }

    fn call(&mut self, function: Function, column: usize) -> Result<Expr> {
        self.expect(TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        if !self.eat(&TokenKind::RParen) {
            loop {
                args.push(self.compare()?);
                if self.eat(&TokenKind::Comma) {
                    continue;
                }
                self.expect(TokenKind::RParen, "',' or ')'")?;
                break;
            }
        }

        let (min, max) = function.arity();
        if args.len() < min || args.len() > max {
            let expected = if min == max {
                min.to_string()
            } else {
                format!("{} to {}", min, max)
            };
            return Err(self.error_at(
                column,
                format!(
                    "{}() takes {} argument(s), {} given",
                    function,
                    expected,
                    args.len()
                ),
            ));
        }
        Ok(Expr::Call(function, args))
    }

    fn axis(&mut self, column: usize) -> Result<Expr> {
        let token = self.advance();
        let index = match token.kind {
            TokenKind::Number(v) if v.fract() == 0.0 && v >= 0.0 => v as usize,
            _ => {
                return Err(self.error_at(
                    token.column,
                    format!("'{}[...]' needs an integer axis index", self.variable),
                ))
            }
        };
        if index > MAX_AXIS {
            return Err(self.error_at(
                token.column,
                format!("axis index {} out of range 0..={}", index, MAX_AXIS),
            ));
        }
        self.expect(TokenKind::RBracket, "']'")?;
        log::trace!("axis distance {}[{}] at column {}", self.variable, index, column);
        Ok(Expr::Axis(index))
    }
}

fn compare_op(kind: &TokenKind) -> Option<CompareOp> {
    Some(match kind {
        TokenKind::Lt => CompareOp::Lt,
        TokenKind::Le => CompareOp::Le,
        TokenKind::Gt => CompareOp::Gt,
        TokenKind::Ge => CompareOp::Ge,
        TokenKind::EqEq => CompareOp::Eq,
        TokenKind::NotEq => CompareOp::Ne,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(src: &str) -> Expr {
        parse(src, "d").unwrap()
    }

    fn at(src: &str, d: f64) -> f64 {
        p(src).eval(d, &[0.0; 3])
    }

    #[test]
    fn test_precedence() {
        assert_eq!(at("1 + 2 * 3", 0.0), 7.0);
        assert_eq!(at("-2 ** 2", 0.0), -4.0);
        assert_eq!(at("2 ** -1", 0.0), 0.5);
        assert_eq!(at("2 ** 3 ** 2", 0.0), 512.0);
        assert_eq!(at("7 // 2 % 3", 0.0), 0.0);
        assert_eq!(at("(1 + 2) * 3", 0.0), 9.0);
    }

    #[test]
    fn test_comparisons_and_logic() {
        assert_eq!(at("d < 2", 1.0), 1.0);
        assert_eq!(at("d < 2", 3.0), 0.0);
        assert_eq!(at("(d > 1) & (d < 3)", 2.0), 1.0);
        assert_eq!(at("(d > 1) & (d < 3)", 4.0), 0.0);
        assert_eq!(at("(d < 1) | (d > 3)", 4.0), 1.0);
        assert_eq!(at("~(d < 1)", 4.0), 1.0);
        // comparisons bind looser than '+'
        assert_eq!(at("d + 1 < 3", 1.0), 1.0);
    }

    #[test]
    fn test_functions_and_constants() {
        assert!((at("exp(-d / 2)", 2.0) - (-1.0f64).exp()).abs() < 1e-12);
        assert!((at("math.cos(pi)", 0.0) + 1.0).abs() < 1e-12);
        assert!((at("numpy.e", 0.0) - std::f64::consts::E).abs() < 1e-12);
        assert_eq!(at("np.maximum(d, 3)", 1.0), 3.0);
        assert_eq!(at("abs(-d)", 2.0), 2.0);
        assert_eq!(at("inf", 0.0), f64::INFINITY);
    }

    #[test]
    fn test_axis_distances() {
        let expr = p("d[0] + 2 * d[2]");
        assert!(expr.uses_axes());
        assert_eq!(expr.eval(0.0, &[1.0, 5.0, 3.0]), 7.0);
        assert!(parse("d[3]", "d").is_err());
        assert!(parse("d[]", "d").is_err());
        assert!(parse("d[1.5]", "d").is_err());
    }

    #[test]
    fn test_custom_variable() {
        let expr = parse("r * 2", "r").unwrap();
        assert_eq!(expr.eval(3.0, &[0.0; 3]), 6.0);
        assert!(parse("d * 2", "r").is_err());
    }

    #[test]
    fn test_rejects_unknown_identifiers() {
        for src in [
            "x + 1",
            "__import__('os')",
            "os.system",
            "math.foo(d)",
            "scipy.exp(d)",
            "modf(d)",
            "d.real",
            "exp",
        ] {
            let err = parse(src, "d").unwrap_err();
            assert!(err.is_configuration(), "{} should be a configuration error", src);
        }
    }

    #[test]
    fn test_rejects_malformed() {
        for src in ["", "   ", "1 +", "(d", "d)", "exp(d,)", "exp()", "fmod(d)", "1 < d < 2", "d d"] {
            assert!(parse(src, "d").is_err(), "{} should fail", src);
        }
    }

    #[test]
    fn test_error_column() {
        match parse("exp(-d) + y", "d") {
            Err(ConnectError::Expression { column, reason, .. }) => {
                assert_eq!(column, 11);
                assert!(reason.contains("'y'"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_limits() {
        let deep = format!("{}d{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert!(parse(&deep, "d").is_err());

        let shallow = format!("{}d{}", "(".repeat(8), ")".repeat(8));
        assert!(parse(&shallow, "d").is_ok());

        let long = "d+".repeat(MAX_EXPRESSION_LEN) + "1";
        assert!(parse(&long, "d").is_err());
    }
}
