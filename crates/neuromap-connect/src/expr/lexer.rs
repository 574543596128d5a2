//! Tokenizer for connection expressions

use crate::error::{ConnectError, Result};

/// Token kinds produced by [`tokenize`]
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Numeric literal
    Number(f64),
    /// Identifier (variable, constant, module or function name)
    Ident(String),
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `**`
    StarStar,
    /// `/`
    Slash,
    /// `//`
    SlashSlash,
    /// `%`
    Percent,
    /// `&`
    Amp,
    /// `|`
    Pipe,
    /// `~`
    Tilde,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
    /// End of input
    Eof,
}

/// A token and the one-based column it starts at
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Token kind
    pub kind: TokenKind,
    /// One-based column
    pub column: usize,
}

/// Split an expression into tokens
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let column = i + 1;

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).map_or(false, |n| n.is_ascii_digit())) {
            let (value, len) = lex_number(source, &chars[i..], column)?;
            tokens.push(Token { kind: TokenKind::Number(value), column });
            i += len;
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let ident: String = chars[start..i].iter().collect();
            tokens.push(Token { kind: TokenKind::Ident(ident), column });
            continue;
        }

        let next = chars.get(i + 1).copied();
        let (kind, len) = match (c, next) {
            ('*', Some('*')) => (TokenKind::StarStar, 2),
            ('/', Some('/')) => (TokenKind::SlashSlash, 2),
            ('<', Some('=')) => (TokenKind::Le, 2),
            ('>', Some('=')) => (TokenKind::Ge, 2),
            ('=', Some('=')) => (TokenKind::EqEq, 2),
            ('!', Some('=')) => (TokenKind::NotEq, 2),
            ('(', _) => (TokenKind::LParen, 1),
            (')', _) => (TokenKind::RParen, 1),
            ('[', _) => (TokenKind::LBracket, 1),
            (']', _) => (TokenKind::RBracket, 1),
            (',', _) => (TokenKind::Comma, 1),
            ('.', _) => (TokenKind::Dot, 1),
            ('+', _) => (TokenKind::Plus, 1),
            ('-', _) => (TokenKind::Minus, 1),
            ('*', _) => (TokenKind::Star, 1),
            ('/', _) => (TokenKind::Slash, 1),
            ('%', _) => (TokenKind::Percent, 1),
            ('&', _) => (TokenKind::Amp, 1),
            ('|', _) => (TokenKind::Pipe, 1),
            ('~', _) => (TokenKind::Tilde, 1),
            ('<', _) => (TokenKind::Lt, 1),
            ('>', _) => (TokenKind::Gt, 1),
            ('^', _) => {
                return Err(ConnectError::expression(
                    source,
                    column,
                    "'^' is not supported, use '**' for powers",
                ))
            }
            ('=', _) => {
                return Err(ConnectError::expression(source, column, "assignment is not allowed"))
            }
            (other, _) => {
                return Err(ConnectError::expression(
                    source,
                    column,
                    format!("unexpected character '{}'", other),
                ))
            }
        };
        tokens.push(Token { kind, column });
        i += len;
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        column: chars.len() + 1,
    });
    Ok(tokens)
}

/// Lex `digits [. digits] [e [+-] digits]`, returning the value and char count
fn lex_number(source: &str, chars: &[char], column: usize) -> Result<(f64, usize)> {
    let mut len = 0;
    let digits = |from: usize| chars[from..].iter().take_while(|c| c.is_ascii_digit()).count();

    len += digits(len);
    if chars.get(len) == Some(&'.') {
        len += 1;
        len += digits(len);
    }
    if matches!(chars.get(len), Some('e') | Some('E')) {
        let mut exp_len = 1;
        if matches!(chars.get(len + exp_len), Some('+') | Some('-')) {
            exp_len += 1;
        }
        let exp_digits = digits(len + exp_len);
        if exp_digits == 0 {
            return Err(ConnectError::expression(source, column, "malformed exponent in number"));
        }
        len += exp_len + exp_digits;
    }

    let text: String = chars[..len].iter().collect();
    let value = text
        .parse::<f64>()
        .map_err(|_| ConnectError::expression(source, column, format!("invalid number '{}'", text)))?;
    Ok((value, len))
}
