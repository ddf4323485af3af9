//! Tokenizer for arithmetic text.
//!
//! Function calls never reach the lexer: they are evaluated first and their
//! results written back as number text (see [`super::parser`]). What is left
//! is numbers, references, the four operators and parentheses.

use super::address::is_reference_syntax;
use super::errors::{DomainError, DomainResult};
use std::fmt;

/// A binary arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operator {
    fn from_char(ch: char) -> Option<Self> {
        match ch {
            '+' => Some(Operator::Add),
            '-' => Some(Operator::Subtract),
            '*' => Some(Operator::Multiply),
            '/' => Some(Operator::Divide),
            _ => None,
        }
    }

    pub fn precedence(&self) -> u8 {
        match self {
            Operator::Add | Operator::Subtract => 1,
            Operator::Multiply | Operator::Divide => 2,
        }
    }

    /// Division by zero follows IEEE 754 (infinity or NaN).
    pub fn apply(&self, left: f64, right: f64) -> f64 {
        match self {
            Operator::Add => left + right,
            Operator::Subtract => left - right,
            Operator::Multiply => left * right,
            Operator::Divide => left / right,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
        };
        f.write_str(symbol)
    }
}

/// A lexical unit of arithmetic text.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Numeric literal, kept as written until evaluation.
    Number(String),
    /// Cell reference as written (not yet normalized).
    Cell(String),
    Operator(Operator),
    LeftParen,
    RightParen,
}

impl Token {
    /// Whether a `+`/`-` following this token is a sign rather than a
    /// binary operator.
    fn starts_operand(previous: Option<&Token>) -> bool {
        matches!(previous, None | Some(Token::Operator(_)) | Some(Token::LeftParen))
    }
}

/// Splits arithmetic text into tokens.
///
/// A leading `+` or `-` (at the start, after an operator or after `(`) gets
/// a literal `0` inserted before it, turning `-x` into `0-x`. A leading `*`
/// or `/` is left alone and fails later with [`DomainError::SyntaxError`].
///
/// # Examples
///
/// ```
/// use sheetcalc::domain::{tokenize, Operator, Token};
///
/// let tokens = tokenize("-a1*2").unwrap();
/// assert_eq!(tokens, vec![
///     Token::Number("0".into()),
///     Token::Operator(Operator::Subtract),
///     Token::Cell("a1".into()),
///     Token::Operator(Operator::Multiply),
///     Token::Number("2".into()),
/// ]);
/// ```
pub fn tokenize(body: &str) -> DomainResult<Vec<Token>> {
    let chars: Vec<char> = body.chars().filter(|ch| !ch.is_whitespace()).collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];

        if ch.is_ascii_digit() || ch == '.' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            tokens.push(Token::Number(chars[start..i].iter().collect()));
            continue;
        }

        if ch.is_ascii_alphabetic() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_alphabetic() {
                i += 1;
            }
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            let reference: String = chars[start..i].iter().collect();
            if !is_reference_syntax(&reference) {
                return Err(DomainError::InvalidToken(reference));
            }
            tokens.push(Token::Cell(reference));
            continue;
        }

        let token = match ch {
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            _ => match Operator::from_char(ch) {
                Some(operator) => {
                    let signed = matches!(operator, Operator::Add | Operator::Subtract);
                    if signed && Token::starts_operand(tokens.last()) {
                        tokens.push(Token::Number("0".to_string()));
                    }
                    Token::Operator(operator)
                }
                None => return Err(DomainError::InvalidCharacter(ch)),
            },
        };
        tokens.push(token);
        i += 1;
    }

    Ok(tokens)
}
