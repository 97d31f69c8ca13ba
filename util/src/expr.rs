//! Safe arithmetic expression evaluation for parameter lists
//!
//! Parameter files are allowed to express angles and lengths as small
//! arithmetic expressions such as `pi/2` or `-0.5 * pi`. This module
//! evaluates those expressions with a closed recursive-descent parser over
//! numeric literals, the constant `pi`, the four arithmetic operators,
//! unary minus and parentheses. Nothing else is accepted, so a parameter
//! file can never smuggle arbitrary code into the evaluator.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::f64::consts::PI;
use thiserror::Error;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors raised while evaluating an expression.
#[derive(Debug, Error, PartialEq)]
pub enum ExprError {
    #[error("Unexpected character '{0}' in expression")]
    UnexpectedChar(char),

    #[error("Unknown identifier \"{0}\", only \"pi\" is recognised")]
    UnknownIdentifier(String),

    #[error("Could not parse \"{0}\" as a number")]
    InvalidNumber(String),

    #[error("Expression ended unexpectedly")]
    UnexpectedEnd,

    #[error("Unexpected trailing input after the expression")]
    TrailingInput,

    #[error("Expected a list of {expected} entries but found {found}")]
    WrongEntryCount { expected: usize, found: usize },
}

/// A single lexical token of an expression.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Evaluate a single arithmetic expression.
pub fn eval(expr: &str) -> Result<f64, ExprError> {
    let tokens = tokenize(expr)?;
    let mut parser = Parser { tokens, pos: 0 };

    let value = parser.expr()?;

    // The whole input must be consumed, a partial parse indicates a
    // malformed expression
    if parser.pos != parser.tokens.len() {
        return Err(ExprError::TrailingInput);
    }

    Ok(value)
}

/// Evaluate a comma-separated list of expressions with a fixed entry count.
pub fn eval_list(list: &str, expected_len: usize) -> Result<Vec<f64>, ExprError> {
    let entries: Vec<&str> = list.split(',').collect();

    if entries.len() != expected_len {
        return Err(ExprError::WrongEntryCount {
            expected: expected_len,
            found: entries.len(),
        });
    }

    entries.iter().map(|e| eval(e)).collect()
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Split an expression string into tokens.
fn tokenize(expr: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '0'..='9' | '.' => {
                let mut num = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        num.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value: f64 = num
                    .parse()
                    .map_err(|_| ExprError::InvalidNumber(num.clone()))?;
                tokens.push(Token::Num(value));
            }
            c if c.is_ascii_alphabetic() => {
                let mut ident = String::new();
                while let Some(&a) = chars.peek() {
                    if a.is_ascii_alphabetic() {
                        ident.push(a);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if ident == "pi" {
                    tokens.push(Token::Num(PI));
                } else {
                    return Err(ExprError::UnknownIdentifier(ident));
                }
            }
            c => return Err(ExprError::UnexpectedChar(c)),
        }
    }

    Ok(tokens)
}

/// Recursive-descent parser over the token stream.
///
/// Grammar:
/// ```text
/// expr   := term (('+' | '-') term)*
/// term   := factor (('*' | '/') factor)*
/// factor := '-' factor | '(' expr ')' | number
/// ```
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Result<Token, ExprError> {
        let token = self.peek().ok_or(ExprError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(token)
    }

    fn expr(&mut self) -> Result<f64, ExprError> {
        let mut value = self.term()?;

        while let Some(op) = self.peek() {
            match op {
                Token::Plus => {
                    self.pos += 1;
                    value += self.term()?;
                }
                Token::Minus => {
                    self.pos += 1;
                    value -= self.term()?;
                }
                _ => break,
            }
        }

        Ok(value)
    }

    fn term(&mut self) -> Result<f64, ExprError> {
        let mut value = self.factor()?;

        while let Some(op) = self.peek() {
            match op {
                Token::Star => {
                    self.pos += 1;
                    value *= self.factor()?;
                }
                Token::Slash => {
                    self.pos += 1;
                    value /= self.factor()?;
                }
                _ => break,
            }
        }

        Ok(value)
    }

    fn factor(&mut self) -> Result<f64, ExprError> {
        match self.next()? {
            Token::Minus => Ok(-self.factor()?),
            Token::Num(n) => Ok(n),
            Token::LParen => {
                let value = self.expr()?;
                match self.next()? {
                    Token::RParen => Ok(value),
                    _ => Err(ExprError::TrailingInput),
                }
            }
            _ => Err(ExprError::UnexpectedEnd),
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_literals() {
        assert_eq!(eval("0"), Ok(0.0));
        assert_eq!(eval("0.11235"), Ok(0.11235));
        assert_eq!(eval(" 42 "), Ok(42.0));
        assert_eq!(eval("-0.5"), Ok(-0.5));
    }

    #[test]
    fn test_pi_arithmetic() {
        assert_eq!(eval("pi"), Ok(PI));
        assert_eq!(eval("pi/2"), Ok(PI / 2.0));
        assert_eq!(eval("-pi / 2"), Ok(-PI / 2.0));
        assert_eq!(eval("2*pi"), Ok(2.0 * PI));
        assert_eq!(eval("pi - pi"), Ok(0.0));
    }

    #[test]
    fn test_precedence_and_parens() {
        assert_eq!(eval("1 + 2 * 3"), Ok(7.0));
        assert_eq!(eval("(1 + 2) * 3"), Ok(9.0));
        assert_eq!(eval("-(1 + 2)"), Ok(-3.0));
        assert_eq!(eval("1 - 2 - 3"), Ok(-4.0));
    }

    #[test]
    fn test_rejects_junk() {
        assert!(eval("").is_err());
        assert!(eval("pie").is_err());
        assert!(eval("1; import os").is_err());
        assert!(eval("1 +").is_err());
        assert!(eval("(1").is_err());
        assert!(eval("1 2").is_err());
        assert!(eval("__import__").is_err());
    }

    #[test]
    fn test_eval_list() {
        let d = eval_list("0.1519, 0, 0, 0.11235, 0.08535, 0.0819", 6).unwrap();
        assert_eq!(d.len(), 6);
        assert_eq!(d[0], 0.1519);
        assert_eq!(d[3], 0.11235);

        let alpha = eval_list("pi/2, 0, 0, pi/2, -pi/2, 0", 6).unwrap();
        assert_eq!(alpha[0], PI / 2.0);
        assert_eq!(alpha[4], -PI / 2.0);

        // Wrong entry counts are rejected
        assert_eq!(
            eval_list("1, 2, 3", 6),
            Err(ExprError::WrongEntryCount {
                expected: 6,
                found: 3
            })
        );

        // A single bad entry poisons the whole list
        assert!(eval_list("1, 2, x, 4, 5, 6", 6).is_err());
    }
}
