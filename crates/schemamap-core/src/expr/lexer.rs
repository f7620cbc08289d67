//! Tokenizer for slot expressions
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

use crate::error::{Error, Result};
use std::iter::Peekable;
use std::str::Chars;

/// Token kinds produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Int(i64),
    Float(f64),
    Str(String),
    Name(String),
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Assign,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    Newline,
    Eof,
}

/// A token and the character offset where it starts
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

/// Character-level scanner
pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<Chars<'a>>,
    position: usize,
    /// Bracket nesting; newlines inside brackets are insignificant
    depth: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.chars().peekable(),
            position: 0,
            depth: 0,
        }
    }

    /// Scan the whole input
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            // collapse blank lines
            let duplicate_newline = token.kind == TokenKind::Newline
                && matches!(
                    tokens.last(),
                    None | Some(Token {
                        kind: TokenKind::Newline,
                        ..
                    })
                );
            if !duplicate_newline {
                tokens.push(token);
            }
            if done {
                return Ok(tokens);
            }
        }
    }

    fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace_and_comments();
        let start = self.position;
        let token = |kind| Token {
            kind,
            position: start,
        };

        let Some(ch) = self.advance() else {
            return Ok(token(TokenKind::Eof));
        };

        let kind = match ch {
            '\n' => TokenKind::Newline,
            '0'..='9' => self.scan_number(ch)?,
            '.' if matches!(self.peek(), Some(c) if c.is_ascii_digit()) => self.scan_number(ch)?,
            '\'' | '"' => TokenKind::Str(self.scan_string(ch, start)?),
            c if c.is_alphabetic() || c == '_' => TokenKind::Name(self.scan_identifier(c)),
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => {
                if self.eat('*') {
                    TokenKind::DoubleStar
                } else {
                    TokenKind::Star
                }
            }
            '/' => {
                if self.eat('/') {
                    TokenKind::DoubleSlash
                } else {
                    TokenKind::Slash
                }
            }
            '%' => TokenKind::Percent,
            '=' => {
                if self.eat('=') {
                    TokenKind::EqEq
                } else {
                    TokenKind::Assign
                }
            }
            '!' => {
                if self.eat('=') {
                    TokenKind::NotEq
                } else {
                    return Err(self.error("expected '=' after '!'", start));
                }
            }
            '<' => {
                if self.eat('=') {
                    TokenKind::LtE
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.eat('=') {
                    TokenKind::GtE
                } else {
                    TokenKind::Gt
                }
            }
            '(' => self.open(TokenKind::LParen),
            '[' => self.open(TokenKind::LBracket),
            '{' => self.open(TokenKind::LBrace),
            ')' => self.close(TokenKind::RParen),
            ']' => self.close(TokenKind::RBracket),
            '}' => self.close(TokenKind::RBrace),
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '.' => TokenKind::Dot,
            other => {
                return Err(self.error(&format!("unexpected character '{}'", other), start));
            }
        };
        Ok(token(kind))
    }

    fn open(&mut self, kind: TokenKind) -> TokenKind {
        self.depth += 1;
        kind
    }

    fn close(&mut self, kind: TokenKind) -> TokenKind {
        self.depth = self.depth.saturating_sub(1);
        kind
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(ch) = self.peek() {
            match ch {
                '\n' if self.depth == 0 => break,
                '#' => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                '\\' => {
                    // explicit line continuation
                    self.advance();
                    if self.peek() == Some('\n') {
                        self.advance();
                    }
                }
                c if c.is_whitespace() => {
                    self.advance();
                }
                _ => break,
            }
        }
    }

    fn scan_number(&mut self, first: char) -> Result<TokenKind> {
        let start = self.position - 1;
        let mut text = String::from(first);
        let mut is_float = first == '.';

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '_' {
                if c != '_' {
                    text.push(c);
                }
                self.advance();
            } else if c == '.' && !is_float {
                is_float = true;
                text.push(c);
                self.advance();
            } else if (c == 'e' || c == 'E') && !text.contains(['e', 'E']) {
                is_float = true;
                text.push(c);
                self.advance();
                if let Some(sign @ ('+' | '-')) = self.peek() {
                    text.push(sign);
                    self.advance();
                }
            } else {
                break;
            }
        }

        if is_float {
            text.parse::<f64>()
                .map(TokenKind::Float)
                .map_err(|_| self.error(&format!("invalid number '{}'", text), start))
        } else {
            text.parse::<i64>()
                .map(TokenKind::Int)
                .map_err(|_| self.error(&format!("integer literal '{}' out of range", text), start))
        }
    }

    fn scan_string(&mut self, quote: char, start: usize) -> Result<String> {
        let mut value = String::new();
        loop {
            match self.advance() {
                None => return Err(self.error("unterminated string literal", start)),
                Some(c) if c == quote => return Ok(value),
                Some('\\') => match self.advance() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some('0') => value.push('\0'),
                    Some(c) => value.push(c),
                    None => return Err(self.error("unterminated string literal", start)),
                },
                Some(c) => value.push(c),
            }
        }
    }

    fn scan_identifier(&mut self, first: char) -> String {
        let mut name = String::from(first);
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }
        name
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.next();
        if ch.is_some() {
            self.position += 1;
        }
        ch
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, message: &str, position: usize) -> Error {
        Error::expression(self.input, format!("{} at position {}", message, position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_operators_and_literals() {
        assert_eq!(
            kinds("{x} ** 2 // 3 != 'a'"),
            vec![
                TokenKind::LBrace,
                TokenKind::Name("x".into()),
                TokenKind::RBrace,
                TokenKind::DoubleStar,
                TokenKind::Int(2),
                TokenKind::DoubleSlash,
                TokenKind::Int(3),
                TokenKind::NotEq,
                TokenKind::Str("a".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_newlines_inside_brackets_ignored() {
        let tokens = kinds("x = [1,\n 2.5]\ntarget = x");
        let newlines = tokens.iter().filter(|k| **k == TokenKind::Newline).count();
        assert_eq!(newlines, 1);
        assert!(tokens.contains(&TokenKind::Float(2.5)));
    }

    #[test]
    fn test_unterminated_string() {
        assert!(Lexer::new("'abc").tokenize().is_err());
    }
}
