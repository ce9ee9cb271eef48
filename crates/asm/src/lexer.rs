// ThumbLab - Thumb-2 Teaching Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Line lexer. Each source line is tokenized on its own; statements never span lines.

use crate::error::SyntaxError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Mnemonic, register, label or directive (leading `.`).
    Ident(String),
    /// Unsigned literal, saturated at `u64::MAX`.
    Number(u64),
    /// String literal with escapes resolved, quotes removed.
    Str(String),
    Comma,
    Colon,
    Hash,
    Minus,
    Equals,
    Bang,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
}

/// A token with its 1-based column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedToken {
    pub token: Token,
    pub column: usize,
}

pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str, line: usize) -> Self {
        Self {
            chars: text.char_indices().peekable(),
            line,
        }
    }

    fn error(&self, column: usize, message: impl std::fmt::Display) -> SyntaxError {
        SyntaxError::new(self.line, format!("column {}: {}", column, message))
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn next_char(&mut self) -> Option<char> {
        self.chars.next().map(|(_, c)| c)
    }

    pub fn tokenize(mut self) -> Result<Vec<LocatedToken>, SyntaxError> {
        let mut tokens = Vec::new();

        while let Some(&(pos, c)) = self.chars.peek() {
            let column = pos + 1;
            let token = match c {
                ' ' | '\t' | '\r' => {
                    self.next_char();
                    continue;
                }
                ';' | '@' => break,
                '/' => {
                    self.next_char();
                    if self.peek_char() == Some('/') {
                        break;
                    }
                    return Err(self.error(column, "unexpected '/'"));
                }
                ',' => self.single(Token::Comma),
                ':' => self.single(Token::Colon),
                '#' => self.single(Token::Hash),
                '-' => self.single(Token::Minus),
                '=' => self.single(Token::Equals),
                '!' => self.single(Token::Bang),
                '[' => self.single(Token::LBracket),
                ']' => self.single(Token::RBracket),
                '{' => self.single(Token::LBrace),
                '}' => self.single(Token::RBrace),
                '"' => {
                    self.next_char();
                    Token::Str(self.read_string(column)?)
                }
                '0'..='9' => Token::Number(self.read_number(column)?),
                c if c.is_ascii_alphabetic() || c == '_' || c == '.' => {
                    Token::Ident(self.read_ident())
                }
                other => return Err(self.error(column, format!("unexpected character '{}'", other))),
            };
            tokens.push(LocatedToken { token, column });
        }

        Ok(tokens)
    }

    fn single(&mut self, token: Token) -> Token {
        self.next_char();
        token
    }

    fn read_ident(&mut self) -> String {
        let mut s = String::new();
        while let Some(c) = self.peek_char() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                s.push(c);
                self.next_char();
            } else {
                break;
            }
        }
        s
    }

    /// Decimal or `0x` hexadecimal. Too-large literals saturate so range
    /// checks still see them as out of range.
    fn read_number(&mut self, column: usize) -> Result<u64, SyntaxError> {
        let mut radix = 10;
        let mut digits = String::new();

        if self.peek_char() == Some('0') {
            self.next_char();
            if matches!(self.peek_char(), Some('x') | Some('X')) {
                self.next_char();
                radix = 16;
            } else {
                digits.push('0');
            }
        }

        while let Some(c) = self.peek_char() {
            if c.is_digit(radix) {
                digits.push(c);
                self.next_char();
            } else if c.is_ascii_alphanumeric() || c == '_' {
                return Err(self.error(column, format!("malformed number near '{}'", c)));
            } else {
                break;
            }
        }

        if digits.is_empty() {
            return Err(self.error(column, "hexadecimal literal without digits"));
        }

        Ok(digits.chars().fold(0u64, |acc, c| {
            let d = c.to_digit(radix).unwrap_or(0) as u64;
            acc.saturating_mul(radix as u64).saturating_add(d)
        }))
    }

    fn read_string(&mut self, column: usize) -> Result<String, SyntaxError> {
        let mut s = String::new();
        loop {
            match self.next_char() {
                None => return Err(self.error(column, "unterminated string literal")),
                Some('"') => return Ok(s),
                Some('\\') => {
                    let escaped = match self.next_char() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('0') => '\0',
                        Some('\\') => '\\',
                        Some('"') => '"',
                        Some(other) => {
                            return Err(self.error(column, format!("unknown escape '\\{}'", other)))
                        }
                        None => return Err(self.error(column, "unterminated string literal")),
                    };
                    s.push(escaped);
                }
                Some(c) => s.push(c),
            }
        }
    }
}
