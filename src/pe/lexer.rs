//! Lexer for PE notation.
//!
//! Splits source text into positioned tokens: identifiers and the
//! single-character specials `_ , . { } -`. Whitespace separates and is
//! discarded. A parenthesized pitch suffix like `note(-3.5)` is absorbed
//! verbatim into its identifier: while the paren counter is non-zero the
//! separator and special-character rules are suspended.

use super::error::CompileError;
use super::token::{Position, Token};

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    parens: i32,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 0,
            col: 0,
            parens: 0,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, CompileError> {
        let mut tokens = Vec::new();
        let mut current = String::new();
        let mut start = Position::new(0, 0);

        while !self.is_at_end() {
            let ch = self.peek();
            if ch == '(' {
                self.parens += 1;
            } else if ch == ')' {
                self.parens -= 1;
            }

            if self.parens == 0 && ch.is_whitespace() {
                flush(&mut tokens, &mut current, start);
            } else if self.parens == 0 && is_special(ch) {
                flush(&mut tokens, &mut current, start);
                tokens.push(Token {
                    text: ch.to_string(),
                    position: self.position(),
                });
            } else if !current.is_empty() || is_identifier_start(ch) {
                if current.is_empty() {
                    start = self.position();
                }
                current.push(ch);
            } else {
                return Err(CompileError::lex(
                    format!("invalid character: '{ch}'"),
                    self.position(),
                ));
            }

            self.advance();
        }
        flush(&mut tokens, &mut current, start);

        Ok(tokens)
    }

    fn peek(&self) -> char {
        self.chars[self.pos]
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.col)
    }

    fn advance(&mut self) {
        let ch = self.chars[self.pos];
        self.pos += 1;
        // Line accounting belongs to the separator rule, so a newline
        // inside a paren literal counts as an ordinary character.
        if ch == '\n' && self.parens == 0 {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
    }
}

fn flush(tokens: &mut Vec<Token>, current: &mut String, start: Position) {
    if !current.is_empty() {
        tokens.push(Token {
            text: std::mem::take(current),
            position: start,
        });
    }
}

fn is_special(ch: char) -> bool {
    matches!(ch, '_' | ',' | '.' | '{' | '}' | '-')
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '/'
}
