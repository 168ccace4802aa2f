//! Hand-written lexer for Quill source text.
//!
//! Whitespace and comments are stripped; the parser sees a flat token
//! stream. Literal tokens carry their decoded values, and lexical errors
//! (bad characters, unterminated literals, numeric overflow) become
//! diagnostics while lexing continues.

use quill_ast::Span;
use quill_diag::DiagnosticBag;

use crate::facts;
use crate::token::{Token, TokenKind};

/// Lex source text into tokens. The last token is always [`TokenKind::Eof`].
pub fn lex(source: &str) -> (Vec<Token>, DiagnosticBag) {
    let mut lexer = Lexer {
        source,
        pos: 0,
        tokens: Vec::new(),
        bag: DiagnosticBag::new(),
    };
    lexer.scan_all();
    (lexer.tokens, lexer.bag)
}

struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    tokens: Vec<Token>,
    bag: DiagnosticBag,
}

impl Lexer<'_> {
    fn scan_all(&mut self) {
        while self.pos < self.source.len() {
            self.scan_token();
        }
        let end = self.source.len() as u32;
        self.tokens.push(Token::new(TokenKind::Eof, Span::empty(end)));
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.source[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        let span = Span::new(start as u32, self.pos as u32);
        self.tokens.push(Token::new(kind, span));
    }

    fn scan_token(&mut self) {
        let start = self.pos;
        let Some(c) = self.bump() else {
            return;
        };

        match c {
            c if c.is_whitespace() => {}

            '/' if self.eat('/') => {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
            }
            '/' if self.eat('*') => {
                // Block comment; consumes to `*/` or end of input.
                while self.pos < self.source.len() {
                    if self.eat('*') {
                        if self.eat('/') {
                            break;
                        }
                    } else {
                        self.bump();
                    }
                }
            }

            '0'..='9' => self.scan_number(start),
            '"' => self.scan_string(start),
            '\'' => self.scan_char(start),
            c if c.is_alphabetic() || c == '_' => self.scan_identifier(start),

            '+' => {
                let kind = if self.eat('+') {
                    TokenKind::PlusPlus
                } else if self.eat('=') {
                    TokenKind::PlusEq
                } else {
                    TokenKind::Plus
                };
                self.push(kind, start);
            }
            '-' => {
                let kind = if self.eat('-') {
                    TokenKind::MinusMinus
                } else if self.eat('=') {
                    TokenKind::MinusEq
                } else if self.eat('>') {
                    TokenKind::Arrow
                } else {
                    TokenKind::Minus
                };
                self.push(kind, start);
            }
            '*' => {
                let kind = if self.eat('=') {
                    TokenKind::StarEq
                } else {
                    TokenKind::Star
                };
                self.push(kind, start);
            }
            '/' => {
                let kind = if self.eat('=') {
                    TokenKind::SlashEq
                } else {
                    TokenKind::Slash
                };
                self.push(kind, start);
            }
            '%' => self.push(TokenKind::Percent, start),
            '!' => {
                let kind = if self.eat('=') {
                    TokenKind::BangEq
                } else {
                    TokenKind::Bang
                };
                self.push(kind, start);
            }
            '~' => self.push(TokenKind::Tilde, start),
            '^' => self.push(TokenKind::Caret, start),
            '=' => {
                let kind = if self.eat('=') {
                    TokenKind::EqEq
                } else if self.eat('>') {
                    TokenKind::FatArrow
                } else {
                    TokenKind::Eq
                };
                self.push(kind, start);
            }
            '&' => {
                let kind = if self.eat('&') {
                    TokenKind::AmpAmp
                } else if self.eat('=') {
                    TokenKind::AmpEq
                } else {
                    TokenKind::Amp
                };
                self.push(kind, start);
            }
            '|' => {
                let kind = if self.eat('|') {
                    TokenKind::PipePipe
                } else if self.eat('=') {
                    TokenKind::PipeEq
                } else if self.eat('>') {
                    TokenKind::PipeGt
                } else {
                    TokenKind::Pipe
                };
                self.push(kind, start);
            }
            '<' => {
                let kind = if self.eat('=') {
                    TokenKind::LtEq
                } else {
                    TokenKind::Lt
                };
                self.push(kind, start);
            }
            '>' => {
                let kind = if self.eat('=') {
                    TokenKind::GtEq
                } else {
                    TokenKind::Gt
                };
                self.push(kind, start);
            }
            '(' => self.push(TokenKind::LParen, start),
            ')' => self.push(TokenKind::RParen, start),
            '{' => self.push(TokenKind::LBrace, start),
            '}' => self.push(TokenKind::RBrace, start),
            '[' => self.push(TokenKind::LBracket, start),
            ']' => self.push(TokenKind::RBracket, start),
            ':' => self.push(TokenKind::Colon, start),
            ';' => self.push(TokenKind::Semicolon, start),
            ',' => self.push(TokenKind::Comma, start),
            '.' => self.push(TokenKind::Dot, start),

            c => self.bag.report_bad_character(start as u32, c),
        }
    }

    fn scan_number(&mut self, start: usize) {
        while matches!(self.peek(), Some('0'..='9')) {
            self.bump();
        }

        let mut is_float = false;
        if self.peek() == Some('.') && matches!(self.peek_second(), Some('0'..='9')) {
            is_float = true;
            self.bump();
            while matches!(self.peek(), Some('0'..='9')) {
                self.bump();
            }
        }
        let digits_end = self.pos;
        if self.eat('f') {
            is_float = true;
        }

        let span = Span::new(start as u32, self.pos as u32);
        let text = &self.source[start..self.pos];
        if is_float {
            // The trailing 'f' marker is not part of the numeric value.
            let digits = &self.source[start..digits_end];
            match digits.parse::<f64>() {
                Ok(value) => self.push(TokenKind::Float(value), start),
                Err(_) => {
                    self.bag.report_invalid_value(span, text, "float");
                    self.push(TokenKind::Float(0.0), start);
                }
            }
        } else {
            match text.parse::<i64>() {
                Ok(value) => self.push(TokenKind::Int(value), start),
                Err(_) => {
                    self.bag.report_invalid_value(span, text, "int");
                    self.push(TokenKind::Int(0), start);
                }
            }
        }
    }

    fn scan_escape(&mut self) -> char {
        match self.bump() {
            Some('n') => '\n',
            Some('t') => '\t',
            Some('r') => '\r',
            Some('0') => '\0',
            Some(c) => c,
            None => '\0',
        }
    }

    fn scan_string(&mut self, start: usize) {
        let mut value = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    let span = Span::new(start as u32, self.pos as u32);
                    self.bag.report_unterminated_string(span);
                    break;
                }
                Some('"') => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    value.push(self.scan_escape());
                }
                Some(c) => {
                    self.bump();
                    value.push(c);
                }
            }
        }
        self.push(TokenKind::Str(value), start);
    }

    fn scan_char(&mut self, start: usize) {
        let value = match self.peek() {
            None | Some('\n') => {
                let span = Span::new(start as u32, self.pos as u32);
                self.bag.report_unterminated_character_literal(span);
                self.push(TokenKind::Char('\0'), start);
                return;
            }
            Some('\'') => {
                self.bump();
                let span = Span::new(start as u32, self.pos as u32);
                self.bag.report_empty_character_literal(span);
                self.push(TokenKind::Char('\0'), start);
                return;
            }
            Some('\\') => {
                self.bump();
                self.scan_escape()
            }
            Some(c) => {
                self.bump();
                c
            }
        };
        if !self.eat('\'') {
            let span = Span::new(start as u32, self.pos as u32);
            self.bag.report_unterminated_character_literal(span);
        }
        self.push(TokenKind::Char(value), start);
    }

    fn scan_identifier(&mut self, start: usize) {
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.bump();
        }
        let text = &self.source[start..self.pos];
        let kind = facts::keyword(text).unwrap_or_else(|| TokenKind::Ident(text.to_string()));
        self.push(kind, start);
    }
}
