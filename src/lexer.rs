use crate::token::{self, Span, Token, TokenKind};

/// Scanner over a borrowed source buffer. Tokens carry spans only, so no text
/// is copied while lexing.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    input: &'a str,
    position: usize,      // current position in input (point to current char)
    read_position: usize, // current reading position in input (after current char)
    ch: Option<char>,     // current char under examination
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut l = Lexer {
            input,
            position: 0,
            read_position: 0,
            ch: None,
            finished: false,
        };

        l.read_char();
        l
    }

    pub fn input(&self) -> &'a str {
        self.input
    }

    fn read_char(&mut self) {
        self.position = self.read_position;
        self.ch = self
            .input
            .get(self.read_position..)
            .and_then(|rest| rest.chars().next());
        self.read_position += self.ch.map_or(0, char::len_utf8);
    }

    fn peek_char(&self) -> Option<char> {
        self.input
            .get(self.read_position..)
            .and_then(|rest| rest.chars().next())
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let start = self.position;
        let kind = match self.ch {
            Some('=') => {
                if self.peek_char() == Some('=') {
                    self.read_char();
                    TokenKind::Eq
                } else {
                    TokenKind::Assign
                }
            }
            Some('!') => {
                if self.peek_char() == Some('=') {
                    self.read_char();
                    TokenKind::Neq
                } else {
                    TokenKind::Bang
                }
            }
            Some(';') => TokenKind::Semicolon,
            Some('(') => TokenKind::Lparen,
            Some(')') => TokenKind::Rparen,
            Some(',') => TokenKind::Comma,
            Some('+') => TokenKind::Plus,
            Some('{') => TokenKind::Lbrace,
            Some('}') => TokenKind::Rbrace,
            Some('-') => TokenKind::Minus,
            Some('*') => TokenKind::Asterisk,
            Some('/') => TokenKind::Slash,
            Some('<') => TokenKind::Lt,
            Some('>') => TokenKind::Gt,
            Some('"') => return self.read_string(),
            None => return Token::new(TokenKind::Eof, Span::new(start, start)),
            Some(c) if is_letter(c) => {
                let span = self.read_identifier();
                return Token::new(token::lookup_ident(span.slice(self.input)), span);
            }
            Some(c) if c.is_ascii_digit() => {
                return Token::new(TokenKind::Int, self.read_number());
            }
            Some(_) => TokenKind::Illegal,
        };

        self.read_char();
        Token::new(kind, Span::new(start, self.position))
    }

    fn read_identifier(&mut self) -> Span {
        let position = self.position;
        while self.ch.is_some_and(|c| is_letter(c) || c.is_ascii_digit()) {
            self.read_char();
        }
        Span::new(position, self.position)
    }

    fn read_number(&mut self) -> Span {
        let position = self.position;
        while self.ch.is_some_and(|c| c.is_ascii_digit()) {
            self.read_char();
        }
        Span::new(position, self.position)
    }

    // The literal span excludes both quotes.
    fn read_string(&mut self) -> Token {
        let quote = self.position;
        self.read_char();
        let position = self.position;

        loop {
            match self.ch {
                Some('"') => {
                    let span = Span::new(position, self.position);
                    self.read_char();
                    return Token::new(TokenKind::String, span);
                }
                None => {
                    return Token::new(
                        TokenKind::UnterminatedString,
                        Span::new(quote, self.position),
                    )
                }
                Some(_) => self.read_char(),
            }
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.ch, Some(' ' | '\t' | '\n' | '\r')) {
            self.read_char()
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    /// Yields every token up to and including the end-of-file token.
    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            self.finished = true;
        }
        Some(token)
    }
}

fn is_letter(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}
