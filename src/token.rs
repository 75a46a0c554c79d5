use std::fmt;

/// Half-open byte range into the source buffer a token or node came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Text covered by this span. The caller must pass the buffer the span was
    /// produced from.
    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Illegal,
    Eof,

    // Identifiers + literals
    Ident,
    Int,
    String,
    // A string literal that ran into the end of input
    UnterminatedString,

    // Operators
    Assign,
    Plus,
    Minus,
    Bang,
    Asterisk,
    Slash,

    Lt,
    Gt,
    Eq,
    Neq,

    // Delimiters
    Comma,
    Semicolon,

    Lparen,
    Rparen,
    Lbrace,
    Rbrace,

    // Keywords
    Function,
    Let,
    True,
    False,
    Null,
    If,
    Else,
    Return,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Illegal => "illegal character",
            Self::Eof => "end of input",
            Self::Ident => "identifier",
            Self::Int => "integer",
            Self::String => "string",
            Self::UnterminatedString => "unterminated string",
            Self::Assign => "`=`",
            Self::Plus => "`+`",
            Self::Minus => "`-`",
            Self::Bang => "`!`",
            Self::Asterisk => "`*`",
            Self::Slash => "`/`",
            Self::Lt => "`<`",
            Self::Gt => "`>`",
            Self::Eq => "`==`",
            Self::Neq => "`!=`",
            Self::Comma => "`,`",
            Self::Semicolon => "`;`",
            Self::Lparen => "`(`",
            Self::Rparen => "`)`",
            Self::Lbrace => "`{`",
            Self::Rbrace => "`}`",
            Self::Function => "`fn`",
            Self::Let => "`let`",
            Self::True => "`true`",
            Self::False => "`false`",
            Self::Null => "`null`",
            Self::If => "`if`",
            Self::Else => "`else`",
            Self::Return => "`return`",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

pub fn lookup_ident(ident: &str) -> TokenKind {
    match ident {
        "fn" => TokenKind::Function,
        "let" => TokenKind::Let,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "null" => TokenKind::Null,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "return" => TokenKind::Return,
        _ => TokenKind::Ident,
    }
}
