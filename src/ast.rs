use std::fmt;
use std::rc::Rc;

use crate::token::{Span, TokenKind};

/// Upper bound on both function parameters and call arguments.
pub const MAX_ARGS: usize = 255;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Statement {
    Let(Identifier, Expression),
    Return(Expression),
    ExpressionStmt(Expression),
}

/// Statements in execution order. Used for both programs and function bodies.
pub type Block = Vec<Statement>;

pub type Program = Block;

/// A name in the source. The text is recovered from the span on demand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Identifier {
    pub span: Span,
}

impl Identifier {
    pub fn new(span: Span) -> Self {
        Self { span }
    }

    pub fn name<'a>(&self, source: &'a str) -> &'a str {
        self.span.slice(source)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expression {
    Ident(Identifier),
    IntLiteral(Span),
    Boolean(bool),
    StringLiteral(Span),
    Null,
    PrefixExpr(Prefix, Box<Expression>),
    InfixExpr(Infix, Box<Expression>, Box<Expression>),
    IfExpr(Box<Expression>, Block, Option<Block>),
    // Shared with every closure created from it
    FnLiteral(Rc<FunctionLiteral>),
    Call(Box<Expression>, Vec<Expression>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionLiteral {
    pub parameters: Vec<Identifier>,
    pub body: Block,
}

impl FunctionLiteral {
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Prefix {
    Minus,
    Bang,
}

impl Prefix {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Minus => Some(Self::Minus),
            TokenKind::Bang => Some(Self::Bang),
            _ => None,
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minus => f.write_str("-"),
            Self::Bang => f.write_str("!"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Infix {
    Eq,
    Neq,
    Lt,
    Gt,
    Plus,
    Minus,
    Slash,
    Asterisk,
}

impl Infix {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Eq => Some(Self::Eq),
            TokenKind::Neq => Some(Self::Neq),
            TokenKind::Lt => Some(Self::Lt),
            TokenKind::Gt => Some(Self::Gt),
            TokenKind::Plus => Some(Self::Plus),
            TokenKind::Minus => Some(Self::Minus),
            TokenKind::Slash => Some(Self::Slash),
            TokenKind::Asterisk => Some(Self::Asterisk),
            _ => None,
        }
    }
}

impl fmt::Display for Infix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            Self::Eq => "==",
            Self::Neq => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Slash => "/",
            Self::Asterisk => "*",
        };
        f.write_str(op)
    }
}
