use std::rc::Rc;

use crate::ast::{
    Block, Expression, FunctionLiteral, Identifier, Infix, Prefix, Program, Statement, MAX_ARGS,
};
use crate::config::DEFAULT_MAX_NESTING_DEPTH;
use crate::error::{ParseError, Position};
use crate::lexer::Lexer;
use crate::token::{Span, Token, TokenKind};

type Result<T> = std::result::Result<T, ParseError>;

/// Binding power of infix operators, weakest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Lowest,
    Equals,
    LessGreater,
    Sum,
    Product,
    Prefix,
    Call,
}

impl Precedence {
    pub fn of(kind: TokenKind) -> Self {
        match kind {
            TokenKind::Eq | TokenKind::Neq => Self::Equals,
            TokenKind::Lt | TokenKind::Gt => Self::LessGreater,
            TokenKind::Plus | TokenKind::Minus => Self::Sum,
            TokenKind::Asterisk | TokenKind::Slash => Self::Product,
            TokenKind::Lparen => Self::Call,
            _ => Self::Lowest,
        }
    }
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    curr_token: Token,
    peek_token: Token,
    errors: Vec<ParseError>,
    // Nesting of the expression being parsed, and its limit
    depth: usize,
    max_depth: usize,
    // Blocks opened but not yet closed, used to resynchronize after an error
    open_blocks: usize,
}

impl<'a> Parser<'a> {
    pub fn new(mut lexer: Lexer<'a>) -> Self {
        let curr_token = lexer.next_token();
        let peek_token = lexer.next_token();

        Parser {
            lexer,
            curr_token,
            peek_token,
            errors: vec![],
            depth: 0,
            max_depth: DEFAULT_MAX_NESTING_DEPTH,
            open_blocks: 0,
        }
    }

    /// Sets how deeply expressions may nest before parsing fails.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    fn next_token(&mut self) {
        self.curr_token = self.peek_token;
        self.peek_token = self.lexer.next_token();
    }

    fn curr_token_is(&self, kind: TokenKind) -> bool {
        self.curr_token.kind == kind
    }

    fn curr_precedence(&self) -> Precedence {
        Precedence::of(self.curr_token.kind)
    }

    fn position(&self, span: Span) -> Position {
        Position::locate(self.lexer.input(), span.start)
    }

    /// Errors recorded by [`Parser::parse_program`], in source order.
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ParseError> {
        self.errors
    }

    /// Parses every statement up to end of input. A statement that fails to
    /// parse is reported in [`Parser::errors`] and skipped up to the next `;`
    /// outside of any block it opened.
    pub fn parse_program(&mut self) -> Program {
        let mut program: Program = vec![];

        while !self.curr_token_is(TokenKind::Eof) {
            match self.parse_statement() {
                Ok(statement) => program.push(statement),
                Err(error) => {
                    self.errors.push(error);
                    self.synchronize();
                }
            }
        }
        program
    }

    fn synchronize(&mut self) {
        let mut open = self.open_blocks;
        self.open_blocks = 0;

        loop {
            match self.curr_token.kind {
                TokenKind::Eof => break,
                TokenKind::Semicolon if open == 0 => {
                    self.next_token();
                    break;
                }
                TokenKind::Lbrace => open += 1,
                TokenKind::Rbrace if open > 0 => {
                    open -= 1;
                    if open == 0 {
                        self.next_token();
                        match self.curr_token.kind {
                            TokenKind::Semicolon => {
                                self.next_token();
                                break;
                            }
                            TokenKind::Else => continue,
                            _ => break,
                        }
                    }
                }
                _ => {}
            }
            self.next_token();
        }
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        match self.curr_token.kind {
            TokenKind::Let => self.parse_let_statement(),
            TokenKind::Return => self.parse_return_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_let_statement(&mut self) -> Result<Statement> {
        self.next_token();

        let name = Identifier::new(self.expect(TokenKind::Ident)?);
        self.expect(TokenKind::Assign)?;
        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_semicolon();

        Ok(Statement::Let(name, value))
    }

    fn parse_return_statement(&mut self) -> Result<Statement> {
        self.next_token();

        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_semicolon();

        Ok(Statement::Return(value))
    }

    fn parse_expression_statement(&mut self) -> Result<Statement> {
        let expression = self.parse_expression(Precedence::Lowest)?;
        self.skip_semicolon();

        Ok(Statement::ExpressionStmt(expression))
    }

    fn skip_semicolon(&mut self) {
        if self.curr_token_is(TokenKind::Semicolon) {
            self.next_token();
        }
    }

    /// Consumes the current token if it has the given kind.
    fn expect(&mut self, kind: TokenKind) -> Result<Span> {
        if self.curr_token_is(kind) {
            let span = self.curr_token.span;
            self.next_token();
            Ok(span)
        } else {
            Err(self.unexpected(kind))
        }
    }

    fn unexpected(&self, expected: TokenKind) -> ParseError {
        let token = self.curr_token;
        let position = self.position(token.span);
        match token.kind {
            TokenKind::Illegal => ParseError::IllegalCharacter {
                found: token.span.slice(self.lexer.input()).to_string(),
                position,
            },
            TokenKind::UnterminatedString => ParseError::UnterminatedString { position },
            found => ParseError::UnexpectedToken {
                expected,
                found,
                position,
            },
        }
    }

    pub fn parse_expression(&mut self, precedence: Precedence) -> Result<Expression> {
        let outer = self.depth;
        let expression = self.parse_nested_expression(precedence);
        self.depth = outer;
        expression
    }

    // Every operand and every infix or call fold adds a level, so the depth
    // tracks how deep the resulting tree is.
    fn parse_nested_expression(&mut self, precedence: Precedence) -> Result<Expression> {
        self.descend()?;
        let mut left = self.parse_prefix()?;

        while !self.curr_token_is(TokenKind::Semicolon) && precedence < self.curr_precedence() {
            self.descend()?;
            left = match self.curr_token.kind {
                TokenKind::Lparen => self.parse_call_expression(left)?,
                kind => match Infix::from_token(kind) {
                    Some(op) => self.parse_infix_expression(op, left)?,
                    None => return Ok(left),
                },
            };
        }

        Ok(left)
    }

    fn descend(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ParseError::NestingTooDeep {
                limit: self.max_depth,
                position: self.position(self.curr_token.span),
            });
        }
        Ok(())
    }

    fn parse_prefix(&mut self) -> Result<Expression> {
        let token = self.curr_token;
        if let Some(op) = Prefix::from_token(token.kind) {
            return self.parse_prefix_expression(op);
        }

        let expression = match token.kind {
            TokenKind::Ident => Expression::Ident(Identifier::new(token.span)),
            TokenKind::Int => Expression::IntLiteral(token.span),
            TokenKind::String => Expression::StringLiteral(token.span),
            TokenKind::True => Expression::Boolean(true),
            TokenKind::False => Expression::Boolean(false),
            TokenKind::Null => Expression::Null,
            TokenKind::Lparen => return self.parse_grouped_expression(),
            TokenKind::If => return self.parse_if_expression(),
            TokenKind::Function => return self.parse_function_literal(),
            TokenKind::Illegal | TokenKind::UnterminatedString => {
                return Err(self.unexpected(TokenKind::Ident))
            }
            found => {
                return Err(ParseError::NoPrefixRule {
                    found,
                    position: self.position(token.span),
                })
            }
        };

        self.next_token();
        Ok(expression)
    }

    fn parse_prefix_expression(&mut self, op: Prefix) -> Result<Expression> {
        self.next_token();

        let right = self.parse_expression(Precedence::Prefix)?;
        Ok(Expression::PrefixExpr(op, Box::new(right)))
    }

    fn parse_infix_expression(&mut self, op: Infix, left: Expression) -> Result<Expression> {
        let precedence = self.curr_precedence();
        self.next_token();

        let right = self.parse_expression(precedence)?;
        Ok(Expression::InfixExpr(op, Box::new(left), Box::new(right)))
    }

    fn parse_grouped_expression(&mut self) -> Result<Expression> {
        self.next_token();

        let expression = self.parse_expression(Precedence::Lowest)?;
        self.expect(TokenKind::Rparen)?;

        Ok(expression)
    }

    fn parse_if_expression(&mut self) -> Result<Expression> {
        self.next_token();

        self.expect(TokenKind::Lparen)?;
        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect(TokenKind::Rparen)?;

        let consequence = self.parse_block()?;
        let alternative = if self.curr_token_is(TokenKind::Else) {
            self.next_token();
            Some(self.parse_block()?)
        } else {
            None
        };

        Ok(Expression::IfExpr(
            Box::new(condition),
            consequence,
            alternative,
        ))
    }

    fn parse_block(&mut self) -> Result<Block> {
        self.expect(TokenKind::Lbrace)?;
        self.open_blocks += 1;

        let mut block: Block = vec![];
        while !self.curr_token_is(TokenKind::Rbrace) && !self.curr_token_is(TokenKind::Eof) {
            block.push(self.parse_statement()?);
        }
        self.expect(TokenKind::Rbrace)?;
        self.open_blocks -= 1;

        Ok(block)
    }

    fn parse_function_literal(&mut self) -> Result<Expression> {
        self.next_token();

        self.expect(TokenKind::Lparen)?;
        let mut parameters = vec![];
        if !self.curr_token_is(TokenKind::Rparen) {
            loop {
                if parameters.len() == MAX_ARGS {
                    return Err(ParseError::TooManyParameters {
                        position: self.position(self.curr_token.span),
                    });
                }
                parameters.push(Identifier::new(self.expect(TokenKind::Ident)?));

                if !self.curr_token_is(TokenKind::Comma) {
                    break;
                }
                self.next_token();
            }
        }
        self.expect(TokenKind::Rparen)?;

        let body = self.parse_block()?;

        Ok(Expression::FnLiteral(Rc::new(FunctionLiteral {
            parameters,
            body,
        })))
    }

    fn parse_call_expression(&mut self, function: Expression) -> Result<Expression> {
        self.next_token();

        let mut arguments = vec![];
        if !self.curr_token_is(TokenKind::Rparen) {
            loop {
                if arguments.len() == MAX_ARGS {
                    return Err(ParseError::TooManyArguments {
                        position: self.position(self.curr_token.span),
                    });
                }
                arguments.push(self.parse_expression(Precedence::Lowest)?);

                if !self.curr_token_is(TokenKind::Comma) {
                    break;
                }
                self.next_token();
            }
        }
        self.expect(TokenKind::Rparen)?;

        Ok(Expression::Call(Box::new(function), arguments))
    }
}

/// Parses a whole source unit, failing with every recorded error.
pub fn parse(source: &str) -> std::result::Result<Program, Vec<ParseError>> {
    parse_with_max_depth(source, DEFAULT_MAX_NESTING_DEPTH)
}

pub fn parse_with_max_depth(
    source: &str,
    max_depth: usize,
) -> std::result::Result<Program, Vec<ParseError>> {
    let mut parser = Parser::new(Lexer::new(source)).with_max_depth(max_depth);
    let program = parser.parse_program();

    if parser.errors().is_empty() {
        Ok(program)
    } else {
        Err(parser.into_errors())
    }
}
