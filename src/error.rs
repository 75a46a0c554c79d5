use std::fmt;

use thiserror::Error;

use crate::token::TokenKind;

/// 1-based line and column of a byte offset in the source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn locate(source: &str, offset: usize) -> Self {
        let before = &source[..offset.min(source.len())];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count() + 1;
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{position}: expected {expected}, found {found}")]
    UnexpectedToken {
        expected: TokenKind,
        found: TokenKind,
        position: Position,
    },
    #[error("{position}: no expression can start with {found}")]
    NoPrefixRule { found: TokenKind, position: Position },
    #[error("{position}: can't have more than 255 parameters")]
    TooManyParameters { position: Position },
    #[error("{position}: can't have more than 255 arguments")]
    TooManyArguments { position: Position },
    #[error("{position}: expression nested deeper than {limit} levels")]
    NestingTooDeep { limit: usize, position: Position },
    #[error("{position}: unterminated string literal")]
    UnterminatedString { position: Position },
    #[error("{position}: illegal character `{found}`")]
    IllegalCharacter { found: String, position: Position },
}

impl ParseError {
    pub fn position(&self) -> Position {
        match self {
            Self::UnexpectedToken { position, .. }
            | Self::NoPrefixRule { position, .. }
            | Self::TooManyParameters { position }
            | Self::TooManyArguments { position }
            | Self::NestingTooDeep { position, .. }
            | Self::UnterminatedString { position }
            | Self::IllegalCharacter { position, .. } => *position,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{}", render_parse_errors(.0))]
    Parse(Vec<ParseError>),
}

fn render_parse_errors(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| format!("PARSE ERROR: {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate() {
        let source = "let a = 1;\nlet b = @;\n";
        let tests = vec![
            (0, Position { line: 1, column: 1 }),
            (4, Position { line: 1, column: 5 }),
            (11, Position { line: 2, column: 1 }),
            (19, Position { line: 2, column: 9 }),
            (100, Position { line: 3, column: 1 }),
        ];

        for i in 0..tests.len() {
            assert_eq!(Position::locate(source, tests[i].0), tests[i].1);
        }
    }

    #[test]
    fn test_error_display() {
        let error = Error::Parse(vec![
            ParseError::UnexpectedToken {
                expected: TokenKind::Rparen,
                found: TokenKind::Eof,
                position: Position { line: 1, column: 7 },
            },
            ParseError::TooManyArguments {
                position: Position { line: 2, column: 3 },
            },
            ParseError::NestingTooDeep {
                limit: 128,
                position: Position { line: 3, column: 130 },
            },
        ]);

        assert_eq!(
            error.to_string(),
            "PARSE ERROR: 1:7: expected `)`, found end of input\n\
             PARSE ERROR: 2:3: can't have more than 255 arguments\n\
             PARSE ERROR: 3:130: expression nested deeper than 128 levels"
        );
    }
}
