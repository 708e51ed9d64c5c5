use std::{fmt, io};

use thiserror::Error;

use crate::token::Token;

/// Pipeline stage that rejected the program before it ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Scan,
    Parse,
    Resolve,
}

/// The `<where>` part of a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    None,
    AtEnd,
    AtLexeme(String),
}

impl Location {
    pub fn of(token: &Token) -> Location {
        if token.is_eof() {
            Location::AtEnd
        } else {
            Location::AtLexeme(token.lexeme.clone())
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::None => Ok(()),
            Location::AtEnd => write!(f, " at end"),
            Location::AtLexeme(lexeme) => write!(f, " at '{}'", lexeme),
        }
    }
}

/// Error raised by the scanner, parser or resolver.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("[line {line}] Error{location}: {message}")]
pub struct StaticError {
    pub stage: Stage,
    pub line: usize,
    pub location: Location,
    pub message: String,
}

impl StaticError {
    pub fn scan(line: usize, message: impl Into<String>) -> StaticError {
        StaticError {
            stage: Stage::Scan,
            line,
            location: Location::None,
            message: message.into(),
        }
    }

    pub fn parse(token: &Token, message: impl Into<String>) -> StaticError {
        StaticError::at_token(Stage::Parse, token, message)
    }

    pub fn resolve(token: &Token, message: impl Into<String>) -> StaticError {
        StaticError::at_token(Stage::Resolve, token, message)
    }

    fn at_token(stage: Stage, token: &Token, message: impl Into<String>) -> StaticError {
        StaticError {
            stage,
            line: token.line,
            location: Location::of(token),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeErrorKind {
    #[error("Undefined variable '{0}'.")]
    UndefinedVariable(String),
    #[error("Operand must be a number.")]
    OperandMustBeNumber,
    #[error("Operands must be numbers.")]
    OperandsMustBeNumbers,
    #[error("Operands must be two numbers or two strings.")]
    OperandsMustBeNumbersOrStrings,
    #[error("Can only call functions and classes.")]
    NotCallable,
    #[error("Expected {expected} arguments but got {got}.")]
    ArityMismatch { expected: usize, got: usize },
}

/// Error raised while executing a resolved program.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}\n[line {line}]")]
pub struct RuntimeError {
    pub line: usize,
    pub lexeme: String,
    pub kind: RuntimeErrorKind,
}

impl RuntimeError {
    pub fn new(token: &Token, kind: RuntimeErrorKind) -> RuntimeError {
        RuntimeError {
            line: token.line,
            lexeme: token.lexeme.clone(),
            kind,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoxError {
    #[error(transparent)]
    Static(#[from] StaticError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    /// The running program asked for the process to end.
    #[error("exit requested with status {0}")]
    Exit(i32),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl LoxError {
    /// sysexits-style status for the command line driver.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoxError::Static(_) => 65,
            LoxError::Runtime(_) => 70,
            LoxError::Exit(code) => *code,
            LoxError::Io(_) => 74,
        }
    }

    pub fn as_static(&self) -> Option<&StaticError> {
        match self {
            LoxError::Static(error) => Some(error),
            _ => None,
        }
    }

    pub fn as_runtime(&self) -> Option<&RuntimeError> {
        match self {
            LoxError::Runtime(error) => Some(error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::token::TokenType;

    #[test]
    fn scan_errors_have_no_location() {
        let error = StaticError::scan(3, "Unexpected character.");
        assert_eq!(error.to_string(), "[line 3] Error: Unexpected character.");
    }

    #[test]
    fn parse_errors_name_the_lexeme() {
        let token = Token::new(TokenType::Equal, "=", 7);
        let error = StaticError::parse(&token, "Invalid assignment target.");
        assert_eq!(
            error.to_string(),
            "[line 7] Error at '=': Invalid assignment target."
        );
    }

    #[test]
    fn errors_at_eof_say_at_end() {
        let token = Token::new(TokenType::Eof, "", 2);
        let error = StaticError::parse(&token, "Expect expression.");
        assert_eq!(error.to_string(), "[line 2] Error at end: Expect expression.");
    }

    #[test]
    fn runtime_error_display() {
        let token = Token::new(TokenType::Identifier, "x", 4);
        let error = RuntimeError::new(
            &token,
            RuntimeErrorKind::UndefinedVariable("x".to_string()),
        );
        assert_eq!(error.to_string(), "Undefined variable 'x'.\n[line 4]");
    }

    #[test]
    fn exit_codes_follow_sysexits() {
        let token = Token::new(TokenType::Plus, "+", 1);
        assert_eq!(
            LoxError::from(StaticError::scan(1, "Unterminated string.")).exit_code(),
            65
        );
        assert_eq!(
            LoxError::from(RuntimeError::new(
                &token,
                RuntimeErrorKind::OperandsMustBeNumbers
            ))
            .exit_code(),
            70
        );
        assert_eq!(LoxError::Exit(0).exit_code(), 0);
    }
}
