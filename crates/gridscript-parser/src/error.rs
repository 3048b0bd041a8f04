//! Parse error type

use thiserror::Error;

/// Errors raised while reducing a token sequence to a command.
///
/// Ambiguity is not an error: a reduction that dead-ends simply yields no
/// command and the parser moves on to the next branch. These errors are
/// raised only for sequences that can never parse under any branch.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("missing closing parenthesis")]
    UnclosedParenthesis,

    #[error("missing closing bracket")]
    UnclosedBracket,

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("list entries must reduce to a value")]
    InvalidListValue,

    #[error("not a recognized command: {0}")]
    UnrecognizedCommand(String),

    #[error("cannot parse an empty command")]
    EmptyCommand,
}

/// Result type for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;
