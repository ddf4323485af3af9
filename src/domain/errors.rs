use thiserror::Error;

/// Every way a formula can fail to produce a number.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Invalid cell reference: {0}")]
    InvalidReference(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Invalid character: '{0}'")]
    InvalidCharacter(char),

    #[error("Mismatched parentheses")]
    MismatchedParentheses,

    #[error("Syntax error")]
    SyntaxError,

    #[error("Bad expression")]
    BadExpression,

    #[error("Missing ')' in call to {0}")]
    UnterminatedFunctionCall(String),

    #[error("{0} needs at least one numeric argument")]
    InsufficientArguments(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Circular dependency at {0}")]
    CircularDependency(String),

    #[error("Expression nested deeper than {0} levels")]
    ExpressionTooDeep(usize),
}

pub type DomainResult<T> = Result<T, DomainError>;
