//! # errors.rs
//!
//! Error types raised along the pipeline.
//!
//! Every stage has its own enum so that a caller can tell at which step an
//! input was rejected:
//!
//! - [`TokenizeError`]: the text could not be split into tokens
//! - [`ParseError`]: the tokens do not form a valid expression
//! - [`ExecutionError`]: evaluation met a value it cannot work with
//! - [`AnalyzerError`]: an analyzer has no rule for a node kind
//! - [`ParameterError`]: a name could not be read or written in the environment
//!
//! [`Error`] wraps all of them for the [`crate::Processor`] facade.

use thiserror::Error;

/// Errors raised while splitting text into tokens.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TokenizeError {
    /// A character that starts no known token.
    #[error("unsupported symbol '{symbol}' at {position}")]
    UnsupportedSymbol { symbol: char, position: usize },

    /// An opening bracket without a closing one, or the other way round.
    #[error("unbalanced brackets at {position}")]
    UnbalancedBrackets { position: usize },

    /// A bracket closed by the wrong kind, e.g. `(1, 2}`.
    #[error("'{open}' is closed by '{close}' at {position}")]
    MismatchedBrackets { open: char, close: char, position: usize },

    /// A quoted string without its closing quote.
    #[error("unterminated string starting at {position}")]
    UnterminatedString { position: usize },

    /// A number literal that cannot be read in its base.
    #[error("malformed number '{text}' at {position}")]
    MalformedNumber { text: String, position: usize },
}

/// Errors raised while turning tokens into a tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),

    #[error("unexpected token '{token}' at {position}")]
    UnexpectedToken { token: String, position: usize },

    #[error("missing operand for '{operator}'")]
    MissingOperand { operator: String },

    #[error("mismatched bracket at {position}")]
    MismatchedBracket { position: usize },

    /// A fixed-arity construct received the wrong number of arguments.
    #[error("'{name}' expects {expected} argument(s) but got {got}")]
    WrongArgumentCount { name: String, expected: String, got: usize },

    /// Assignment, increment or definition whose target is not a variable.
    #[error("the target of '{operator}' must be a variable")]
    NotAVariable { operator: String },

    #[error("unit '{unit}' can only follow a number literal")]
    InvalidUnitSuffix { unit: String },

    #[error("empty expression")]
    EmptyExpression,

    #[error("{count} operands are left without an operator")]
    TrailingOperands { count: usize },

    #[error("'?' without a matching ':'")]
    MissingTernaryBranch,
}

/// Errors raised by the environment on reads and writes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterError {
    /// Mutation of a `Constant` or `ReadOnly` parameter.
    #[error("parameter '{0}' is read-only")]
    ReadOnly(String),

    /// Lookup of a name known to no scope and no registry.
    #[error("parameter '{0}' is undefined")]
    Undefined(String),
}

/// Errors raised by an analyzer that has no rule for a node kind.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalyzerError {
    #[error("{analyzer} is not supported for '{node}'")]
    UnsupportedOperation { analyzer: &'static str, node: String },
}

/// Errors raised while evaluating a tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutionError {
    #[error("'{operation}' does not support a {kind} operand")]
    UnsupportedOperand { operation: String, kind: &'static str },

    #[error("'{operation}' does not support {left} and {right} operands")]
    UnsupportedOperands { operation: String, left: &'static str, right: &'static str },

    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error("function '{name}' with {arity} argument(s) is undefined")]
    UndefinedFunction { name: String, arity: usize },

    #[error("dimension mismatch in '{operation}'")]
    DimensionMismatch { operation: String },

    #[error("invalid argument for '{function}': {reason}")]
    InvalidArgument { function: String, reason: String },

    #[error("cannot convert {from} into {to}")]
    IncompatibleUnits { from: String, to: String },

    #[error("unknown unit '{0}'")]
    UnknownUnit(String),

    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),
}

/// Any error the crate can produce.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("tokenize error: {0}")]
    Tokenize(#[from] TokenizeError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("analyzer error: {0}")]
    Analyzer(#[from] AnalyzerError),

    #[error("parameter error: {0}")]
    Parameter(#[from] ParameterError),
}

#[cfg(test)]
mod errors_tests {
    use super::*;

    #[test]
    fn test_messages_carry_position() {
        let err = TokenizeError::UnsupportedSymbol { symbol: '$', position: 3 };
        assert_eq!(err.to_string(), "unsupported symbol '$' at 3");

        let err = ParseError::from(TokenizeError::UnbalancedBrackets { position: 0 });
        assert_eq!(err.to_string(), "unbalanced brackets at 0");
    }

    #[test]
    fn test_parameter_error_converts_into_execution_error() {
        let err: ExecutionError = ParameterError::ReadOnly("pi".into()).into();
        assert_eq!(err, ExecutionError::Parameter(ParameterError::ReadOnly("pi".into())));
        assert_eq!(err.to_string(), "parameter 'pi' is read-only");
    }

    #[test]
    fn test_umbrella_error_wraps_each_stage() {
        let err: Error = ParseError::EmptyExpression.into();
        assert!(matches!(err, Error::Parse(ParseError::EmptyExpression)));
        assert_eq!(err.to_string(), "parse error: empty expression");
    }
}
