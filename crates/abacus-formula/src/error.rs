//! Formula error types

use crate::FormulaId;
use thiserror::Error;

/// Result type for parsing
pub type ParseResult<T> = std::result::Result<T, ParseError>;

/// Result type for engine and configuration operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Malformed formula text
///
/// The `Display` output of each variant is the diagnostic reported to the
/// [`DiagnosticSink`](crate::DiagnosticSink). Positions are character offsets
/// inside `expression`, which is the formula itself or the text of the group
/// being parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A variable is not in the parameter list
    #[error("parameter [{name}] in formula [{formula}] is not in parameter list [{parameters}]")]
    UnknownParameter {
        formula: String,
        name: String,
        parameters: String,
    },

    /// `)` without a matching `(`
    #[error(
        "expression [{expression}] in formula [{formula}] has an unexpected close tag at position {position}"
    )]
    UnexpectedCloseTag {
        formula: String,
        expression: String,
        position: usize,
    },

    /// `(` without a matching `)`
    #[error("expression [{expression}] in formula [{formula}] lacks a close tag")]
    MissingCloseTag { formula: String, expression: String },

    /// `()` with nothing inside
    #[error(
        "expression [{expression}] in formula [{formula}] has no expression between tags at position {position}"
    )]
    EmptyGroup {
        formula: String,
        expression: String,
        position: usize,
    },

    /// A character no token starts with
    #[error(
        "expression [{expression}] in formula [{formula}] has an illegal character [{character}] at position {position}"
    )]
    IllegalCharacter {
        formula: String,
        expression: String,
        character: char,
        position: usize,
    },

    /// An operator with nothing on one of its sides
    #[error(
        "expression [{expression}] in formula [{formula}] lacks an operand for [{operator}] at position {position}"
    )]
    MissingOperand {
        formula: String,
        expression: String,
        operator: char,
        position: usize,
    },

    /// Two operands with no operator between them
    #[error(
        "expression [{expression}] in formula [{formula}] lacks an operator at position {position}"
    )]
    MissingOperator {
        formula: String,
        expression: String,
        position: usize,
    },

    /// Empty formula text
    #[error("formula is empty")]
    EmptyFormula,
}

/// Errors raised by the engine and its configuration
#[derive(Debug, Error)]
pub enum FormulaError {
    /// Formula text failed to parse
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// No formula is configured under this id
    #[error("formula [{0}] is not configured")]
    UnknownFormula(FormulaId),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Failed to read a configuration file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON configuration
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
