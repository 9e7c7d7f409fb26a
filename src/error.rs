use thiserror::Error;

// ---------------------------------------------------------------------------
// Domain errors shared by the command-line tools
// ---------------------------------------------------------------------------

/// Failures that the tools report as fatal command-line errors.
///
/// Most library functions return `anyhow::Result` and attach file context on
/// top of these, so callers that care can still `downcast_ref::<AppError>()`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    #[error("unknown ID in input file: {0}")]
    UnknownId(String),

    #[error("invalid index specification {spec:?}: {reason}")]
    InvalidIndexSpec { spec: String, reason: String },

    #[error("invalid delimiter {0:?}: expected a single ASCII character")]
    InvalidDelimiter(String),

    #[error("line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },

    #[error("line {line}, column {column}: {value:?} is not a number")]
    NotANumber {
        line: u64,
        column: usize,
        value: String,
    },

    #[error("line {line}: expected {expected} columns, found {found}")]
    ColumnCountMismatch {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("syntax error in mapping expression: {0}")]
    ExpressionSyntax(String),

    #[error("cannot evaluate mapping expression: {0}")]
    ExpressionEval(String),
}
