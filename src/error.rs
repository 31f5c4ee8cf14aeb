use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GapError {
    /// A precondition on the input rows or tables does not hold.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Two tables that must be joined share no usable key.
    #[error("Join key error: {0}")]
    JoinKey(String),

    #[error("Missing column: '{0}'")]
    MissingColumn(String),

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

pub type Result<T> = std::result::Result<T, GapError>;
