//! Error types for the engine library.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// FEN string missing one of its mandatory fields
    #[error("Invalid FEN: missing {field} field")]
    MissingFenField { field: &'static str },

    #[error("Invalid FEN {field} field: {value:?}")]
    InvalidFenField { field: &'static str, value: String },

    #[error("Invalid square: {0:?}")]
    InvalidSquare(String),

    #[error("Invalid move string: {0:?}")]
    InvalidMove(String),

    #[error("Failed to read config file: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
