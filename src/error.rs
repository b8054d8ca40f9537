/* ------------------------------------------------------------------ */
/* Error type for checkpoint, corpus and config I/O                   */
/* ------------------------------------------------------------------ */
//
// The model itself never fails: out-of-range indices, empty vocabularies
// and degenerate rows all have defined fallbacks. Only the edges that
// touch the filesystem or parse user input return Result.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BigramError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Bad magic bytes in checkpoint {path}")]
    BadMagic { path: String },

    #[error("Unsupported weight precision tag {0}")]
    UnsupportedPrecision(u8),

    #[error("Corrupt checkpoint: {0}")]
    Corrupt(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Corpus contains no usable text")]
    EmptyCorpus,
}

pub type Result<T> = std::result::Result<T, BigramError>;

impl BigramError {
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
