//! Core error type.
//!
//! Rejected mutations and lookup misses are ordinary `Option` returns, not
//! errors; this type only covers the load/save boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
