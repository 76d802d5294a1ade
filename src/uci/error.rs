use thiserror::Error;

use crate::board::FenError;

/// Command-interface failures. All of these are reported as diagnostic lines
/// and leave the REPL running; only I/O errors terminate the process.
#[derive(Debug, Error)]
pub enum UciError {
    /// Malformed input: unknown token, bad move string.
    #[error("parse error: {0}")]
    Parse(String),

    /// Structurally valid input used wrongly: mutually exclusive flags,
    /// missing required flag, unknown option, value out of range.
    #[error("usage error: {0}")]
    Usage(String),

    /// Command legal only in another engine state, e.g. `stop` with no
    /// search running.
    #[error("state error: {0}")]
    State(String),

    #[error("parse error: {0}")]
    Fen(#[from] FenError),
}
