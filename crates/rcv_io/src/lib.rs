//! I/O for the RCV engine.
//!
//! - `loader`: read a normalized contest file (rules + ballots) into engine types.
//! - `hasher`: SHA-256 digests of input bytes.
//! - `report`: render a contest outcome as deterministic JSON and write it atomically.
//!
//! No network I/O.

#![forbid(unsafe_code)]

use rcv_core::ConfigError;
use thiserror::Error;

pub mod hasher;
pub mod loader;
pub mod report;

pub use loader::{load_contest, parse_contest, LoadOptions, LoadedContest};
pub use report::{render_outcome_json, write_outcome_json};

/// Unified error for rcv_io.
#[derive(Debug, Error)]
pub enum IoError {
    /// Filesystem / path errors.
    #[error("io/path error: {0}")]
    Path(String),

    /// JSON errors with a JSON Pointer to the offending value.
    #[error("json error at {pointer}: {msg}")]
    Json { pointer: String, msg: String },

    /// Input exceeds a loader limit.
    #[error("limit exceeded: {0}")]
    Limit(String),

    /// The rules in the file do not validate.
    #[error("invalid rules: {0}")]
    Rules(#[from] ConfigError),
}

pub type IoResult<T> = Result<T, IoError>;

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        IoError::Path(e.to_string())
    }
}

impl From<serde_json::Error> for IoError {
    fn from(e: serde_json::Error) -> Self {
        // serde_json reports line/column, not a pointer.
        IoError::Json { pointer: "/".to_string(), msg: e.to_string() }
    }
}

pub mod prelude {
    pub use crate::hasher::sha256_hex;
    pub use crate::{
        load_contest, parse_contest, render_outcome_json, write_outcome_json, IoError, IoResult,
        LoadOptions, LoadedContest,
    };
}
