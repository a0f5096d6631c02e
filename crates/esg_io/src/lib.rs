//! esg_io — canonical JSON, SHA-256 hashing, environment configuration, the
//! content-addressed model cache, and JSON Schema validation.
//!
//! Single source of truth: each concern lives in its own file module; this
//! crate root only defines the shared error type and a small prelude.

#![forbid(unsafe_code)]

use thiserror::Error;

/// Unified error for esg_io (used by canonical_json/hasher/config/cache/schema).
#[derive(Debug, Error)]
pub enum IoError {
    #[error("io/path error: {0}")]
    Path(String),

    #[error("json error at {pointer}: {msg}")]
    Json { pointer: String, msg: String },

    #[error("hash error: {0}")]
    Hash(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("invalid: {0}")]
    Invalid(String),
}

pub type IoResult<T> = Result<T, IoError>;

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        IoError::Path(e.to_string())
    }
}

impl From<serde_json::Error> for IoError {
    fn from(e: serde_json::Error) -> Self {
        IoError::Json {
            pointer: "/".to_string(),
            msg: e.to_string(),
        }
    }
}

pub mod cache;
pub mod canonical_json;
pub mod config;
pub mod hasher;
pub mod rubric;
pub mod schema;

/// True if `s` looks like a URL (any `<scheme>://`), used to enforce the
/// offline-only posture when resolving document source paths.
#[inline]
pub fn looks_like_url_strict(s: &str) -> bool {
    s.trim().contains("://")
}

pub mod prelude {
    pub use crate::{looks_like_url_strict, IoError, IoResult};

    pub use crate::cache;
    pub use crate::canonical_json;
    pub use crate::config;
    pub use crate::hasher;
    pub use crate::rubric;
    pub use crate::schema;

    pub use crate::cache::Cache;
    pub use crate::canonical_json::to_canonical_bytes;
    pub use crate::config::EngineConfig;
    #[cfg(feature = "hash")]
    pub use crate::hasher::sha256_hex;
    pub use crate::rubric::load_rubric;
}
