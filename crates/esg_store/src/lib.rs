//! esg_store — Chunk Store (C1): page-aware PDF extraction, bronze append,
//! silver consolidation, over a columnar (Parquet) chunk table.
//!
//! No network I/O: PDF acquisition is an external collaborator (spec §1);
//! this crate only ever receives bytes already on disk.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Unreadable PDF, empty text, or no chunks passed cleaning.
    #[error("ingestion error: {0}")]
    Ingestion(String),

    /// Input failed canonicalization, or a columnar row was malformed.
    #[error("canonicalization error: {0}")]
    Canon(String),

    #[error("io error: {0}")]
    Io(String),
}

pub mod clean;
pub mod columnar;
pub mod ingest;
pub mod silver;
pub mod types;

pub mod prelude {
    pub use crate::ingest::ingest;
    pub use crate::silver::consolidate;
    pub use crate::types::{Chunk, ChunkStatus, IngestionManifest, ManifestChunkEntry};
    pub use crate::StoreError;
}
