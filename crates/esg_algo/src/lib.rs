//! Algorithm layer: hybrid retrieval (BM25 + dense fusion), evidence
//! selection, and rubric scoring. Depends only on `esg_core`, `esg_io`
//! (for the content-addressed cache) and `esg_store`'s `Chunk` type — no
//! orchestration, no provenance, no narrative generation.
#![forbid(unsafe_code)]

use thiserror::Error;

pub mod bm25;
pub mod embeddings;
pub mod evidence;
pub mod fusion;
pub mod scorer;

/// Errors from the retrieval path (C3): index construction and query-time
/// fusion.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("alpha must be in [0, 1], got {0}")]
    BadAlpha(f64),
    #[error("index error: {0}")]
    Index(String),
}

/// Errors from the rubric scorer (C5). `EvidenceGate` is never raised as an
/// error — a failing gate downgrades the theme score to stage 0 with a
/// recorded reason rather than aborting the run.
#[derive(Debug, Error)]
pub enum RubricError {
    #[error("theme has no descriptor in the loaded rubric")]
    UnknownTheme,
    #[error("computed stage outside the valid 0..=4 range")]
    StageOutOfRange,
}

pub mod prelude {
    pub use crate::bm25::{Bm25Index, Bm25Params};
    pub use crate::embeddings::{build_index, cosine, read_index, write_index, EmbeddingIndex, IndexMeta};
    pub use crate::evidence::{cut_quote, select_evidence, EvidenceRecord, SelectionResult};
    pub use crate::fusion::{query, RankedChunk};
    pub use crate::scorer::{score_theme, ThemeScore};
    pub use crate::{RetrievalError, RubricError};
}
