//! Data-model types owned by the Chunk Store (C1).

use serde::{Deserialize, Serialize};

use esg_core::ids::{ChunkId, DocId, OrgId, Sha256};

/// A page-anchored chunk. Created once by extraction, never mutated
/// (spec.md §3 Chunk / §4.1 Contracts).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: ChunkId,
    pub doc_id: DocId,
    pub page_no: u32,
    pub char_start: usize,
    pub char_end: usize,
    /// Original (uncanonicalized) text, preserved verbatim for quotation.
    pub text: String,
    pub text_sha256: Sha256,
    pub theme_hint: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStatus {
    Clean,
    Suspect,
}

/// One row of the ingestion manifest: a chunk's id and cleaning status.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ManifestChunkEntry {
    pub chunk_id: ChunkId,
    pub status: ChunkStatus,
    pub non_printable_fraction: f64,
}

/// The canonical-JSON artifact written by `ingest` (C1 §4.1).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IngestionManifest {
    pub doc_id: DocId,
    pub org_id: OrgId,
    pub fiscal_year: u16,
    pub source_sha256: Sha256,
    pub chunk_count: usize,
    pub page_range: (u32, u32),
    pub chunks: Vec<ManifestChunkEntry>,
    /// Pages that failed extraction; recorded, never silently dropped
    /// (Design Notes: "exception swallowing").
    pub skipped_pages: Vec<u32>,
}
