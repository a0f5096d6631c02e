//! Matrix Orchestrator (C6) + Provenance & Manifest (C8): wires the chunk
//! store, algorithm layer, and grounded editor into the per-doc run
//! protocol, enforces the authenticity gates, and lays out every artifact
//! named in the on-disk layout contract.
#![forbid(unsafe_code)]

use thiserror::Error;

pub mod artifacts;
pub mod gates;
pub mod orchestrate;

use esg_core::ids::DocId;
use esg_io::config::EngineConfig;

/// Process exit codes (§6): the first failing gate determines the code.
pub const EXIT_OK: i32 = 0;
pub const EXIT_DETERMINISM_FAILED: i32 = 2;
pub const EXIT_PARITY_FAILED: i32 = 3;
pub const EXIT_EVIDENCE_FAILED: i32 = 4;
pub const EXIT_PROVENANCE_FAILED: i32 = 5;
pub const EXIT_CACHE_MISS: i32 = 6;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("io error: {0}")]
    Io(#[from] esg_io::IoError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("chunk store error: {0}")]
    Store(String),
    #[error("retrieval error: {0}")]
    Retrieval(String),
    #[error("rubric error: {0}")]
    Rubric(String),
    #[error("narrative error: {0}")]
    Report(String),
    #[error("config error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Map an error to the process exit code it should produce (§6, §7).
    /// Gate failures surfaced via `matrix_contract.json` use the
    /// corresponding codes directly; this covers the fatal paths that abort
    /// before a contract can even be written. A fail-closed cache miss can
    /// surface from several call sites (index build, per-theme embedding,
    /// narrative generation), each wrapping the originating `IoError`
    /// differently, so this matches on the rendered message rather than one
    /// specific variant shape.
    pub fn exit_code(&self) -> i32 {
        if self.to_string().contains("cache miss") {
            EXIT_CACHE_MISS
        } else {
            EXIT_PROVENANCE_FAILED
        }
    }
}

/// Run the matrix for every doc in `doc_ids`, writing per-doc artifacts plus
/// the matrix-wide `matrix_contract.json`, and return the exit code implied
/// by the first failing gate across all docs (or `EXIT_OK`).
pub fn run_matrix(
    config: &EngineConfig,
    cache: &esg_io::cache::Cache,
    rubric: &esg_core::rubric::Rubric,
    docs: &[(DocId, esg_core::ids::OrgId, u16, std::path::PathBuf)],
    embed_live: impl Fn(&str) -> Result<Vec<f32>, esg_io::IoError> + Copy,
    narrate_live: impl Fn(&str) -> Result<String, esg_io::IoError> + Copy,
) -> Result<i32, PipelineError> {
    let mut entries = Vec::with_capacity(docs.len());

    for (doc_id, _org_id, _year, silver_path) in docs {
        tracing::info!(doc_id = %doc_id, stage = "matrix", "starting run_doc");
        let index_dir = orchestrate::index_dir_for(config, doc_id);
        let outcome = match orchestrate::run_doc(config, cache, rubric, doc_id, silver_path, &index_dir, embed_live, narrate_live) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(doc_id = %doc_id, stage = "matrix", error = %e, "run_doc failed");
                return Err(e);
            }
        };
        if outcome.verdict != artifacts::DocVerdict::Ok {
            tracing::warn!(doc_id = %doc_id, stage = "matrix", verdict = ?outcome.verdict, gates = ?outcome.gates, "doc did not pass all gates");
        }
        entries.push(orchestrate::to_contract_entry(&outcome));
    }

    let contract = artifacts::MatrixContract::from_docs(entries);
    let contract_path = config.artifacts_root.join("matrix").join("matrix_contract.json");
    contract.write(&contract_path)?;
    tracing::info!(status = ?contract.status, doc_count = contract.doc_count, ok_count = contract.ok_count, "matrix contract written");

    let exit_code = match contract.status {
        artifacts::DocVerdict::Ok => EXIT_OK,
        artifacts::DocVerdict::Revise => {
            if contract.docs.iter().any(|d| d.gates.parity == artifacts::GateStatus::Fail) {
                EXIT_PARITY_FAILED
            } else {
                EXIT_EVIDENCE_FAILED
            }
        }
        artifacts::DocVerdict::Fail => {
            if contract.docs.iter().any(|d| d.gates.determinism == artifacts::GateStatus::Fail) {
                EXIT_DETERMINISM_FAILED
            } else {
                EXIT_PROVENANCE_FAILED
            }
        }
    };

    Ok(exit_code)
}

pub mod prelude {
    pub use crate::artifacts::{DocVerdict, GateStatus, MatrixContract, OutputContract};
    pub use crate::orchestrate::{run_doc, DocRunOutcome};
    pub use crate::{run_matrix, PipelineError};
}
