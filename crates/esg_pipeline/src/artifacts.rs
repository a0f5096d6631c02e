//! Canonical JSON artifact shapes written under `artifacts/matrix/<doc_id>/…`
//! (§6). All of these round-trip through `esg_io::canonical_json` so that
//! byte-identity across replay runs is a property of the writer, not of
//! serde's default field order.

use std::path::Path;

use serde::{Deserialize, Serialize};

use esg_algo::scorer::ThemeScore;
use esg_core::ids::ChunkId;
use esg_core::tokens::Theme;
use esg_io::canonical_json::write_canonical_file;
use esg_io::hasher::sha256_hex;

use crate::PipelineError;

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<String, PipelineError> {
    let json_value = serde_json::to_value(value).map_err(|e| PipelineError::Io(esg_io::IoError::from(e)))?;
    write_canonical_file(path, &json_value).map_err(|e| PipelineError::Io(esg_io::IoError::Path(e.to_string())))?;
    let bytes = esg_io::canonical_json::to_canonical_bytes(value)?;
    Ok(sha256_hex(&bytes))
}

/// `artifacts/matrix/<doc_id>/narrative.json`: the single narrative artifact
/// (§4.7) — this crate only writes it, the shape itself lives in `esg_report`.
pub fn write_narrative(path: &Path, narrative: &esg_report::NarrativeArtifact) -> Result<String, PipelineError> {
    write_json(path, narrative)
}

/// One theme's entry in the Output Contract (§3 Theme Score).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThemeScoreEntry {
    pub theme: Theme,
    pub stage: Option<u8>,
    pub confidence: f64,
    pub evidence_ids: Vec<String>,
    pub rationale_ref: Option<String>,
    pub descriptor: String,
    pub reason: Option<String>,
}

impl From<&ThemeScore> for ThemeScoreEntry {
    fn from(score: &ThemeScore) -> Self {
        ThemeScoreEntry {
            theme: score.theme,
            stage: score.stage,
            confidence: score.confidence,
            evidence_ids: score.evidence_ids.iter().map(|e| e.as_str().to_string()).collect(),
            rationale_ref: score.rationale_ref.clone(),
            descriptor: score.descriptor.clone(),
            reason: score.reason.clone(),
        }
    }
}

/// The Output Contract (§3): the determinism substrate, `output.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputContract {
    pub trace_id: String,
    pub doc_id: String,
    pub scores: Vec<ThemeScoreEntry>,
    pub model_version: String,
    pub rubric_version: String,
    pub deterministic_timestamp: String,
}

impl OutputContract {
    pub fn write(&self, path: &Path) -> Result<String, PipelineError> {
        write_json(path, self)
    }
}

/// `baseline/determinism_report.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeterminismReport {
    pub hashes: [String; 3],
    pub identical: bool,
}

impl DeterminismReport {
    pub fn from_hashes(hashes: [String; 3]) -> Self {
        let identical = hashes[0] == hashes[1] && hashes[1] == hashes[2];
        DeterminismReport { hashes, identical }
    }

    pub fn write(&self, path: &Path) -> Result<String, PipelineError> {
        write_json(path, self)
    }
}

/// One theme's row in `pipeline_validation/demo_topk_vs_evidence.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TopkVsEvidenceRow {
    pub theme: Theme,
    pub evidence_ids: Vec<String>,
    pub fused_topk_ids: Vec<String>,
    pub subset_ok: bool,
    pub missing_count: usize,
}

impl TopkVsEvidenceRow {
    pub fn compute(theme: Theme, evidence_chunk_ids: &[ChunkId], fused_topk_ids: &[ChunkId]) -> Self {
        let topk_set: std::collections::HashSet<&str> = fused_topk_ids.iter().map(|c| c.as_str()).collect();
        let missing: Vec<&ChunkId> = evidence_chunk_ids.iter().filter(|c| !topk_set.contains(c.as_str())).collect();
        TopkVsEvidenceRow {
            theme,
            evidence_ids: evidence_chunk_ids.iter().map(|c| c.as_str().to_string()).collect(),
            fused_topk_ids: fused_topk_ids.iter().map(|c| c.as_str().to_string()).collect(),
            subset_ok: missing.is_empty(),
            missing_count: missing.len(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TopkVsEvidenceReport {
    pub rows: Vec<TopkVsEvidenceRow>,
}

impl TopkVsEvidenceReport {
    pub fn write(&self, path: &Path) -> Result<String, PipelineError> {
        write_json(path, self)
    }
}

/// One theme's row in `pipeline_validation/evidence_audit.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvidenceAuditRow {
    pub theme: Theme,
    pub evidence_count: usize,
    pub unique_pages: usize,
    pub pass: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvidenceAuditReport {
    pub rows: Vec<EvidenceAuditRow>,
}

impl EvidenceAuditReport {
    pub fn write(&self, path: &Path) -> Result<String, PipelineError> {
        write_json(path, self)
    }
}

/// One theme's row in `pipeline_validation/rd_sources.json` — despite the
/// name (retained from the source corpus), this reports framework-token
/// detections for every theme, not only Reporting Disclosure.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FrameworkTokensRow {
    pub theme: Theme,
    pub framework_tokens: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FrameworkTokensReport {
    pub rows: Vec<FrameworkTokensRow>,
}

impl FrameworkTokensReport {
    pub fn write(&self, path: &Path) -> Result<String, PipelineError> {
        write_json(path, self)
    }
}

/// Authenticity gate verdicts for one doc (§4.6).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateStatus {
    Pass,
    Fail,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocGates {
    pub determinism: GateStatus,
    pub parity: GateStatus,
    pub evidence: GateStatus,
    pub provenance: GateStatus,
    pub offline: GateStatus,
}

impl DocGates {
    pub fn all_pass(&self) -> bool {
        [self.determinism, self.parity, self.evidence, self.provenance, self.offline]
            .iter()
            .all(|g| *g == GateStatus::Pass)
    }

    /// The first gate to fail, in the fixed precedence order of §4.6 (also
    /// the order `run_matrix`'s exit-code mapping checks). `None` once
    /// `all_pass()` holds.
    pub fn first_failing_gate(&self) -> Option<&'static str> {
        if self.determinism == GateStatus::Fail {
            Some("determinism")
        } else if self.parity == GateStatus::Fail {
            Some("parity")
        } else if self.evidence == GateStatus::Fail {
            Some("evidence")
        } else if self.provenance == GateStatus::Fail {
            Some("provenance")
        } else if self.offline == GateStatus::Fail {
            Some("offline")
        } else {
            None
        }
    }
}

/// Per-doc state machine terminal state (§4.6).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocVerdict {
    Ok,
    Revise,
    Fail,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocContractEntry {
    pub doc_id: String,
    pub gates: DocGates,
    pub verdict: DocVerdict,
    pub first_failing_gate: Option<String>,
}

/// `artifacts/matrix/matrix_contract.json`: matrix-wide gate summary.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatrixContract {
    pub docs: Vec<DocContractEntry>,
    pub status: DocVerdict,
    pub doc_count: usize,
    pub ok_count: usize,
}

impl MatrixContract {
    pub fn from_docs(docs: Vec<DocContractEntry>) -> Self {
        let status = if docs.iter().any(|d| d.verdict == DocVerdict::Fail) {
            DocVerdict::Fail
        } else if docs.iter().any(|d| d.verdict == DocVerdict::Revise) {
            DocVerdict::Revise
        } else {
            DocVerdict::Ok
        };
        let doc_count = docs.len();
        let ok_count = docs.iter().filter(|d| d.verdict == DocVerdict::Ok).count();
        MatrixContract { docs, status, doc_count, ok_count }
    }

    pub fn write(&self, path: &Path) -> Result<String, PipelineError> {
        write_json(path, self)
    }
}

/// One entry in the attestation bundle (§4.8 C8).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AttestationEntry {
    pub artifact: String,
    pub sha256: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Attestation {
    pub doc_id: String,
    pub model_version: String,
    pub rubric_version: String,
    pub seed: u64,
    pub deterministic_timestamp: String,
    pub entries: Vec<AttestationEntry>,
}

impl Attestation {
    pub fn write(&self, path: &Path) -> Result<String, PipelineError> {
        write_json(path, self)
    }
}
