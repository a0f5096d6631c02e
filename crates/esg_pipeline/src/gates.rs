//! Authenticity gates (§4.6): the five checks a doc must clear for
//! `matrix_contract.status = "ok"`. Each gate is a pure function over the
//! artifacts already computed for a doc; none of them re-run any stage.

use esg_algo::evidence::EvidenceRecord;
use esg_io::hasher::sha256_hex;

use crate::artifacts::{DeterminismReport, EvidenceAuditReport, GateStatus, TopkVsEvidenceReport};

/// P1: three `output.json` hashes are byte-identical.
pub fn determinism_gate(report: &DeterminismReport) -> GateStatus {
    if report.identical {
        GateStatus::Pass
    } else {
        GateStatus::Fail
    }
}

/// P2: every theme's evidence sits inside that theme's fused top-K.
pub fn parity_gate(report: &TopkVsEvidenceReport) -> GateStatus {
    if report.rows.iter().all(|r| r.subset_ok) {
        GateStatus::Pass
    } else {
        GateStatus::Fail
    }
}

/// P3: every theme claiming a nonzero stage meets the evidence-count and
/// page-diversity floor (themes correctly downgraded to `insufficient_evidence`
/// always pass this gate — the gate tests claims, not coverage per se).
pub fn evidence_gate(report: &EvidenceAuditReport) -> GateStatus {
    if report.rows.iter().all(|r| r.pass) {
        GateStatus::Pass
    } else {
        GateStatus::Fail
    }
}

/// P4: every evidence quote is a literal substring of its chunk's original
/// text, and the record's sha256 matches `sha256("{doc_id}::{quote}")`.
pub fn provenance_gate(doc_id: &str, evidence: &[EvidenceRecord], chunk_text: impl Fn(&str) -> Option<String>) -> GateStatus {
    for e in evidence {
        let Some(text) = chunk_text(e.chunk_id.as_str()) else {
            return GateStatus::Fail;
        };
        if !text.contains(&e.quote) {
            return GateStatus::Fail;
        }
        let expected = sha256_hex(format!("{doc_id}::{}", e.quote).as_bytes());
        if expected != e.sha256 {
            return GateStatus::Fail;
        }
    }
    GateStatus::Pass
}

/// P6: during replay, the cache ledger recorded zero online calls. The
/// content-addressed cache already fails closed on a miss before control
/// reaches here (`esg_io::cache::Cache::get_or_call`), so reaching this
/// point under `offline_replay=true` is itself proof the gate holds.
pub fn offline_gate(offline_replay: bool, online_calls_observed: u64) -> GateStatus {
    if offline_replay && online_calls_observed > 0 {
        GateStatus::Fail
    } else {
        GateStatus::Pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{EvidenceAuditReport, EvidenceAuditRow, TopkVsEvidenceRow};
    use esg_algo::evidence::EvidenceRecord;
    use esg_core::ids::{ChunkId, DocId, EvidenceId, OrgId};
    use esg_core::tokens::Theme;

    fn sample_evidence(doc_id: &DocId, page_no: u32, quote: &str) -> EvidenceRecord {
        let chunk_id = ChunkId::new(doc_id, page_no, 0);
        EvidenceRecord {
            evidence_id: EvidenceId::new(&chunk_id, 0),
            doc_id: doc_id.clone(),
            theme: Theme::Ghg,
            quote: quote.to_string(),
            page_no,
            chunk_id,
            sha256: sha256_hex(format!("{doc_id}::{quote}").as_bytes()),
        }
    }

    #[test]
    fn provenance_gate_passes_when_quote_is_literal_and_hash_matches() {
        let org: OrgId = "ORG".parse().unwrap();
        let doc_id = DocId::new(&org, 2025);
        let evidence = vec![sample_evidence(&doc_id, 1, "We report Scope 1 emissions.")];
        let status = provenance_gate(doc_id.as_str(), &evidence, |_| {
            Some("Intro. We report Scope 1 emissions. Closing.".to_string())
        });
        assert_eq!(status, GateStatus::Pass);
    }

    #[test]
    fn provenance_gate_fails_when_quote_not_a_literal_substring() {
        let org: OrgId = "ORG".parse().unwrap();
        let doc_id = DocId::new(&org, 2025);
        let evidence = vec![sample_evidence(&doc_id, 1, "We report Scope 1 emissions.")];
        let status = provenance_gate(doc_id.as_str(), &evidence, |_| Some("Unrelated chunk text.".to_string()));
        assert_eq!(status, GateStatus::Fail);
    }

    #[test]
    fn provenance_gate_fails_on_hash_mismatch() {
        let org: OrgId = "ORG".parse().unwrap();
        let doc_id = DocId::new(&org, 2025);
        let mut evidence = sample_evidence(&doc_id, 1, "We report Scope 1 emissions.");
        evidence.sha256 = "0".repeat(64);
        let status = provenance_gate(doc_id.as_str(), &[evidence], |_| {
            Some("We report Scope 1 emissions.".to_string())
        });
        assert_eq!(status, GateStatus::Fail);
    }

    #[test]
    fn parity_gate_fails_when_any_row_has_missing_evidence() {
        let report = TopkVsEvidenceReport {
            rows: vec![TopkVsEvidenceRow {
                theme: Theme::Ghg,
                evidence_ids: vec!["a".into()],
                fused_topk_ids: vec!["b".into()],
                subset_ok: false,
                missing_count: 1,
            }],
        };
        assert_eq!(parity_gate(&report), GateStatus::Fail);
    }

    #[test]
    fn evidence_gate_fails_when_any_row_fails() {
        let report = EvidenceAuditReport {
            rows: vec![EvidenceAuditRow { theme: Theme::Ghg, evidence_count: 1, unique_pages: 1, pass: false }],
        };
        assert_eq!(evidence_gate(&report), GateStatus::Fail);
    }

    #[test]
    fn offline_gate_fails_on_any_online_call_during_replay() {
        assert_eq!(offline_gate(true, 0), GateStatus::Pass);
        assert_eq!(offline_gate(true, 1), GateStatus::Fail);
        assert_eq!(offline_gate(false, 5), GateStatus::Pass);
    }
}
