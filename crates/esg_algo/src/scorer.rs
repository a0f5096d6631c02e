//! Rubric Scorer (C5 §4.5): assigns a stage 0-4 per theme from the evidence
//! pool and a literal rationale keyed to the rubric's descriptor. A pure
//! function of (rubric, evidence) — no I/O, no randomness.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use esg_core::ids::EvidenceId;
use esg_core::rubric::{confidence_schedule, Rubric, Stage};
use esg_core::tokens::Theme;

use crate::evidence::EvidenceRecord;
use crate::RubricError;

const FRAMEWORK_TOKENS: [&str; 4] = ["GRI", "SASB", "TCFD", "ISSB"];
const TCFD_FOUR_PILLARS: [&str; 4] = ["governance", "strategy", "risk management", "metrics and targets"];
const RD_BROCHURE_MAX_CHARS: usize = 200;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThemeScore {
    pub theme: Theme,
    pub stage: Option<u8>,
    pub confidence: f64,
    pub evidence_ids: Vec<EvidenceId>,
    pub rationale_ref: Option<String>,
    pub descriptor: String,
    pub reason: Option<String>,
}

fn framework_tokens_present(texts: &[&str]) -> Vec<&'static str> {
    FRAMEWORK_TOKENS
        .iter()
        .copied()
        .filter(|tok| texts.iter().any(|t| t.to_uppercase().contains(tok)))
        .collect()
}

fn contains_ci(haystacks: &[&str], needle: &str) -> bool {
    haystacks.iter().any(|h| h.to_lowercase().contains(&needle.to_lowercase()))
}

/// Stage-specific precedence matchers (§4.5 point 2, illustrative rules
/// implemented exactly as given). Returns `None` when the theme has no
/// special-cased rule and the generic fallback should run instead.
fn special_cased_stage(theme: Theme, texts: &[&str]) -> Option<u8> {
    match theme {
        Theme::Rd => {
            let brochure = texts
                .iter()
                .any(|t| t.len() < RD_BROCHURE_MAX_CHARS && contains_ci(&[t], "brochure"));
            if brochure {
                return Some(0);
            }
            None
        }
        Theme::Ghg => {
            if contains_ci(texts, "limited assurance") {
                Some(3)
            } else if contains_ci(texts, "reasonable assurance") {
                Some(4)
            } else {
                None
            }
        }
        Theme::Rmm => {
            let all_pillars = TCFD_FOUR_PILLARS.iter().all(|p| contains_ci(texts, p));
            if all_pillars {
                Some(2)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Generic fallback for themes without a special-cased rule: a framework
/// token found *in the evidence text itself* (not merely hinted) lifts the
/// stage; otherwise descriptor-keyword presence is binary.
fn generic_stage(texts: &[&str], keywords: &[String]) -> u8 {
    let framework_hits = framework_tokens_present(texts);
    let keyword_hit = keywords.iter().any(|kw| contains_ci(texts, kw));
    match (keyword_hit, framework_hits.is_empty()) {
        (true, false) => 2,
        (true, true) => 1,
        (false, _) => 0,
    }
}

/// Score one theme. Applies the evidence gate first (§3 I3); only once it
/// passes does stage assignment run.
pub fn score_theme(
    theme: Theme,
    evidence: &[EvidenceRecord],
    rubric: &Rubric,
) -> Result<ThemeScore, RubricError> {
    let descriptor = rubric
        .descriptor(theme)
        .ok_or(RubricError::UnknownTheme)?;

    let distinct_pages: HashSet<u32> = evidence.iter().map(|e| e.page_no).collect();
    let evidence_ids: Vec<EvidenceId> = evidence.iter().map(|e| e.evidence_id.clone()).collect();

    if evidence.len() < descriptor.evidence_min || distinct_pages.len() < descriptor.distinct_pages_min {
        return Ok(ThemeScore {
            theme,
            stage: Some(0),
            confidence: 0.0,
            evidence_ids,
            rationale_ref: None,
            descriptor: format!("{} — insufficient evidence", theme.code()),
            reason: Some(format!(
                "insufficient_evidence(n={}<{},pages={}<{})",
                evidence.len(),
                descriptor.evidence_min,
                distinct_pages.len(),
                descriptor.distinct_pages_min
            )),
        });
    }

    let texts: Vec<&str> = evidence.iter().map(|e| e.quote.as_str()).collect();

    let stage = special_cased_stage(theme, &texts).unwrap_or_else(|| generic_stage(&texts, &descriptor.keywords));
    let stage_value = Stage::new(stage.min(esg_core::rubric::MAX_STAGE)).map_err(|_| RubricError::StageOutOfRange)?;

    let confidence = confidence_schedule(stage_value, evidence.len(), descriptor.evidence_min);

    Ok(ThemeScore {
        theme,
        stage: Some(stage_value.value()),
        confidence,
        evidence_ids,
        rationale_ref: Some(format!("rubric:{}:{}", theme.code(), stage_value.value())),
        descriptor: format!("{} — stage {}", theme.code(), stage_value.value()),
        reason: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use esg_core::ids::{ChunkId, DocId, OrgId};

    fn rubric() -> Rubric {
        Rubric {
            version: esg_core::rubric::RubricVersion::new("v3.0").unwrap(),
            themes: Theme::ALL
                .iter()
                .map(|t| esg_core::rubric::ThemeDescriptor {
                    theme: *t,
                    keywords: vec!["disclosure".to_string()],
                    evidence_min: 2,
                    distinct_pages_min: 2,
                })
                .collect(),
        }
    }

    fn evidence_on(doc: &DocId, theme: Theme, page: u32, quote: &str, idx: u32) -> EvidenceRecord {
        let chunk_id = ChunkId::new(doc, page, idx);
        EvidenceRecord {
            evidence_id: EvidenceId::new(&chunk_id, 0),
            doc_id: doc.clone(),
            theme,
            quote: quote.to_string(),
            page_no: page,
            chunk_id,
            sha256: "x".to_string(),
        }
    }

    #[test]
    fn evidence_gate_fires_on_single_page() {
        let org: OrgId = "ORG".parse().unwrap();
        let doc = DocId::new(&org, 2025);
        let ev = vec![
            evidence_on(&doc, Theme::Tsp, 12, "disclosure text", 0),
            evidence_on(&doc, Theme::Tsp, 12, "disclosure text two", 1),
        ];
        let score = score_theme(Theme::Tsp, &ev, &rubric()).unwrap();
        assert_eq!(score.stage, Some(0));
        assert!(score.reason.unwrap().starts_with("insufficient_evidence"));
    }

    #[test]
    fn rd_brochure_takes_precedence_over_framework_boost() {
        let org: OrgId = "ORG".parse().unwrap();
        let doc = DocId::new(&org, 2025);
        let ev = vec![
            evidence_on(&doc, Theme::Rd, 1, "See our company brochure for sustainability highlights.", 0),
            evidence_on(&doc, Theme::Rd, 2, "TCFD aligned disclosure brochure summary.", 1),
        ];
        let score = score_theme(Theme::Rd, &ev, &rubric()).unwrap();
        assert_eq!(score.stage, Some(0));
        assert!(score.confidence >= 0.80);
    }

    #[test]
    fn ghg_limited_assurance_is_stage_three_not_four() {
        let org: OrgId = "ORG".parse().unwrap();
        let doc = DocId::new(&org, 2025);
        let ev = vec![
            evidence_on(&doc, Theme::Ghg, 1, "…limited assurance by Bureau Veritas…", 0),
            evidence_on(&doc, Theme::Ghg, 2, "disclosure of scope 1 and 2 emissions", 1),
        ];
        let score = score_theme(Theme::Ghg, &ev, &rubric()).unwrap();
        assert_eq!(score.stage, Some(3));
    }

    #[test]
    fn rmm_four_pillar_mention_is_stage_two() {
        let org: OrgId = "ORG".parse().unwrap();
        let doc = DocId::new(&org, 2025);
        let quote = "Our governance, strategy, risk management, and metrics and targets are disclosed.";
        let ev = vec![
            evidence_on(&doc, Theme::Rmm, 1, quote, 0),
            evidence_on(&doc, Theme::Rmm, 2, "disclosure continues", 1),
        ];
        let score = score_theme(Theme::Rmm, &ev, &rubric()).unwrap();
        assert_eq!(score.stage, Some(2));
    }
}
