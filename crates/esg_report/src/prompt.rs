//! Prompt composition (§4.7): every prompt carries only literal quote/page
//! pairs already produced by the scorer and selector — nothing is invented
//! here, the LLM only ever sees what the evidence already says.

use esg_algo::evidence::EvidenceRecord;
use esg_algo::scorer::ThemeScore;
use esg_core::tokens::Theme;

const EXEC_SUMMARY_MAX_WORDS: usize = 200;

/// The executive-summary prompt: one instruction carrying every theme's
/// stage and the page numbers its evidence came from, nothing else.
pub fn executive_summary_prompt(doc_id: &str, scores: &[(ThemeScore, Vec<EvidenceRecord>)]) -> String {
    let mut lines = Vec::with_capacity(scores.len());
    for (score, evidence) in scores {
        let stage_desc = match score.stage {
            Some(s) => format!("stage {s}"),
            None => "insufficient_evidence".to_string(),
        };
        let pages: Vec<String> = evidence.iter().map(|e| e.page_no.to_string()).collect();
        lines.push(format!("- {}: {} (pages: {})", score.theme.code(), stage_desc, pages.join(", ")));
    }

    format!(
        "Write an executive summary of at most {EXEC_SUMMARY_MAX_WORDS} words for the ESG maturity \
         assessment of document \"{doc_id}\". Use only the stages and pages listed below; do not \
         introduce any metric, date, or claim that is not already present there.\n\n{}",
        lines.join("\n")
    )
}

/// The per-theme prompt: 3-4 sentences referencing specific pages, built
/// from the theme's literal evidence quotes.
pub fn theme_prompt(theme: Theme, descriptor: &str, score: &ThemeScore, evidence: &[EvidenceRecord]) -> String {
    let mut quotes = Vec::with_capacity(evidence.len());
    for e in evidence {
        quotes.push(format!("  - (p.{}) \"{}\"", e.page_no, e.quote));
    }
    let stage_desc = match score.stage {
        Some(s) => format!("Stage {s}"),
        None => "insufficient_evidence".to_string(),
    };
    let limitation_clause = if score.confidence < 0.7 {
        "The confidence in this assessment is below 0.7; state that limitation explicitly in the last sentence."
    } else {
        ""
    };

    format!(
        "Write 3-4 sentences analyzing the \"{theme}\" theme ({descriptor}) for this document, assigned \
         {stage_desc} with confidence {:.2}. Reference the specific pages below and quote or paraphrase \
         only what they say; introduce no metric, date, or claim absent from them. {limitation_clause}\n\n\
         Evidence:\n{}",
        score.confidence,
        quotes.join("\n"),
        theme = theme.code(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use esg_core::ids::{ChunkId, DocId, EvidenceId, OrgId};

    fn sample_evidence(page_no: u32) -> EvidenceRecord {
        let org: OrgId = "ORG".parse().unwrap();
        let doc = DocId::new(&org, 2025);
        let chunk = ChunkId::new(&doc, page_no, 0);
        EvidenceRecord {
            evidence_id: EvidenceId::new(&chunk, 0),
            doc_id: doc.clone(),
            theme: Theme::Ghg,
            quote: "We report Scope 1 and Scope 2 emissions annually.".to_string(),
            page_no,
            chunk_id: chunk,
            sha256: "deadbeef".to_string(),
        }
    }

    #[test]
    fn theme_prompt_carries_only_literal_quotes() {
        let evidence = vec![sample_evidence(4)];
        let score = ThemeScore {
            theme: Theme::Ghg,
            stage: Some(3),
            confidence: 0.8,
            evidence_ids: evidence.iter().map(|e| e.evidence_id.clone()).collect(),
            rationale_ref: None,
            descriptor: "GHG".to_string(),
            reason: None,
        };
        let prompt = theme_prompt(Theme::Ghg, "Greenhouse gas accounting", &score, &evidence);
        assert!(prompt.contains("We report Scope 1 and Scope 2 emissions annually."));
        assert!(prompt.contains("p.4"));
        assert!(!prompt.contains("confidence is below 0.7"));
    }

    #[test]
    fn low_confidence_forces_limitation_instruction() {
        let evidence = vec![sample_evidence(2)];
        let score = ThemeScore {
            theme: Theme::Rd,
            stage: Some(1),
            confidence: 0.6,
            evidence_ids: vec![],
            rationale_ref: None,
            descriptor: "RD".to_string(),
            reason: None,
        };
        let prompt = theme_prompt(Theme::Rd, "Reporting disclosure", &score, &evidence);
        assert!(prompt.contains("state that limitation explicitly"));
    }
}
