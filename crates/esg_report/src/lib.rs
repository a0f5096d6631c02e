//! Grounded Editor (C7): composes prompts from Theme Scores and Evidence
//! Records, calls the LLM at `temperature = 0.0` through the content-
//! addressed cache (C2), and enforces the fidelity guards before emitting
//! the single narrative artifact named in the on-disk layout contract.
#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use thiserror::Error;

use esg_algo::evidence::EvidenceRecord;
use esg_algo::scorer::ThemeScore;
use esg_core::ids::DocId;
use esg_core::tokens::Theme;
use esg_io::cache::Cache;
use esg_io::IoError;

pub mod guard;
pub mod prompt;

const TEMPERATURE: f64 = 0.0;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("io error: {0}")]
    Io(#[from] IoError),
    #[error("fabrication guard rejected narrative: {0}")]
    Fabrication(String),
}

/// One theme's narrative paragraph.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThemeNarrative {
    pub theme: Theme,
    pub text: String,
}

/// `artifacts/matrix/<doc_id>/narrative.json`: the single narrative
/// artifact per doc (§4.7 — no HTML, no dashboard rendering).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NarrativeArtifact {
    pub doc_id: String,
    pub executive_summary: String,
    pub themes: Vec<ThemeNarrative>,
    pub model_id: String,
    pub deterministic_timestamp: String,
}

/// One theme's grounding material for narration: its score, descriptor
/// text (from the rubric), and the literal evidence it was scored from.
pub struct ThemeNarrationInput<'a> {
    pub score: &'a ThemeScore,
    pub descriptor: &'a str,
    pub evidence: &'a [EvidenceRecord],
}

/// Compose and (cache-)call every prompt for `doc_id`, run the fidelity
/// guards over each result, and assemble the narrative artifact. `llm_live`
/// is only invoked on a fetch-mode cache miss; under `OFFLINE_REPLAY=true`
/// the cache fails closed before this function sees any uncached prompt.
pub fn narrate(
    cache: &Cache,
    model_id: &str,
    doc_id: &DocId,
    deterministic_timestamp: &str,
    themes: &[ThemeNarrationInput<'_>],
    llm_live: impl Fn(&str) -> Result<String, IoError>,
) -> Result<NarrativeArtifact, ReportError> {
    let scored_evidence: Vec<(ThemeScore, Vec<EvidenceRecord>)> = themes
        .iter()
        .map(|t| (t.score.clone(), t.evidence.to_vec()))
        .collect();

    let exec_prompt = prompt::executive_summary_prompt(doc_id.as_str(), &scored_evidence);
    let exec_evidence_text: String = themes
        .iter()
        .flat_map(|t| t.evidence.iter().map(|e| e.quote.as_str()))
        .collect::<Vec<_>>()
        .join(" ");

    let mut executive_summary = call_llm(cache, model_id, "executive_summary", &exec_prompt, &llm_live)?;
    guard::check_no_fabricated_numbers("executive_summary", &executive_summary, &exec_evidence_text)?;
    executive_summary = guard::enforce_word_limit(&executive_summary, 200);

    let mut theme_narratives = Vec::with_capacity(themes.len());
    for t in themes {
        let evidence_text: String = t.evidence.iter().map(|e| e.quote.as_str()).collect::<Vec<_>>().join(" ");
        let p = prompt::theme_prompt(t.score.theme, t.descriptor, t.score, t.evidence);
        let mut text = call_llm(cache, model_id, &format!("theme:{}", t.score.theme.code()), &p, &llm_live)?;
        guard::check_no_fabricated_numbers(t.score.theme.code(), &text, &evidence_text)?;
        text = guard::ensure_limitation_disclosed(&text, t.score.confidence);
        theme_narratives.push(ThemeNarrative { theme: t.score.theme, text });
    }

    Ok(NarrativeArtifact {
        doc_id: doc_id.as_str().to_string(),
        executive_summary,
        themes: theme_narratives,
        model_id: model_id.to_string(),
        deterministic_timestamp: deterministic_timestamp.to_string(),
    })
}

fn call_llm(
    cache: &Cache,
    model_id: &str,
    kind: &str,
    prompt_text: &str,
    llm_live: &impl Fn(&str) -> Result<String, IoError>,
) -> Result<String, ReportError> {
    let params = serde_json::json!({ "temperature": TEMPERATURE, "kind": kind });
    let input = serde_json::json!({ "prompt": prompt_text });
    let out: String = cache.get_or_call(model_id, "narrative", &params, &input, || llm_live(prompt_text))?;
    Ok(out)
}

pub mod prelude {
    pub use crate::{narrate, NarrativeArtifact, ReportError, ThemeNarrationInput, ThemeNarrative};
}
