//! Evidence Selector (C4 §4.4): given the fused top-K and a target theme,
//! select the evidence pool the scorer will see, enforcing page diversity.

use std::collections::{HashMap, HashSet};

use esg_core::ids::{ChunkId, DocId, EvidenceId};
use esg_core::tokens::Theme;
use esg_io::hasher::sha256_hex;
use esg_store::types::Chunk;

use crate::fusion::RankedChunk;

const EVIDENCE_TARGET: usize = 4;
const PAGES_TARGET: usize = 2;
const QUOTE_MAX_WORDS: usize = 30;

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct EvidenceRecord {
    pub evidence_id: EvidenceId,
    pub doc_id: DocId,
    pub theme: Theme,
    pub quote: String,
    pub page_no: u32,
    pub chunk_id: ChunkId,
    pub sha256: String,
}

pub struct SelectionResult {
    pub evidence: Vec<EvidenceRecord>,
    pub pages_seen: HashSet<u32>,
}

/// Cut a verbatim quote from a chunk's *original* text: the first sentence
/// containing a theme keyword (case-insensitive substring match), else the
/// first <=30-word span. Operates on original text so the result is always
/// a literal substring (I1).
pub fn cut_quote(original_text: &str, keywords: &[String]) -> String {
    for sentence in split_sentences(original_text) {
        let lower = sentence.to_lowercase();
        if keywords.iter().any(|kw| lower.contains(&kw.to_lowercase())) {
            let trimmed = sentence.trim();
            if trimmed.split_whitespace().count() <= QUOTE_MAX_WORDS {
                return trimmed.to_string();
            }
            return first_n_words(trimmed, QUOTE_MAX_WORDS);
        }
    }
    first_n_words(original_text, QUOTE_MAX_WORDS)
}

fn split_sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let bytes = text.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if matches!(b, b'.' | b'!' | b'?') {
            let candidate = text[start..=i].trim();
            if !candidate.is_empty() {
                out.push(candidate);
            }
            start = i + 1;
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

fn first_n_words(text: &str, n: usize) -> String {
    text.split_whitespace().take(n).collect::<Vec<_>>().join(" ")
}

/// Select the evidence pool for `theme` from the fused top-K, using
/// `chunk_lookup` to resolve each ranked chunk's original text and page.
///
/// Determinism: the top-K order is already stable (rank order from the
/// retriever); "first new page" iterates that order, never a hash map.
pub fn select_evidence(
    doc_id: &DocId,
    theme: Theme,
    top_k: &[RankedChunk],
    chunk_lookup: &HashMap<ChunkId, Chunk>,
    keywords: &[String],
    evidence_min: usize,
) -> SelectionResult {
    let mut evidence = Vec::new();
    let mut pages_seen: HashSet<u32> = HashSet::new();

    for ranked in top_k {
        let chunk = match chunk_lookup.get(&ranked.chunk_id) {
            Some(c) => c,
            None => continue,
        };

        let is_new_page = !pages_seen.contains(&chunk.page_no);
        let under_minimum = evidence.len() < evidence_min;
        if !is_new_page && !under_minimum {
            continue;
        }

        let quote = cut_quote(&chunk.text, keywords);
        let sha = sha256_hex(format!("{doc_id}::{quote}").as_bytes());
        let ordinal = evidence.len() as u32;
        evidence.push(EvidenceRecord {
            evidence_id: EvidenceId::new(&chunk.chunk_id, ordinal),
            doc_id: doc_id.clone(),
            theme,
            quote,
            page_no: chunk.page_no,
            chunk_id: chunk.chunk_id.clone(),
            sha256: sha,
        });
        pages_seen.insert(chunk.page_no);

        if evidence.len() >= EVIDENCE_TARGET && pages_seen.len() >= PAGES_TARGET {
            break;
        }
    }

    SelectionResult { evidence, pages_seen }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cut_quote_prefers_keyword_sentence() {
        let text = "Intro paragraph with nothing relevant. We disclose GHG emissions targets annually. Closing remarks.";
        let quote = cut_quote(text, &["GHG".to_string()]);
        assert!(quote.contains("GHG emissions targets"));
    }

    #[test]
    fn cut_quote_falls_back_to_first_words() {
        let text = "one two three four five six seven eight nine ten";
        let quote = cut_quote(text, &["nonexistent".to_string()]);
        assert_eq!(quote, text);
    }
}
