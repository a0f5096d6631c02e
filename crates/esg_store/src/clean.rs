//! Text cleaning and canonicalization, applied during extraction (C1 §4.1).
//!
//! Two distinct text forms come out of every chunk: the **original** text
//! (preserved verbatim for quotation, I1) and the **canonical** text (used
//! only for hashing and BM25 tokenization — `strip + lowercase +
//! whitespace-normalize`).

const MIN_CHUNK_CHARS: usize = 100;
const SUSPECT_NON_PRINTABLE_FRACTION: f64 = 0.15;

/// Remove NUL and non-printable control characters, collapse whitespace
/// while preserving newlines. This is the one mutation applied to raw
/// extracted text before it becomes a chunk's "original" text.
pub fn clean_raw_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_was_space = false;
    for ch in input.chars() {
        if ch == '\0' {
            continue;
        }
        if ch == '\n' {
            out.push('\n');
            last_was_space = true;
            continue;
        }
        if ch.is_control() && ch != '\t' {
            continue;
        }
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
            continue;
        }
        out.push(ch);
        last_was_space = false;
    }
    out.trim().to_string()
}

/// Fraction of non-printable characters in the *raw, uncleaned* slice,
/// used to flag a chunk `suspect` before it is admitted to bronze.
pub fn non_printable_fraction(raw: &str) -> f64 {
    if raw.is_empty() {
        return 0.0;
    }
    let total = raw.chars().count();
    let non_printable = raw
        .chars()
        .filter(|c| *c == '\0' || (c.is_control() && *c != '\n' && *c != '\t' && *c != '\r'))
        .count();
    non_printable as f64 / total as f64
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CleanStatus {
    Clean,
    Suspect,
}

pub fn classify(raw: &str) -> CleanStatus {
    if non_printable_fraction(raw) > SUSPECT_NON_PRINTABLE_FRACTION {
        CleanStatus::Suspect
    } else {
        CleanStatus::Clean
    }
}

/// Canonical text used only for hashing and BM25 tokenization: strip,
/// lowercase, whitespace-normalize. Never used for quotation.
pub fn canonicalize(original: &str) -> String {
    let mut out = String::with_capacity(original.len());
    let mut last_was_space = true;
    for ch in original.trim().chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            for lower in ch.to_lowercase() {
                out.push(lower);
            }
            last_was_space = false;
        }
    }
    out.trim_end().to_string()
}

/// Split one page's cleaned text into paragraph-sized chunks of at least
/// `min_chars` characters (default 100). Paragraphs are joined forward
/// until the minimum size is met; the final chunk absorbs any remainder.
pub fn split_into_chunks(page_text: &str, min_chars: Option<usize>) -> Vec<(usize, usize, String)> {
    let min_chars = min_chars.unwrap_or(MIN_CHUNK_CHARS);
    let mut chunks = Vec::new();
    let mut cursor = 0usize;
    let mut buf = String::new();
    let mut buf_start = 0usize;

    for para in page_text.split("\n\n") {
        if buf.is_empty() {
            buf_start = cursor;
        } else {
            buf.push_str("\n\n");
        }
        buf.push_str(para);
        cursor += para.len() + 2;

        if buf.chars().count() >= min_chars {
            chunks.push((buf_start, buf_start + buf.len(), buf.clone()));
            buf.clear();
        }
    }
    if !buf.is_empty() {
        chunks.push((buf_start, buf_start + buf.len(), buf));
    }
    if chunks.is_empty() && !page_text.is_empty() {
        chunks.push((0, page_text.len(), page_text.to_string()));
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_strips_control_chars_and_collapses_spaces() {
        let raw = "Hello\u{0}   World\n\n\tFoo";
        let cleaned = clean_raw_text(raw);
        assert!(!cleaned.contains('\0'));
        assert!(!cleaned.contains("   "));
    }

    #[test]
    fn non_printable_fraction_flags_suspect() {
        let mostly_junk = "\u{1}\u{2}\u{3}\u{4}\u{5}abc";
        assert_eq!(classify(mostly_junk), CleanStatus::Suspect);
        assert_eq!(classify("a perfectly normal sentence."), CleanStatus::Clean);
    }

    #[test]
    fn canonicalize_lowercases_and_normalizes_whitespace() {
        let original = "  The  Company's   ESG  Report\n\n2025 ";
        let canon = canonicalize(original);
        assert_eq!(canon, "the company's esg report 2025");
    }

    #[test]
    fn split_respects_minimum_size() {
        let text = "Para one.\n\nPara two.\n\nPara three is a bit longer than the others here.";
        let chunks = split_into_chunks(text, Some(10));
        assert!(!chunks.is_empty());
        for (_, _, t) in &chunks[..chunks.len() - 1] {
            assert!(t.chars().count() >= 10);
        }
    }
}
