//! Fidelity guards (§4.7c): reject LLM output that introduces a number or
//! date not present anywhere in the evidence it was grounded on. This is a
//! post-hoc check, not a prompt instruction — the prompt already asks for
//! grounded text, the guard is what actually enforces it.

use crate::ReportError;

/// Every run of ASCII digits in `text` must also appear, as a run of ASCII
/// digits, somewhere in `evidence_text`. Catches fabricated percentages,
/// years, and counts the model wasn't given.
pub fn check_no_fabricated_numbers(label: &str, text: &str, evidence_text: &str) -> Result<(), ReportError> {
    let evidence_numbers: std::collections::HashSet<&str> = digit_runs(evidence_text).collect();
    for run in digit_runs(text) {
        if !evidence_numbers.contains(run) {
            return Err(ReportError::Fabrication(format!("{label}: number \"{run}\" not present in evidence")));
        }
    }
    Ok(())
}

fn digit_runs(s: &str) -> impl Iterator<Item = &str> {
    let bytes = s.as_bytes();
    let mut runs = Vec::new();
    let mut start = None;
    for (i, b) in bytes.iter().enumerate() {
        if b.is_ascii_digit() {
            if start.is_none() {
                start = Some(i);
            }
        } else if let Some(st) = start.take() {
            runs.push(&s[st..i]);
        }
    }
    if let Some(st) = start {
        runs.push(&s[st..]);
    }
    runs.into_iter()
}

/// Enforce the executive summary's word cap by truncating (never raising:
/// a too-long summary is a length violation the caller can always fix by
/// cutting, not a fabrication).
pub fn enforce_word_limit(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        text.to_string()
    } else {
        words[..max_words].join(" ")
    }
}

/// Append the limitation sentence if confidence is below the threshold and
/// the model's own text didn't already state one.
pub fn ensure_limitation_disclosed(text: &str, confidence: f64) -> String {
    if confidence >= 0.7 {
        return text.to_string();
    }
    let already_disclosed = text.to_lowercase().contains("limitation") || text.to_lowercase().contains("confidence");
    if already_disclosed {
        text.to_string()
    } else {
        format!("{text} This assessment carries below-threshold confidence ({confidence:.2}) and should be treated as provisional.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fabricated_number_is_rejected() {
        let evidence = "We reduced emissions by 12% in 2024.";
        let narrative = "Emissions fell by 45% according to the filing.";
        let err = check_no_fabricated_numbers("GHG", narrative, evidence).unwrap_err();
        matches!(err, ReportError::Fabrication(_));
    }

    #[test]
    fn numbers_present_in_evidence_pass() {
        let evidence = "We reduced emissions by 12% in 2024.";
        let narrative = "The company cut emissions by 12% during 2024.";
        assert!(check_no_fabricated_numbers("GHG", narrative, evidence).is_ok());
    }

    #[test]
    fn low_confidence_gets_limitation_sentence() {
        let out = ensure_limitation_disclosed("Some analysis.", 0.6);
        assert!(out.contains("provisional"));
    }

    #[test]
    fn word_limit_truncates() {
        let text = (0..250).map(|i| i.to_string()).collect::<Vec<_>>().join(" ");
        let truncated = enforce_word_limit(&text, 200);
        assert_eq!(truncated.split_whitespace().count(), 200);
    }
}
