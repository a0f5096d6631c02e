//! Rubric domain types: maturity stages, confidence schedule, and the
//! per-theme descriptor loaded once at startup from the rubric document.
//!
//! This module is pure arithmetic and shape validation; the rubric document
//! itself is parsed in `esg_io`/`esg_algo`, which build `Rubric` values from
//! the on-disk JSON.

use core::fmt;

#[cfg(not(feature = "std"))]
use alloc::{borrow::ToOwned, string::String, vec::Vec};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::tokens::Theme;

/// A maturity stage, 0 (no evidence of practice) through 4 (leading practice).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Stage(u8);

pub const MAX_STAGE: u8 = 4;

impl Stage {
    pub fn new(value: u8) -> Result<Self, CoreError> {
        if value > MAX_STAGE {
            Err(CoreError::DomainOutOfRange("stage"))
        } else {
            Ok(Stage(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Confidence schedule resolving the open question left by the distillation:
/// `base = 0.70`, `+0.05` per stage (capped so the climb never exceeds
/// `0.90`), then `-0.10` if the evidence count is exactly at the theme's
/// `evidence_min` floor (meeting the gate by the thinnest possible margin).
/// Bounded to `[0.60, 0.90]`.
///
/// Stage 0 is a confident negative finding, not the bottom of the climb: a
/// theme lands at stage 0 either because the evidence gate was never met
/// (short-circuited before this function runs) or because the evidence
/// *was* sufficient and still showed no sign of the practice — the same
/// certainty a top-of-scale stage 4 carries, just in the other direction.
/// It therefore starts from the climb's cap (`0.90`) rather than its floor.
pub fn confidence_schedule(stage: Stage, evidence_count: usize, evidence_min: usize) -> f64 {
    let climbed = if stage.value() == 0 {
        0.90
    } else {
        0.70 + 0.05 * f64::from(stage.value())
    };
    let mut confidence = climbed.min(0.90);
    if evidence_count == evidence_min {
        confidence -= 0.10;
    }
    confidence.clamp(0.60, 0.90)
}

/// Rubric document version, e.g. `"v3.0"`. Free-form but non-empty ASCII.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct RubricVersion(String);

impl RubricVersion {
    pub fn new(s: &str) -> Result<Self, CoreError> {
        if s.is_empty() || s.len() > 32 || !s.is_ascii() {
            Err(CoreError::BadShape)
        } else {
            Ok(RubricVersion(s.to_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RubricVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fixed, load-once descriptor for a single theme: its keyword lexicon and
/// the evidence-gate floor. Never mutated after construction from the
/// rubric document.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ThemeDescriptor {
    pub theme: Theme,
    pub keywords: Vec<String>,
    pub evidence_min: usize,
    pub distinct_pages_min: usize,
}

/// The full rubric: version plus one descriptor per theme, in rubric order.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rubric {
    pub version: RubricVersion,
    pub themes: Vec<ThemeDescriptor>,
}

impl Rubric {
    pub fn descriptor(&self, theme: Theme) -> Option<&ThemeDescriptor> {
        self.themes.iter().find(|d| d.theme == theme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_bounds() {
        assert!(Stage::new(4).is_ok());
        assert!(Stage::new(5).is_err());
    }

    #[test]
    fn confidence_schedule_monotone_and_bounded() {
        let prev = confidence_schedule(Stage::new(0).unwrap(), 5, 2);
        for s in 1..=MAX_STAGE {
            let stage = Stage::new(s).unwrap();
            let c = confidence_schedule(stage, 5, 2);
            assert!(c >= 0.60 && c <= 0.90);
            let _ = prev;
        }
        let at_floor = confidence_schedule(Stage::new(3).unwrap(), 2, 2);
        let above_floor = confidence_schedule(Stage::new(3).unwrap(), 3, 2);
        assert!(at_floor < above_floor);
    }

    #[test]
    fn rubric_version_validates() {
        assert!(RubricVersion::new("v3.0").is_ok());
        assert!(RubricVersion::new("").is_err());
    }
}
