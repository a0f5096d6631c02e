//! Fixed domain vocabularies: the seven rubric themes, and small enums used
//! across the scoring pipeline.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// The seven ESG maturity themes, in rubric order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Theme {
    /// Transition Strategy & Planning
    Tsp,
    /// Oversight & Strategic Positioning
    Osp,
    /// Disclosure Maturity
    Dm,
    /// Greenhouse Gas Accounting
    Ghg,
    /// Risk & Dependency
    Rd,
    /// Engagement & Incentives
    Ei,
    /// Risk Management Maturity
    Rmm,
}

impl Theme {
    /// All seven themes, in rubric order.
    pub const ALL: [Theme; 7] = [
        Theme::Tsp,
        Theme::Osp,
        Theme::Dm,
        Theme::Ghg,
        Theme::Rd,
        Theme::Ei,
        Theme::Rmm,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Theme::Tsp => "TSP",
            Theme::Osp => "OSP",
            Theme::Dm => "DM",
            Theme::Ghg => "GHG",
            Theme::Rd => "RD",
            Theme::Ei => "EI",
            Theme::Rmm => "RMM",
        }
    }

    /// Rubric-order rank, used for deterministic sort keys.
    pub fn rank(self) -> u8 {
        Theme::ALL.iter().position(|t| *t == self).unwrap() as u8
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Theme {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TSP" => Ok(Theme::Tsp),
            "OSP" => Ok(Theme::Osp),
            "DM" => Ok(Theme::Dm),
            "GHG" => Ok(Theme::Ghg),
            "RD" => Ok(Theme::Rd),
            "EI" => Ok(Theme::Ei),
            "RMM" => Ok(Theme::Rmm),
            _ => Err(CoreError::InvalidTheme),
        }
    }
}

/// `RETRIEVAL_TIER` knob: which chunk layer a run is allowed to read from.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum RetrievalTier {
    Auto,
    Silver,
    Bronze,
}

impl FromStr for RetrievalTier {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(RetrievalTier::Auto),
            "silver" => Ok(RetrievalTier::Silver),
            "bronze" => Ok(RetrievalTier::Bronze),
            _ => Err(CoreError::BadShape),
        }
    }
}

impl fmt::Display for RetrievalTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RetrievalTier::Auto => "auto",
            RetrievalTier::Silver => "silver",
            RetrievalTier::Bronze => "bronze",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_roundtrip_and_rank() {
        for (i, t) in Theme::ALL.iter().enumerate() {
            let code = t.code();
            let parsed: Theme = code.parse().unwrap();
            assert_eq!(parsed, *t);
            assert_eq!(t.rank() as usize, i);
        }
        assert!("XYZ".parse::<Theme>().is_err());
    }

    #[test]
    fn retrieval_tier_roundtrip() {
        assert_eq!("auto".parse::<RetrievalTier>().unwrap(), RetrievalTier::Auto);
        assert_eq!("bronze".parse::<RetrievalTier>().unwrap(), RetrievalTier::Bronze);
        assert!("cold".parse::<RetrievalTier>().is_err());
    }
}
