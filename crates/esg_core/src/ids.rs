//! Canonical identifiers for the ESG engine's data model. No I/O; pure parsing
//! and shape validation so that every layer agrees on what a `doc_id` or
//! `chunk_id` is allowed to look like.

use core::fmt;
use core::str::FromStr;

#[cfg(not(feature = "std"))]
use alloc::{borrow::ToOwned, format, string::String};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

const MAX_ID_LEN: usize = 256;
const HEX64_LEN: usize = 64;
const TOKEN_MAX_LEN: usize = 64;

#[inline]
fn is_ascii_no_nul(s: &str) -> bool {
    !s.as_bytes().iter().any(|&b| b == 0 || b > 0x7F)
}

/// Lowercase hex, exactly 64 chars (a SHA-256 digest).
#[inline]
pub fn is_valid_sha256(s: &str) -> bool {
    s.len() == HEX64_LEN
        && is_ascii_no_nul(s)
        && s.as_bytes()
            .iter()
            .all(|&b| (b'0'..=b'9').contains(&b) || (b'a'..=b'f').contains(&b))
}

/// Token charset shared by org/theme/doc identifiers: `^[A-Za-z0-9_.:-]{1,64}$`.
#[inline]
pub fn is_valid_token(s: &str) -> bool {
    let bs = s.as_bytes();
    let len = bs.len();
    if len == 0 || len > TOKEN_MAX_LEN || !is_ascii_no_nul(s) {
        return false;
    }
    bs.iter().all(|&b| {
        (b'A'..=b'Z').contains(&b)
            || (b'a'..=b'z').contains(&b)
            || (b'0'..=b'9').contains(&b)
            || b == b'_'
            || b == b'.'
            || b == b':'
            || b == b'-'
    })
}

macro_rules! simple_string_newtype {
    ($(#[$m:meta])* $name:ident) => {
        $(#[$m])*
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(String);

        impl $name {
            #[inline] pub fn as_str(&self) -> &str { &self.0 }
        }

        impl fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
        }

        impl TryFrom<&str> for $name {
            type Error = CoreError;
            #[inline]
            fn try_from(value: &str) -> Result<Self, Self::Error> { value.parse() }
        }
    }
}

// === Generic digest newtype ===

simple_string_newtype!(
    /// Generic lowercase 64-hex SHA-256 digest.
    Sha256
);

impl FromStr for Sha256 {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !is_ascii_no_nul(s) {
            return Err(CoreError::NonAscii);
        }
        if s.len() > MAX_ID_LEN {
            return Err(CoreError::TooLong);
        }
        if !is_valid_sha256(s) {
            return Err(CoreError::BadShape);
        }
        Ok(Sha256(s.to_owned()))
    }
}
impl Sha256 {
    #[inline]
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

/// `trace_id`: sha256 of canonical run parameters. Same shape as `Sha256`,
/// kept distinct at the type level so the two meanings can't be confused.
pub type TraceId = Sha256;

// === Registry/organization token ===

simple_string_newtype!(
    /// Organization token: `^[A-Za-z0-9_.:-]{1,64}$`.
    OrgId
);

impl FromStr for OrgId {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !is_ascii_no_nul(s) {
            return Err(CoreError::NonAscii);
        }
        if s.len() > MAX_ID_LEN {
            return Err(CoreError::TooLong);
        }
        if !is_valid_token(s) {
            return Err(CoreError::BadShape);
        }
        Ok(OrgId(s.to_owned()))
    }
}

// === Document id: "{ORG}_{YEAR}" ===

simple_string_newtype!(
    /// Stable identifier for a (company, year) document instance: `{ORG}_{YEAR}`.
    DocId
);

impl DocId {
    /// Build a `DocId` from its constituent org token and fiscal year.
    pub fn new(org: &OrgId, fiscal_year: u16) -> Self {
        DocId(format!("{org}_{fiscal_year}"))
    }

    /// The fiscal year suffix, if the id ends in `_<4 digits>`.
    pub fn fiscal_year(&self) -> Option<u16> {
        let (_, suffix) = self.0.rsplit_once('_')?;
        if suffix.len() == 4 && suffix.bytes().all(|b| b.is_ascii_digit()) {
            suffix.parse().ok()
        } else {
            None
        }
    }
}

impl FromStr for DocId {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !is_ascii_no_nul(s) {
            return Err(CoreError::NonAscii);
        }
        if s.is_empty() || s.len() > MAX_ID_LEN {
            return Err(CoreError::TooLong);
        }
        // Looser than `is_valid_token` (orgs may be multi-segment), but still ASCII,
        // no whitespace, no path separators.
        if !s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'))
        {
            return Err(CoreError::BadShape);
        }
        Ok(DocId(s.to_owned()))
    }
}

// === Chunk id: "{doc_id}_p{page}_c{index}" ===

simple_string_newtype!(
    /// `{doc_id}_p{page_no}_c{index}`.
    ChunkId
);

impl ChunkId {
    pub fn new(doc_id: &DocId, page_no: u32, index: u32) -> Self {
        ChunkId(format!("{doc_id}_p{page_no}_c{index}"))
    }

    /// The `doc_id` prefix embedded in this chunk id (best-effort split on `_p`).
    pub fn doc_id_prefix(&self) -> Option<&str> {
        let idx = self.0.rfind("_p")?;
        Some(&self.0[..idx])
    }
}

impl FromStr for ChunkId {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !is_ascii_no_nul(s) {
            return Err(CoreError::NonAscii);
        }
        if s.is_empty() || s.len() > MAX_ID_LEN {
            return Err(CoreError::TooLong);
        }
        if !s.contains("_p") || !s.contains("_c") {
            return Err(CoreError::BadShape);
        }
        Ok(ChunkId(s.to_owned()))
    }
}

// === Evidence id: "{chunk_id}::{ordinal:02d}" ===

simple_string_newtype!(
    /// `{chunk_id}::{ordinal:02d}`.
    EvidenceId
);

impl EvidenceId {
    pub fn new(chunk_id: &ChunkId, ordinal: u32) -> Self {
        EvidenceId(format!("{chunk_id}::{ordinal:02}"))
    }
}

impl FromStr for EvidenceId {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !is_ascii_no_nul(s) {
            return Err(CoreError::NonAscii);
        }
        if s.is_empty() || s.len() > MAX_ID_LEN {
            return Err(CoreError::TooLong);
        }
        if !s.contains("::") {
            return Err(CoreError::BadShape);
        }
        Ok(EvidenceId(s.to_owned()))
    }
}

/// Strict RFC3339 "YYYY-MM-DDTHH:MM:SSZ" shape check (20 bytes).
#[inline]
pub fn is_rfc3339_utc_seconds(s: &str) -> bool {
    let b = s.as_bytes();
    if b.len() != 20 {
        return false;
    }
    let digits = |r: core::ops::Range<usize>| b[r].iter().all(|&c| (b'0'..=b'9').contains(&c));
    digits(0..4)
        && b[4] == b'-'
        && digits(5..7)
        && b[7] == b'-'
        && digits(8..10)
        && b[10] == b'T'
        && digits(11..13)
        && b[13] == b':'
        && digits(14..16)
        && b[16] == b':'
        && digits(17..19)
        && b[19] == b'Z'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_roundtrip() {
        let hex = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcd";
        let d: Sha256 = hex.parse().unwrap();
        assert_eq!(d.as_hex(), hex);
        assert!("not-hex".parse::<Sha256>().is_err());
    }

    #[test]
    fn doc_chunk_evidence_ids() {
        let org: OrgId = "LSE_HEAD".parse().unwrap();
        let doc = DocId::new(&org, 2025);
        assert_eq!(doc.as_str(), "LSE_HEAD_2025");
        assert_eq!(doc.fiscal_year(), Some(2025));

        let chunk = ChunkId::new(&doc, 12, 3);
        assert_eq!(chunk.as_str(), "LSE_HEAD_2025_p12_c3");
        assert_eq!(chunk.doc_id_prefix(), Some("LSE_HEAD_2025"));

        let ev = EvidenceId::new(&chunk, 7);
        assert_eq!(ev.as_str(), "LSE_HEAD_2025_p12_c3::07");
    }

    #[test]
    fn rfc3339_shape() {
        assert!(is_rfc3339_utc_seconds("2025-10-28T06:00:00Z"));
        assert!(!is_rfc3339_utc_seconds("2025-10-28 06:00:00Z"));
        assert!(!is_rfc3339_utc_seconds("2025-10-28T06:00:00"));
    }
}
