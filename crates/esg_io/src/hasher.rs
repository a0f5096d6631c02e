//! SHA-256 hashing utilities over raw bytes and canonical JSON.
//!
//! Deterministic: same canonical structure => same lowercase 64-hex across
//! OS/arch.

#![forbid(unsafe_code)]

use crate::IoError;

#[cfg(feature = "hash")]
use digest::Digest;
#[cfg(feature = "hash")]
use sha2::Sha256;

#[cfg(all(feature = "hash", feature = "serde"))]
use crate::canonical_json::to_canonical_bytes;
#[cfg(all(feature = "hash", feature = "serde"))]
use serde::Serialize;

/// Compute lowercase 64-hex SHA-256 of raw bytes.
#[cfg(feature = "hash")]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let out = hasher.finalize();
    hex::encode(out)
}

#[cfg(not(feature = "hash"))]
pub fn sha256_hex(_bytes: &[u8]) -> String {
    String::new()
}

/// Streaming SHA-256 for any reader; returns lowercase 64-hex.
#[cfg(feature = "hash")]
pub fn sha256_stream<R: std::io::Read>(reader: &mut R) -> Result<String, IoError> {
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf).map_err(|e| IoError::Path(e.to_string()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(not(feature = "hash"))]
pub fn sha256_stream<R: std::io::Read>(_reader: &mut R) -> Result<String, IoError> {
    Err(IoError::Hash("hash feature disabled".into()))
}

/// SHA-256 of canonical JSON representation (sorted keys, no trailing newline).
#[cfg(all(feature = "hash", feature = "serde"))]
pub fn sha256_canonical<T: Serialize>(value: &T) -> Result<String, IoError> {
    let bytes = to_canonical_bytes(value)?;
    Ok(sha256_hex(&bytes))
}

#[cfg(not(all(feature = "hash", feature = "serde")))]
pub fn sha256_canonical<T>(_value: &T) -> Result<String, IoError> {
    Err(IoError::Hash("hash+serde features required".into()))
}

/// Hash a file from disk; returns lowercase 64-hex.
#[cfg(feature = "hash")]
pub fn sha256_file<P: AsRef<std::path::Path>>(path: P) -> Result<String, IoError> {
    let mut f = std::fs::File::open(path).map_err(|e| IoError::Path(e.to_string()))?;
    sha256_stream(&mut f)
}

#[cfg(not(feature = "hash"))]
pub fn sha256_file<P: AsRef<std::path::Path>>(_path: P) -> Result<String, IoError> {
    Err(IoError::Hash("hash feature disabled".into()))
}

/// Cache key for a model call: sha256 of the canonical JSON of
/// `{model_id, params, input}`, per the content-addressed cache contract.
#[cfg(all(feature = "hash", feature = "serde"))]
pub fn cache_key<P: Serialize, I: Serialize>(
    model_id: &str,
    params: &P,
    input: &I,
) -> Result<String, IoError> {
    let envelope = serde_json::json!({
        "model_id": model_id,
        "params": serde_json::to_value(params)?,
        "input": serde_json::to_value(input)?,
    });
    sha256_canonical(&envelope)
}

#[cfg(not(all(feature = "hash", feature = "serde")))]
pub fn cache_key<P, I>(_model_id: &str, _params: &P, _input: &I) -> Result<String, IoError> {
    Err(IoError::Hash("hash+serde features required".into()))
}

/// `trace_id`: sha256 of the canonical JSON of the run's frozen parameters.
#[cfg(all(feature = "hash", feature = "serde"))]
pub fn trace_id_from_params<T: Serialize>(params: &T) -> Result<String, IoError> {
    sha256_canonical(params)
}

// ---------- Hex helpers ----------

/// True iff string is lowercase 64-hex.
pub fn is_hex64(s: &str) -> bool {
    s.len() == 64
        && s.as_bytes()
            .iter()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Return a short prefix of a 64-hex string (1..=64). Errors if non-hex or out of range.
pub fn short_hex(full_hex: &str, len: usize) -> Result<String, IoError> {
    if !(1..=64).contains(&len) {
        return Err(IoError::Hash("short_hex length out of range".into()));
    }
    if !is_hex64(full_hex) {
        return Err(IoError::Hash("short_hex expects lowercase 64-hex".into()));
    }
    Ok(full_hex[..len].to_string())
}

/// Strict check for "YYYY-MM-DDTHH:MM:SSZ".
pub fn is_rfc3339_utc_seconds(s: &str) -> bool {
    if s.len() != 20 {
        return false;
    }
    let b = s.as_bytes();
    fn is_digit(x: u8) -> bool {
        (b'0'..=b'9').contains(&x)
    }
    for &i in &[0, 1, 2, 3, 5, 6, 8, 9, 11, 12, 14, 15, 17, 18] {
        if !is_digit(b[i]) {
            return false;
        }
    }
    b[4] == b'-' && b[7] == b'-' && b[10] == b'T' && b[13] == b':' && b[16] == b':' && b[19] == b'Z'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex64_roundtrip() {
        let h = sha256_hex(b"hello");
        assert!(is_hex64(&h));
        assert_eq!(short_hex(&h, 8).unwrap().len(), 8);
    }

    #[test]
    fn rfc3339_shape() {
        assert!(is_rfc3339_utc_seconds("2025-10-28T06:00:00Z"));
        assert!(!is_rfc3339_utc_seconds("2025-10-28T06:00:00"));
    }

    #[test]
    fn cache_key_is_stable_under_field_order() {
        let a = serde_json::json!({"x": 1, "y": 2});
        let b = serde_json::json!({"y": 2, "x": 1});
        let ka = cache_key("model-a", &serde_json::json!({}), &a).unwrap();
        let kb = cache_key("model-a", &serde_json::json!({}), &b).unwrap();
        assert_eq!(ka, kb);
    }
}
