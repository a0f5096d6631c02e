//! Content-addressed cache for every external model call (embeddings,
//! narrative generation). The cache is the only sanctioned boundary between
//! the engine and the network: fetch-phase runs populate it, replay-phase
//! runs (`OFFLINE_REPLAY=true`) may only read it and must fail closed on a
//! miss.

use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::canonical_json::write_canonical_file;
use crate::hasher::cache_key;
use crate::IoError;

/// One line of `cache/ledger.jsonl`: an append-only audit record of every
/// cache access, online or not.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry<'a> {
    pub phase: &'a str,
    pub key: &'a str,
    pub model_id: &'a str,
    pub kind: &'a str,
    pub online: bool,
    pub deterministic_timestamp: &'a str,
}

/// Content-addressed cache rooted at `CACHE_ROOT`.
pub struct Cache {
    root: PathBuf,
    offline_replay: bool,
    deterministic_timestamp: String,
}

impl Cache {
    pub fn new(root: impl Into<PathBuf>, offline_replay: bool, deterministic_timestamp: String) -> Self {
        Cache {
            root: root.into(),
            offline_replay,
            deterministic_timestamp,
        }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.root.join("entries").join(format!("{key}.json"))
    }

    fn ledger_path(&self) -> PathBuf {
        self.root.join("ledger.jsonl")
    }

    fn append_ledger(&self, entry: &LedgerEntry<'_>) -> Result<(), IoError> {
        fs::create_dir_all(&self.root).map_err(|e| IoError::Path(e.to_string()))?;
        let value = serde_json::to_value(entry)?;
        let line = String::from_utf8(crate::canonical_json::to_canonical_json_bytes(&value))
            .expect("canonical JSON is always valid UTF-8");
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.ledger_path())
            .map_err(|e| IoError::Path(e.to_string()))?;
        writeln!(f, "{line}").map_err(|e| IoError::Path(e.to_string()))?;
        Ok(())
    }

    /// Look up or compute a cached model call. `kind` is a short label
    /// ("embedding", "narrative") recorded in the ledger for audit. `call` is
    /// only ever invoked when not offline-replaying and the key is absent;
    /// a replay-mode miss is a hard error (fail-closed, never silently
    /// falls back to calling out).
    pub fn get_or_call<P, I, O, F>(
        &self,
        model_id: &str,
        kind: &str,
        params: &P,
        input: &I,
        call: F,
    ) -> Result<O, IoError>
    where
        P: Serialize,
        I: Serialize,
        O: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<O, IoError>,
    {
        let key = cache_key(model_id, params, input)?;
        let path = self.entry_path(&key);

        if path.exists() {
            let bytes = fs::read(&path).map_err(|e| IoError::Path(e.to_string()))?;
            let value: O = serde_json::from_slice(&bytes)?;
            self.append_ledger(&LedgerEntry {
                phase: if self.offline_replay { "replay" } else { "fetch" },
                key: &key,
                model_id,
                kind,
                online: false,
                deterministic_timestamp: &self.deterministic_timestamp,
            })?;
            return Ok(value);
        }

        if self.offline_replay {
            return Err(IoError::Invalid(format!(
                "cache miss for key {key} during offline replay (kind={kind}, model={model_id})"
            )));
        }

        let value = call()?;
        let json = serde_json::to_value(&value)?;
        write_canonical_file(&path, &json).map_err(|e| IoError::Path(e.to_string()))?;
        self.append_ledger(&LedgerEntry {
            phase: "fetch",
            key: &key,
            model_id,
            kind,
            online: true,
            deterministic_timestamp: &self.deterministic_timestamp,
        })?;
        Ok(value)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn first_call_executes_and_caches() {
        let dir = tempdir().unwrap();
        let cache = Cache::new(dir.path(), false, "2025-10-28T06:00:00Z".to_string());
        let mut calls = 0;
        let params = serde_json::json!({"alpha": 1});
        let input = serde_json::json!("hello");

        let out: String = cache
            .get_or_call("model-a", "embedding", &params, &input, || {
                calls += 1;
                Ok("result".to_string())
            })
            .unwrap();
        assert_eq!(out, "result");
        assert_eq!(calls, 1);

        let out2: String = cache
            .get_or_call("model-a", "embedding", &params, &input, || {
                calls += 1;
                Ok("result".to_string())
            })
            .unwrap();
        assert_eq!(out2, "result");
        assert_eq!(calls, 1, "second call must hit cache, not recompute");
    }

    #[test]
    fn offline_replay_fails_closed_on_miss() {
        let dir = tempdir().unwrap();
        let cache = Cache::new(dir.path(), true, "2025-10-28T06:00:00Z".to_string());
        let params = serde_json::json!({});
        let input = serde_json::json!("anything");
        let result: Result<String, IoError> =
            cache.get_or_call("model-a", "embedding", &params, &input, || {
                Ok("should-not-run".to_string())
            });
        assert!(result.is_err());
    }
}
