//! Process-wide environment configuration. Every knob named in the external
//! interface contract is parsed here, once, at startup — never read from
//! `std::env` ad hoc elsewhere in the engine.

use std::path::PathBuf;

use esg_core::tokens::RetrievalTier;

use crate::IoError;

/// Everything the engine needs from the process environment, parsed once and
/// threaded explicitly from there on.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub seed: u64,
    pub deterministic_hash_seed: u64,
    pub deterministic_timestamp: String,
    pub offline_replay: bool,
    pub retrieval_tier: RetrievalTier,
    pub data_root: PathBuf,
    pub cache_root: PathBuf,
    pub artifacts_root: PathBuf,
}

impl EngineConfig {
    /// Build from a generic environment lookup function, so callers (and
    /// tests) need not mutate real process environment variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, IoError> {
        let seed = parse_u64_or_default(&lookup, "SEED", 42)?;
        let deterministic_hash_seed = parse_u64_or_default(&lookup, "DETERMINISTIC_HASH_SEED", 0)?;

        let deterministic_timestamp = lookup("DETERMINISTIC_TIMESTAMP")
            .ok_or_else(|| IoError::Invalid("DETERMINISTIC_TIMESTAMP is required".into()))?;
        if !crate::hasher::is_rfc3339_utc_seconds(&deterministic_timestamp) {
            return Err(IoError::Invalid(
                "DETERMINISTIC_TIMESTAMP must be RFC3339 UTC 'YYYY-MM-DDTHH:MM:SSZ'".into(),
            ));
        }

        let offline_replay = match lookup("OFFLINE_REPLAY") {
            None => false,
            Some(v) => parse_bool(&v)
                .ok_or_else(|| IoError::Invalid(format!("OFFLINE_REPLAY: not a bool: {v}")))?,
        };

        let retrieval_tier = match lookup("RETRIEVAL_TIER") {
            None => RetrievalTier::Auto,
            Some(v) => v
                .parse()
                .map_err(|_| IoError::Invalid(format!("RETRIEVAL_TIER: invalid value {v}")))?,
        };

        if offline_replay && retrieval_tier == RetrievalTier::Bronze {
            return Err(IoError::Invalid(
                "OFFLINE_REPLAY=true with RETRIEVAL_TIER=bronze is forbidden".into(),
            ));
        }

        let data_root = lookup("DATA_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data"));
        let cache_root = lookup("CACHE_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("cache"));
        let artifacts_root = lookup("ARTIFACTS_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("artifacts"));

        Ok(EngineConfig {
            seed,
            deterministic_hash_seed,
            deterministic_timestamp,
            offline_replay,
            retrieval_tier,
            data_root,
            cache_root,
            artifacts_root,
        })
    }

    /// Build from the real process environment.
    pub fn from_env() -> Result<Self, IoError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }
}

fn parse_u64_or_default(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
) -> Result<u64, IoError> {
    match lookup(key) {
        None => Ok(default),
        Some(v) => v
            .parse::<u64>()
            .map_err(|_| IoError::Invalid(format!("{key}: not a u64: {v}"))),
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(map: &HashMap<&str, &str>) -> impl Fn(&str) -> Option<String> + '_ {
        move |k| map.get(k).map(|v| v.to_string())
    }

    #[test]
    fn defaults_apply() {
        let mut env = HashMap::new();
        env.insert("DETERMINISTIC_TIMESTAMP", "2025-10-28T06:00:00Z");
        let cfg = EngineConfig::from_lookup(lookup(&env)).unwrap();
        assert_eq!(cfg.seed, 42);
        assert_eq!(cfg.deterministic_hash_seed, 0);
        assert!(!cfg.offline_replay);
        assert_eq!(cfg.retrieval_tier, RetrievalTier::Auto);
    }

    #[test]
    fn rejects_offline_replay_with_bronze() {
        let mut env = HashMap::new();
        env.insert("DETERMINISTIC_TIMESTAMP", "2025-10-28T06:00:00Z");
        env.insert("OFFLINE_REPLAY", "true");
        env.insert("RETRIEVAL_TIER", "bronze");
        assert!(EngineConfig::from_lookup(lookup(&env)).is_err());
    }

    #[test]
    fn requires_deterministic_timestamp() {
        let env = HashMap::new();
        assert!(EngineConfig::from_lookup(lookup(&env)).is_err());
    }
}
