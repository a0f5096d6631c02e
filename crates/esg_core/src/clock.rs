//! Deterministic wall-clock service. Every timestamp that ends up in an
//! artifact must be read through a `Clock`, never `SystemTime::now()`
//! directly, so that `DETERMINISTIC_TIMESTAMP` can fully pin a replay.

use core::fmt;

#[cfg(not(feature = "std"))]
use alloc::{borrow::ToOwned, string::String};

use crate::errors::CoreError;
use crate::ids::is_rfc3339_utc_seconds;

/// An RFC3339 UTC timestamp truncated to whole seconds, the only shape this
/// engine ever writes into an artifact.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Timestamp(String);

impl Timestamp {
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        if is_rfc3339_utc_seconds(s) {
            Ok(Timestamp(s.to_owned()))
        } else {
            Err(CoreError::InvalidTimestamp)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of "now" for a run. The only production implementation is
/// `Clock::Fixed`, built from `DETERMINISTIC_TIMESTAMP` at process start;
/// there is no wall-clock variant; every run is pinned, since an
/// unpinned clock would break triple-replay identity by construction.
#[derive(Clone, Debug)]
pub struct Clock {
    now: Timestamp,
}

impl Clock {
    pub fn fixed(now: Timestamp) -> Self {
        Clock { now }
    }

    pub fn from_env_value(s: &str) -> Result<Self, CoreError> {
        Ok(Clock::fixed(Timestamp::parse(s)?))
    }

    pub fn now(&self) -> &Timestamp {
        &self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_rejects_bad_shape() {
        assert!(Timestamp::parse("2025-10-28T06:00:00Z").is_ok());
        assert!(Timestamp::parse("2025-10-28T06:00:00.000Z").is_err());
        assert!(Timestamp::parse("not-a-timestamp").is_err());
    }

    #[test]
    fn clock_is_fixed() {
        let clock = Clock::from_env_value("2025-10-28T06:00:00Z").unwrap();
        assert_eq!(clock.now().as_str(), "2025-10-28T06:00:00Z");
    }
}
