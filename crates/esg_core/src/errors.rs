//! Minimal error set for core-domain validation & parsing. I/O-free.

use core::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CoreError {
    NonAscii,
    TooLong,
    BadShape,
    InvalidTimestamp,
    InvalidTheme,
    DomainOutOfRange(&'static str),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::NonAscii => write!(f, "non-ascii input"),
            CoreError::TooLong => write!(f, "input too long"),
            CoreError::BadShape => write!(f, "malformed identifier"),
            CoreError::InvalidTimestamp => write!(f, "invalid timestamp"),
            CoreError::InvalidTheme => write!(f, "unknown theme code"),
            CoreError::DomainOutOfRange(k) => write!(f, "domain out of range: {k}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CoreError {}
