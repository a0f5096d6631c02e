//! esg_core — core types, ids, deterministic ordering, and the Clock/SeededRng
//! services shared across the ESG maturity evaluation engine.
//!
//! This crate is **I/O-free**: it defines stable types/APIs used by every
//! other crate in the workspace (`esg_io`, `esg_store`, `esg_algo`,
//! `esg_pipeline`, `esg_report`, `esg_cli`) without touching a filesystem,
//! clock, or network.
//!
//! - Identifiers: `DocId`, `ChunkId`, `EvidenceId`, generic `Sha256`/`TraceId`
//! - Domain tokens: `Theme` (the seven rubric themes), `RetrievalTier`
//! - Deterministic ordering and reduction helpers (`StableOrd`, `HashCanon`)
//! - A fixed `Clock` service (no wall-clock variant; every run is pinned)
//! - A seeded RNG service (ChaCha20) for the handful of call sites that need it
//! - Rubric domain types: `Stage`, `confidence_schedule`, `Rubric`
//!
//! Serialization derives are gated behind the `serde` feature.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod clock;
pub mod determinism;
pub mod errors;
pub mod ids;
pub mod rng;
pub mod rubric;
pub mod tokens;

pub mod prelude {
    pub use crate::clock::{Clock, Timestamp};
    pub use crate::determinism::{sort_stable, HashCanon, StableOrd, StableReduce};
    pub use crate::errors::CoreError;
    pub use crate::ids::{ChunkId, DocId, EvidenceId, OrgId, Sha256, TraceId};
    pub use crate::rng::SeededRng;
    pub use crate::rubric::{confidence_schedule, Rubric, RubricVersion, Stage, ThemeDescriptor};
    pub use crate::tokens::{RetrievalTier, Theme};
}
