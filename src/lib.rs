//! # gatekeeper
//!
//! A local similarity-detection core that answers one question at API
//! admission time: is there an already-registered API in this tenant whose
//! structural description is similar enough to this submission that the
//! operator should reject it, ask for reuse, or issue a new version?
//!
//! The crate implements the deterministic pipeline that turns an API
//! specification document (OpenAPI-style JSON or YAML) into a compact
//! fixed-width MinHash signature, and the in-memory locality-sensitive
//! hashing (LSH) index that answers near-duplicate queries against those
//! signatures, backed by a durable SQLite signature store used to rebuild
//! the index on restart.
//!
//! ## Pipeline
//!
//! ```text
//! specification text
//!   -> pruning::extract        (Pruner & Feature Extractor)
//!   -> shingling::shingle      (Shingler)
//!   -> minhash::MinHashGenerator (MinHash Generator)
//!   -> lsh::LshIndex           (candidate lookup + Jaccard verification)
//!   -> store::SignatureStore   (durable persistence, startup hydration)
//! ```
//!
//! [`service::SignatureService`] is the orchestrator most callers should
//! use directly; the lower-level modules are public so the pipeline stages
//! can be exercised independently (as the test suite does).
//!
//! Out of scope, by design (see `SPEC_FULL.md` §1): policy decisions about
//! whether a duplicate should block publication, semantic diffs of APIs,
//! clustering beyond pairwise similarity, cross-tenant federation, and any
//! network I/O.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod core;
pub mod lsh;
pub mod minhash;
pub mod pruning;
pub mod service;
pub mod shingling;
pub mod store;

pub use core::config::RulesetConfig;
pub use core::errors::{GatekeeperError, Result};
pub use lsh::LshIndex;
pub use minhash::{MinHashGenerator, Signature};
pub use service::{ApiLifecycleStatus, DedupResult, SignatureDto, SignatureService};
pub use store::SignatureStore;

/// Library version, read from the crate's own `Cargo.toml` at build time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
