//! Configuration types for the gatekeeper.
//!
//! [`RulesetConfig`] models the YAML ruleset document the wider governance
//! platform delivers to this core (spec §6): `enabled`, `similarity_threshold`,
//! `num_hash_functions`, `num_bands`, and an optional `rules` mapping that
//! this core ignores entirely (policy decisions are out of scope, §1).

pub mod validation;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::errors::{GatekeeperError, Result};

pub use validation::{validate_positive_usize, validate_range, validate_unit_range};

/// Default similarity threshold used when a ruleset omits one, and the
/// value [`RulesetConfig::clamp_threshold`] falls back to for an
/// out-of-range caller-supplied threshold (spec §4.6).
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.95;

/// Minimum accepted similarity threshold (spec §4.6).
pub const MIN_SIMILARITY_THRESHOLD: f64 = 0.5;

/// Maximum accepted similarity threshold.
pub const MAX_SIMILARITY_THRESHOLD: f64 = 1.0;

/// Default number of MinHash hash functions (signature width H).
pub const DEFAULT_NUM_HASHES: usize = 128;

/// Default number of LSH bands.
pub const DEFAULT_NUM_BANDS: usize = 16;

/// Default shingle width (fixed per spec §4.2, but kept configurable for tests).
pub const DEFAULT_SHINGLE_WIDTH: usize = 3;

/// Default PRNG seed for MinHash coefficient generation (spec §4.3).
pub const DEFAULT_MINHASH_SEED: u64 = 42;

/// The ruleset configuration the host platform delivers to this core.
///
/// `rules` is accepted but never interpreted — policy decisions live outside
/// the core (spec §1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesetConfig {
    /// Whether duplicate detection is active at all.
    #[serde(default = "RulesetConfig::default_enabled")]
    pub enabled: bool,

    /// Minimum estimated Jaccard similarity a match must reach to be
    /// reported as a duplicate.
    #[serde(default = "RulesetConfig::default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Number of MinHash hash functions (the signature width, H).
    #[serde(default = "RulesetConfig::default_num_hash_functions")]
    pub num_hash_functions: usize,

    /// Number of LSH bands (B).
    #[serde(default = "RulesetConfig::default_num_bands")]
    pub num_bands: usize,

    /// Opaque rule bodies the core does not interpret.
    #[serde(default)]
    pub rules: HashMap<String, serde_yaml::Value>,
}

impl RulesetConfig {
    const fn default_enabled() -> bool {
        true
    }

    const fn default_similarity_threshold() -> f64 {
        DEFAULT_SIMILARITY_THRESHOLD
    }

    const fn default_num_hash_functions() -> usize {
        DEFAULT_NUM_HASHES
    }

    const fn default_num_bands() -> usize {
        DEFAULT_NUM_BANDS
    }

    /// Parse a ruleset document from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate internal consistency of the configuration.
    pub fn validate(&self) -> Result<()> {
        validate_positive_usize(self.num_hash_functions, "num_hash_functions")?;
        validate_positive_usize(self.num_bands, "num_bands")?;
        validate_range(
            self.similarity_threshold,
            MIN_SIMILARITY_THRESHOLD,
            MAX_SIMILARITY_THRESHOLD,
            "similarity_threshold",
        )
        .map_err(|_| {
            GatekeeperError::config(format!(
                "similarity_threshold must be between {MIN_SIMILARITY_THRESHOLD} and {MAX_SIMILARITY_THRESHOLD}"
            ))
        })?;
        Ok(())
    }

    /// Clamp an ad hoc threshold (e.g. supplied by a single `check_for_duplicates`
    /// call) into the accepted range, silently substituting the default when
    /// it falls outside `[0.5, 1.0]` (spec §4.6).
    pub fn clamp_threshold(threshold: f64) -> f64 {
        if (MIN_SIMILARITY_THRESHOLD..=MAX_SIMILARITY_THRESHOLD).contains(&threshold) {
            threshold
        } else {
            DEFAULT_SIMILARITY_THRESHOLD
        }
    }
}

impl Default for RulesetConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            similarity_threshold: Self::default_similarity_threshold(),
            num_hash_functions: Self::default_num_hash_functions(),
            num_bands: Self::default_num_bands(),
            rules: HashMap::new(),
        }
    }
}
