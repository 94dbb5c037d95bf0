//! Wire DTOs (spec §6): stable JSON contracts for future remote use.
//!
//! Field names use `#[serde(rename_all = "camelCase")]` so Rust's
//! idiomatic snake_case field names produce exactly the JSON keys the spec
//! names, following the same convention the teacher uses throughout its
//! own `api::results` DTOs.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::minhash::Signature;

/// A generated signature, carried both as a cell array and a Base64 blob
/// plus diagnostic counts (spec §4.6 `generate_signature`, spec §6 DTO).
///
/// `signatureBlob` (the raw bytes) is intentionally not serialized — only
/// `signatureArray` and `signatureBase64` cross the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureDto {
    /// The API's identifier.
    pub api_uuid: String,
    /// The owning tenant.
    pub organization: String,
    /// The signature cells, in index order.
    pub signature_array: Vec<u32>,
    /// The signature bytes, standard Base64 encoded.
    pub signature_base64: String,
    /// Configured signature width (`H`).
    pub num_hash_functions: usize,
    /// Number of features extracted from the specification.
    pub feature_count: usize,
    /// Number of shingles derived from those features.
    pub shingle_count: usize,
}

impl SignatureDto {
    /// Build a DTO from a computed signature plus diagnostic counts.
    pub fn new(
        api_uuid: impl Into<String>,
        organization: impl Into<String>,
        signature: &Signature,
        feature_count: usize,
        shingle_count: usize,
    ) -> Self {
        Self {
            api_uuid: api_uuid.into(),
            organization: organization.into(),
            signature_array: signature.cells().to_vec(),
            signature_base64: BASE64.encode(signature.to_bytes()),
            num_hash_functions: signature.len(),
            feature_count,
            shingle_count,
        }
    }
}

/// A single near-duplicate match, reported alongside enough context for
/// the host policy layer to decide what to do about it (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictReport {
    /// The identifier of the matching, already-registered API.
    pub matched_api_uuid: String,
    /// The matching API's display name, if known to the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_api_name: Option<String>,
    /// The matching API's version, if known to the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_api_version: Option<String>,
    /// The matching API's base context/path, if known to the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_api_context: Option<String>,
    /// Estimated Jaccard similarity against the query signature.
    pub similarity_score: f64,
    /// Reserved for a future finer-grained path-only similarity breakdown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_similarity: Option<f64>,
    /// Reserved for a future finer-grained schema-only similarity breakdown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_similarity: Option<f64>,
    /// Reserved for a future finer-grained metadata-only similarity breakdown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_similarity: Option<f64>,
    /// Human-readable explanation of the match.
    pub message: String,
    /// A short operator-facing recommendation (reuse, reject, version).
    pub recommendation: String,
}

/// The outcome of a [`crate::service::SignatureService::check_for_duplicates`]
/// call (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DedupResult {
    /// Whether any non-self match met the threshold.
    pub is_duplicate: bool,
    /// Whether at least one match reached similarity >= 0.95.
    pub high_confidence: bool,
    /// Every surviving match, most similar first.
    pub conflict_reports: Vec<ConflictReport>,
    /// The submitted API's identifier.
    pub query_api_uuid: String,
    /// The submitted API's tenant.
    pub organization: String,
    /// The threshold actually used (after clamping, if applicable).
    pub threshold: f64,
    /// A short human-readable summary of the outcome.
    pub message: String,
}

/// Similarity level above which a match is considered "high confidence"
/// (spec §4.6).
pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.95;
