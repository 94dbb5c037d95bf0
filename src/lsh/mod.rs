//! LSH Index (spec §4.4).
//!
//! An in-memory, multi-tenant banded index over MinHash signatures. Signals
//! candidates in O(1) amortized per band via a `BandKey -> {api_id}`
//! mapping, then verifies candidates by estimating full-signature Jaccard
//! similarity. Grounded on the teacher's `LshIndex`
//! (`detectors/lsh/index.rs`): per-band hash maps plus a side table of
//! stored signatures, with the banding math and concurrency wrapper
//! generalized to this spec's `(tenant, api_id)` keyspace and its outer
//! shared-exclusive lock (spec §9 Design Notes, option (a)).

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use tracing::warn;

use crate::core::errors::{GatekeeperError, Result};
use crate::minhash::Signature;

/// A candidate match returned by [`LshIndex::find_similar`]: the matching
/// API id and its estimated Jaccard similarity against the query.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    /// The matching API's identifier.
    pub api_id: String,
    /// Estimated Jaccard similarity in `[0.0, 1.0]`.
    pub similarity: f64,
}

/// The string encoding of a band's `R` consecutive signature cells: the
/// cell values joined with `,` (spec §3 `BandKey` — "stable
/// delimiter-separated decimal form").
fn band_key(cells: &[u32]) -> String {
    let mut key = String::with_capacity(cells.len() * 8);
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            key.push(',');
        }
        key.push_str(&cell.to_string());
    }
    key
}

struct IndexState {
    /// Per-band `BandKey -> {api_id}` bucket tables.
    bands: Vec<HashMap<String, HashSet<String>>>,
    /// `api_id -> signature`.
    signatures: HashMap<String, Signature>,
    /// `api_id -> tenant`.
    tenants: HashMap<String, String>,
}

impl IndexState {
    fn new(num_bands: usize) -> Self {
        Self {
            bands: (0..num_bands).map(|_| HashMap::new()).collect(),
            signatures: HashMap::new(),
            tenants: HashMap::new(),
        }
    }

    fn band_keys(&self, signature: &Signature, rows: usize) -> Vec<String> {
        (0..self.bands.len())
            .map(|band_idx| band_key(signature.band_cells(band_idx, rows)))
            .collect()
    }

    /// Remove every band membership for `api_id`, given its previously
    /// stored signature. Deletes buckets that become empty.
    fn remove_bands(&mut self, api_id: &str, signature: &Signature, rows: usize) {
        for band_idx in 0..self.bands.len() {
            let key = band_key(signature.band_cells(band_idx, rows));
            if let Some(bucket) = self.bands[band_idx].get_mut(&key) {
                bucket.remove(api_id);
                if bucket.is_empty() {
                    self.bands[band_idx].remove(&key);
                }
            }
        }
    }

    fn insert_bands(&mut self, api_id: &str, signature: &Signature, rows: usize) {
        for band_idx in 0..self.bands.len() {
            let key = band_key(signature.band_cells(band_idx, rows));
            self.bands[band_idx]
                .entry(key)
                .or_default()
                .insert(api_id.to_string());
        }
    }
}

/// In-memory, multi-tenant LSH index over MinHash signatures.
///
/// Guarded by a single outer [`parking_lot::RwLock`]: reads
/// (`find_candidates`, `find_similar`, `contains`, `size`,
/// `get_signature`) take shared access, writes (`insert`, `remove`,
/// `clear`) take exclusive access, so no reader ever observes a signature
/// present in one band but not another (spec §5).
pub struct LshIndex {
    num_hashes: usize,
    num_bands: usize,
    rows_per_band: usize,
    state: RwLock<IndexState>,
}

impl LshIndex {
    /// Build an index for `num_hashes` (`H`) cells split into `num_bands`
    /// (`B`) bands. If `H` is not evenly divisible by `B`, `R` is floored
    /// and the trailing `H mod B` cells are ignored uniformly for every
    /// signature in the process (spec §3 banding consistency invariant); a
    /// warning is logged once at construction.
    pub fn new(num_hashes: usize, num_bands: usize) -> Self {
        let rows_per_band = num_hashes / num_bands.max(1);
        if num_bands == 0 || num_hashes % num_bands != 0 {
            warn!(
                num_hashes,
                num_bands, rows_per_band, "H is not evenly divisible by B; trailing cells ignored"
            );
        }
        Self {
            num_hashes,
            num_bands,
            rows_per_band,
            state: RwLock::new(IndexState::new(num_bands)),
        }
    }

    /// Signature width this index was configured for.
    pub fn num_hashes(&self) -> usize {
        self.num_hashes
    }

    fn check_width(&self, signature: &Signature) -> Result<()> {
        if signature.len() != self.num_hashes {
            return Err(GatekeeperError::length_mismatch(
                self.num_hashes,
                signature.len(),
            ));
        }
        Ok(())
    }

    /// Insert or replace the signature for `(tenant, api_id)`. Replacing an
    /// existing entry removes its prior band memberships before adding the
    /// new ones, so no stale bucket entry for `api_id` survives (spec §4.4
    /// edge case — update semantics). Observable as either fully old or
    /// fully new: the whole operation runs under the exclusive lock.
    pub fn insert(&self, tenant: &str, api_id: &str, signature: Signature) -> Result<()> {
        self.check_width(&signature)?;
        let mut state = self.state.write();

        if let Some(previous) = state.signatures.get(api_id).cloned() {
            state.remove_bands(api_id, &previous, self.rows_per_band);
        }

        state.insert_bands(api_id, &signature, self.rows_per_band);
        state.signatures.insert(api_id.to_string(), signature);
        state.tenants.insert(api_id.to_string(), tenant.to_string());
        Ok(())
    }

    /// Remove `api_id` and every band membership it held. A no-op (not an
    /// error) if `api_id` is unknown (spec §4.4 edge case).
    pub fn remove(&self, api_id: &str) {
        let mut state = self.state.write();
        if let Some(signature) = state.signatures.remove(api_id) {
            state.remove_bands(api_id, &signature, self.rows_per_band);
        }
        state.tenants.remove(api_id);
    }

    /// Drop all stored signatures and band buckets.
    pub fn clear(&self) {
        let mut state = self.state.write();
        *state = IndexState::new(self.num_bands);
    }

    /// Union, over every band, of the bucket identified by `signature`'s
    /// `BandKey` in that band, filtered to entries whose stored tenant
    /// equals `tenant` (spec §4.4). Returns an empty set if the signature
    /// matches no bucket.
    pub fn find_candidates(&self, tenant: &str, signature: &Signature) -> Result<HashSet<String>> {
        self.check_width(signature)?;
        let state = self.state.read();
        let mut candidates = HashSet::new();

        for band_idx in 0..self.num_bands {
            let key = band_key(signature.band_cells(band_idx, self.rows_per_band));
            if let Some(bucket) = state.bands[band_idx].get(&key) {
                for api_id in bucket {
                    if state.tenants.get(api_id).map(String::as_str) == Some(tenant) {
                        candidates.insert(api_id.clone());
                    }
                }
            }
        }

        Ok(candidates)
    }

    /// For each candidate surfaced by [`Self::find_candidates`], compute
    /// the full-signature Jaccard estimate; keep those at or above
    /// `threshold`, sorted by similarity descending with ties broken by
    /// `api_id` ascending (spec §4.4).
    pub fn find_similar(
        &self,
        tenant: &str,
        signature: &Signature,
        threshold: f64,
    ) -> Result<Vec<Match>> {
        self.check_width(signature)?;
        let candidates = self.find_candidates(tenant, signature)?;
        let state = self.state.read();

        let mut matches: Vec<Match> = candidates
            .into_iter()
            .filter_map(|api_id| {
                let stored = state.signatures.get(&api_id)?;
                let similarity = signature.estimate_similarity(stored).ok()?;
                (similarity >= threshold).then_some(Match { api_id, similarity })
            })
            .collect();

        matches.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.api_id.cmp(&b.api_id))
        });

        Ok(matches)
    }

    /// Whether `api_id` currently has a stored signature.
    pub fn contains(&self, api_id: &str) -> bool {
        self.state.read().signatures.contains_key(api_id)
    }

    /// Number of signatures currently held.
    pub fn size(&self) -> usize {
        self.state.read().signatures.len()
    }

    /// Fetch a copy of the stored signature for `api_id`, if any.
    pub fn get_signature(&self, api_id: &str) -> Option<Signature> {
        self.state.read().signatures.get(api_id).cloned()
    }
}
