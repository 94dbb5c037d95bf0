//! MinHash Generator (spec §4.3).
//!
//! Reduces a token set to a fixed-length signature by, for each hash
//! function `i`, tracking the minimum of `h(x) = |(A[i]*x + B[i]) mod p|`
//! over every token `x` in the set. Mirrors the cell-wise-minimum update
//! loop shape of the teacher's `generate_minhash_signature`, but computes
//! `h` from the spec's fixed affine-coefficient family instead of a
//! reseeded hash function per cell.

use std::collections::HashSet;
use std::time::Instant;

use tracing::debug;

use super::coeffs::{generate_coefficients, MERSENNE_PRIME_31};
use super::signature::{Signature, SENTINEL};

/// Default signature width (spec §4.3).
pub const DEFAULT_NUM_HASHES: usize = 128;

/// Default PRNG seed (spec §4.3).
pub const DEFAULT_SEED: u64 = 42;

/// Parameters governing signature generation: width and PRNG seed. The
/// derived `A`/`B` coefficient arrays are cached alongside.
#[derive(Debug, Clone)]
pub struct MinHashGenerator {
    num_hashes: usize,
    seed: u64,
    a: Vec<u32>,
    b: Vec<u32>,
}

impl MinHashGenerator {
    /// Build a generator for the given signature width and PRNG seed,
    /// deriving the `A`/`B` coefficient arrays up front.
    pub fn new(num_hashes: usize, seed: u64) -> Self {
        let (a, b) = generate_coefficients(num_hashes, seed);
        Self {
            num_hashes,
            seed,
            a,
            b,
        }
    }

    /// Signature width (`H`) this generator produces.
    pub fn num_hashes(&self) -> usize {
        self.num_hashes
    }

    /// PRNG seed this generator was constructed with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Compute a signature from a 64-bit token set (spec §4.3).
    ///
    /// An empty token set yields a signature of `H` sentinel cells; two
    /// empty-signature APIs therefore compare as identical (documented as
    /// acceptable in spec §4.3, since the admission layer is not expected to
    /// submit such specs in practice).
    pub fn compute_signature(&self, tokens: &HashSet<u64>) -> Signature {
        let start = Instant::now();
        let mut cells = vec![SENTINEL; self.num_hashes];

        for &token in tokens {
            for i in 0..self.num_hashes {
                let h = min_hash_cell(token, self.a[i], self.b[i]);
                if h < cells[i] {
                    cells[i] = h;
                }
            }
        }

        debug!(
            tokens = tokens.len(),
            hashes = self.num_hashes,
            elapsed = ?start.elapsed(),
            "computed minhash signature"
        );

        Signature::from_cells(cells)
    }
}

impl Default for MinHashGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_NUM_HASHES, DEFAULT_SEED)
    }
}

/// `h = |(a*x + b) mod p|`, computed in 64-bit arithmetic to avoid overflow
/// before reducing back into a `u32` cell value.
fn min_hash_cell(x: u64, a: u32, b: u32) -> u32 {
    let p = MERSENNE_PRIME_31;
    let x_mod = x % p;
    let a = a as u64;
    let b = b as u64;
    let value = (a.wrapping_mul(x_mod).wrapping_add(b)) % p;
    value as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(values: &[u64]) -> HashSet<u64> {
        values.iter().copied().collect()
    }

    #[test]
    fn deterministic_for_identical_seed_and_width() {
        let gen_a = MinHashGenerator::new(64, 42);
        let gen_b = MinHashGenerator::new(64, 42);
        let t = tokens(&[1, 2, 3, 42, 9999]);
        assert_eq!(gen_a.compute_signature(&t), gen_b.compute_signature(&t));
    }

    #[test]
    fn empty_token_set_yields_all_sentinel_cells() {
        let gen = MinHashGenerator::new(16, 42);
        let sig = gen.compute_signature(&HashSet::new());
        assert!(sig.cells().iter().all(|&c| c == SENTINEL));
    }

    #[test]
    fn identical_token_sets_yield_identical_signatures() {
        let gen = MinHashGenerator::default();
        let t1 = tokens(&[5, 10, 15]);
        let t2 = tokens(&[15, 10, 5]);
        assert_eq!(gen.compute_signature(&t1), gen.compute_signature(&t2));
    }

    #[test]
    fn disjoint_token_sets_usually_diverge() {
        let gen = MinHashGenerator::new(128, 42);
        let t1 = tokens(&(0..50).collect::<Vec<_>>());
        let t2 = tokens(&(1000..1050).collect::<Vec<_>>());
        let similarity = gen
            .compute_signature(&t1)
            .estimate_similarity(&gen.compute_signature(&t2))
            .unwrap();
        assert!(similarity < 0.5);
    }
}
