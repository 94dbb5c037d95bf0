//! MinHash Generator (spec §4.3): PRNG coefficients, signature type, and
//! the signature-computation pipeline.

pub mod coeffs;
pub mod generator;
pub mod signature;

pub use generator::{MinHashGenerator, DEFAULT_NUM_HASHES, DEFAULT_SEED};
pub use signature::Signature;
