//! MinHash signature type: fixed-width cell vector, byte layout, and the
//! cell-wise-equality Jaccard estimator (spec §4.3).

use crate::core::errors::{GatekeeperError, Result};

/// Sentinel "infinity" cell value (`2^31 - 1`), used to initialize a
/// signature before any token has been observed.
pub const SENTINEL: u32 = (1u32 << 31) - 1;

/// A fixed-length MinHash signature: `H` non-negative 32-bit cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature(Vec<u32>);

impl Signature {
    /// Build a signature from an owned cell vector.
    pub fn from_cells(cells: Vec<u32>) -> Self {
        Self(cells)
    }

    /// Number of cells (the configured `H`).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether this signature has zero cells.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the cell vector.
    pub fn cells(&self) -> &[u32] {
        &self.0
    }

    /// Serialize to `4·H` bytes, big-endian 32-bit integers in index order
    /// (spec §4.3 byte layout).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.0.len() * 4);
        for cell in &self.0 {
            bytes.extend_from_slice(&cell.to_be_bytes());
        }
        bytes
    }

    /// Deserialize from a byte blob. The length must be a multiple of 4;
    /// anything else is a [`GatekeeperError::CorruptSignature`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % 4 != 0 {
            return Err(GatekeeperError::corrupt_signature(format!(
                "signature blob length {} is not a multiple of 4",
                bytes.len()
            )));
        }
        let cells = bytes
            .chunks_exact(4)
            .map(|chunk| {
                let mut buf = [0u8; 4];
                buf.copy_from_slice(chunk);
                u32::from_be_bytes(buf)
            })
            .collect();
        Ok(Self(cells))
    }

    /// Estimate Jaccard similarity between two signatures of equal length:
    /// the fraction of cells that are equal. Different lengths are a
    /// [`GatekeeperError::LengthMismatch`] (spec §4.3).
    pub fn estimate_similarity(&self, other: &Signature) -> Result<f64> {
        if self.0.len() != other.0.len() {
            return Err(GatekeeperError::length_mismatch(self.0.len(), other.0.len()));
        }
        if self.0.is_empty() {
            return Ok(1.0);
        }
        let matches = self
            .0
            .iter()
            .zip(other.0.iter())
            .filter(|(a, b)| a == b)
            .count();
        Ok(matches as f64 / self.0.len() as f64)
    }

    /// The `R` consecutive cells belonging to band `band_index` given `rows`
    /// rows per band (spec §4.4).
    pub fn band_cells(&self, band_index: usize, rows: usize) -> &[u32] {
        let start = band_index * rows;
        let end = start + rows;
        &self.0[start..end]
    }
}

impl From<Vec<u32>> for Signature {
    fn from(cells: Vec<u32>) -> Self {
        Self(cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_round_trip_preserves_cells() {
        let sig = Signature::from_cells(vec![0, 1, u32::MAX, SENTINEL]);
        let bytes = sig.to_bytes();
        assert_eq!(bytes.len(), 4 * sig.len());
        let back = Signature::from_bytes(&bytes).unwrap();
        assert_eq!(sig, back);
    }

    #[test]
    fn corrupt_length_is_rejected() {
        let err = Signature::from_bytes(&[0, 1, 2]).unwrap_err();
        assert!(matches!(err, GatekeeperError::CorruptSignature { .. }));
    }

    #[test]
    fn self_similarity_is_one() {
        let sig = Signature::from_cells(vec![1, 2, 3, 4]);
        assert_eq!(sig.estimate_similarity(&sig).unwrap(), 1.0);
    }

    #[test]
    fn similarity_is_symmetric() {
        let a = Signature::from_cells(vec![1, 2, 3, 4]);
        let b = Signature::from_cells(vec![1, 9, 3, 9]);
        assert_eq!(
            a.estimate_similarity(&b).unwrap(),
            b.estimate_similarity(&a).unwrap()
        );
    }

    #[test]
    fn mismatched_lengths_error() {
        let a = Signature::from_cells(vec![1, 2, 3]);
        let b = Signature::from_cells(vec![1, 2]);
        let err = a.estimate_similarity(&b).unwrap_err();
        assert!(matches!(err, GatekeeperError::LengthMismatch { .. }));
    }

    #[test]
    fn band_cells_slices_the_right_window() {
        let sig = Signature::from_cells((0..16).collect());
        assert_eq!(sig.band_cells(0, 8), &[0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(sig.band_cells(1, 8), &[8, 9, 10, 11, 12, 13, 14, 15]);
    }
}
