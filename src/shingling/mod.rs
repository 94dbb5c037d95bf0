//! Shingler (spec §4.2).
//!
//! Expands a feature list into a deduplicated set of overlapping n-gram
//! tokens ("shingles"), then reduces each shingle to a 64-bit integer via
//! FNV-1a so the token set can be fed straight into the MinHash generator.

use std::collections::HashSet;
use std::hash::Hasher;

use fnv::FnvHasher;

/// Shingle width, fixed per spec §4.2.
pub const SHINGLE_WIDTH: usize = 3;

/// FNV-1a 64-bit offset basis (spec §4.2). `fnv::FnvHasher::default()` is
/// seeded with this exact basis, so it is reproduced here only for the
/// doctest-style known-vector check below, not as a second implementation.
const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;

/// Expand a feature list into the deduplicated shingle set for that API.
///
/// For every feature string: the lowercased, whitespace-normalized feature
/// itself is always emitted as a shingle (this double-counts short features
/// against their own word n-grams, which is intentional — spec §9 open
/// question (b)). Word sequences of length `SHINGLE_WIDTH` are then emitted
/// as sliding windows; a feature with fewer than `SHINGLE_WIDTH` words
/// contributes only the whole-feature shingle (no separate windows).
pub fn shingle(features: &[String]) -> HashSet<String> {
    let mut shingles = HashSet::new();

    for feature in features {
        let normalized = feature.to_lowercase();
        let words: Vec<&str> = normalized.split_whitespace().collect();
        let collapsed = words.join(" ");
        if collapsed.is_empty() {
            continue;
        }
        shingles.insert(collapsed.clone());

        if words.len() < SHINGLE_WIDTH {
            continue;
        }
        for i in 0..=(words.len() - SHINGLE_WIDTH) {
            shingles.insert(words[i..i + SHINGLE_WIDTH].join(" "));
        }
    }

    shingles
}

/// Reduce a shingle set to the 64-bit token set MinHash consumes, via
/// FNV-1a over each shingle's UTF-8 bytes.
pub fn hash_shingles(shingles: &HashSet<String>) -> HashSet<u64> {
    shingles.iter().map(|s| fnv1a(s.as_bytes())).collect()
}

/// FNV-1a over a byte slice, via `fnv::FnvHasher`: its default seed is
/// exactly the spec's offset basis (`0xcbf29ce484222325`) and its per-byte
/// update is the standard FNV-1a step, so this is bit-exact with spec §4.2
/// without re-implementing the algorithm by hand.
pub fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(bytes);
    hasher.finish()
}

/// Run the full shingle → token-set pipeline over a feature list.
pub fn tokenize(features: &[String]) -> HashSet<u64> {
    hash_shingles(&shingle(features))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a_matches_known_vector() {
        // "" hashes to the offset basis itself.
        assert_eq!(fnv1a(b""), FNV_OFFSET_BASIS);
    }

    #[test]
    fn short_feature_emits_only_the_whole_feature_shingle() {
        let features = vec!["GET /pets".to_string()];
        let shingles = shingle(&features);
        assert_eq!(shingles.len(), 1);
        assert!(shingles.contains("get /pets"));
    }

    #[test]
    fn long_feature_emits_whole_feature_plus_sliding_windows() {
        let features = vec!["GET /pets tag:pets operationId:listpets extra".to_string()];
        let shingles = shingle(&features);
        // whole-feature shingle + (5 words - 3 + 1) = 3 windows = 4 total
        assert_eq!(shingles.len(), 4);
        assert!(shingles.contains("get /pets tag:pets operationid:listpets extra"));
        assert!(shingles.contains("get /pets tag:pets"));
        assert!(shingles.contains("tag:pets operationid:listpets extra"));
    }

    #[test]
    fn empty_features_contribute_nothing() {
        let features: Vec<String> = vec![];
        assert!(shingle(&features).is_empty());
    }

    #[test]
    fn duplicate_shingles_across_features_are_deduplicated() {
        let features = vec!["GET /pets".to_string(), "get /pets".to_string()];
        assert_eq!(shingle(&features).len(), 1);
    }

    #[test]
    fn tokenize_produces_64_bit_tokens_deterministically() {
        let features = vec!["GET /pets".to_string()];
        let a = tokenize(&features);
        let b = tokenize(&features);
        assert_eq!(a, b);
        assert_eq!(a.len(), 1);
    }
}
