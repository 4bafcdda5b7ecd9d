//! Deterministic bucketing of identities.
use sha2::{Digest, Sha256};

/// Number of buckets identities are spread across.
pub const TOTAL_BUCKETS: u32 = 100;

/// Maps an identifier onto a bucket in `[0, TOTAL_BUCKETS)`.
///
/// Implementations must be pure: the same identifier always lands in the same bucket, across
/// calls and across processes.
pub trait Bucketer {
    fn bucket(&self, identifier: &str) -> u32;
}

/// The default (and only production) bucketer.
///
/// Hashes the identifier with SHA-256 and reduces the high-order 4 bytes of the digest, read as
/// a big-endian integer, modulo [`TOTAL_BUCKETS`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Bucketer;

impl Bucketer for Sha256Bucketer {
    fn bucket(&self, identifier: &str) -> u32 {
        let hash = Sha256::digest(identifier.as_bytes());
        let value = u32::from_be_bytes([hash[0], hash[1], hash[2], hash[3]]);
        value % TOTAL_BUCKETS
    }
}

/// Compute the bucket of `identifier` using [`Sha256Bucketer`].
///
/// ```
/// let bucket = setbit::bucket("user-123");
/// assert!(bucket < 100);
/// assert_eq!(bucket, setbit::bucket("user-123"));
/// ```
pub fn bucket(identifier: &str) -> u32 {
    Sha256Bucketer.bucket(identifier)
}

#[cfg(test)]
pub struct DeterministicBucketer(pub std::collections::HashMap<String, u32>);

#[cfg(test)]
impl Bucketer for DeterministicBucketer {
    fn bucket(&self, identifier: &str) -> u32 {
        self.0.get(identifier).copied().unwrap_or(0) % TOTAL_BUCKETS
    }
}
