//! Revision fingerprints.
//!
//! A revision is the hex SHA-256 digest of a canonically sorted value set,
//! so the same set always yields the same revision regardless of the order
//! in which its members arrived.

use std::fmt::Display;

use sha2::Digest;
use sha2::Sha256;

/// Revision of the active release versions of one group.
pub fn revision_of_versions(versions: Vec<u64>) -> String {
    digest_sorted(versions)
}

/// Revision of an arbitrary token set.
pub fn revision_of_tokens(tokens: Vec<String>) -> String {
    digest_sorted(tokens)
}

fn digest_sorted<T: Ord + Display>(mut values: Vec<T>) -> String {
    values.sort_unstable();
    let mut hasher = Sha256::new();
    for v in &values {
        hasher.update(v.to_string().as_bytes());
        // separator keeps [1, 23] and [12, 3] apart
        hasher.update([b'\n']);
    }
    format!("{:x}", hasher.finalize())
}
