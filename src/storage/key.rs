//! Cache key derivation

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use url::Url;

/// Derive the storage key for a request URL.
///
/// The key is a 64-bit non-cryptographic hash of the absolute URL string
/// (scheme, host, path and query); headers, method, body and time never
/// contribute, so the same URL always lands on the same slot. Known
/// limitation: distinct URLs can collide, and the store does not detect
/// that — the colliding entry is overwritten. Acceptable for a best-effort
/// offline cache.
pub fn cache_key(url: &Url) -> String {
    let mut hasher = DefaultHasher::new();
    url.as_str().hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
