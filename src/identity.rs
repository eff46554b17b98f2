//! # Document identity
//! Deterministic document ids derived from a resource URL.
//!
//! The id names persisted documents (idempotent upsert) and is recomputed
//! from the same URL to look up derived artifacts such as AI sparks. The
//! hash is intentionally non-cryptographic; collisions are accepted in
//! exchange for speed and determinism. Do not swap in a cryptographic hash:
//! stored documents are keyed by this exact function.

/// Sentinel id for resources without a resolvable URL.
///
/// All URL-less resources collide on this key by design (last write wins);
/// the coordinator drops them before persistence anyway.
pub const UNKNOWN_ID: &str = "unknown";

/// Derive the stable document id for a URL.
///
/// Rolling hash over the URL's UTF-16 code units with wrapping 32-bit
/// signed arithmetic: `h = (h << 5) - h + unit` per step. The result is
/// `"doc_" + |h|` where `|h|` is the unsigned absolute value, so
/// `i32::MIN` maps to `2147483648` instead of overflowing.
///
/// An empty URL is treated the same as an absent one: neither resolves to
/// a real document.
pub fn document_id(url: Option<&str>) -> String {
    let Some(url) = url.filter(|u| !u.is_empty()) else {
        return UNKNOWN_ID.to_string();
    };
    let mut hash: i32 = 0;
    for unit in url.encode_utf16() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(unit as i32);
    }
    format!("doc_{}", hash.unsigned_abs())
}
