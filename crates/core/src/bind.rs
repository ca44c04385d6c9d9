//! Listen-address classification

/// Addresses that accept connections on every interface
pub const WILDCARD_ADDRESSES: &[&str] = &["0.0.0.0", "::"];

/// Check if any address is a wildcard bind
///
/// Matching is exact-string; callers are expected to hand over canonical
/// address text (no ports, brackets or zone suffixes).
pub fn is_public_bind<S: AsRef<str>>(addresses: &[S]) -> bool {
    addresses.iter().any(|addr| is_wildcard(addr.as_ref()))
}

/// The wildcard addresses in `addresses`, in order
pub fn public_binds<S: AsRef<str>>(addresses: &[S]) -> Vec<&str> {
    addresses
        .iter()
        .map(|addr| addr.as_ref())
        .filter(|addr| is_wildcard(addr))
        .collect()
}

fn is_wildcard(addr: &str) -> bool {
    WILDCARD_ADDRESSES.contains(&addr)
}
