use std::path::Path;

/// Content address of a canonical path: first 16 hex chars of its blake3
/// digest. Deterministic within and across builds, so two relative
/// references resolving to the same file collapse to one output name.
pub fn content_address(path: &Path) -> String {
    let digest = blake3::hash(path.to_string_lossy().as_bytes());
    digest.to_hex().as_str()[..16].to_string()
}
