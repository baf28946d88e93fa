//! Content-addressed cache key derivation (§4.2, GLOSSARY "Fingerprint").

use sha2::{Digest, Sha256};

/// First 16 hex characters of `SHA-256(repo_url)`, used as the repository
/// cache's directory name (§6: `<baseDir>/<16-hex-chars>/`).
pub fn fingerprint(repo_url: &str) -> String {
    let digest = Sha256::digest(repo_url.as_bytes());
    hex::encode(digest)[..16].to_string()
}
