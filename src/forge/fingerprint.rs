//! Deterministic request fingerprinting for the forge's result cache (C9).

use sha2::{Digest, Sha256};

use super::types::GenerationRequest;

/// A deterministic digest of the fields that define a generation request's
/// identity for caching purposes: equal inputs produce an equal fingerprint,
/// and the field order used to build it is fixed.
///
/// Newtype around a hex string so it can be used directly as an
/// [`crate::resilience::LruCache`] key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct RequestFingerprint(pub String);

impl RequestFingerprint {
    /// Compute the fingerprint of `request`.
    ///
    /// Fields are fed into the hash in a fixed, declared order regardless of
    /// how the caller constructed the request (Rust's struct fields have no
    /// insertion order to begin with, but the hashing order here is explicit
    /// and stable on top of that).
    pub fn compute(request: &GenerationRequest) -> Self {
        let mut hasher = Sha256::new();

        let style = serde_json::to_string(&request.style).unwrap_or_default();
        let aspect_ratio = serde_json::to_string(&request.aspect_ratio).unwrap_or_default();
        let image_model = serde_json::to_string(&request.image_model).unwrap_or_default();

        for field in [
            request.prompt.as_str(),
            style.as_str(),
            aspect_ratio.as_str(),
            request.resolution.as_str(),
            image_model.as_str(),
            request.video_model.as_str(),
            request.negative_prompt.as_deref().unwrap_or(""),
            if request.skip_animation { "1" } else { "0" },
            request.style_override.as_deref().unwrap_or(""),
        ] {
            hasher.update(field.as_bytes());
            hasher.update([0u8]); // field separator, avoids cross-field ambiguity
        }

        Self(hex_encode(&hasher.finalize()))
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}
