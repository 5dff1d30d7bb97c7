//! Vision analyzer contract (C12).
//!
//! The analyzer returns free-form text that is expected to parse as JSON;
//! malformed JSON must be tolerated rather than propagated as an error,
//! falling back to a defensible default where possible.

use async_trait::async_trait;
use serde::Deserialize;

/// The vision analysis contract consumed by the streaming pipeline's
/// per-group [`crate::pipeline::GroupAnalyzer`] implementations.
#[async_trait]
pub trait VisionAnalyzer: Send + Sync {
    /// Analyze `image_bytes` (of `mime_type`) against `prompt`, returning
    /// the raw text response for the caller to JSON-parse.
    async fn analyze(&self, image_bytes: &[u8], mime_type: &str, prompt: &str) -> anyhow::Result<String>;
}

/// A defensible fallback shape for a vision response that failed to parse
/// as the caller's expected schema.
#[derive(Debug, Clone, Deserialize)]
pub struct VisionFallback {
    /// The raw text, used verbatim as the description.
    pub description: String,
}

/// Parse `raw` as JSON of type `T`; on failure, fall back to a description
/// built from the raw text with every other field left at its default.
pub fn parse_or_fallback<T>(raw: &str) -> T
where
    T: serde::de::DeserializeOwned + FromRawText,
{
    serde_json::from_str(raw).unwrap_or_else(|_| T::from_raw_text(raw))
}

/// Implemented by vision-response types so [`parse_or_fallback`] can build a
/// defensible default from raw, unparseable text.
pub trait FromRawText {
    /// Build a fallback value from raw analyzer text.
    fn from_raw_text(raw: &str) -> Self;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Parsed {
        description: String,
        #[serde(default)]
        tags: Vec<String>,
    }

    impl FromRawText for Parsed {
        fn from_raw_text(raw: &str) -> Self {
            Self { description: raw.to_string(), tags: Vec::new() }
        }
    }

    #[test]
    fn valid_json_parses_normally() {
        let parsed: Parsed = parse_or_fallback(r#"{"description": "a cat", "tags": ["cute"]}"#);
        assert_eq!(parsed.description, "a cat");
        assert_eq!(parsed.tags, vec!["cute".to_string()]);
    }

    #[test]
    fn malformed_json_falls_back_to_raw_text_description() {
        let parsed: Parsed = parse_or_fallback("not json at all");
        assert_eq!(parsed.description, "not json at all");
        assert!(parsed.tags.is_empty());
    }
}
