//! Image provider contract (C12).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The two allowed image models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageModel {
    /// The first of the two fallback pair members.
    ModelA,
    /// The second of the two fallback pair members.
    ModelB,
}

impl ImageModel {
    /// The other member of the fallback pair.
    pub fn fallback(self) -> Self {
        match self {
            Self::ModelA => Self::ModelB,
            Self::ModelB => Self::ModelA,
        }
    }
}

/// Supported aspect ratios for image generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AspectRatio {
    /// Square.
    Ratio1x1,
    /// Widescreen.
    Ratio16x9,
    /// Portrait widescreen.
    Ratio9x16,
    /// Standard.
    Ratio4x3,
    /// Portrait standard.
    Ratio3x4,
}

/// A single generated image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    /// Raw image bytes, decoded from the provider's base64 wire payload at
    /// the boundary; base64 stays at the edge rather than crossing into
    /// the core.
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`, e.g. `"image/png"`.
    pub mime_type: String,
}

/// Input to [`ImageProvider::generate_image`].
#[derive(Debug, Clone)]
pub struct ImageRequest {
    /// The final prompt text.
    pub prompt: String,
    /// Which of the two allowed models to invoke.
    pub model: ImageModel,
    /// Requested aspect ratio.
    pub aspect_ratio: AspectRatio,
    /// Optional negative prompt.
    pub negative_prompt: Option<String>,
}

/// Output of [`ImageProvider::generate_image`].
#[derive(Debug, Clone)]
pub struct ImageResponse {
    /// Whether the call succeeded.
    pub success: bool,
    /// Generated images, in provider-returned order. Empty on failure.
    pub images: Vec<GeneratedImage>,
    /// Human-readable error, present when `success` is false.
    pub error: Option<String>,
}

/// The image generation contract consumed by the forge (C9).
///
/// Implementations own their own retry/backoff via C2 and their own circuit
/// via C1; the forge calls this trait directly and embeds no
/// provider-specific protocol details.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Generate one or more images for `request`.
    async fn generate_image(&self, request: &ImageRequest) -> anyhow::Result<ImageResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_is_the_other_model() {
        assert_eq!(ImageModel::ModelA.fallback(), ImageModel::ModelB);
        assert_eq!(ImageModel::ModelB.fallback(), ImageModel::ModelA);
    }
}
