//! Request/result types for the generation forge (C9).

use serde::{Deserialize, Serialize};

use crate::providers::{AspectRatio, GeneratedImage, ImageModel};

/// The closed set of canonical style directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStyle {
    /// Painterly illustration.
    Illustration,
    /// Watercolor painting.
    Watercolor,
    /// Japanese animation style.
    Anime,
    /// Photorealistic rendering.
    Photorealistic,
    /// Flat vector/graphic design.
    FlatDesign,
    /// No canonical directive; `style_override` carries the whole style instead.
    Custom,
}

impl GenerationStyle {
    /// The fixed directive text prepended to the user's prompt. `Custom`
    /// contributes no text.
    pub fn directive(self) -> &'static str {
        match self {
            Self::Illustration => "A detailed illustration",
            Self::Watercolor => "A soft watercolor painting",
            Self::Anime => "An anime-style scene",
            Self::Photorealistic => "A photorealistic photograph",
            Self::FlatDesign => "A flat, minimalist vector design",
            Self::Custom => "",
        }
    }
}

/// Which video model this forge targets for a generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoModelId(pub String);

/// A validated generation request; also the set of fields that feed
/// [`super::fingerprint::RequestFingerprint`].
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationRequest {
    /// The user's prompt text. Must be non-empty.
    pub prompt: String,
    /// The canonical style directive to apply.
    pub style: GenerationStyle,
    /// Requested image aspect ratio.
    pub aspect_ratio: AspectRatio,
    /// Requested resolution hint (provider-specific string, e.g. `"1024x1024"`).
    pub resolution: String,
    /// Primary image model to try first.
    pub image_model: ImageModel,
    /// Video model to use for the animation step.
    pub video_model: String,
    /// Optional negative prompt passed to both providers.
    pub negative_prompt: Option<String>,
    /// If true, skip the animation step entirely.
    #[serde(default)]
    pub skip_animation: bool,
    /// Optional free-text style override, appended after the style directive.
    pub style_override: Option<String>,
}

impl GenerationRequest {
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.prompt.trim().is_empty() {
            return Err("prompt must not be empty".to_string());
        }
        Ok(())
    }
}

/// Terminal outcome of a single generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    /// Both illustration and (animation or a skip) succeeded.
    Completed,
    /// Illustration succeeded; animation did not run or failed.
    Partial,
    /// Illustration itself did not succeed.
    Failed,
}

/// The full result of one `generate` call.
///
/// Invariants enforced by construction in [`super::generate`]: `Completed`
/// implies `illustration.is_some()` and (`animation.is_some()` or
/// `skip_animation` was requested); `Partial` implies an illustration with
/// no animation; `Failed` implies no illustration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    /// The terminal status.
    pub status: GenerationStatus,
    /// The generated still image, if production got that far.
    pub illustration: Option<GeneratedImage>,
    /// The location of the generated animation, if one was produced.
    pub animation_uri: Option<String>,
    /// The final prompt text actually sent to the image provider.
    pub final_prompt: String,
    /// Whether this result was served from the forge's cache.
    pub cached: bool,
    /// Wall-clock duration of the call that produced this result.
    pub duration_ms: u64,
    /// Present when status is not `Completed` (or when `Partial`
    /// specifically, to explain why the animation step didn't finish).
    pub error: Option<String>,
}

/// One of the two frozen (image model, video model) pairs plus a resolution
/// override, for callers that want a draft/production convenience instead of
/// assembling a [`GenerationRequest`] by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelPreset {
    /// The image model this preset uses.
    pub image_model: ImageModel,
    /// The video model name this preset uses.
    pub video_model: &'static str,
    /// The resolution string this preset requests.
    pub resolution: &'static str,
}

/// Fast, lower-resolution preset for iteration.
pub const DRAFT_PRESET: ModelPreset =
    ModelPreset { image_model: ImageModel::ModelA, video_model: "video-draft", resolution: "512x512" };

/// Full-resolution preset for final output.
pub const PRODUCTION_PRESET: ModelPreset =
    ModelPreset { image_model: ImageModel::ModelB, video_model: "video-production", resolution: "1024x1024" };
