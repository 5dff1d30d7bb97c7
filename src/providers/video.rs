//! Video provider contract (C12).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Aspect ratios accepted by the video provider: a narrower set than the
/// image provider's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoAspectRatio {
    /// Widescreen.
    Ratio16x9,
    /// Portrait widescreen.
    Ratio9x16,
}

/// How a reference image supplied to the video provider should be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceImageType {
    /// A concrete on-screen asset to carry into the animation.
    Asset,
    /// A visual style reference only.
    Style,
    /// A persistent subject being carried over.
    Subject,
}

/// A reference image handed to the video provider alongside the primary frame.
#[derive(Debug, Clone)]
pub struct ReferenceImage {
    /// Raw image bytes.
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`.
    pub mime_type: String,
    /// How this reference should influence generation.
    pub kind: ReferenceImageType,
}

/// Tunable options for a single video generation call.
#[derive(Debug, Clone)]
pub struct VideoOptions {
    /// Which video model to invoke.
    pub model: String,
    /// Requested aspect ratio.
    pub aspect_ratio: VideoAspectRatio,
    /// Optional negative prompt.
    pub negative_prompt: Option<String>,
    /// Additional reference images.
    pub reference_images: Vec<ReferenceImage>,
    /// Cooperative cancellation, honored by the implementation.
    pub abort_signal: Option<CancellationToken>,
}

/// Terminal status of a video generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    /// The video was produced.
    Completed,
    /// The video was not produced.
    Failed,
}

/// Output of [`VideoProvider::generate_video_from_image`].
#[derive(Debug, Clone)]
pub struct VideoResponse {
    /// Terminal status.
    pub status: VideoStatus,
    /// Location of the produced video, present when `status` is `Completed`.
    pub video_uri: Option<String>,
    /// Human-readable error, present when `status` is `Failed`.
    pub error: Option<String>,
}

/// Progress callback invoked during video generation: `(status, human_message)`.
pub type VideoProgressCallback<'a> = &'a (dyn Fn(VideoStatus, &str) + Send + Sync);

/// The video generation contract consumed by the forge (C9).
#[async_trait]
pub trait VideoProvider: Send + Sync {
    /// Animate `image_bytes` (of `mime_type`) using `prompt` and `options`,
    /// reporting intermediate progress through `on_progress` if supplied.
    async fn generate_video_from_image(
        &self,
        image_bytes: &[u8],
        mime_type: &str,
        prompt: &str,
        options: VideoOptions,
        on_progress: Option<VideoProgressCallback<'_>>,
    ) -> anyhow::Result<VideoResponse>;
}
