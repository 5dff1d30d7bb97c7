//! Thin contract surfaces for the external image, video, and vision model
//! providers the core consumes but does not implement (C12).

mod image;
mod video;
mod vision;

pub use image::{AspectRatio, GeneratedImage, ImageModel, ImageProvider, ImageRequest, ImageResponse};
pub use video::{
    ReferenceImage, ReferenceImageType, VideoAspectRatio, VideoOptions, VideoProgressCallback, VideoProvider,
    VideoResponse, VideoStatus,
};
pub use vision::{FromRawText, VisionAnalyzer, VisionFallback, parse_or_fallback};
