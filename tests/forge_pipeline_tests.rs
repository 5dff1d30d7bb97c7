//! Exercises the subject registry, editable prompt, and generation forge
//! together the way a caller assembling a full generation request would.

use std::sync::Arc;

use async_trait::async_trait;
use genesis_core::config::GenesisConfig;
use genesis_core::forge::{Forge, GenerationRequest, GenerationStatus, GenerationStyle};
use genesis_core::prompt::{EditablePrompt, SectionSource};
use genesis_core::providers::{
    AspectRatio, GeneratedImage, ImageModel, ImageProvider, ImageRequest, ImageResponse, VideoOptions,
    VideoProgressCallback, VideoProvider, VideoResponse, VideoStatus,
};
use genesis_core::subjects::{SubjectInput, SubjectRegistry, SubjectType};
use tokio_util::sync::CancellationToken;

struct StubImage;

#[async_trait]
impl ImageProvider for StubImage {
    async fn generate_image(&self, _request: &ImageRequest) -> anyhow::Result<ImageResponse> {
        Ok(ImageResponse {
            success: true,
            images: vec![GeneratedImage { bytes: vec![7, 7, 7], mime_type: "image/png".to_string() }],
            error: None,
        })
    }
}

struct StubVideo;

#[async_trait]
impl VideoProvider for StubVideo {
    async fn generate_video_from_image(
        &self,
        _image_bytes: &[u8],
        _mime_type: &str,
        _prompt: &str,
        _options: VideoOptions,
        _on_progress: Option<VideoProgressCallback<'_>>,
    ) -> anyhow::Result<VideoResponse> {
        Ok(VideoResponse { status: VideoStatus::Completed, video_uri: Some("file://out.mp4".to_string()), error: None })
    }
}

#[tokio::test]
async fn carryover_subject_feeds_an_editable_prompt_into_the_forge() {
    let mut subjects = SubjectRegistry::new(10);
    let fox = subjects
        .register(SubjectInput {
            name: "Ferris".to_string(),
            subject_type: SubjectType::Animal,
            description: "a small orange fox mascot".to_string(),
            key_features: vec!["orange fur".to_string(), "blue eyes".to_string()],
            origin_cut_id: "cut-1".to_string(),
            carryover: true,
            tags: vec!["mascot".to_string()],
            reference_image: None,
        })
        .expect("valid subject registers");

    let mut prompt = EditablePrompt::new();
    prompt.add_section("subjects", "Carryover subjects", subjects.build_carryover_prompt(), SectionSource::Analysis);
    prompt.add_section("action", "Action", "riding a skateboard down a hill", SectionSource::Manual);
    let combined = prompt.combine();
    assert!(combined.contains("Ferris"));
    assert!(combined.contains("skateboard"));

    let config = GenesisConfig { api_key: Some("test-key".to_string()), ..GenesisConfig::default() };
    let forge = Forge::new(&config, Arc::new(StubImage), Arc::new(StubVideo)).expect("api key is present");

    let request = GenerationRequest {
        prompt: combined,
        style: GenerationStyle::Illustration,
        aspect_ratio: AspectRatio::Ratio16x9,
        resolution: "1024x1024".to_string(),
        image_model: ImageModel::ModelA,
        video_model: "video-v1".to_string(),
        negative_prompt: None,
        skip_animation: false,
        style_override: None,
    };

    let result = forge.generate(request, &CancellationToken::new()).await;
    assert_eq!(result.status, GenerationStatus::Completed);
    assert!(result.final_prompt.contains("Ferris"));

    subjects.mark_used_in_cut(fox.id, "cut-2").expect("registered subject exists");
    assert_eq!(subjects.recall(fox.id).expect("still registered").last_used_in_cut_id.as_deref(), Some("cut-2"));
}
