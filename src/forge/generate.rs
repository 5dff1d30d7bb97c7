//! Single-request generation flow: prompt → illustration → animation, with
//! two-model fallback and fingerprinted result caching (C9).

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::GenesisConfig;
use crate::error::ForgeError;
use crate::providers::{ImageProvider, ImageRequest, VideoOptions, VideoProvider, VideoStatus};
use crate::resilience::LruCache;

use super::fingerprint::RequestFingerprint;
use super::types::{GenerationRequest, GenerationResult, GenerationStatus};

/// Drives single-request and batch generation against injected image/video
/// providers.
///
/// Owns the result cache exclusively. Applications wanting cross-instance
/// sharing build that on top.
pub struct Forge {
    image_provider: Arc<dyn ImageProvider>,
    video_provider: Arc<dyn VideoProvider>,
    cache: Mutex<LruCache<RequestFingerprint, GenerationResult>>,
}

impl Forge {
    /// Construct a forge. Fails synchronously if `config` carries no API key.
    pub fn new(
        config: &GenesisConfig,
        image_provider: Arc<dyn ImageProvider>,
        video_provider: Arc<dyn VideoProvider>,
    ) -> Result<Self, ForgeError> {
        config.require_api_key().map_err(|_| ForgeError::MissingApiKey)?;
        Ok(Self {
            image_provider,
            video_provider,
            cache: Mutex::new(LruCache::new(config.cache_capacity).unwrap_or_else(|_| {
                LruCache::new(1).unwrap_or_else(|_| unreachable!("capacity 1 is always valid"))
            })),
        })
    }

    /// Number of entries currently cached.
    pub fn cache_size(&self) -> usize {
        self.cache.lock().size()
    }

    /// Remove every cached entry.
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    /// Run one generation request to completion: validate, check for an
    /// already-cancelled signal, serve from cache if possible, build the
    /// final prompt, generate the illustration with fallback, then the
    /// animation (unless skipped), caching the terminal result.
    pub async fn generate(&self, request: GenerationRequest, cancel: &CancellationToken) -> GenerationResult {
        let started = Instant::now();

        if let Err(message) = request.validate() {
            return failed(message, String::new(), started);
        }

        if cancel.is_cancelled() {
            return failed("cancelled".to_string(), String::new(), started);
        }

        let fingerprint = RequestFingerprint::compute(&request);
        if let Some(hit) = self.cache.lock().get(&fingerprint).cloned() {
            return GenerationResult { cached: true, duration_ms: elapsed_ms(started), ..hit };
        }

        let final_prompt = build_final_prompt(&request);

        let image = match self.generate_image_with_fallback(&request, &final_prompt).await {
            Ok(image) => image,
            Err(message) => return failed(message, final_prompt, started),
        };

        if request.skip_animation {
            let result = GenerationResult {
                status: GenerationStatus::Completed,
                illustration: Some(image),
                animation_uri: None,
                final_prompt,
                cached: false,
                duration_ms: elapsed_ms(started),
                error: None,
            };
            self.cache.lock().set(fingerprint, result.clone());
            return result;
        }

        if cancel.is_cancelled() {
            return GenerationResult {
                status: GenerationStatus::Partial,
                illustration: Some(image),
                animation_uri: None,
                final_prompt,
                cached: false,
                duration_ms: elapsed_ms(started),
                error: Some("cancelled before animation".to_string()),
            };
        }

        let video_options = VideoOptions {
            model: request.video_model.clone(),
            aspect_ratio: crate::providers::VideoAspectRatio::Ratio16x9,
            negative_prompt: request.negative_prompt.clone(),
            reference_images: Vec::new(),
            abort_signal: Some(cancel.clone()),
        };

        let video_outcome = self
            .video_provider
            .generate_video_from_image(&image.bytes, &image.mime_type, &final_prompt, video_options, None)
            .await;

        let result = match video_outcome {
            Ok(response) if response.status == VideoStatus::Completed => GenerationResult {
                status: GenerationStatus::Completed,
                illustration: Some(image),
                animation_uri: response.video_uri,
                final_prompt,
                cached: false,
                duration_ms: elapsed_ms(started),
                error: None,
            },
            Ok(response) => GenerationResult {
                status: GenerationStatus::Partial,
                illustration: Some(image),
                animation_uri: None,
                final_prompt,
                cached: false,
                duration_ms: elapsed_ms(started),
                error: response.error.or_else(|| Some("animation failed".to_string())),
            },
            Err(err) => {
                warn!(error = %err, "video generation raised an error");
                GenerationResult {
                    status: GenerationStatus::Partial,
                    illustration: Some(image),
                    animation_uri: None,
                    final_prompt,
                    cached: false,
                    duration_ms: elapsed_ms(started),
                    error: Some(err.to_string()),
                }
            }
        };

        self.cache.lock().set(fingerprint, result.clone());
        result
    }

    async fn generate_image_with_fallback(
        &self,
        request: &GenerationRequest,
        final_prompt: &str,
    ) -> Result<crate::providers::GeneratedImage, String> {
        let primary = request.image_model;
        match self.try_image(request, final_prompt, primary).await {
            Ok(image) => return Ok(image),
            Err(primary_error) => {
                info!(model = ?primary, error = %primary_error, "primary image model failed, trying fallback");
                let fallback = primary.fallback();
                match self.try_image(request, final_prompt, fallback).await {
                    Ok(image) => Ok(image),
                    Err(fallback_error) => Err(format!(
                        "image generation failed after fallback: primary={primary_error}, fallback={fallback_error}"
                    )),
                }
            }
        }
    }

    async fn try_image(
        &self,
        request: &GenerationRequest,
        final_prompt: &str,
        model: crate::providers::ImageModel,
    ) -> Result<crate::providers::GeneratedImage, String> {
        let image_request = ImageRequest {
            prompt: final_prompt.to_string(),
            model,
            aspect_ratio: request.aspect_ratio,
            negative_prompt: request.negative_prompt.clone(),
        };

        match self.image_provider.generate_image(&image_request).await {
            Ok(response) if response.success => {
                response.images.into_iter().next().ok_or_else(|| "provider reported success with no images".to_string())
            }
            Ok(response) => Err(response.error.unwrap_or_else(|| "image provider reported failure".to_string())),
            Err(err) => Err(err.to_string()),
        }
    }
}

fn failed(message: String, final_prompt: String, started: Instant) -> GenerationResult {
    GenerationResult {
        status: GenerationStatus::Failed,
        illustration: None,
        animation_uri: None,
        final_prompt,
        cached: false,
        duration_ms: elapsed_ms(started),
        error: Some(message),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Build the final prompt: style directive, optional style override, then
/// the user's prompt, joined by `". "`.
fn build_final_prompt(request: &GenerationRequest) -> String {
    let directive = request.style.directive();
    let mut parts: Vec<&str> = Vec::new();
    if !directive.is_empty() {
        parts.push(directive);
    }
    if let Some(style_override) = request.style_override.as_deref() {
        if !style_override.trim().is_empty() {
            parts.push(style_override.trim());
        }
    }
    parts.push(request.prompt.trim());
    parts.join(". ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{
        AspectRatio, GeneratedImage, ImageModel, ImageResponse, VideoProgressCallback, VideoResponse,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use crate::forge::types::GenerationStyle;

    struct FailThenSucceedImage {
        fail_models: Vec<ImageModel>,
        calls: AtomicU32,
    }

    #[async_trait]
    impl ImageProvider for FailThenSucceedImage {
        async fn generate_image(&self, request: &ImageRequest) -> anyhow::Result<ImageResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_models.contains(&request.model) {
                return Ok(ImageResponse { success: false, images: Vec::new(), error: Some("down".to_string()) });
            }
            Ok(ImageResponse {
                success: true,
                images: vec![GeneratedImage { bytes: vec![1, 2, 3], mime_type: "image/png".to_string() }],
                error: None,
            })
        }
    }

    struct AlwaysCompletesVideo;
    #[async_trait]
    impl VideoProvider for AlwaysCompletesVideo {
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

    fn config_with_key() -> GenesisConfig {
        GenesisConfig { api_key: Some("test-key".to_string()), ..GenesisConfig::default() }
    }

    fn request(skip_animation: bool) -> GenerationRequest {
        GenerationRequest {
            prompt: "a cat on a skateboard".to_string(),
            style: GenerationStyle::Anime,
            aspect_ratio: AspectRatio::Ratio1x1,
            resolution: "1024x1024".to_string(),
            image_model: ImageModel::ModelA,
            video_model: "video-v1".to_string(),
            negative_prompt: None,
            skip_animation,
            style_override: None,
        }
    }

    #[test]
    fn construction_without_api_key_fails() {
        let config = GenesisConfig::default();
        let image = Arc::new(FailThenSucceedImage { fail_models: Vec::new(), calls: AtomicU32::new(0) });
        let video = Arc::new(AlwaysCompletesVideo);
        let result = Forge::new(&config, image, video);
        assert!(matches!(result, Err(ForgeError::MissingApiKey)));
    }

    #[tokio::test]
    async fn primary_failure_falls_back_to_other_model() {
        let image = Arc::new(FailThenSucceedImage { fail_models: vec![ImageModel::ModelA], calls: AtomicU32::new(0) });
        let video = Arc::new(AlwaysCompletesVideo);
        let forge = Forge::new(&config_with_key(), image, video).unwrap();

        let result = forge.generate(request(true), &CancellationToken::new()).await;
        assert_eq!(result.status, GenerationStatus::Completed);
        assert!(result.illustration.is_some());
    }

    #[tokio::test]
    async fn both_models_failing_is_a_failed_result_mentioning_fallback() {
        let image = Arc::new(FailThenSucceedImage {
            fail_models: vec![ImageModel::ModelA, ImageModel::ModelB],
            calls: AtomicU32::new(0),
        });
        let video = Arc::new(AlwaysCompletesVideo);
        let forge = Forge::new(&config_with_key(), image, video).unwrap();

        let result = forge.generate(request(true), &CancellationToken::new()).await;
        assert_eq!(result.status, GenerationStatus::Failed);
        assert!(result.error.unwrap().contains("fallback"));
    }

    #[tokio::test]
    async fn skip_animation_produces_completed_result_without_animation() {
        let image = Arc::new(FailThenSucceedImage { fail_models: Vec::new(), calls: AtomicU32::new(0) });
        let video = Arc::new(AlwaysCompletesVideo);
        let forge = Forge::new(&config_with_key(), image, video).unwrap();

        let result = forge.generate(request(true), &CancellationToken::new()).await;
        assert_eq!(result.status, GenerationStatus::Completed);
        assert!(result.animation_uri.is_none());
    }

    #[tokio::test]
    async fn repeat_request_is_served_from_cache() {
        let image = Arc::new(FailThenSucceedImage { fail_models: Vec::new(), calls: AtomicU32::new(0) });
        let video = Arc::new(AlwaysCompletesVideo);
        let forge = Forge::new(&config_with_key(), image, video).unwrap();

        let first = forge.generate(request(true), &CancellationToken::new()).await;
        let second = forge.generate(request(true), &CancellationToken::new()).await;

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.illustration, second.illustration);
        assert_eq!(forge.cache_size(), 1);
    }

    #[tokio::test]
    async fn already_aborted_signal_yields_cancelled_failure() {
        let image = Arc::new(FailThenSucceedImage { fail_models: Vec::new(), calls: AtomicU32::new(0) });
        let video = Arc::new(AlwaysCompletesVideo);
        let forge = Forge::new(&config_with_key(), image, video).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = forge.generate(request(false), &cancel).await;
        assert_eq!(result.status, GenerationStatus::Failed);
        assert_eq!(result.error.as_deref(), Some("cancelled"));
    }

    #[test]
    fn final_prompt_joins_directive_override_and_prompt() {
        let mut req = request(true);
        req.style_override = Some("muted palette".to_string());
        let prompt = build_final_prompt(&req);
        assert_eq!(prompt, "An anime-style scene. muted palette. a cat on a skateboard");
    }

    #[test]
    fn custom_style_with_no_override_is_just_the_prompt() {
        let mut req = request(true);
        req.style = GenerationStyle::Custom;
        let prompt = build_final_prompt(&req);
        assert_eq!(prompt, "a cat on a skateboard");
    }
}
