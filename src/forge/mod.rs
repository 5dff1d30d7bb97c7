//! Content-addressed generation forge: prompt → illustration → animation,
//! with two-model fallback, fingerprinted caching, and bounded-parallelism
//! batching (C9).

mod batch;
mod fingerprint;
mod generate;
mod types;

pub use batch::{BatchOutcome, BatchProgress, BatchTotals};
pub use fingerprint::RequestFingerprint;
pub use generate::Forge;
pub use types::{
    GenerationRequest, GenerationResult, GenerationStatus, GenerationStyle, ModelPreset, VideoModelId,
    DRAFT_PRESET, PRODUCTION_PRESET,
};
