//! Crate-wide error taxonomy.
//!
//! Leaf modules return their own typed error so callers can match precisely;
//! [`GenesisError`] wraps them for the orchestration-level call sites (the
//! agent proxy, the forge, the batch driver) the way `anyhow::Result` wraps
//! lower-level errors elsewhere in this crate.

use thiserror::Error;

/// Errors raised by the resilience primitives (C1).
#[derive(Debug, Error)]
pub enum ResilienceError {
    /// The circuit is open and is failing fast without invoking the guarded call.
    #[error("circuit breaker is open")]
    CircuitOpen,
    /// A cache or window was constructed with an invalid (zero) capacity.
    #[error("capacity must be at least 1")]
    InvalidCapacity,
}

/// Errors raised by the agent runtime (C3, C7).
#[derive(Debug, Error)]
pub enum AgentError {
    /// A command failed schema validation and was dropped.
    #[error("invalid command: {0}")]
    InvalidCommand(String),
    /// The worker did not reply before the caller's deadline elapsed.
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
    /// The worker task exited unexpectedly outside of a requested shutdown.
    #[error("worker crashed: {0}")]
    WorkerCrash(String),
    /// The worker has already been shut down or was never started.
    #[error("worker is not running")]
    NotRunning,
}

/// Errors raised while analyzing a request through the streaming pipeline (C8).
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The request failed validation before any analyzer ran.
    #[error("invalid analysis request: {0}")]
    InvalidRequest(String),
}

/// Errors raised by the generation forge (C9).
#[derive(Debug, Error)]
pub enum ForgeError {
    /// The request failed schema validation.
    #[error("invalid generation request: {0}")]
    InvalidRequest(String),
    /// The caller's abort signal had already fired.
    #[error("cancelled")]
    Cancelled,
    /// Both the primary and fallback image models failed.
    #[error("image generation failed after fallback: {0}")]
    ImageFallbackExhausted(String),
    /// The forge was constructed without a required API key.
    #[error("missing API key for provider")]
    MissingApiKey,
}

/// Errors raised by the subject registry (C10).
#[derive(Debug, Error)]
pub enum SubjectError {
    /// The subject failed schema validation (empty name/description/features).
    #[error("invalid subject: {0}")]
    InvalidSubject(String),
    /// No subject exists with the given id.
    #[error("subject not found: {0}")]
    NotFound(uuid::Uuid),
}

/// Errors raised by the editable prompt model (C11).
#[derive(Debug, Error)]
pub enum PromptError {
    /// An operation referenced a section id that does not exist.
    #[error("unknown prompt section: {0}")]
    UnknownSection(String),
}

/// Top-level error type unifying every component family.
#[derive(Debug, Error)]
pub enum GenesisError {
    /// See [`ResilienceError`].
    #[error(transparent)]
    Resilience(#[from] ResilienceError),
    /// See [`AgentError`].
    #[error(transparent)]
    Agent(#[from] AgentError),
    /// See [`PipelineError`].
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    /// See [`ForgeError`].
    #[error(transparent)]
    Forge(#[from] ForgeError),
    /// See [`SubjectError`].
    #[error(transparent)]
    Subject(#[from] SubjectError),
    /// See [`PromptError`].
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

/// Convenience alias for fallible operations returning [`GenesisError`].
pub type GenesisResult<T> = Result<T, GenesisError>;
