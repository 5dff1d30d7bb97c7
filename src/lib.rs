//! Genesis Core - orchestration SDK for multi-stage generative media pipelines
//!
//! This library provides the resilience primitives, out-of-process-style agent
//! runtime, streaming multi-axis analysis pipeline, and content-addressed
//! generation forge behind a prompt-to-illustration-to-animation workflow.

// Allow certain clippy warnings that are either stylistic or from external dependencies
#![allow(clippy::uninlined_format_args)] // Style preference
#![allow(clippy::items_after_statements)] // Locally-scoped use statements are fine
#![allow(clippy::module_name_repetitions)]

pub mod agent;
pub mod config;
pub mod context;
pub mod error;
pub mod forge;
pub mod health;
pub mod logger;
pub mod metrics;
pub mod nudge;
pub mod pipeline;
pub mod prompt;
pub mod providers;
pub mod resilience;
pub mod subjects;

// Re-export the top-level configuration and error types for easier testing.
pub use config::GenesisConfig;
pub use error::{GenesisError, GenesisResult};

// Re-exports of the most commonly reached-for type from each component family.
pub use agent::{AgentCommand, AgentEvent, AgentProxy};
pub use forge::{Forge, GenerationRequest, GenerationResult};
pub use health::HealthMonitor;
pub use nudge::NudgeEngine;
pub use pipeline::{analyze, AnalysisResult};
pub use subjects::SubjectRegistry;
