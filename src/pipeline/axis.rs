//! Axis, group, and progress types for the streaming analysis pipeline (C8).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// One of the seven named analysis dimensions (spec GLOSSARY: "Axis").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AxisId {
    A1,
    A2,
    A3,
    A4,
    A5,
    A6,
    A7,
}

impl AxisId {
    /// Every axis, in declared order.
    pub const ALL: [AxisId; 7] =
        [AxisId::A1, AxisId::A2, AxisId::A3, AxisId::A4, AxisId::A5, AxisId::A6, AxisId::A7];

    /// The group that produces this axis: `A1-A3 -> grok`, `A4-A6 -> opus`, `A7 -> emotion`.
    pub fn group(self) -> Group {
        match self {
            AxisId::A1 | AxisId::A2 | AxisId::A3 => Group::Grok,
            AxisId::A4 | AxisId::A5 | AxisId::A6 => Group::Opus,
            AxisId::A7 => Group::Emotion,
        }
    }

    /// A short human-readable label, e.g. `"A1"`.
    pub fn label(self) -> &'static str {
        match self {
            AxisId::A1 => "A1",
            AxisId::A2 => "A2",
            AxisId::A3 => "A3",
            AxisId::A4 => "A4",
            AxisId::A5 => "A5",
            AxisId::A6 => "A6",
            AxisId::A7 => "A7",
        }
    }
}

/// The analyzer that produces a set of axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Group {
    Grok,
    Opus,
    Emotion,
}

impl Group {
    /// The axes this group is responsible for.
    pub fn axes(self) -> &'static [AxisId] {
        match self {
            Group::Grok => &[AxisId::A1, AxisId::A2, AxisId::A3],
            Group::Opus => &[AxisId::A4, AxisId::A5, AxisId::A6],
            Group::Emotion => &[AxisId::A7],
        }
    }
}

/// Lifecycle state of one axis within a run: transitions monotonically from
/// pending to running to a terminal `completed` or `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Per-axis progress tracked throughout a run.
#[derive(Debug, Clone, Serialize)]
pub struct AxisProgress {
    /// Which axis this tracks.
    pub id: AxisId,
    /// Human-readable label.
    pub label: &'static str,
    /// Current lifecycle state.
    pub status: AxisStatus,
    /// When the axis's group call was launched.
    pub started_at: Option<DateTime<Utc>>,
    /// When the axis settled (completed or failed).
    pub completed_at: Option<DateTime<Utc>>,
    /// Wall-clock duration of the group call, once settled.
    pub duration_ms: Option<u64>,
    /// Error message, if the axis's group call failed.
    pub error: Option<String>,
}

impl AxisProgress {
    fn pending(id: AxisId) -> Self {
        Self {
            id,
            label: id.label(),
            status: AxisStatus::Pending,
            started_at: None,
            completed_at: None,
            duration_ms: None,
            error: None,
        }
    }
}

pub(super) fn initial_progress(requested: &[AxisId]) -> Vec<AxisProgress> {
    requested.iter().copied().map(AxisProgress::pending).collect()
}

/// Supported request language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Ja,
    En,
}

/// A validated request into the streaming pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisRequest {
    /// The text the analyzers evaluate. Must be non-empty.
    pub prompt: String,
    /// Output language hint passed through to analyzers.
    pub language: Language,
    /// If set, restricts the run to these axes; otherwise all seven run.
    pub include_axes: Option<Vec<AxisId>>,
}

/// A single analyzer producing every axis within one [`Group`].
///
/// Implementations own their own retry/circuit behavior; core code does not
/// embed provider-specific protocol details.
#[async_trait]
pub trait GroupAnalyzer: Send + Sync {
    /// Run this group's analysis, honoring `cancel`. The returned JSON value
    /// is merged into the run's partial result under the group's key.
    async fn analyze(&self, request: &AnalysisRequest, cancel: &CancellationToken) -> anyhow::Result<serde_json::Value>;
}

/// The analyzers available for a run; a missing entry means that group's
/// axes are skipped rather than failed.
#[derive(Clone, Default)]
pub struct Analyzers {
    /// Produces `A1, A2, A3`.
    pub grok: Option<Arc<dyn GroupAnalyzer>>,
    /// Produces `A4, A5, A6`.
    pub opus: Option<Arc<dyn GroupAnalyzer>>,
    /// Produces `A7`.
    pub emotion: Option<Arc<dyn GroupAnalyzer>>,
}

impl Analyzers {
    pub(super) fn for_group(&self, group: Group) -> Option<Arc<dyn GroupAnalyzer>> {
        match group {
            Group::Grok => self.grok.clone(),
            Group::Opus => self.opus.clone(),
            Group::Emotion => self.emotion.clone(),
        }
    }
}
