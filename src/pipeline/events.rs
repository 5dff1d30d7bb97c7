//! Terminal and progress event types for a streaming analysis run (C8).

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::axis::{AxisId, AxisProgress, Group};

/// The four weighted sub-scores that make up a run's overall confidence.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Confidence {
    /// `completedCount / requestedCount * 100`.
    pub coverage: f64,
    /// A step function of `completedCount`: 85 / 60 / 30.
    pub depth: f64,
    /// 80 if both grok and opus groups are present, else 50.
    pub coherence: f64,
    /// 85 if the emotion group is present, else 65.
    pub specificity: f64,
    /// The weighted total: `0.3*coverage + 0.3*depth + 0.2*coherence + 0.2*specificity`.
    pub total: f64,
}

pub(super) fn compute_confidence(completed: usize, requested: usize, grok: bool, opus: bool, emotion: bool) -> Confidence {
    let coverage = if requested == 0 { 0.0 } else { completed as f64 / requested as f64 * 100.0 };
    let depth = if completed >= 6 {
        85.0
    } else if completed >= 3 {
        60.0
    } else {
        30.0
    };
    let coherence = if grok && opus { 80.0 } else { 50.0 };
    let specificity = if emotion { 85.0 } else { 65.0 };
    let total = 0.3 * coverage + 0.3 * depth + 0.2 * coherence + 0.2 * specificity;
    Confidence { coverage, depth, coherence, specificity, total }
}

/// The fully aggregated outcome of a run, carried by the terminal `final` event.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    /// Merged output of the grok group, if it ran and succeeded.
    pub grok_axes: Option<serde_json::Value>,
    /// Merged output of the opus group, if it ran and succeeded.
    pub opus_axes: Option<serde_json::Value>,
    /// Merged output of the emotion group, if it ran and succeeded.
    pub emotion_axes: Option<serde_json::Value>,
    /// The computed confidence breakdown.
    pub confidence: Confidence,
    /// When this result was assembled.
    pub processed_at: DateTime<Utc>,
    /// Total wall-clock duration of the run.
    pub total_duration_ms: u64,
    /// Final per-axis progress for every requested axis.
    pub axis_results: Vec<AxisProgress>,
}

#[derive(Debug, Clone, Default)]
pub(super) struct PartialResult {
    pub grok: Option<serde_json::Value>,
    pub opus: Option<serde_json::Value>,
    pub emotion: Option<serde_json::Value>,
}

impl PartialResult {
    pub(super) fn set(&mut self, group: Group, value: serde_json::Value) {
        match group {
            Group::Grok => self.grok = Some(value),
            Group::Opus => self.opus = Some(value),
            Group::Emotion => self.emotion = Some(value),
        }
    }
}

/// The discriminated event stream a run emits.
///
/// Exactly one `final` event is emitted per run, and it is always last.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A group's axes transitioned to `running`.
    AxisStart {
        /// The group that started.
        group: Group,
        /// The axes it is responsible for.
        axes: Vec<AxisId>,
    },
    /// A group's axes transitioned to `completed`.
    AxisComplete {
        /// The group that completed.
        group: Group,
        /// The axes it produced.
        axes: Vec<AxisId>,
        /// How long the group call took.
        duration_ms: u64,
    },
    /// A group's axes transitioned to `failed`.
    AxisError {
        /// The group that failed.
        group: Group,
        /// The axes left failed.
        axes: Vec<AxisId>,
        /// The error message.
        error: String,
    },
    /// A periodic snapshot of every axis's current progress.
    Progress {
        /// Current per-axis states.
        axis_results: Vec<AxisProgress>,
        /// `completed_or_failed_count / requested_count * 100`.
        percent: f64,
    },
    /// The single terminal event of a run.
    Final {
        /// The fully aggregated result.
        result: AnalysisResult,
    },
}
