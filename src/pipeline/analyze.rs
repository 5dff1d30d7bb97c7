//! The streaming analysis algorithm itself (C8).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::Stream;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;

use super::axis::{AnalysisRequest, Analyzers, AxisId, AxisStatus, Group};
use super::events::{compute_confidence, AnalysisResult, PartialResult, StreamEvent};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn resolve_requested_axes(request: &AnalysisRequest) -> Result<Vec<AxisId>, PipelineError> {
    if request.prompt.trim().is_empty() {
        return Err(PipelineError::InvalidRequest("prompt must not be empty".to_string()));
    }
    match &request.include_axes {
        Some(axes) if !axes.is_empty() => Ok(axes.clone()),
        Some(_) => Err(PipelineError::InvalidRequest("include_axes must not be empty when set".to_string())),
        None => Ok(AxisId::ALL.to_vec()),
    }
}

struct GroupOutcome {
    group: Group,
    axes: Vec<AxisId>,
    result: anyhow::Result<serde_json::Value>,
    elapsed: Duration,
}

/// Run the streaming axis analysis, yielding [`StreamEvent`]s as groups
/// settle.
///
/// Individual analyzer failure never blocks the run; other groups continue.
/// `cancel` firing stops future polling, but already-yielded events remain
/// valid.
pub fn analyze(
    request: AnalysisRequest,
    analyzers: Analyzers,
    cancel: CancellationToken,
) -> impl Stream<Item = StreamEvent> {
    async_stream::stream! {
        let requested = match resolve_requested_axes(&request) {
            Ok(axes) => axes,
            Err(err) => {
                yield StreamEvent::AxisError {
                    group: Group::Grok,
                    axes: Vec::new(),
                    error: err.to_string(),
                };
                return;
            }
        };

        let total = requested.len();
        let started_at = Instant::now();
        let mut progress: HashMap<AxisId, super::axis::AxisProgress> = super::axis::initial_progress(&requested)
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        yield StreamEvent::Progress { axis_results: sorted_progress(&progress, &requested), percent: 0.0 };

        let mut pending = FuturesUnordered::new();
        let mut settled = 0usize;

        for group in [Group::Grok, Group::Opus, Group::Emotion] {
            let axes_requested: Vec<AxisId> =
                group.axes().iter().copied().filter(|a| requested.contains(a)).collect();
            if axes_requested.is_empty() {
                continue;
            }

            match analyzers.for_group(group) {
                Some(analyzer) => {
                    for axis in &axes_requested {
                        if let Some(entry) = progress.get_mut(axis) {
                            entry.status = AxisStatus::Running;
                            entry.started_at = Some(Utc::now());
                        }
                    }
                    yield StreamEvent::AxisStart { group, axes: axes_requested.clone() };

                    let request = request.clone();
                    let cancel = cancel.clone();
                    let group_started = Instant::now();
                    pending.push(async move {
                        let result = analyzer.analyze(&request, &cancel).await;
                        GroupOutcome { group, axes: axes_requested, result, elapsed: group_started.elapsed() }
                    });
                }
                None => {
                    for axis in &axes_requested {
                        if let Some(entry) = progress.get_mut(axis) {
                            entry.status = AxisStatus::Completed;
                            entry.completed_at = Some(Utc::now());
                            entry.duration_ms = Some(0);
                        }
                    }
                    settled += axes_requested.len();
                }
            }
        }

        let mut partial = PartialResult::default();
        let mut ticker = tokio::time::interval(POLL_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        while settled < total && !pending.is_empty() {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let percent = (settled as f64 / total as f64) * 100.0;
                    yield StreamEvent::Progress { axis_results: sorted_progress(&progress, &requested), percent };
                }
                Some(outcome) = pending.next() => {
                    let duration_ms = u64::try_from(outcome.elapsed.as_millis()).unwrap_or(u64::MAX);
                    let validated = match outcome.result {
                        Ok(value) => super::schema::validate(outcome.group, &value).map(|()| value),
                        Err(err) => Err(err.to_string()),
                    };
                    match validated {
                        Ok(value) => {
                            partial.set(outcome.group, value);
                            for axis in &outcome.axes {
                                if let Some(entry) = progress.get_mut(axis) {
                                    entry.status = AxisStatus::Completed;
                                    entry.completed_at = Some(Utc::now());
                                    entry.duration_ms = Some(duration_ms);
                                }
                            }
                            settled += outcome.axes.len();
                            yield StreamEvent::AxisComplete { group: outcome.group, axes: outcome.axes, duration_ms };
                        }
                        Err(message) => {
                            for axis in &outcome.axes {
                                if let Some(entry) = progress.get_mut(axis) {
                                    entry.status = AxisStatus::Failed;
                                    entry.error = Some(message.clone());
                                }
                            }
                            settled += outcome.axes.len();
                            yield StreamEvent::AxisError { group: outcome.group, axes: outcome.axes, error: message };
                        }
                    }
                }
            }
        }

        let completed_count = progress.values().filter(|p| p.status == AxisStatus::Completed).count();
        let confidence = compute_confidence(
            completed_count,
            total,
            partial.grok.is_some(),
            partial.opus.is_some(),
            partial.emotion.is_some(),
        );

        yield StreamEvent::Final {
            result: AnalysisResult {
                grok_axes: partial.grok,
                opus_axes: partial.opus,
                emotion_axes: partial.emotion,
                confidence,
                processed_at: Utc::now(),
                total_duration_ms: u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX),
                axis_results: sorted_progress(&progress, &requested),
            },
        };
    }
}

fn sorted_progress(
    progress: &HashMap<AxisId, super::axis::AxisProgress>,
    requested: &[AxisId],
) -> Vec<super::axis::AxisProgress> {
    requested.iter().filter_map(|id| progress.get(id).cloned()).collect()
}

/// Consume a run to completion and return only its terminal result (spec
/// §4.10: "a convenience callback API ... consumes the generator and returns
/// the final result").
pub async fn stream_axis_analysis(
    request: AnalysisRequest,
    analyzers: Analyzers,
    cancel: CancellationToken,
    mut on_event: impl FnMut(&StreamEvent),
) -> Result<AnalysisResult, PipelineError> {
    let mut stream = Box::pin(analyze(request, analyzers, cancel));
    while let Some(event) = stream.next().await {
        on_event(&event);
        if let StreamEvent::Final { result } = event {
            return Ok(result);
        }
    }
    Err(PipelineError::InvalidRequest("stream ended without a final event".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::axis::{GroupAnalyzer, Language};
    use async_trait::async_trait;
    use std::sync::Arc;

    /// Returns a value carrying every axis key across every group, so it
    /// satisfies whichever group's schema it is assigned to in a test.
    struct Ok3;
    #[async_trait]
    impl GroupAnalyzer for Ok3 {
        async fn analyze(&self, _request: &AnalysisRequest, _cancel: &CancellationToken) -> anyhow::Result<serde_json::Value> {
            Ok(serde_json::json!({
                "a1": "x", "a2": "y", "a3": "z",
                "a4": "x", "a5": "y", "a6": "z",
                "a7": "x",
            }))
        }
    }

    struct SchemaMismatch;
    #[async_trait]
    impl GroupAnalyzer for SchemaMismatch {
        async fn analyze(&self, _request: &AnalysisRequest, _cancel: &CancellationToken) -> anyhow::Result<serde_json::Value> {
            Ok(serde_json::json!({"unexpected": "garbage"}))
        }
    }

    struct AlwaysFails;
    #[async_trait]
    impl GroupAnalyzer for AlwaysFails {
        async fn analyze(&self, _request: &AnalysisRequest, _cancel: &CancellationToken) -> anyhow::Result<serde_json::Value> {
            Err(anyhow::anyhow!("analyzer exploded"))
        }
    }

    fn request() -> AnalysisRequest {
        AnalysisRequest { prompt: "a fox in a forest".to_string(), language: Language::En, include_axes: None }
    }

    #[tokio::test]
    async fn partial_failure_does_not_block_other_groups() {
        let analyzers = Analyzers {
            grok: Some(Arc::new(AlwaysFails)),
            opus: Some(Arc::new(Ok3)),
            emotion: Some(Arc::new(Ok3)),
        };

        let result = stream_axis_analysis(request(), analyzers, CancellationToken::new(), |_| {}).await.unwrap();
        assert!(result.grok_axes.is_none());
        assert!(result.opus_axes.is_some());
        let failed = result.axis_results.iter().filter(|p| p.status == AxisStatus::Failed).count();
        let completed = result.axis_results.iter().filter(|p| p.status == AxisStatus::Completed).count();
        assert_eq!(failed, 3);
        assert_eq!(completed, 4);
    }

    #[tokio::test]
    async fn missing_analyzer_is_skipped_not_failed() {
        let analyzers = Analyzers { grok: Some(Arc::new(Ok3)), opus: None, emotion: None };
        let result = stream_axis_analysis(request(), analyzers, CancellationToken::new(), |_| {}).await.unwrap();
        let skipped = result
            .axis_results
            .iter()
            .filter(|p| p.status == AxisStatus::Completed && p.duration_ms == Some(0))
            .count();
        assert_eq!(skipped, 4);
    }

    #[tokio::test]
    async fn schema_mismatch_fails_the_group_instead_of_merging() {
        let analyzers = Analyzers {
            grok: Some(Arc::new(SchemaMismatch)),
            opus: Some(Arc::new(Ok3)),
            emotion: Some(Arc::new(Ok3)),
        };
        let result = stream_axis_analysis(request(), analyzers, CancellationToken::new(), |_| {}).await.unwrap();
        assert!(result.grok_axes.is_none());
        assert!(result.opus_axes.is_some());
        let failed = result.axis_results.iter().filter(|p| p.status == AxisStatus::Failed).count();
        assert_eq!(failed, 3);
        assert!(result.axis_results.iter().filter(|p| p.status == AxisStatus::Failed).all(|p| p.error.is_some()));
    }

    #[tokio::test]
    async fn exactly_one_final_event_and_it_is_last() {
        let analyzers = Analyzers { grok: Some(Arc::new(Ok3)), opus: Some(Arc::new(Ok3)), emotion: Some(Arc::new(Ok3)) };
        let mut stream = Box::pin(analyze(request(), analyzers, CancellationToken::new()));
        let mut events = Vec::new();
        while let Some(event) = stream.next().await {
            events.push(event);
        }
        let final_count = events.iter().filter(|e| matches!(e, StreamEvent::Final { .. })).count();
        assert_eq!(final_count, 1);
        assert!(matches!(events.last(), Some(StreamEvent::Final { .. })));
    }
}
