//! Bounded-parallelism batch generation with stable output ordering (C9).
//!
//! Requests are split into contiguous chunks of size ≤ `concurrency` and
//! processed chunk-by-chunk, each chunk run in parallel — the same
//! "batches to limit concurrent tasks" shape used for bulk file analysis
//! elsewhere in this codebase.

use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use super::generate::Forge;
use super::types::{GenerationRequest, GenerationResult, GenerationStatus};

/// A single step of batch progress, reported through the caller-supplied
/// callback as `(index, total, step, message)`.
#[derive(Debug, Clone)]
pub struct BatchProgress {
    /// Index of the request this step concerns.
    pub index: usize,
    /// Total number of requests in the batch.
    pub total: usize,
    /// A short machine-readable step name (e.g. `"image"`, `"video"`, `"cache_hit"`).
    pub step: &'static str,
    /// A human-readable message.
    pub message: String,
}

/// Aggregate totals across a completed batch.
#[derive(Debug, Clone, Default)]
pub struct BatchTotals {
    /// Number of requests that finished `Completed`.
    pub success_count: usize,
    /// Number of requests that finished `Partial`.
    pub partial_count: usize,
    /// Number of requests that finished `Failed`.
    pub failure_count: usize,
    /// Total wall-clock duration of the whole batch.
    pub total_duration_ms: u64,
}

/// The outcome of [`Forge::generate_batch`].
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Per-request results, in the same order as the input requests.
    pub results: Vec<GenerationResult>,
    /// Aggregate totals across `results`.
    pub totals: BatchTotals,
}

impl Forge {
    /// Run `requests` with at most `concurrency` (minimum 1) running at
    /// once, preserving the input order in the output.
    ///
    /// If `cancel` is already fired when a chunk starts, every request in
    /// that chunk and every subsequent chunk completes as `Failed` with
    /// `"cancelled"` without invoking any provider, so a pre-cancelled batch
    /// never hangs.
    pub async fn generate_batch(
        &self,
        requests: Vec<GenerationRequest>,
        concurrency: usize,
        cancel: &CancellationToken,
        mut on_progress: impl FnMut(BatchProgress),
    ) -> BatchOutcome {
        let total = requests.len();
        let concurrency = concurrency.max(1);
        let started = std::time::Instant::now();

        let mut results: Vec<Option<GenerationResult>> = (0..total).map(|_| None).collect();

        for (chunk_start, chunk) in requests.into_iter().collect::<Vec<_>>().chunks(concurrency).enumerate().map(
            |(chunk_index, chunk)| (chunk_index * concurrency, chunk.to_vec()),
        ) {
            if cancel.is_cancelled() {
                for (offset, _) in chunk.iter().enumerate() {
                    let index = chunk_start + offset;
                    on_progress(BatchProgress {
                        index,
                        total,
                        step: "cancelled",
                        message: "batch cancelled before this request started".to_string(),
                    });
                    results[index] = Some(cancelled_result());
                }
                continue;
            }

            let futures = chunk.into_iter().enumerate().map(|(offset, request)| {
                let index = chunk_start + offset;
                async move {
                    let result = self.generate(request, cancel).await;
                    (index, result)
                }
            });

            for (index, result) in join_all(futures).await {
                let step = match result.status {
                    GenerationStatus::Completed => "completed",
                    GenerationStatus::Partial => "partial",
                    GenerationStatus::Failed => "failed",
                };
                on_progress(BatchProgress {
                    index,
                    total,
                    step,
                    message: result.error.clone().unwrap_or_else(|| "ok".to_string()),
                });
                results[index] = Some(result);
            }
        }

        let results: Vec<GenerationResult> =
            results.into_iter().map(|r| r.unwrap_or_else(cancelled_result)).collect();

        let mut totals = BatchTotals { total_duration_ms: elapsed_ms(started), ..BatchTotals::default() };
        for result in &results {
            match result.status {
                GenerationStatus::Completed => totals.success_count += 1,
                GenerationStatus::Partial => totals.partial_count += 1,
                GenerationStatus::Failed => totals.failure_count += 1,
            }
        }

        BatchOutcome { results, totals }
    }
}

fn cancelled_result() -> GenerationResult {
    GenerationResult {
        status: GenerationStatus::Failed,
        illustration: None,
        animation_uri: None,
        final_prompt: String::new(),
        cached: false,
        duration_ms: 0,
        error: Some("cancelled".to_string()),
    }
}

fn elapsed_ms(started: std::time::Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
