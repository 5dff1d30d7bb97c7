//! Per-group result schemas (C8 step 4): "validate the result against the
//! group's schema (safe-parse); if valid, merge ... On group failure: mark
//! every axis in the group failed."
//!
//! An analyzer returning a value that doesn't carry its group's axes is not
//! a trustworthy result; it is rejected here the same way as a thrown error,
//! rather than merged into the final result.

use serde::Deserialize;

use super::axis::Group;

/// Grok group schema: one entry per axis (`A1`, `A2`, `A3`).
#[derive(Debug, Deserialize)]
struct GrokAxes {
    #[allow(dead_code)]
    a1: serde_json::Value,
    #[allow(dead_code)]
    a2: serde_json::Value,
    #[allow(dead_code)]
    a3: serde_json::Value,
}

/// Opus group schema: one entry per axis (`A4`, `A5`, `A6`).
#[derive(Debug, Deserialize)]
struct OpusAxes {
    #[allow(dead_code)]
    a4: serde_json::Value,
    #[allow(dead_code)]
    a5: serde_json::Value,
    #[allow(dead_code)]
    a6: serde_json::Value,
}

/// Emotion group schema: the single `A7` axis.
#[derive(Debug, Deserialize)]
struct EmotionAxes {
    #[allow(dead_code)]
    a7: serde_json::Value,
}

/// Safe-parse `value` against `group`'s schema. `Err` carries a message fit
/// to attach to an `AxisError` event.
pub(super) fn validate(group: Group, value: &serde_json::Value) -> Result<(), String> {
    let parsed = match group {
        Group::Grok => serde_json::from_value::<GrokAxes>(value.clone()).map(drop),
        Group::Opus => serde_json::from_value::<OpusAxes>(value.clone()).map(drop),
        Group::Emotion => serde_json::from_value::<EmotionAxes>(value.clone()).map(drop),
    };
    parsed.map_err(|err| format!("{group:?} result did not match its schema: {err}"))
}
