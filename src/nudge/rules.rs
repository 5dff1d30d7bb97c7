//! Declarative nudge rules and the five rules shipped by default (C6).

use std::time::Duration;

use crate::context::AgentContextSnapshot;
use crate::health::{HealthStatus, Overall, ServiceStatus};

/// Relative importance of a nudge, for callers that want to sort by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// A single declarative nudge rule.
///
/// `predicate` and `formatter` are boxed closures rather than fn pointers so
/// that callers can build rules that close over their own thresholds; the
/// five defaults in [`default_rules`] do exactly this.
pub struct NudgeRule {
    /// Stable identifier, used as the cooldown key.
    pub id: String,
    /// Priority surfaced on the emitted message.
    pub priority: Priority,
    /// Minimum time between two emissions of this rule.
    pub cooldown: Duration,
    /// Free-form grouping label (e.g. "prompt", "availability").
    pub category: String,
    /// Whether this rule currently applies.
    pub predicate: Box<dyn Fn(&AgentContextSnapshot, &HealthStatus) -> bool + Send + Sync>,
    /// Renders the message body when the rule fires.
    pub formatter: Box<dyn Fn(&AgentContextSnapshot, &HealthStatus) -> String + Send + Sync>,
    /// Optional machine-readable action hint attached to the emitted message.
    pub action: Option<String>,
}

const PROMPT_IDLE_THRESHOLD_MS: u64 = 10 * 60 * 1000;
const LONG_SESSION_THRESHOLD: usize = 8;
const SLOW_RESPONSE_THRESHOLD_MS: u64 = 5_000;

fn slow_service(health: &HealthStatus) -> Option<&str> {
    health
        .services
        .iter()
        .find(|(_, h)| h.status == ServiceStatus::Ok && h.latency_ms >= SLOW_RESPONSE_THRESHOLD_MS)
        .map(|(name, _)| name.as_str())
}

/// The five default rules: prompt-refine, vendor fallback, all-down,
/// long-running session, and slow response.
pub fn default_rules() -> Vec<NudgeRule> {
    vec![
        NudgeRule {
            id: "prompt-refine".to_string(),
            priority: Priority::Low,
            cooldown: Duration::from_secs(15 * 60),
            category: "prompt".to_string(),
            predicate: Box::new(|context, _health| {
                context.last_prompt.is_some()
                    && context.last_refined_prompt.is_none()
                    && context.prompt_edit_idle_ms >= PROMPT_IDLE_THRESHOLD_MS
            }),
            formatter: Box::new(|_context, _health| {
                "This prompt hasn't been refined in a while. Want a pass at sharpening it?".to_string()
            }),
            action: Some("refine_prompt".to_string()),
        },
        NudgeRule {
            id: "vendor-fallback".to_string(),
            priority: Priority::Medium,
            cooldown: Duration::from_secs(5 * 60),
            category: "availability".to_string(),
            predicate: Box::new(|_context, health| health.overall == Overall::Partial),
            formatter: Box::new(|_context, health| {
                let down: Vec<&str> = health
                    .services
                    .iter()
                    .filter(|(_, h)| h.status != ServiceStatus::Ok && h.status != ServiceStatus::Unconfigured)
                    .map(|(name, _)| name.as_str())
                    .collect();
                format!("Falling back: {} unavailable, routing around it.", down.join(", "))
            }),
            action: None,
        },
        NudgeRule {
            id: "all-down".to_string(),
            priority: Priority::High,
            cooldown: Duration::from_secs(60),
            category: "availability".to_string(),
            predicate: Box::new(|_context, health| health.overall == Overall::AllDown),
            formatter: Box::new(|_context, _health| {
                "Every configured service is unavailable right now.".to_string()
            }),
            action: None,
        },
        NudgeRule {
            id: "long-running-session".to_string(),
            priority: Priority::Low,
            cooldown: Duration::from_secs(10 * 60),
            category: "session".to_string(),
            predicate: Box::new(|context, _health| {
                context.session_ids.len() >= LONG_SESSION_THRESHOLD
            }),
            formatter: Box::new(|context, _health| {
                format!(
                    "This session has touched {} conversation threads. Consider starting fresh.",
                    context.session_ids.len()
                )
            }),
            action: None,
        },
        NudgeRule {
            id: "slow-response".to_string(),
            priority: Priority::Low,
            cooldown: Duration::from_secs(5 * 60),
            category: "performance".to_string(),
            predicate: Box::new(|_context, health| slow_service(health).is_some()),
            formatter: Box::new(|_context, health| {
                let name = slow_service(health).unwrap_or("a service");
                format!("{name} is responding slowly.")
            }),
            action: None,
        },
    ]
}
