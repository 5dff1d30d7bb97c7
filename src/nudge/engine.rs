//! Nudge rule evaluation with per-rule cooldowns (C6).

use std::time::Instant;

use crate::context::AgentContextSnapshot;
use crate::health::HealthStatus;
use crate::resilience::LruCache;

use super::rules::{NudgeRule, Priority};

const LAST_SENT_CAPACITY: usize = 100;

/// A rule-triggered advisory message emitted to the host process.
#[derive(Debug, Clone, serde::Serialize)]
pub struct NudgeMessage {
    /// The id of the rule that produced this message.
    pub rule_id: String,
    /// The rule's declared priority.
    pub priority: Priority,
    /// The rule's declared category.
    pub category: String,
    /// The rendered message body.
    pub message: String,
    /// The rule's optional action hint.
    pub action: Option<String>,
}

/// Evaluates a pluggable list of [`NudgeRule`]s against the current context
/// and health snapshot, respecting each rule's cooldown.
pub struct NudgeEngine {
    rules: Vec<NudgeRule>,
    last_sent: LruCache<String, Instant>,
    nudge_count: u64,
}

impl NudgeEngine {
    /// Construct an engine with the given rules, evaluated in declared order.
    pub fn new(rules: Vec<NudgeRule>) -> Self {
        Self {
            rules,
            last_sent: LruCache::new(LAST_SENT_CAPACITY).expect("capacity is a nonzero constant"),
            nudge_count: 0,
        }
    }

    /// An engine preloaded with the five default rules.
    pub fn with_default_rules() -> Self {
        Self::new(super::rules::default_rules())
    }

    /// Total number of nudges emitted over this engine's lifetime.
    pub fn nudge_count(&self) -> u64 {
        self.nudge_count
    }

    /// Evaluate every rule against `context` and `health`, in declared order.
    ///
    /// A rule whose predicate holds is included only if it has never fired,
    /// or if its cooldown has elapsed since it last fired — cooldown is
    /// time-sensitive per rule, not one-shot. Included rules have their
    /// last-sent time refreshed to now.
    pub fn evaluate(&mut self, context: &AgentContextSnapshot, health: &HealthStatus) -> Vec<NudgeMessage> {
        let mut out = Vec::new();

        for index in 0..self.rules.len() {
            let fires = {
                let rule = &self.rules[index];
                (rule.predicate)(context, health)
            };
            if !fires {
                continue;
            }

            let now = Instant::now();
            let due = match self.last_sent.get(&self.rules[index].id) {
                Some(last) => now.duration_since(*last) >= self.rules[index].cooldown,
                None => true,
            };
            if !due {
                continue;
            }

            self.last_sent.set(self.rules[index].id.clone(), now);
            self.nudge_count += 1;

            let rule = &self.rules[index];
            out.push(NudgeMessage {
                rule_id: rule.id.clone(),
                priority: rule.priority,
                category: rule.category.clone(),
                message: (rule.formatter)(context, health),
                action: rule.action.clone(),
            });
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::Overall;
    use std::collections::HashMap;
    use std::time::Duration;

    fn context() -> AgentContextSnapshot {
        AgentContextSnapshot {
            last_prompt: None,
            last_refined_prompt: None,
            active_shot_count: 0,
            session_ids: Vec::new(),
            cached: false,
            last_activity: chrono::Utc::now(),
            prompt_edit_idle_ms: 0,
        }
    }

    fn health(overall: Overall) -> HealthStatus {
        HealthStatus { services: HashMap::new(), overall }
    }

    fn always_rule(id: &str, cooldown_ms: u64) -> NudgeRule {
        NudgeRule {
            id: id.to_string(),
            priority: Priority::Low,
            cooldown: Duration::from_millis(cooldown_ms),
            category: "test".to_string(),
            predicate: Box::new(|_, _| true),
            formatter: Box::new(|_, _| "fired".to_string()),
            action: None,
        }
    }

    #[test]
    fn fires_once_then_respects_cooldown() {
        let mut engine = NudgeEngine::new(vec![always_rule("r1", 10_000)]);
        let first = engine.evaluate(&context(), &health(Overall::AllOk));
        assert_eq!(first.len(), 1);
        let second = engine.evaluate(&context(), &health(Overall::AllOk));
        assert!(second.is_empty());
    }

    #[test]
    fn fires_again_after_cooldown_elapses() {
        let mut engine = NudgeEngine::new(vec![always_rule("r1", 1)]);
        assert_eq!(engine.evaluate(&context(), &health(Overall::AllOk)).len(), 1);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(engine.evaluate(&context(), &health(Overall::AllOk)).len(), 1);
    }

    #[test]
    fn all_down_rule_fires_on_all_down_health() {
        let mut engine = NudgeEngine::with_default_rules();
        let nudges = engine.evaluate(&context(), &health(Overall::AllDown));
        assert!(nudges.iter().any(|n| n.rule_id == "all-down"));
    }

    #[test]
    fn declared_order_is_preserved_in_output() {
        let mut engine = NudgeEngine::new(vec![always_rule("a", 1), always_rule("b", 1)]);
        let nudges = engine.evaluate(&context(), &health(Overall::AllOk));
        assert_eq!(nudges[0].rule_id, "a");
        assert_eq!(nudges[1].rule_id, "b");
    }
}
