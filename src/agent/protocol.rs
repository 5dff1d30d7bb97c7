//! Typed command/event protocol, schema-validated on receipt (C3).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::{AgentContextSnapshot, ContextUpdate};
use crate::error::AgentError;
use crate::health::HealthStatus;
use crate::metrics::MetricsSnapshot;
use crate::nudge::NudgeMessage;

/// Partial runtime configuration accepted by the `configure` command.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigurePayload {
    /// New health-check interval in milliseconds, if set.
    pub health_interval_ms: Option<u64>,
    /// New nudge-evaluation interval in milliseconds, if set.
    pub nudge_interval_ms: Option<u64>,
}

/// Commands accepted by the agent worker.
///
/// Deserialized from a tagged JSON union with field `type`; any payload that
/// fails to parse against this shape is rejected by [`parse_command`] and
/// never reaches the worker.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentCommand {
    /// Run a health probe round immediately.
    CheckHealth,
    /// Merge a partial update into the context registry.
    UpdateContext {
        /// The fields to merge.
        payload: ContextUpdate,
    },
    /// Request a full status snapshot.
    GetStatus,
    /// Adjust runtime-tunable configuration.
    Configure {
        /// The fields to change.
        payload: ConfigurePayload,
    },
    /// Request a graceful shutdown.
    Shutdown,
}

/// Events emitted by the agent worker.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Emitted exactly once, before any other event, when the worker starts.
    Ready,
    /// A fresh health snapshot, emitted after every `check()`.
    HealthUpdate {
        /// The snapshot.
        status: HealthStatus,
    },
    /// A nudge emitted by the rule engine.
    Nudge {
        /// The nudge message.
        message: NudgeMessage,
    },
    /// A fresh context snapshot, emitted after every context mutation.
    ContextSync {
        /// The snapshot.
        snapshot: AgentContextSnapshot,
    },
    /// The reply to a `get_status` command.
    Status {
        /// The last-observed health snapshot, if any has been taken yet.
        health: Option<HealthStatus>,
        /// The current context snapshot.
        context: AgentContextSnapshot,
        /// The current metrics snapshot.
        metrics: MetricsSnapshot,
    },
    /// Raised whenever a command was rejected or an internal operation failed.
    Error {
        /// A human-readable description of the failure.
        message: String,
    },
    /// Emitted exactly once, as the last event, before the worker exits.
    ShutdownComplete,
}

/// Validate and parse a raw command payload.
///
/// Invalid messages never reach the worker: the caller is expected to turn a
/// parse failure into an `error` event rather than propagate it as an
/// exception.
pub fn parse_command(raw: Value) -> Result<AgentCommand, AgentError> {
    serde_json::from_value(raw).map_err(|e| AgentError::InvalidCommand(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn check_health_parses() {
        let command = parse_command(json!({"type": "check_health"})).unwrap();
        assert!(matches!(command, AgentCommand::CheckHealth));
    }

    #[test]
    fn update_context_parses_payload() {
        let command = parse_command(json!({
            "type": "update_context",
            "payload": {"last_prompt": "a cat on a skateboard"}
        }))
        .unwrap();
        match command {
            AgentCommand::UpdateContext { payload } => {
                assert_eq!(payload.last_prompt.as_deref(), Some("a cat on a skateboard"));
            }
            _ => panic!("expected UpdateContext"),
        }
    }

    #[test]
    fn unknown_type_is_rejected_not_panicking() {
        let result = parse_command(json!({"type": "not_a_real_command"}));
        assert!(matches!(result, Err(AgentError::InvalidCommand(_))));
    }

    #[test]
    fn missing_payload_on_update_context_is_rejected() {
        let result = parse_command(json!({"type": "update_context"}));
        assert!(result.is_err());
    }
}
