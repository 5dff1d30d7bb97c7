//! The agent worker: an isolated cooperative task behind one command/event
//! channel pair (C7).
//!
//! The worker runs as its own `tokio::task` rather than a real subprocess:
//! a channel-only communication boundary, with no shared mutable state
//! crossing it, is what actually matters, and a task gives us that without
//! the cost of a real process per agent.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::context::ContextRegistry;
use crate::health::{HealthMonitor, HealthStatus, Overall};
use crate::metrics::MetricsRegistry;
use crate::nudge::NudgeEngine;

use super::protocol::{AgentCommand, AgentEvent};

/// How the worker's task ended.
#[derive(Debug)]
pub enum WorkerExit {
    /// Ended via an explicit `shutdown` command or cancellation; never restarted.
    Clean,
    /// Ended unexpectedly; the proxy may restart the worker.
    Abnormal(String),
}

fn empty_health() -> HealthStatus {
    HealthStatus { services: HashMap::new(), overall: Overall::AllDown }
}

/// Owns every piece of mutable worker-side state exclusively: the health
/// monitor, the context registry, and the nudge engine. None of it is
/// `Send`/`Sync`-shared; the worker is the only task that ever touches it.
pub struct AgentWorker {
    cmd_rx: mpsc::Receiver<AgentCommand>,
    event_tx: mpsc::Sender<AgentEvent>,
    cancel: CancellationToken,
    health: HealthMonitor,
    context: ContextRegistry,
    nudges: NudgeEngine,
    metrics: Arc<MetricsRegistry>,
    health_interval: Duration,
    nudge_interval: Duration,
    last_health: Option<HealthStatus>,
}

impl AgentWorker {
    /// Construct a worker from its already-assembled components.
    pub fn new(
        cmd_rx: mpsc::Receiver<AgentCommand>,
        event_tx: mpsc::Sender<AgentEvent>,
        cancel: CancellationToken,
        health: HealthMonitor,
        nudges: NudgeEngine,
        metrics: Arc<MetricsRegistry>,
        health_interval: Duration,
        nudge_interval: Duration,
    ) -> Self {
        Self {
            cmd_rx,
            event_tx,
            cancel,
            health,
            context: ContextRegistry::new(),
            nudges,
            metrics,
            health_interval,
            nudge_interval,
            last_health: None,
        }
    }

    /// Run the worker until cancelled or commanded to shut down.
    ///
    /// Emits exactly one `ready` before anything else and, on the clean
    /// path, exactly one `shutdown_complete` as the last event.
    pub async fn run(mut self) -> WorkerExit {
        if self.event_tx.send(AgentEvent::Ready).await.is_err() {
            return WorkerExit::Abnormal("event channel closed before ready".to_string());
        }

        let mut health_timer = tokio::time::interval(self.health_interval);
        health_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        health_timer.tick().await; // consume the immediate first tick

        let mut nudge_timer = tokio::time::interval(self.nudge_interval);
        nudge_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        nudge_timer.tick().await;

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    return self.finish_clean().await;
                }
                maybe_cmd = self.cmd_rx.recv() => {
                    match maybe_cmd {
                        Some(AgentCommand::Shutdown) => {
                            self.cancel.cancel();
                            return self.finish_clean().await;
                        }
                        Some(command) => self.handle_command(command, &mut health_timer, &mut nudge_timer).await,
                        None => return WorkerExit::Abnormal("command channel closed".to_string()),
                    }
                }
                _ = health_timer.tick() => {
                    self.run_health_round().await;
                    self.run_nudge_round().await;
                }
                _ = nudge_timer.tick() => {
                    self.run_nudge_round().await;
                }
            }
        }
    }

    async fn finish_clean(mut self) -> WorkerExit {
        let _ = self.event_tx.send(AgentEvent::ShutdownComplete).await;
        WorkerExit::Clean
    }

    async fn handle_command(
        &mut self,
        command: AgentCommand,
        health_timer: &mut tokio::time::Interval,
        nudge_timer: &mut tokio::time::Interval,
    ) {
        match command {
            AgentCommand::CheckHealth => {
                self.run_health_round().await;
                self.run_nudge_round().await;
            }
            AgentCommand::UpdateContext { payload } => {
                self.context.update(payload);
                let snapshot = self.context.get();
                let _ = self.event_tx.send(AgentEvent::ContextSync { snapshot }).await;
            }
            AgentCommand::GetStatus => {
                let status = AgentEvent::Status {
                    health: self.last_health.clone(),
                    context: self.context.get(),
                    metrics: self.metrics.snapshot(),
                };
                let _ = self.event_tx.send(status).await;
            }
            AgentCommand::Configure { payload } => {
                if let Some(ms) = payload.health_interval_ms {
                    self.health_interval = Duration::from_millis(ms);
                    *health_timer = tokio::time::interval(self.health_interval);
                    health_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
                }
                if let Some(ms) = payload.nudge_interval_ms {
                    self.nudge_interval = Duration::from_millis(ms);
                    *nudge_timer = tokio::time::interval(self.nudge_interval);
                    nudge_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
                }
            }
            AgentCommand::Shutdown => unreachable!("handled by the caller before dispatch"),
        }
    }

    async fn run_health_round(&mut self) {
        let status = self.health.check().await;
        self.metrics.increment("health_checks", 1);
        self.last_health = Some(status.clone());
        let _ = self.event_tx.send(AgentEvent::HealthUpdate { status }).await;
    }

    async fn run_nudge_round(&mut self) {
        let context = self.context.get();
        let health = self.last_health.clone().unwrap_or_else(empty_health);
        let nudges = self.nudges.evaluate(&context, &health);
        for message in nudges {
            self.metrics.increment("nudges_sent", 1);
            let _ = self.event_tx.send(AgentEvent::Nudge { message }).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::CircuitBreakerConfig;

    fn fast_config() -> (HealthMonitor, NudgeEngine) {
        let health = HealthMonitor::new(vec![], CircuitBreakerConfig {
            failure_threshold: 3,
            reset_timeout: Duration::from_secs(1),
        });
        (health, NudgeEngine::new(vec![]))
    }

    #[tokio::test]
    async fn emits_ready_then_shutdown_complete_on_clean_stop() {
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let (event_tx, mut event_rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let (health, nudges) = fast_config();
        let worker = AgentWorker::new(
            cmd_rx,
            event_tx,
            cancel,
            health,
            nudges,
            Arc::new(MetricsRegistry::new()),
            Duration::from_secs(60),
            Duration::from_secs(60),
        );

        let handle = tokio::spawn(worker.run());
        assert!(matches!(event_rx.recv().await, Some(AgentEvent::Ready)));

        cmd_tx.send(AgentCommand::Shutdown).await.unwrap();
        assert!(matches!(event_rx.recv().await, Some(AgentEvent::ShutdownComplete)));
        assert!(matches!(handle.await.unwrap(), WorkerExit::Clean));
    }

    #[tokio::test]
    async fn update_context_emits_context_sync() {
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let (event_tx, mut event_rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let (health, nudges) = fast_config();
        let worker = AgentWorker::new(
            cmd_rx,
            event_tx,
            cancel,
            health,
            nudges,
            Arc::new(MetricsRegistry::new()),
            Duration::from_secs(60),
            Duration::from_secs(60),
        );

        let handle = tokio::spawn(worker.run());
        let _ = event_rx.recv().await; // ready

        cmd_tx
            .send(AgentCommand::UpdateContext {
                payload: crate::context::ContextUpdate {
                    last_prompt: Some("a prompt".to_string()),
                    ..Default::default()
                },
            })
            .await
            .unwrap();

        match event_rx.recv().await {
            Some(AgentEvent::ContextSync { snapshot }) => {
                assert_eq!(snapshot.last_prompt.as_deref(), Some("a prompt"));
            }
            other => panic!("expected ContextSync, got {other:?}"),
        }

        cmd_tx.send(AgentCommand::Shutdown).await.unwrap();
        let _ = handle.await;
    }
}
