//! The parent-process side of the agent channel: lifecycle, restart, and
//! typed request/response helpers (C7).

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, watch, Notify};
use tokio::time::timeout;

use crate::context::AgentContextSnapshot;
use crate::error::AgentError;
use crate::health::{HealthMonitor, HealthStatus, ServiceProbe};
use crate::metrics::{MetricsRegistry, MetricsSnapshot};
use crate::nudge::{NudgeEngine, NudgeRule};
use crate::resilience::CircuitBreakerConfig;

use super::protocol::{AgentCommand, AgentEvent};
use super::worker::{AgentWorker, WorkerExit};

const GET_HEALTH_TIMEOUT: Duration = Duration::from_secs(15);
const GET_STATUS_TIMEOUT: Duration = Duration::from_secs(5);
const SENDER_WAIT_TIMEOUT: Duration = Duration::from_secs(5);
const RESTART_BACKOFFS: [Duration; 3] =
    [Duration::from_secs(1), Duration::from_secs(2), Duration::from_secs(4)];
const EVENT_BUFFER: usize = 256;

/// The reply to [`AgentProxy::get_status`].
#[derive(Debug, Clone)]
pub struct AgentStatusSnapshot {
    /// The last-observed health snapshot, if any check has completed yet.
    pub health: Option<HealthStatus>,
    /// The current context snapshot.
    pub context: AgentContextSnapshot,
    /// The current metrics snapshot.
    pub metrics: MetricsSnapshot,
}

struct ProxyState {
    last_health: Option<HealthStatus>,
    last_context: Option<AgentContextSnapshot>,
    shutting_down: bool,
}

/// Builds a fresh worker every time one is (re)spawned, so a restart never
/// reuses a previous worker's now-consumed internal state.
struct WorkerFactory {
    probes: Vec<Arc<dyn ServiceProbe>>,
    breaker_config: CircuitBreakerConfig,
    rule_factory: Box<dyn Fn() -> Vec<NudgeRule> + Send + Sync>,
    health_interval: Duration,
    nudge_interval: Duration,
}

impl WorkerFactory {
    fn spawn(
        &self,
        metrics: Arc<MetricsRegistry>,
    ) -> (mpsc::Sender<AgentCommand>, mpsc::Receiver<AgentEvent>, tokio::task::JoinHandle<WorkerExit>) {
        use tokio_util::sync::CancellationToken;

        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (event_tx, event_rx) = mpsc::channel(32);
        let health = HealthMonitor::new(self.probes.clone(), self.breaker_config);
        let nudges = NudgeEngine::new((self.rule_factory)());
        let cancel = CancellationToken::new();

        let worker = AgentWorker::new(
            cmd_rx,
            event_tx,
            cancel,
            health,
            nudges,
            metrics,
            self.health_interval,
            self.nudge_interval,
        );

        let handle = tokio::spawn(worker.run());
        (cmd_tx, event_rx, handle)
    }
}

/// Singleton-style handle over one agent worker: an explicit handle with
/// `start`/`stop` rather than global mutable state. Owns the latest-seen
/// snapshots and supervises
/// worker restarts; the live command sender is republished through a watch
/// channel so a restart is transparent to callers already holding a handle.
pub struct AgentProxy {
    cmd_tx: watch::Receiver<Option<mpsc::Sender<AgentCommand>>>,
    events: broadcast::Sender<AgentEvent>,
    state: Arc<Mutex<ProxyState>>,
    shutdown_notify: Arc<Notify>,
    metrics: Arc<MetricsRegistry>,
}

impl AgentProxy {
    /// Start the worker and its restart supervisor, returning a handle
    /// immediately (the caller does not wait for `ready`).
    pub fn start(
        probes: Vec<Arc<dyn ServiceProbe>>,
        breaker_config: CircuitBreakerConfig,
        rule_factory: Box<dyn Fn() -> Vec<NudgeRule> + Send + Sync>,
        health_interval: Duration,
        nudge_interval: Duration,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        let factory = WorkerFactory { probes, breaker_config, rule_factory, health_interval, nudge_interval };
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let state = Arc::new(Mutex::new(ProxyState {
            last_health: None,
            last_context: None,
            shutting_down: false,
        }));
        let shutdown_notify = Arc::new(Notify::new());
        let (cmd_tx_publisher, cmd_tx) = watch::channel(None);

        tokio::spawn(supervise(
            factory,
            cmd_tx_publisher,
            events.clone(),
            state.clone(),
            shutdown_notify.clone(),
            metrics.clone(),
        ));

        Self { cmd_tx, events, state, shutdown_notify, metrics }
    }

    /// Subscribe to republished worker events.
    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.events.subscribe()
    }

    async fn current_sender(&self) -> Result<mpsc::Sender<AgentCommand>, AgentError> {
        let mut receiver = self.cmd_tx.clone();
        if let Some(sender) = receiver.borrow().clone() {
            return Ok(sender);
        }
        timeout(SENDER_WAIT_TIMEOUT, async {
            loop {
                if receiver.changed().await.is_err() {
                    return Err(AgentError::NotRunning);
                }
                if let Some(sender) = receiver.borrow().clone() {
                    return Ok(sender);
                }
            }
        })
        .await
        .map_err(|_| AgentError::NotRunning)?
    }

    /// Send a command to the current worker instance.
    pub async fn send_command(&self, command: AgentCommand) -> Result<(), AgentError> {
        let sender = self.current_sender().await?;
        sender.send(command).await.map_err(|_| AgentError::NotRunning)
    }

    /// Request a graceful shutdown and wait (up to 5s) for `shutdown_complete`.
    ///
    /// Marks the proxy as shutting down first so the supervisor never
    /// mistakes this for an abnormal exit worth restarting.
    pub async fn stop(&self) {
        self.state.lock().shutting_down = true;
        let _ = self.send_command(AgentCommand::Shutdown).await;
        let _ = timeout(Duration::from_secs(5), self.shutdown_notify.notified()).await;
    }

    /// Resolves on the next `health_update`, issuing `check_health` to
    /// prompt one. 15s deadline.
    pub async fn get_health(&self) -> Result<HealthStatus, AgentError> {
        let mut receiver = self.events.subscribe();
        self.send_command(AgentCommand::CheckHealth).await?;

        timeout(GET_HEALTH_TIMEOUT, async {
            loop {
                match receiver.recv().await {
                    Ok(AgentEvent::HealthUpdate { status }) => return status,
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => {
                        std::future::pending::<()>().await;
                        unreachable!()
                    }
                }
            }
        })
        .await
        .map_err(|_| AgentError::Timeout("get_health"))
    }

    /// Resolves on the next `status` reply. 5s deadline.
    pub async fn get_status(&self) -> Result<AgentStatusSnapshot, AgentError> {
        let mut receiver = self.events.subscribe();
        self.send_command(AgentCommand::GetStatus).await?;

        timeout(GET_STATUS_TIMEOUT, async {
            loop {
                match receiver.recv().await {
                    Ok(AgentEvent::Status { health, context, metrics }) => {
                        return AgentStatusSnapshot { health, context, metrics };
                    }
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => {
                        std::future::pending::<()>().await;
                        unreachable!()
                    }
                }
            }
        })
        .await
        .map_err(|_| AgentError::Timeout("get_status"))
    }

    /// The last health snapshot observed by the proxy, without round-tripping
    /// to the worker.
    pub fn last_health(&self) -> Option<HealthStatus> {
        self.state.lock().last_health.clone()
    }

    /// The last context snapshot observed by the proxy, without round-tripping
    /// to the worker.
    pub fn last_context(&self) -> Option<AgentContextSnapshot> {
        self.state.lock().last_context.clone()
    }

    /// The shared metrics registry backing this proxy's worker.
    pub fn metrics(&self) -> Arc<MetricsRegistry> {
        self.metrics.clone()
    }
}

async fn supervise(
    factory: WorkerFactory,
    cmd_tx_publisher: watch::Sender<Option<mpsc::Sender<AgentCommand>>>,
    events: broadcast::Sender<AgentEvent>,
    state: Arc<Mutex<ProxyState>>,
    shutdown_notify: Arc<Notify>,
    metrics: Arc<MetricsRegistry>,
) {
    let mut restart_count = 0usize;

    loop {
        let (cmd_tx, mut event_rx, handle) = factory.spawn(metrics.clone());
        let _ = cmd_tx_publisher.send(Some(cmd_tx));

        let forward_state = state.clone();
        let forward_events = events.clone();
        let forward_notify = shutdown_notify.clone();
        let forwarder = tokio::spawn(async move {
            let mut saw_ready = false;
            while let Some(event) = event_rx.recv().await {
                match &event {
                    AgentEvent::Ready => saw_ready = true,
                    AgentEvent::HealthUpdate { status } => {
                        forward_state.lock().last_health = Some(status.clone());
                    }
                    AgentEvent::ContextSync { snapshot } => {
                        forward_state.lock().last_context = Some(snapshot.clone());
                    }
                    AgentEvent::ShutdownComplete => {
                        forward_notify.notify_waiters();
                    }
                    _ => {}
                }
                let _ = forward_events.send(event);
            }
            saw_ready
        });

        let exit = handle.await.unwrap_or_else(|join_err| WorkerExit::Abnormal(join_err.to_string()));
        let saw_ready = forwarder.await.unwrap_or(false);
        if saw_ready {
            restart_count = 0;
        }

        let shutting_down = state.lock().shutting_down;
        match exit {
            WorkerExit::Clean => break,
            _ if shutting_down => break,
            WorkerExit::Abnormal(message) => {
                if restart_count >= RESTART_BACKOFFS.len() {
                    let _ = events.send(AgentEvent::Error {
                        message: format!("worker crashed and restart attempts are exhausted: {message}"),
                    });
                    break;
                }
                tokio::time::sleep(RESTART_BACKOFFS[restart_count]).await;
                restart_count += 1;
            }
        }
    }

    let _ = cmd_tx_publisher.send(None);
}
