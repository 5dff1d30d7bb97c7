//! Health monitor: per-service probing behind circuit breakers (C4).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use parking_lot::Mutex;

use crate::resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitCallError};

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Status of a single configured service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    /// The service responded healthily.
    Ok,
    /// The service responded but reported degraded operation.
    Degraded,
    /// The service did not respond, errored, or its circuit is open.
    Down,
    /// No probe is registered for this service name.
    Unconfigured,
}

/// Aggregate status across every configured service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Overall {
    /// Every configured service is `Ok`.
    AllOk,
    /// At least one configured service is `Ok` and at least one is not.
    Partial,
    /// No configured service is `Ok` (including when zero services are configured).
    AllDown,
}

/// Health of a single service.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ServiceHealth {
    /// The service's current status.
    pub status: ServiceStatus,
    /// Probe latency in milliseconds; `0` for unconfigured services.
    pub latency_ms: u64,
    /// When this reading was taken.
    pub last_check: DateTime<Utc>,
    /// Human-readable error, present whenever `status` is not `Ok`.
    pub error: Option<String>,
}

/// A full health snapshot across every service known to the monitor.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthStatus {
    /// Per-service health, keyed by service name.
    pub services: HashMap<String, ServiceHealth>,
    /// The aggregate status derived from `services`.
    pub overall: Overall,
}

/// Outcome of a single successful probe invocation.
pub struct ProbeReading {
    /// `Ok` or `Degraded` — `Down` is derived from a probe error, not reported directly.
    pub status: ServiceStatus,
}

/// A single external service probe.
#[async_trait]
pub trait ServiceProbe: Send + Sync {
    /// Stable name used as the key in [`HealthStatus::services`].
    fn name(&self) -> &str;
    /// Whether this service has been configured (e.g. has credentials).
    /// Unconfigured probes are never invoked and always read `Unconfigured`.
    fn is_configured(&self) -> bool;
    /// Perform one health check. `Err` is treated as the service being down.
    async fn probe(&self) -> anyhow::Result<ProbeReading>;
}

struct Guarded {
    probe: Arc<dyn ServiceProbe>,
    breaker: CircuitBreaker,
}

/// Monitors N external services, each behind its own circuit breaker.
pub struct HealthMonitor {
    services: Vec<Guarded>,
    running: Mutex<bool>,
    cached: Mutex<Option<HealthStatus>>,
    check_count: AtomicU64,
}

impl HealthMonitor {
    /// Construct a monitor for the given probes, each wrapped in its own
    /// circuit breaker using `breaker_config`.
    pub fn new(probes: Vec<Arc<dyn ServiceProbe>>, breaker_config: CircuitBreakerConfig) -> Self {
        let services = probes
            .into_iter()
            .map(|probe| Guarded {
                probe,
                breaker: CircuitBreaker::new(breaker_config),
            })
            .collect();

        Self {
            services,
            running: Mutex::new(false),
            cached: Mutex::new(None),
            check_count: AtomicU64::new(0),
        }
    }

    /// Number of invocations of [`Self::check`] that actually ran a probe round.
    pub fn check_count(&self) -> u64 {
        self.check_count.load(Ordering::SeqCst)
    }

    /// The most recently cached snapshot, if any.
    pub fn cached_snapshot(&self) -> Option<HealthStatus> {
        self.cached.lock().clone()
    }

    /// Run a probe round across every configured service, guarding against
    /// concurrent invocation.
    pub async fn check(&self) -> HealthStatus {
        {
            let mut running = self.running.lock();
            if *running {
                return self
                    .cached_snapshot()
                    .unwrap_or_else(|| synthesize_all_down(&self.services));
            }
            *running = true;
        }

        self.check_count.fetch_add(1, Ordering::SeqCst);

        let probes = self.services.iter().map(|guarded| async move {
            let health = Self::probe_one(guarded).await;
            (guarded.probe.name().to_string(), health)
        });

        let results = join_all(probes).await;
        let services: HashMap<String, ServiceHealth> = results.into_iter().collect();
        let overall = compute_overall(&services);
        let status = HealthStatus { services, overall };

        *self.cached.lock() = Some(status.clone());
        *self.running.lock() = false;

        status
    }

    async fn probe_one(guarded: &Guarded) -> ServiceHealth {
        let now = Utc::now();
        if !guarded.probe.is_configured() {
            return ServiceHealth {
                status: ServiceStatus::Unconfigured,
                latency_ms: 0,
                last_check: now,
                error: None,
            };
        }

        let started = std::time::Instant::now();
        let probe = &guarded.probe;
        let outcome = guarded
            .breaker
            .execute(|| async {
                match tokio::time::timeout(PROBE_TIMEOUT, probe.probe()).await {
                    Ok(Ok(reading)) => Ok(reading),
                    Ok(Err(err)) => Err(err.to_string()),
                    Err(_) => Err("probe timed out".to_string()),
                }
            })
            .await;

        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match outcome {
            Ok(reading) => ServiceHealth {
                status: reading.status,
                latency_ms,
                last_check: now,
                error: None,
            },
            Err(CircuitCallError::Open) => ServiceHealth {
                status: ServiceStatus::Down,
                latency_ms: 0,
                last_check: now,
                error: Some("circuit open".to_string()),
            },
            Err(CircuitCallError::Inner(message)) => ServiceHealth {
                status: ServiceStatus::Down,
                latency_ms,
                last_check: now,
                error: Some(message),
            },
        }
    }
}

fn compute_overall(services: &HashMap<String, ServiceHealth>) -> Overall {
    let configured: Vec<&ServiceHealth> = services
        .values()
        .filter(|h| h.status != ServiceStatus::Unconfigured)
        .collect();

    if configured.is_empty() {
        return Overall::AllDown;
    }

    let all_ok = configured.iter().all(|h| h.status == ServiceStatus::Ok);
    if all_ok {
        return Overall::AllOk;
    }

    let any_ok = configured.iter().any(|h| h.status == ServiceStatus::Ok);
    if any_ok {
        Overall::Partial
    } else {
        Overall::AllDown
    }
}

fn synthesize_all_down(services: &[Guarded]) -> HealthStatus {
    let now = Utc::now();
    let services = services
        .iter()
        .map(|g| {
            (
                g.probe.name().to_string(),
                ServiceHealth {
                    status: ServiceStatus::Down,
                    latency_ms: 0,
                    last_check: now,
                    error: Some("check already in progress".to_string()),
                },
            )
        })
        .collect();
    HealthStatus {
        services,
        overall: Overall::AllDown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    struct FakeProbe {
        name: &'static str,
        configured: bool,
        result: Mutex<Option<anyhow::Result<ProbeReading>>>,
        calls: AtomicU32,
    }

    #[async_trait]
    impl ServiceProbe for FakeProbe {
        fn name(&self) -> &str {
            self.name
        }
        fn is_configured(&self) -> bool {
            self.configured
        }
        async fn probe(&self) -> anyhow::Result<ProbeReading> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.result.lock().take() {
                Some(r) => r,
                None => Ok(ProbeReading { status: ServiceStatus::Ok }),
            }
        }
    }

    fn breaker_config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 3,
            reset_timeout: Duration::from_millis(100),
        }
    }

    #[tokio::test]
    async fn all_ok_when_every_configured_service_is_ok() {
        let probe = Arc::new(FakeProbe {
            name: "image",
            configured: true,
            result: Mutex::new(None),
            calls: AtomicU32::new(0),
        });
        let monitor = HealthMonitor::new(vec![probe], breaker_config());
        let status = monitor.check().await;
        assert_eq!(status.overall, Overall::AllOk);
        assert_eq!(monitor.check_count(), 1);
    }

    #[tokio::test]
    async fn unconfigured_services_are_ignored_unless_all_unconfigured() {
        let configured = Arc::new(FakeProbe {
            name: "image",
            configured: true,
            result: Mutex::new(None),
            calls: AtomicU32::new(0),
        });
        let unconfigured = Arc::new(FakeProbe {
            name: "video",
            configured: false,
            result: Mutex::new(None),
            calls: AtomicU32::new(0),
        });
        let monitor = HealthMonitor::new(vec![configured, unconfigured], breaker_config());
        let status = monitor.check().await;
        assert_eq!(status.overall, Overall::AllOk);
        assert_eq!(status.services["video"].status, ServiceStatus::Unconfigured);
    }

    #[tokio::test]
    async fn zero_configured_services_is_all_down() {
        let monitor = HealthMonitor::new(vec![], breaker_config());
        let status = monitor.check().await;
        assert_eq!(status.overall, Overall::AllDown);
    }

    #[tokio::test]
    async fn failing_probe_opens_breaker_and_maps_to_down() {
        let probe = Arc::new(FakeProbe {
            name: "image",
            configured: true,
            result: Mutex::new(Some(Err(anyhow::anyhow!("boom")))),
            calls: AtomicU32::new(0),
        });
        let monitor = HealthMonitor::new(
            vec![probe.clone()],
            CircuitBreakerConfig {
                failure_threshold: 1,
                reset_timeout: Duration::from_secs(60),
            },
        );

        let status = monitor.check().await;
        assert_eq!(status.services["image"].status, ServiceStatus::Down);

        *probe.result.lock() = Some(Ok(ProbeReading { status: ServiceStatus::Ok }));
        let status = monitor.check().await;
        assert_eq!(status.services["image"].status, ServiceStatus::Down);
        assert_eq!(status.services["image"].error.as_deref(), Some("circuit open"));
    }
}
