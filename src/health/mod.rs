//! Health monitoring across external services (C4).

mod monitor;

pub use monitor::{HealthMonitor, HealthStatus, Overall, ProbeReading, ServiceHealth, ServiceProbe, ServiceStatus};
