//! Out-of-process-style agent runtime: typed protocol, worker, and proxy
//! (C3, C7).

mod protocol;
mod proxy;
mod worker;

pub use protocol::{AgentCommand, AgentEvent, ConfigurePayload, parse_command};
pub use proxy::{AgentProxy, AgentStatusSnapshot};
pub use worker::{AgentWorker, WorkerExit};
