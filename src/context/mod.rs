//! Process-wide mutable agent context with a deduplicating session window (C5).

mod registry;

pub use registry::{AgentContextSnapshot, ContextRegistry, ContextUpdate};
