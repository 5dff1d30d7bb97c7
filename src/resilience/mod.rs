//! Resilience primitives: circuit breaker, LRU cache, sliding window (C1).

mod circuit_breaker;
mod lru_cache;
mod sliding_window;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitCallError, CircuitState};
pub use lru_cache::LruCache;
pub use sliding_window::{SlidingWindow, SlidingWindowConfig};
