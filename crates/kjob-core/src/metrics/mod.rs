//! Metrics collection abstraction for the execution and log relay paths.
//!
//! Backends (prometheus, etc) implement [`MetricsBackend`] and are injected as a
//! [`MetricsHandle`] into the [`crate::Executor`] and the HTTP layer.
mod backend;
pub use backend::{ExecuteOutcome, MetricsBackend, MetricsHandle, StreamOutcome};

mod noop;
pub use noop::NoOpMetrics;

use std::sync::Arc;

/// Create a no-op metrics handle.
#[inline]
pub fn noop_metrics() -> MetricsHandle {
    Arc::new(NoOpMetrics)
}
