use crate::metrics::backend::{ExecuteOutcome, MetricsBackend, StreamOutcome};

/// No-op metrics backend that compiles to nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetrics;

impl MetricsBackend for NoOpMetrics {
    #[inline(always)]
    fn record_execution(&self, _: ExecuteOutcome) {}

    #[inline(always)]
    fn record_stream_closed(&self, _: StreamOutcome, _: u64) {}
}
