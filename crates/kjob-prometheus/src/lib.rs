use std::sync::Arc;

use prometheus::{CounterVec, IntCounter, Opts, Registry, proto::MetricFamily};

use kjob_core::{ExecuteOutcome, MetricsBackend, StreamOutcome};

/// Prometheus metrics backend for kjob.
///
/// ## Metrics
/// - `kjob_executions_total{outcome}` - Counter of execution requests by outcome
/// - `kjob_log_streams_total{outcome}` - Counter of finished log relay sessions by outcome
/// - `kjob_log_lines_relayed_total` - Counter of log lines forwarded to clients
///
/// ## Label cardinality
/// Both `outcome` labels come from closed enums ([`ExecuteOutcome`], [`StreamOutcome`]).
#[derive(Clone)]
pub struct PrometheusMetrics {
    executions: CounterVec,
    log_streams: CounterVec,
    lines_relayed: IntCounter,
    registry: Arc<Registry>,
}

impl PrometheusMetrics {
    /// Create a new prometheus metrics backend with custom registry.
    pub fn new_with_registry(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        let executions = CounterVec::new(
            Opts::new("executions_total", "Total number of execution requests").namespace("kjob"),
            &["outcome"],
        )?;
        registry.register(Box::new(executions.clone()))?;

        let log_streams = CounterVec::new(
            Opts::new("log_streams_total", "Total number of finished log relay sessions")
                .namespace("kjob"),
            &["outcome"],
        )?;
        registry.register(Box::new(log_streams.clone()))?;

        let lines_relayed = IntCounter::with_opts(
            Opts::new("log_lines_relayed_total", "Total log lines forwarded to clients")
                .namespace("kjob"),
        )?;
        registry.register(Box::new(lines_relayed.clone()))?;

        Ok(Self {
            executions,
            log_streams,
            lines_relayed,
            registry,
        })
    }

    /// Create a new prometheus metrics backend with its own registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::new_with_registry(Arc::new(Registry::new()))
    }

    /// Gather all metrics for exposition.
    ///
    /// # Example
    /// ```rust,ignore
    /// let metrics = PrometheusMetrics::new()?;
    /// let families = metrics.gather();
    /// let encoder = prometheus::TextEncoder::new();
    /// encoder.encode(&families, &mut buffer)?;
    /// ```
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn record_execution(&self, outcome: ExecuteOutcome) {
        self.executions
            .with_label_values(&[outcome.as_label()])
            .inc();
    }

    fn record_stream_closed(&self, outcome: StreamOutcome, lines: u64) {
        self.log_streams
            .with_label_values(&[outcome.as_label()])
            .inc();
        self.lines_relayed.inc_by(lines);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family<'a>(families: &'a [MetricFamily], name: &str) -> &'a MetricFamily {
        families
            .iter()
            .find(|f| f.name() == name)
            .unwrap_or_else(|| panic!("{name} not found"))
    }

    fn exposition(metrics: &PrometheusMetrics) -> String {
        prometheus::TextEncoder::new()
            .encode_to_string(&metrics.gather())
            .unwrap()
    }

    #[test]
    fn record_execution_counts_per_outcome() {
        let metrics = PrometheusMetrics::new().unwrap();

        metrics.record_execution(ExecuteOutcome::Submitted);
        metrics.record_execution(ExecuteOutcome::Submitted);
        metrics.record_execution(ExecuteOutcome::SecretLookupFailed);

        let families = metrics.gather();
        let executions = family(&families, "kjob_executions_total");
        assert_eq!(executions.get_metric().len(), 2);

        let text = exposition(&metrics);
        assert!(text.contains(r#"kjob_executions_total{outcome="submitted"} 2"#), "{text}");
        assert!(text.contains(r#"kjob_executions_total{outcome="secret_lookup_failed"} 1"#), "{text}");
    }

    #[test]
    fn record_stream_closed_counts_sessions_and_lines() {
        let metrics = PrometheusMetrics::new().unwrap();

        metrics.record_stream_closed(StreamOutcome::Completed, 10);
        metrics.record_stream_closed(StreamOutcome::WriteFailed, 2);

        let families = metrics.gather();
        assert_eq!(family(&families, "kjob_log_streams_total").get_metric().len(), 2);

        let text = exposition(&metrics);
        assert!(text.contains("kjob_log_lines_relayed_total 12"), "{text}");
    }

    #[test]
    fn can_use_custom_registry() {
        let registry = Arc::new(Registry::new());
        let metrics = PrometheusMetrics::new_with_registry(registry.clone()).unwrap();

        metrics.record_execution(ExecuteOutcome::InvalidRequest);
        assert!(!registry.gather().is_empty());
    }

    #[test]
    fn double_registration_fails() {
        let registry = Arc::new(Registry::new());
        PrometheusMetrics::new_with_registry(registry.clone()).unwrap();
        assert!(PrometheusMetrics::new_with_registry(registry).is_err());
    }
}
