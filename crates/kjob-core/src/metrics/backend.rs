use std::sync::Arc;

/// How one execution request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteOutcome {
    /// Workload accepted by the cluster.
    Submitted,
    /// Request rejected before any lookup.
    InvalidRequest,
    /// Catalog entry missing or metadata store failed.
    MetadataLookupFailed,
    /// Secret set missing or secret store failed.
    SecretLookupFailed,
    /// Cluster refused the workload.
    SubmissionFailed,
}

impl ExecuteOutcome {
    /// Return label value for metrics.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            ExecuteOutcome::Submitted => "submitted",
            ExecuteOutcome::InvalidRequest => "invalid_request",
            ExecuteOutcome::MetadataLookupFailed => "metadata_lookup_failed",
            ExecuteOutcome::SecretLookupFailed => "secret_lookup_failed",
            ExecuteOutcome::SubmissionFailed => "submission_failed",
        }
    }
}

/// How one log relay session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Output read to the end.
    Completed,
    /// No execution identifier in the request.
    MissingIdentifier,
    /// No unit found or the log connection could not be opened.
    OpenFailed,
    /// Reading the log stream failed midway.
    ReadFailed,
    /// Sending to the client failed (usually a disconnect).
    WriteFailed,
}

impl StreamOutcome {
    /// Return label value for metrics.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            StreamOutcome::Completed => "completed",
            StreamOutcome::MissingIdentifier => "missing_identifier",
            StreamOutcome::OpenFailed => "open_failed",
            StreamOutcome::ReadFailed => "read_failed",
            StreamOutcome::WriteFailed => "write_failed",
        }
    }
}

/// Backend metrics collection interface.
pub trait MetricsBackend: Send + Sync + 'static {
    /// Record the outcome of one execution request.
    fn record_execution(&self, outcome: ExecuteOutcome);

    /// Record a finished log relay session.
    ///
    /// # Arguments
    /// - `outcome`: How the session terminated
    /// - `lines`: Number of lines forwarded to the client before it terminated
    fn record_stream_closed(&self, outcome: StreamOutcome, lines: u64);
}

/// Shared handle to metrics backend.
pub type MetricsHandle = Arc<dyn MetricsBackend>;
