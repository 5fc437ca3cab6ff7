use thiserror::Error;

/// Boxed platform error carried through unchanged.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure of a metadata or secret store lookup.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("codec error: {0}")]
    Codec(String),
}

/// Failure reported by a cluster job client.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("workload submission rejected: {0}")]
    Submission(#[source] BoxError),

    #[error("no running unit for execution: {0}")]
    UnitNotFound(String),

    #[error("platform error: {0}")]
    Platform(String),

    #[error("cluster client configuration: {0}")]
    Config(String),
}

/// Failure of one execution request.
///
/// Metadata and secret lookups are kept as separate kinds so callers can tell
/// which store failed.
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("metadata lookup for job '{job}' failed: {source}")]
    MetadataLookup {
        job: String,
        #[source]
        source: StoreError,
    },

    #[error("secret lookup for job '{job}' failed: {source}")]
    SecretLookup {
        job: String,
        #[source]
        source: StoreError,
    },

    #[error("submission of job '{job}' failed: {source}")]
    Submission {
        job: String,
        #[source]
        source: ClusterError,
    },
}

impl ExecuteError {
    /// The store error behind a lookup failure, if any.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            ExecuteError::MetadataLookup { source, .. } | ExecuteError::SecretLookup { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }
}
