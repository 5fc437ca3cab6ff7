use std::pin::Pin;

use async_trait::async_trait;
use futures::io::AsyncBufRead;
use kjob_model::{Env, ExecutionId};

use crate::error::ClusterError;

/// Live output of one unit.
///
/// Finite and not restartable. Dropping it releases the underlying connection.
pub type LogStream = Pin<Box<dyn AsyncBufRead + Send>>;

/// Client of the cluster scheduler.
#[async_trait]
pub trait ClusterJobClient: Send + Sync + 'static {
    /// Submit one workload running `image` with `env` and return its fresh identifier.
    ///
    /// Success means the platform accepted the workload, nothing more.
    async fn submit(&self, job_name: &str, image: &str, env: &Env) -> Result<ExecutionId, ClusterError>;

    /// Open a follow-mode output stream of the unit labelled with `id`.
    ///
    /// Point-in-time lookup: fails with [`ClusterError::UnitNotFound`] if no
    /// unit exists right now.
    async fn open_log_stream(&self, id: &ExecutionId) -> Result<LogStream, ClusterError>;
}
