use std::sync::Arc;

use kjob_model::{ExecutionId, ExecutionRequest};
use tracing::{debug, info, warn};

use crate::{
    ClusterJobClient, MetadataStore, SecretStore,
    error::ExecuteError,
    metrics::{ExecuteOutcome, MetricsHandle},
};

/// Turns an execution request into a submitted workload.
///
/// Looks up the catalog entry and secret set of the job, merges the caller's
/// arguments with the secrets (secrets win on collision) and hands the result to
/// the cluster client. Every step short-circuits: a failed step makes no further
/// downstream calls.
#[derive(Clone)]
pub struct Executor {
    metadata: Arc<dyn MetadataStore>,
    secrets: Arc<dyn SecretStore>,
    cluster: Arc<dyn ClusterJobClient>,
    metrics: MetricsHandle,
}

impl Executor {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        secrets: Arc<dyn SecretStore>,
        cluster: Arc<dyn ClusterJobClient>,
        metrics: MetricsHandle,
    ) -> Self {
        Self {
            metadata,
            secrets,
            cluster,
            metrics,
        }
    }

    /// Execute one request and return the identifier of the submitted workload.
    pub async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionId, ExecuteError> {
        let result = self.run(request).await;
        self.metrics.record_execution(match &result {
            Ok(_) => ExecuteOutcome::Submitted,
            Err(ExecuteError::InvalidRequest(_)) => ExecuteOutcome::InvalidRequest,
            Err(ExecuteError::MetadataLookup { .. }) => ExecuteOutcome::MetadataLookupFailed,
            Err(ExecuteError::SecretLookup { .. }) => ExecuteOutcome::SecretLookupFailed,
            Err(ExecuteError::Submission { .. }) => ExecuteOutcome::SubmissionFailed,
        });
        result
    }

    async fn run(&self, request: ExecutionRequest) -> Result<ExecutionId, ExecuteError> {
        if let Err(e) = request.validate() {
            warn!(error = %e, "rejecting execution request");
            return Err(ExecuteError::InvalidRequest(e.to_string()));
        }
        let job = request.name;

        let metadata = self.metadata.get_metadata(&job).await.map_err(|source| {
            warn!(job = %job, error = %source, "metadata lookup failed");
            ExecuteError::MetadataLookup {
                job: job.clone(),
                source,
            }
        })?;

        let secrets = self.secrets.get_secrets(&job).await.map_err(|source| {
            warn!(job = %job, error = %source, "secret lookup failed");
            ExecuteError::SecretLookup {
                job: job.clone(),
                source,
            }
        })?;

        let env = request.args.merged(&secrets);
        debug!(job = %job, image = %metadata.image_name, vars = env.len(), "submitting workload");

        let id = self
            .cluster
            .submit(&job, &metadata.image_name, &env)
            .await
            .map_err(|source| {
                warn!(job = %job, error = %source, "workload submission failed");
                ExecuteError::Submission {
                    job: job.clone(),
                    source,
                }
            })?;

        info!(job = %job, execution = %id, "workload submitted");
        Ok(id)
    }
}
