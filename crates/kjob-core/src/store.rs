use async_trait::async_trait;
use kjob_model::{Env, JobMetadata, JobSecrets};

use crate::error::StoreError;

/// Catalog of runnable jobs, keyed by job name.
#[async_trait]
pub trait MetadataStore: Send + Sync + 'static {
    /// Create or replace the catalog entry named `metadata.name`.
    async fn put_metadata(&self, metadata: JobMetadata) -> Result<(), StoreError>;

    /// Fetch one catalog entry. Absence is [`StoreError::NotFound`].
    async fn get_metadata(&self, name: &str) -> Result<JobMetadata, StoreError>;

    /// All catalog entries, in no particular order.
    async fn list_metadata(&self) -> Result<Vec<JobMetadata>, StoreError>;
}

/// Secret values injected into a job's environment.
#[async_trait]
pub trait SecretStore: Send + Sync + 'static {
    /// Create or replace the secret set of `secrets.job_name`.
    async fn put_secrets(&self, secrets: JobSecrets) -> Result<(), StoreError>;

    /// Fetch the secret set of a job. Absence is [`StoreError::NotFound`].
    async fn get_secrets(&self, job_name: &str) -> Result<Env, StoreError>;
}
