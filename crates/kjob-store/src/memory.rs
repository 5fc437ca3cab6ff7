use std::collections::BTreeMap;

use async_trait::async_trait;
use kjob_core::{MetadataStore, SecretStore, StoreError};
use kjob_model::{Env, JobMetadata, JobSecrets};
use tokio::sync::RwLock;

/// In-memory catalog and secret sets.
///
/// Both maps are keyed by job name; writes replace the previous value.
#[derive(Debug, Default)]
pub struct MemoryStore {
    metadata: RwLock<BTreeMap<String, JobMetadata>>,
    secrets: RwLock<BTreeMap<String, Env>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for MemoryStore {
    async fn put_metadata(&self, metadata: JobMetadata) -> Result<(), StoreError> {
        let mut map = self.metadata.write().await;
        map.insert(metadata.name.clone(), metadata);
        Ok(())
    }

    async fn get_metadata(&self, name: &str) -> Result<JobMetadata, StoreError> {
        let map = self.metadata.read().await;
        map.get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn list_metadata(&self) -> Result<Vec<JobMetadata>, StoreError> {
        let map = self.metadata.read().await;
        Ok(map.values().cloned().collect())
    }
}

#[async_trait]
impl SecretStore for MemoryStore {
    async fn put_secrets(&self, secrets: JobSecrets) -> Result<(), StoreError> {
        let mut map = self.secrets.write().await;
        map.insert(secrets.job_name, secrets.secrets);
        Ok(())
    }

    async fn get_secrets(&self, job_name: &str) -> Result<Env, StoreError> {
        let map = self.secrets.read().await;
        map.get(job_name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(job_name.to_string()))
    }
}
