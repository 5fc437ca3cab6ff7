use async_trait::async_trait;
use kjob_core::{MetadataStore, SecretStore, StoreError};
use kjob_model::{Env, JobMetadata, JobSecrets};
use redis::{AsyncCommands, Client, RedisError, aio::MultiplexedConnection};
use tracing::{debug, info};

const METADATA_SUFFIX: &str = "-metadata";
const SECRETS_SUFFIX: &str = "-secrets";

/// Catalog and secret sets stored as JSON strings in Redis.
///
/// Layout:
/// - `<name>-metadata` → JSON [`JobMetadata`]
/// - `<name>-secrets` → JSON object of secret values
///
/// One multiplexed connection is shared by every caller.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    /// Connect to the Redis server at `address` (`host:port`).
    pub async fn connect(address: &str) -> Result<Self, StoreError> {
        let client = Client::open(format!("redis://{address}")).map_err(unavailable)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(unavailable)?;
        info!(address, "connected to redis");
        Ok(Self { conn })
    }

    async fn read(&self, key: &str) -> Result<String, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await.map_err(unavailable)?;
        value.ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn write(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, value).await.map_err(unavailable)?;
        debug!(key, "stored value");
        Ok(())
    }
}

#[async_trait]
impl MetadataStore for RedisStore {
    async fn put_metadata(&self, metadata: JobMetadata) -> Result<(), StoreError> {
        let value = serde_json::to_string(&metadata).map_err(codec)?;
        self.write(&metadata_key(&metadata.name), value).await
    }

    async fn get_metadata(&self, name: &str) -> Result<JobMetadata, StoreError> {
        let raw = self.read(&metadata_key(name)).await?;
        serde_json::from_str(&raw).map_err(codec)
    }

    async fn list_metadata(&self) -> Result<Vec<JobMetadata>, StoreError> {
        let mut conn = self.conn.clone();
        let keys: Vec<String> = conn
            .keys(format!("*{METADATA_SUFFIX}"))
            .await
            .map_err(unavailable)?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let values: Vec<Option<String>> = conn.mget(&keys).await.map_err(unavailable)?;
        decode_all(values)
    }
}

#[async_trait]
impl SecretStore for RedisStore {
    async fn put_secrets(&self, secrets: JobSecrets) -> Result<(), StoreError> {
        let value = serde_json::to_string(&secrets.secrets).map_err(codec)?;
        self.write(&secrets_key(&secrets.job_name), value).await
    }

    async fn get_secrets(&self, job_name: &str) -> Result<Env, StoreError> {
        let raw = self.read(&secrets_key(job_name)).await?;
        serde_json::from_str(&raw).map_err(codec)
    }
}

fn metadata_key(name: &str) -> String {
    format!("{name}{METADATA_SUFFIX}")
}

fn secrets_key(job_name: &str) -> String {
    format!("{job_name}{SECRETS_SUFFIX}")
}

/// Decode MGET results; keys deleted between KEYS and MGET come back as nil and are skipped.
fn decode_all(values: Vec<Option<String>>) -> Result<Vec<JobMetadata>, StoreError> {
    values
        .into_iter()
        .flatten()
        .map(|raw| serde_json::from_str(&raw).map_err(codec))
        .collect()
}

fn unavailable(e: RedisError) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

fn codec(e: serde_json::Error) -> StoreError {
    StoreError::Codec(e.to_string())
}
