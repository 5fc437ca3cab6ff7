use std::sync::Arc;

use kjob_core::{ClusterJobClient, Executor, MetadataStore, MetricsHandle, SecretStore};

/// WebSocket buffer sizes of the log relay, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// Socket read buffer; also the most log bytes read into one text frame.
    pub read_buffer_size: usize,
    pub write_buffer_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: 4096,
            write_buffer_size: 4096,
        }
    }
}

/// Everything the HTTP surface needs, built once at startup and shared by every request.
pub struct AppContext {
    pub executor: Executor,
    pub metadata: Arc<dyn MetadataStore>,
    pub secrets: Arc<dyn SecretStore>,
    pub cluster: Arc<dyn ClusterJobClient>,
    pub metrics: MetricsHandle,
    pub stream: StreamConfig,
}

impl AppContext {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        secrets: Arc<dyn SecretStore>,
        cluster: Arc<dyn ClusterJobClient>,
        metrics: MetricsHandle,
    ) -> Self {
        let executor = Executor::new(
            metadata.clone(),
            secrets.clone(),
            cluster.clone(),
            metrics.clone(),
        );
        Self {
            executor,
            metadata,
            secrets,
            cluster,
            metrics,
            stream: StreamConfig::default(),
        }
    }

    pub fn with_stream_config(mut self, stream: StreamConfig) -> Self {
        self.stream = stream;
        self
    }
}
