pub mod error;
pub use error::{ClusterError, ExecuteError, StoreError};

pub mod identity;
pub use identity::{is_execution_id, label_selector_for, labels_for, new_execution_id};

pub mod workload;
pub use workload::{RestartPolicy, WorkloadSpec};

mod store;
pub use store::{MetadataStore, SecretStore};

mod cluster;
pub use cluster::{ClusterJobClient, LogStream};

mod executor;
pub use executor::Executor;

pub mod metrics;
pub use metrics::{ExecuteOutcome, MetricsBackend, MetricsHandle, StreamOutcome, noop_metrics};
