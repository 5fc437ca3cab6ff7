use std::time::Duration;

/// Settings of the Kubernetes job client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubeSettings {
    /// Namespace Jobs are created in and pods are looked up in.
    pub namespace: String,
    /// Explicit API server URL. `None` infers kubeconfig or in-cluster config.
    pub endpoint: Option<String>,
    /// `activeDeadlineSeconds` of every submitted Job. `None` leaves the platform default.
    pub job_deadline: Option<Duration>,
}

impl Default for KubeSettings {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            endpoint: None,
            job_deadline: None,
        }
    }
}
