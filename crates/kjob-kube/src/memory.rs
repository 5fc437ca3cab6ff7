use std::{
    collections::HashMap,
    sync::{
        Mutex, MutexGuard,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use futures::io::Cursor;
use tracing::{debug, info};

use kjob_core::{ClusterError, ClusterJobClient, LogStream, WorkloadSpec};
use kjob_model::{Env, ExecutionId};

#[derive(Default)]
struct State {
    submitted: Vec<WorkloadSpec>,
    output: HashMap<ExecutionId, Vec<u8>>,
}

/// In-process cluster.
///
/// Every accepted submission gets a unit whose output is empty until scripted
/// with [`MemoryCluster::set_output`]. Output can also be scripted for
/// identifiers that were never submitted.
#[derive(Default)]
pub struct MemoryCluster {
    job_deadline: Option<Duration>,
    state: Mutex<State>,
    reject: AtomicBool,
    opens: AtomicUsize,
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deadline applied to every submitted workload.
    pub fn with_job_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.job_deadline = deadline;
        self
    }

    /// Make subsequent submissions fail (or succeed again).
    pub fn reject_submissions(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    /// Script the output of the unit labelled with `id`, one entry per line.
    pub fn set_output<I, L>(&self, id: &ExecutionId, lines: I)
    where
        I: IntoIterator<Item = L>,
        L: AsRef<str>,
    {
        let mut out = Vec::new();
        for line in lines {
            out.extend_from_slice(line.as_ref().as_bytes());
            out.push(b'\n');
        }
        self.set_raw_output(id, out);
    }

    /// Script raw output bytes, with no line framing added.
    pub fn set_raw_output(&self, id: &ExecutionId, bytes: impl Into<Vec<u8>>) {
        self.lock().output.insert(id.clone(), bytes.into());
    }

    /// Workloads accepted so far, in submission order.
    pub fn submitted(&self) -> Vec<WorkloadSpec> {
        self.lock().submitted.clone()
    }

    /// Number of `open_log_stream` calls, successful or not.
    pub fn open_calls(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Writes are single inserts/pushes, so a poisoned state is still consistent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ClusterJobClient for MemoryCluster {
    async fn submit(&self, job_name: &str, image: &str, env: &Env) -> Result<ExecutionId, ClusterError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(ClusterError::Submission(
                format!("workload for job '{job_name}' rejected").into(),
            ));
        }

        let spec = WorkloadSpec::build(job_name, image, env.clone(), self.job_deadline);
        let id = spec.id.clone();

        let mut state = self.lock();
        state.output.entry(id.clone()).or_default();
        state.submitted.push(spec);

        info!(job = %job_name, execution = %id, "workload accepted in memory");
        Ok(id)
    }

    async fn open_log_stream(&self, id: &ExecutionId) -> Result<LogStream, ClusterError> {
        self.opens.fetch_add(1, Ordering::SeqCst);

        let output = self
            .lock()
            .output
            .get(id)
            .cloned()
            .ok_or_else(|| ClusterError::UnitNotFound(id.to_string()))?;

        debug!(execution = %id, bytes = output.len(), "serving scripted output");
        let stream: LogStream = Box::pin(Cursor::new(output));
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use futures::AsyncReadExt;

    use super::*;

    async fn read_all(mut stream: LogStream) -> String {
        let mut out = String::new();
        stream.read_to_string(&mut out).await.unwrap();
        out
    }

    #[tokio::test]
    async fn submission_is_recorded_with_a_fresh_identifier() {
        let cluster = MemoryCluster::new().with_job_deadline(Some(Duration::from_secs(60)));
        let env = Env::single("TOKEN", "t");

        let a = cluster.submit("backup", "img:1", &env).await.unwrap();
        let b = cluster.submit("backup", "img:1", &env).await.unwrap();
        assert_ne!(a, b);

        let submitted = cluster.submitted();
        assert_eq!(submitted.len(), 2);
        assert_eq!(submitted[0].id, a);
        assert_eq!(submitted[0].image, "img:1");
        assert_eq!(submitted[0].env, env);
        assert_eq!(submitted[0].active_deadline, Some(Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn rejected_submissions_leave_no_trace() {
        let cluster = MemoryCluster::new();
        cluster.reject_submissions(true);

        let err = cluster.submit("backup", "img", &Env::new()).await.unwrap_err();
        assert!(matches!(err, ClusterError::Submission(_)));
        assert!(cluster.submitted().is_empty());
    }

    #[tokio::test]
    async fn scripted_output_is_served() {
        let cluster = MemoryCluster::new();
        let id = cluster.submit("backup", "img", &Env::new()).await.unwrap();
        cluster.set_output(&id, ["a", "b"]);

        let stream = cluster.open_log_stream(&id).await.unwrap();
        assert_eq!(read_all(stream).await, "a\nb\n");
    }

    #[tokio::test]
    async fn submitted_unit_without_output_is_empty() {
        let cluster = MemoryCluster::new();
        let id = cluster.submit("backup", "img", &Env::new()).await.unwrap();

        let stream = cluster.open_log_stream(&id).await.unwrap();
        assert_eq!(read_all(stream).await, "");
    }

    #[tokio::test]
    async fn unknown_identifier_has_no_unit() {
        let cluster = MemoryCluster::new();
        let result = cluster.open_log_stream(&ExecutionId::from("nope")).await;

        assert!(matches!(result, Err(ClusterError::UnitNotFound(id)) if id == "nope"));
        assert_eq!(cluster.open_calls(), 1);
    }
}
