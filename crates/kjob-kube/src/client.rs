use std::io;

use async_trait::async_trait;
use futures::{AsyncBufRead, AsyncBufReadExt, TryStreamExt, stream};
use k8s_openapi::api::{batch::v1::Job, core::v1::Pod};
use kube::{
    Api, Client, Config,
    api::{ListParams, LogParams, PostParams},
};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use kjob_core::{ClusterError, ClusterJobClient, LogStream, WorkloadSpec, label_selector_for};
use kjob_model::{Env, ExecutionId};

use crate::{KubeSettings, build_job, select_unit};

type Chunk = io::Result<Vec<u8>>;

/// Cluster job client backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeJobClient {
    client: Client,
    settings: KubeSettings,
}

impl KubeJobClient {
    /// Build a client from inferred configuration (kubeconfig or in-cluster),
    /// pointed at `settings.endpoint` when one is set.
    pub async fn connect(settings: KubeSettings) -> Result<Self, ClusterError> {
        let config = match settings.endpoint.as_deref() {
            None => Config::infer()
                .await
                .map_err(|e| ClusterError::Config(e.to_string()))?,
            Some(endpoint) => {
                let uri: http::Uri = endpoint
                    .parse()
                    .map_err(|e| ClusterError::Config(format!("endpoint {endpoint:?}: {e}")))?;
                let mut config = match Config::infer().await {
                    Ok(config) => config,
                    Err(e) => {
                        debug!(error = %e, "no inferable credentials; using bare endpoint");
                        Config::new(uri.clone())
                    }
                };
                config.cluster_url = uri;
                config
            }
        };

        info!(
            cluster = %config.cluster_url,
            namespace = %settings.namespace,
            "kubernetes client configured"
        );
        let client = Client::try_from(config).map_err(|e| ClusterError::Config(e.to_string()))?;
        Ok(Self::from_client(client, settings))
    }

    /// Wrap an existing client.
    pub fn from_client(client: Client, settings: KubeSettings) -> Self {
        Self { client, settings }
    }

    fn jobs(&self) -> Api<Job> {
        Api::namespaced(self.client.clone(), &self.settings.namespace)
    }

    fn pods(&self) -> Api<Pod> {
        Api::namespaced(self.client.clone(), &self.settings.namespace)
    }
}

#[async_trait]
impl ClusterJobClient for KubeJobClient {
    async fn submit(&self, job_name: &str, image: &str, env: &Env) -> Result<ExecutionId, ClusterError> {
        let spec = WorkloadSpec::build(job_name, image, env.clone(), self.settings.job_deadline);
        let job = build_job(&spec);

        self.jobs()
            .create(&PostParams::default(), &job)
            .await
            .map_err(|e| ClusterError::Submission(Box::new(e)))?;

        info!(
            job = %job_name,
            execution = %spec.id,
            namespace = %self.settings.namespace,
            "job created"
        );
        Ok(spec.id)
    }

    async fn open_log_stream(&self, id: &ExecutionId) -> Result<LogStream, ClusterError> {
        let selector = label_selector_for(id);
        let pods = self
            .pods()
            .list(&ListParams::default().labels(&selector))
            .await
            .map_err(|e| ClusterError::Platform(e.to_string()))?;

        let unit = select_unit(pods.items)
            .and_then(|pod| pod.metadata.name)
            .ok_or_else(|| ClusterError::UnitNotFound(id.to_string()))?;

        debug!(execution = %id, pod = %unit, "following pod logs");
        follow_logs(self.pods(), unit).await
    }
}

/// Open a follow-mode log connection to `pod` and expose it as a [`LogStream`].
///
/// The connection is read on its own task and handed over one chunk at a time;
/// dropping the returned stream stops the task and closes the connection.
async fn follow_logs(api: Api<Pod>, pod: String) -> Result<LogStream, ClusterError> {
    let (opened_tx, opened_rx) = oneshot::channel();
    let (chunk_tx, chunk_rx) = mpsc::channel::<Chunk>(1);

    tokio::spawn(async move {
        let params = LogParams {
            follow: true,
            ..LogParams::default()
        };
        match api.log_stream(&pod, &params).await {
            Ok(reader) => {
                let _ = opened_tx.send(Ok(()));
                pump(reader, chunk_tx).await;
                debug!(pod = %pod, "log connection closed");
            }
            Err(e) => {
                let _ = opened_tx.send(Err(e));
            }
        }
    });

    match opened_rx.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(ClusterError::Platform(e.to_string())),
        Err(_) => {
            return Err(ClusterError::Platform(
                "log reader exited before the connection opened".to_string(),
            ));
        }
    }

    let chunks = stream::unfold(chunk_rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    });
    let stream: LogStream = Box::pin(Box::pin(chunks).into_async_read());
    Ok(stream)
}

/// Copy chunks from `reader` into `tx` until end of stream, a read error or the
/// receiving side going away.
async fn pump<R>(reader: R, tx: mpsc::Sender<Chunk>)
where
    R: AsyncBufRead,
{
    let mut reader = Box::pin(reader);
    loop {
        let read = tokio::select! {
            read = reader.fill_buf() => read.map(|buf| buf.to_vec()),
            _ = tx.closed() => return,
        };

        match read {
            Ok(chunk) if chunk.is_empty() => return,
            Ok(chunk) => {
                reader.consume_unpin(chunk.len());
                if tx.send(Ok(chunk)).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                warn!(error = %e, "log read failed");
                let _ = tx.send(Err(e)).await;
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::{AsyncReadExt, io::Cursor};

    use super::*;

    struct FailingAfter {
        first: Option<Vec<u8>>,
    }

    impl futures::AsyncRead for FailingAfter {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _: &mut std::task::Context<'_>,
            _: &mut [u8],
        ) -> std::task::Poll<io::Result<usize>> {
            unreachable!("read through the buffered interface")
        }
    }

    impl AsyncBufRead for FailingAfter {
        fn poll_fill_buf(
            self: std::pin::Pin<&mut Self>,
            _: &mut std::task::Context<'_>,
        ) -> std::task::Poll<io::Result<&[u8]>> {
            let this = self.get_mut();
            match &this.first {
                Some(buf) => std::task::Poll::Ready(Ok(buf.as_slice())),
                None => std::task::Poll::Ready(Err(io::Error::other("connection reset"))),
            }
        }

        fn consume(self: std::pin::Pin<&mut Self>, _: usize) {
            self.get_mut().first = None;
        }
    }

    #[tokio::test]
    async fn pump_forwards_everything_then_ends() {
        let (tx, rx) = mpsc::channel(1);
        let task = tokio::spawn(pump(Cursor::new(b"one\ntwo\n".to_vec()), tx));

        let chunks = stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|c| (c, rx)) });
        let mut out = String::new();
        Box::pin(chunks)
            .into_async_read()
            .read_to_string(&mut out)
            .await
            .unwrap();

        assert_eq!(out, "one\ntwo\n");
        task.await.unwrap();
    }

    #[tokio::test]
    async fn pump_forwards_read_errors() {
        let (tx, mut rx) = mpsc::channel(1);
        let reader = FailingAfter {
            first: Some(b"partial".to_vec()),
        };
        tokio::spawn(pump(reader, tx));

        assert_eq!(rx.recv().await.unwrap().unwrap(), b"partial".to_vec());
        assert!(rx.recv().await.unwrap().is_err());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn pump_stops_when_consumer_goes_away() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        pump(Cursor::new(b"never read\n".to_vec()), tx).await;
    }

    type ApiHandle = tower_test::mock::Handle<http::Request<kube::client::Body>, http::Response<kube::client::Body>>;

    /// Client whose API server is the returned handle. Its default namespace is
    /// deliberately not the configured one.
    fn mock_client(namespace: &str) -> (KubeJobClient, ApiHandle) {
        let (service, handle) =
            tower_test::mock::pair::<http::Request<kube::client::Body>, http::Response<kube::client::Body>>();
        let settings = KubeSettings {
            namespace: namespace.to_string(),
            ..KubeSettings::default()
        };
        let client = Client::new(service, "default");
        (KubeJobClient::from_client(client, settings), handle)
    }

    fn respond(status: u16, body: impl Into<Vec<u8>>) -> http::Response<kube::client::Body> {
        http::Response::builder()
            .status(status)
            .body(kube::client::Body::from(body.into()))
            .unwrap()
    }

    fn json(status: u16, value: serde_json::Value) -> http::Response<kube::client::Body> {
        respond(status, serde_json::to_vec(&value).unwrap())
    }

    fn pod_list(pods: &[(&str, &str)]) -> serde_json::Value {
        let items: Vec<_> = pods
            .iter()
            .map(|(name, created)| {
                serde_json::json!({
                    "apiVersion": "v1",
                    "kind": "Pod",
                    "metadata": {"name": name, "creationTimestamp": created}
                })
            })
            .collect();
        serde_json::json!({
            "apiVersion": "v1",
            "kind": "PodList",
            "metadata": {},
            "items": items
        })
    }

    #[tokio::test]
    async fn submit_posts_the_job_into_the_configured_namespace() {
        let (client, mut handle) = mock_client("jobs");
        let server = tokio::spawn(async move {
            let (request, send) = handle.next_request().await.expect("job not posted");
            assert_eq!(request.method(), http::Method::POST);
            assert_eq!(request.uri().path(), "/apis/batch/v1/namespaces/jobs/jobs");

            let body = request.into_body().collect_bytes().await.unwrap();
            send.send_response(respond(201, body.to_vec()));
            serde_json::from_slice::<serde_json::Value>(&body).unwrap()
        });

        let env = Env::single("TOKEN", "s3cr3t");
        let id = client.submit("backup", "registry/backup:1", &env).await.unwrap();
        let job = server.await.unwrap();

        assert_eq!(job["kind"], "Job");
        assert_eq!(job["metadata"]["name"], id.as_str());
        assert_eq!(job["metadata"]["labels"]["job"], id.as_str());
        assert_eq!(job["spec"]["template"]["metadata"]["labels"]["job"], id.as_str());

        let container = &job["spec"]["template"]["spec"]["containers"][0];
        assert_eq!(container["image"], "registry/backup:1");
        assert_eq!(container["env"][0]["name"], "TOKEN");
        assert_eq!(container["env"][0]["value"], "s3cr3t");
    }

    #[tokio::test]
    async fn rejected_job_is_a_submission_error() {
        let (client, mut handle) = mock_client("jobs");
        tokio::spawn(async move {
            let (_, send) = handle.next_request().await.expect("job not posted");
            send.send_response(json(
                403,
                serde_json::json!({
                    "apiVersion": "v1",
                    "kind": "Status",
                    "metadata": {},
                    "status": "Failure",
                    "message": "jobs.batch is forbidden",
                    "reason": "Forbidden",
                    "code": 403
                }),
            ));
        });

        let err = client.submit("backup", "img", &Env::new()).await.unwrap_err();
        assert!(matches!(err, ClusterError::Submission(_)), "{err}");
    }

    #[tokio::test]
    async fn logs_of_the_newest_unit_are_followed() {
        let (client, mut handle) = mock_client("jobs");
        let id = ExecutionId::from("backup-1");

        let expected_selector = format!("labelSelector=job%3D{id}");
        let server = tokio::spawn(async move {
            let (request, send) = handle.next_request().await.expect("pods not listed");
            assert_eq!(request.method(), http::Method::GET);
            assert_eq!(request.uri().path(), "/api/v1/namespaces/jobs/pods");
            let query = request.uri().query().unwrap_or_default().to_string();
            assert!(query.contains(&expected_selector), "{query}");
            send.send_response(json(
                200,
                pod_list(&[
                    ("backup-1-old", "2024-01-01T00:00:00Z"),
                    ("backup-1-new", "2024-01-01T00:05:00Z"),
                ]),
            ));

            let (request, send) = handle.next_request().await.expect("logs not requested");
            assert_eq!(request.uri().path(), "/api/v1/namespaces/jobs/pods/backup-1-new/log");
            let query = request.uri().query().unwrap_or_default().to_string();
            assert!(query.contains("follow=true"), "{query}");
            send.send_response(respond(200, b"first\nsecond\n".to_vec()));
        });

        let mut stream = client.open_log_stream(&id).await.unwrap();
        let mut out = String::new();
        stream.read_to_string(&mut out).await.unwrap();
        server.await.unwrap();

        assert_eq!(out, "first\nsecond\n");
    }

    #[tokio::test]
    async fn no_pods_for_the_selector_is_unit_not_found() {
        let (client, mut handle) = mock_client("jobs");
        let server = tokio::spawn(async move {
            let (request, send) = handle.next_request().await.expect("pods not listed");
            assert_eq!(request.uri().path(), "/api/v1/namespaces/jobs/pods");
            send.send_response(json(200, pod_list(&[])));
        });

        let result = client.open_log_stream(&ExecutionId::from("backup-1")).await;
        server.await.unwrap();

        assert!(matches!(result, Err(ClusterError::UnitNotFound(id)) if id == "backup-1"));
    }

    #[tokio::test]
    async fn failed_pod_listing_is_a_platform_error() {
        let (client, mut handle) = mock_client("jobs");
        tokio::spawn(async move {
            let (_, send) = handle.next_request().await.expect("pods not listed");
            send.send_response(json(
                500,
                serde_json::json!({
                    "apiVersion": "v1",
                    "kind": "Status",
                    "metadata": {},
                    "status": "Failure",
                    "message": "etcdserver: request timed out",
                    "reason": "InternalError",
                    "code": 500
                }),
            ));
        });

        let result = client.open_log_stream(&ExecutionId::from("backup-1")).await;
        assert!(matches!(result, Err(ClusterError::Platform(_))));
    }
}
