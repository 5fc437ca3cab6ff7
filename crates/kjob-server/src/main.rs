mod config;
mod metrics;

use std::{net::Ipv4Addr, sync::Arc};

use kjob_api::{AppContext, HttpApi};
use kjob_core::{ClusterJobClient, MetadataStore, MetricsHandle, SecretStore};
use kjob_kube::{KubeJobClient, MemoryCluster};
use kjob_observe::init_logger;
use kjob_prometheus::PrometheusMetrics;
use kjob_store::{MemoryStore, RedisStore};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{ClusterBackend, ServerConfig};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let cfg = ServerConfig::from_env()?;

    // 1) logger
    init_logger(&cfg.logger)?;
    info!("logger initialized");

    // 2) metrics
    let prometheus = PrometheusMetrics::new()?;
    let metrics: MetricsHandle = Arc::new(prometheus.clone());

    // 3) job catalog + secrets
    let (metadata, secrets) = match cfg.redis_address.as_deref() {
        Some(address) => {
            let store = Arc::new(RedisStore::connect(address).await?);
            (
                store.clone() as Arc<dyn MetadataStore>,
                store as Arc<dyn SecretStore>,
            )
        }
        None => {
            warn!("KJOB_REDIS_ADDRESS is not set; catalog and secrets are kept in memory");
            let store = Arc::new(MemoryStore::new());
            (
                store.clone() as Arc<dyn MetadataStore>,
                store as Arc<dyn SecretStore>,
            )
        }
    };

    // 4) cluster
    let cluster: Arc<dyn ClusterJobClient> = match cfg.cluster_backend {
        ClusterBackend::Kube => Arc::new(KubeJobClient::connect(cfg.kube.clone()).await?),
        ClusterBackend::Memory => {
            warn!("using the in-memory cluster; no workloads will run");
            Arc::new(MemoryCluster::new().with_job_deadline(cfg.kube.job_deadline))
        }
    };

    // 5) http
    let ctx = AppContext::new(metadata, secrets, cluster, metrics).with_stream_config(cfg.stream);
    let app = HttpApi::new(Arc::new(ctx))
        .router()
        .merge(metrics::router(prometheus));

    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, cfg.port)).await?;
    info!(addr = %listener.local_addr()?, "http server listening");

    // 6) run until a shutdown signal arrives
    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    kjob_api::axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    info!("http server stopped");
    Ok(())
}

async fn wait_for_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("ctrl-c received"),
                    _ = term.recv() => info!("SIGTERM received"),
                }
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                let _ = tokio::signal::ctrl_c().await;
                info!("ctrl-c received");
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("ctrl-c received");
    }

    info!("shutting down");
    shutdown.cancel();
}
