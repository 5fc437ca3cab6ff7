use kjob_api::axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use kjob_prometheus::PrometheusMetrics;
use prometheus::TextEncoder;
use tracing::error;

/// GET /metrics in the Prometheus text exposition format.
pub fn router(metrics: PrometheusMetrics) -> Router {
    Router::new()
        .route("/metrics", get(render))
        .with_state(metrics)
}

async fn render(State(metrics): State<PrometheusMetrics>) -> Response {
    match TextEncoder::new().encode_to_string(&metrics.gather()) {
        Ok(body) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            error!(error = %e, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use kjob_api::axum::body::{Body, to_bytes};
    use kjob_api::axum::http::Request;
    use kjob_core::{ExecuteOutcome, MetricsBackend};
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn exposes_recorded_counters() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.record_execution(ExecuteOutcome::Submitted);

        let response = router(metrics)
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains(r#"kjob_executions_total{outcome="submitted"} 1"#), "{text}");
    }
}
