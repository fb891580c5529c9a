//! GET /health 与 GET /metrics

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{Map, Value};

use crate::http::HttpServerState;

pub fn create_route() -> Router<HttpServerState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
}

/// 逐个检查存储适配器，全部可用返回 200，否则 503
async fn health_handler(State(state): State<HttpServerState>) -> Response {
    let report = state.dao.health().await;
    let healthy = report.iter().all(|(_, ok)| *ok);

    let stores: Map<String, Value> = report
        .into_iter()
        .map(|(name, ok)| (name.to_string(), Value::from(if ok { "up" } else { "down" })))
        .collect();
    let body = serde_json::json!({
        "status": if healthy { "ok" } else { "degraded" },
        "stores": stores,
        "checked_at": chrono::Utc::now().to_rfc3339(),
    });

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body)).into_response()
}

/// Prometheus 文本格式指标；未初始化时返回 503
async fn metrics_handler() -> Response {
    match crate::infra::metrics::render_metrics() {
        Some(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics not initialized").into_response(),
    }
}
