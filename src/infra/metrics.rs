//! Prometheus 指标：RPC 调用量与延迟、同步结果、缓存连接池等
//!
//! 通过 `init()` 安装全局 Recorder，通过 HTTP GET `/metrics` 暴露抓取端点。
//! 未初始化时各 `record_*` 调用是空操作。

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::OnceLock;

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// 指标名称
const COUNTER_RPC_TOTAL: &str = "manager_rpc_total";
const HISTOGRAM_RPC_DURATION: &str = "manager_rpc_duration_seconds";
const COUNTER_SYNC_MESSAGES: &str = "manager_sync_messages_total";
const COUNTER_SYNC_SKIPPED_IDS: &str = "manager_sync_skipped_ids_total";
const COUNTER_BACKEND_ERRORS: &str = "manager_backend_errors_total";
const GAUGE_REDIS_POOL_ACTIVE: &str = "manager_redis_pool_active";
const GAUGE_REDIS_POOL_IDLE: &str = "manager_redis_pool_idle";

/// 初始化 Prometheus 指标（安装全局 Recorder）。
/// 仅需在进程内调用一次；重复调用会返回 Err。
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let handle = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;
    HANDLE
        .set(handle)
        .map_err(|_| "metrics already initialized")?;
    Ok(())
}

/// 渲染当前指标为 Prometheus 文本格式，供 GET /metrics 使用。
pub fn render_metrics() -> Option<String> {
    HANDLE.get().map(|h| h.render())
}

/// 记录一次 RPC 调用：总次数（按路由 + 错误码）+ 耗时直方图。
pub fn record_rpc(route: &str, err_code: u32, duration_secs: f64) {
    metrics::counter!(
        COUNTER_RPC_TOTAL,
        "route" => route.to_string(),
        "err_code" => err_code.to_string()
    )
    .increment(1);
    metrics::histogram!(HISTOGRAM_RPC_DURATION, "route" => route.to_string()).record(duration_secs);
}

/// 记录一次同步返回的消息数与跳过的消息 ID 数。
pub fn record_sync(messages: usize, skipped_ids: usize) {
    metrics::counter!(COUNTER_SYNC_MESSAGES).increment(messages as u64);
    metrics::counter!(COUNTER_SYNC_SKIPPED_IDS).increment(skipped_ids as u64);
}

/// 记录后端错误（按存储类型）。
pub fn record_backend_error(store: &'static str) {
    metrics::counter!(COUNTER_BACKEND_ERRORS, "store" => store).increment(1);
}

/// 更新 Redis 连接池状态（Gauge）。
pub fn record_redis_pool(active: u32, idle: u32) {
    metrics::gauge!(GAUGE_REDIS_POOL_ACTIVE).set(active as f64);
    metrics::gauge!(GAUGE_REDIS_POOL_IDLE).set(idle as f64);
}
