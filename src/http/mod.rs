//! HTTP 服务器模块 - 使用 Axum 承载 RPC 入口
//!
//! 功能包括：
//! - RPC 请求分发
//! - 健康检查
//! - 监控指标

pub mod routes;
pub mod server;

pub use server::{HttpServerState, RpcHttpServer};
