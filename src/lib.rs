pub mod cli;
pub mod codec;
pub mod config;
pub mod dao;
pub mod error;
pub mod http; // RPC 入口（axum）
pub mod infra;
pub mod logging;
pub mod model;
pub mod repository;
pub mod rpc;
pub mod server;
pub mod service;

pub use config::ServerConfig;
pub use dao::Dao;
pub use error::{ErrCode, Result, ServerError};
pub use model::*;
pub use server::ManagerServer;
