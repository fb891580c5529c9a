//! 消息管理 RPC 服务
//!
//! 四个接口都返回响应信封；这里是内部错误转换成错误码的唯一位置，
//! 后端错误细节只进日志。

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use super::error::{RpcError, RpcResult};
use super::router::RpcRouter;
use super::types::{
    Empty, Envelope, ExceptionMsgRequest, GetOfflineMsgsRequest, OfflineMsgsPayload,
    SetExceptionMsgRequest, SyncPayload, SyncRequest,
};
use crate::dao::Dao;
use crate::error::ErrCode;
use crate::infra::metrics;
use crate::model::ExceptionMsg;
use crate::service::SyncService;

pub const ROUTE_GET_OFFLINE_MSGS: &str = "manager/offline_msgs/get";
pub const ROUTE_SET_EXCEPTION_MSG: &str = "manager/exception_msg/set";
pub const ROUTE_EXCEPTION_MSG: &str = "manager/exception_msg/get";
pub const ROUTE_SYNC: &str = "manager/sync";

/// 消息管理 RPC 服务
pub struct ManagerRpcService {
    dao: Dao,
    sync_service: SyncService,
}

impl ManagerRpcService {
    pub fn new(dao: Dao, sync_concurrency: usize) -> Self {
        let sync_service = SyncService::new(&dao, sync_concurrency);
        Self { dao, sync_service }
    }

    /// 读取用户离线收件箱
    pub async fn get_offline_msgs(&self, uid: i64) -> Envelope<OfflineMsgsPayload> {
        info!("📥 GetOfflineMsgs: uid={}", uid);
        match self.dao.inbox().get_inbox(uid).await {
            Ok(msgs) => Envelope::ok(OfflineMsgsPayload { msgs }),
            Err(e) => {
                error!("❌ 读取离线消息失败: uid={}, error={}", uid, e);
                metrics::record_backend_error("inbox_store");
                Envelope::error(ErrCode::from(&e))
            }
        }
    }

    /// 写入异常消息（按 msg_id 覆盖）
    pub async fn set_exception_msg(&self, request: SetExceptionMsgRequest) -> Envelope<Empty> {
        info!(
            "📥 SetExceptionMsg: msg_id={}, {} -> {}",
            request.msg_id, request.source_uid, request.target_uid
        );
        let message = ExceptionMsg::new(
            request.source_uid,
            request.target_uid,
            request.msg_id,
            request.msg,
        );

        let blob = match message.to_blob() {
            Ok(blob) => blob,
            Err(e) => {
                error!("❌ 异常消息序列化失败: msg_id={}, error={}", message.msg_id, e);
                return Envelope::error(ErrCode::ServerError);
            }
        };

        match self.dao.cache().put_exception(&message.msg_id, &blob).await {
            Ok(()) => Envelope::ok(Empty {}),
            Err(e) => {
                error!("❌ 写入异常消息失败: msg_id={}, error={}", message.msg_id, e);
                metrics::record_backend_error("cache");
                Envelope::error(ErrCode::from(&e))
            }
        }
    }

    /// 读取异常消息
    ///
    /// 读取契约尚未确定，目前不访问缓存，总是返回成功。
    pub async fn exception_msg(&self, request: ExceptionMsgRequest) -> Envelope<Empty> {
        info!("📥 ExceptionMsg: msg_id={}", request.msg_id);
        Envelope::ok(Empty {})
    }

    /// 同步离线消息
    pub async fn sync(&self, uid: i64) -> Envelope<SyncPayload> {
        info!("📥 Sync: uid={}", uid);
        match self.sync_service.sync(uid).await {
            Ok(outcome) => Envelope::ok(SyncPayload {
                p2p_msgs: outcome.messages,
            }),
            Err(e) => Envelope::error(ErrCode::from(&e)),
        }
    }

    /// 把四个接口注册到路由器
    pub fn register_routes(self: Arc<Self>, router: &mut RpcRouter) {
        let service = self.clone();
        router.register(ROUTE_GET_OFFLINE_MSGS, move |body| {
            let service = service.clone();
            async move {
                let request: GetOfflineMsgsRequest = parse_body(body)?;
                to_value(service.get_offline_msgs(request.uid).await)
            }
        });

        let service = self.clone();
        router.register(ROUTE_SET_EXCEPTION_MSG, move |body| {
            let service = service.clone();
            async move {
                let request: SetExceptionMsgRequest = parse_body(body)?;
                to_value(service.set_exception_msg(request).await)
            }
        });

        let service = self.clone();
        router.register(ROUTE_EXCEPTION_MSG, move |body| {
            let service = service.clone();
            async move {
                let request: ExceptionMsgRequest = if body.is_null() {
                    ExceptionMsgRequest::default()
                } else {
                    parse_body(body)?
                };
                to_value(service.exception_msg(request).await)
            }
        });

        let service = self;
        router.register(ROUTE_SYNC, move |body| {
            let service = service.clone();
            async move {
                let request: SyncRequest = parse_body(body)?;
                to_value(service.sync(request.uid).await)
            }
        });
    }
}

fn parse_body<T: DeserializeOwned>(body: Value) -> RpcResult<T> {
    serde_json::from_value(body).map_err(|e| RpcError::request(format!("invalid body: {}", e)))
}

fn to_value<P: Serialize>(envelope: Envelope<P>) -> RpcResult<Value> {
    serde_json::to_value(envelope)
        .map_err(|e| RpcError::server(format!("failed to encode envelope: {}", e)))
}
