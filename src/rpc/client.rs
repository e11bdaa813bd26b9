use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{Value, json};
use tracing::debug;

use super::error::RpcError;
use super::models::{RpcMethod, RpcReply, RpcRequest};
use super::transport::{HttpTransport, Transport};
use crate::config::Settings;

/// 等待队列和已停止队列每次拉取的数量
pub const PAGE_SIZE: u64 = 100;

/// 无状态的请求/响应封装，不做重试
#[derive(Clone)]
pub struct RpcClient {
    transport: Arc<dyn Transport>,
    secret: Option<String>,
    next_id: Arc<AtomicU64>,
}

impl RpcClient {
    pub fn new(transport: Arc<dyn Transport>, secret: Option<String>) -> Self {
        Self {
            transport,
            secret: secret.filter(|s| !s.is_empty()),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// 按设置中的端口和密钥连接本机引擎
    pub fn from_settings(settings: &Settings) -> Result<Self, RpcError> {
        let transport = HttpTransport::new(settings.rpc_endpoint())?;
        Ok(Self::new(
            Arc::new(transport),
            settings.secret().map(str::to_string),
        ))
    }

    fn build_request(&self, method: RpcMethod, params: Vec<Value>) -> RpcRequest {
        let id = format!("maltex-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut full = Vec::with_capacity(params.len() + 1);
        if let Some(secret) = &self.secret {
            full.push(Value::String(format!("token:{}", secret)));
        }
        full.extend(params);
        RpcRequest::new(id, method, full)
    }

    /// 发送一次调用。传输失败返回 Err，其余情况都解码成 RpcReply
    pub async fn call(&self, method: RpcMethod, params: Vec<Value>) -> Result<RpcReply, RpcError> {
        let request = self.build_request(method, params);
        let body = self.transport.send(&request).await?;
        let reply = RpcReply::decode(&body);
        if matches!(reply, RpcReply::Unrecognized) {
            debug!(
                "无法识别的响应 {}: {}",
                method,
                String::from_utf8_lossy(&body)
            );
        }
        Ok(reply)
    }

    pub async fn tell_active(&self) -> Result<RpcReply, RpcError> {
        self.call(RpcMethod::TellActive, vec![]).await
    }

    pub async fn tell_waiting(&self) -> Result<RpcReply, RpcError> {
        self.call(RpcMethod::TellWaiting, vec![json!(0), json!(PAGE_SIZE)])
            .await
    }

    pub async fn tell_stopped(&self) -> Result<RpcReply, RpcError> {
        self.call(RpcMethod::TellStopped, vec![json!(0), json!(PAGE_SIZE)])
            .await
    }

    pub async fn add_uri(&self, uris: &[String]) -> Result<RpcReply, RpcError> {
        self.call(RpcMethod::AddUri, vec![json!(uris)]).await
    }

    /// torrent 为 base64 编码后的种子内容
    pub async fn add_torrent(
        &self,
        torrent: &str,
        options: &serde_json::Map<String, Value>,
    ) -> Result<RpcReply, RpcError> {
        let mut params = vec![json!(torrent), json!(Vec::<String>::new())];
        if !options.is_empty() {
            params.push(Value::Object(options.clone()));
        }
        self.call(RpcMethod::AddTorrent, params).await
    }

    /// pause / forcePause / unpause / removeDownloadResult / forceRemove 这类只带 gid 的调用
    pub async fn call_gid(&self, method: RpcMethod, gid: &str) -> Result<RpcReply, RpcError> {
        self.call(method, vec![json!(gid)]).await
    }

    pub async fn change_option(
        &self,
        gid: &str,
        options: &serde_json::Map<String, Value>,
    ) -> Result<RpcReply, RpcError> {
        self.call(
            RpcMethod::ChangeOption,
            vec![json!(gid), Value::Object(options.clone())],
        )
        .await
    }
}
