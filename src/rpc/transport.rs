use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use tracing::debug;

use super::error::RpcError;
use super::models::RpcRequest;

/// 把请求送到引擎并取回原始响应体
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &RpcRequest) -> Result<Vec<u8>, RpcError>;
}

/// JSON-RPC over HTTP
#[derive(Debug, Clone)]
pub struct HttpTransport {
    inner: Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, RpcError> {
        let inner = ClientBuilder::new()
            .timeout(Duration::from_secs(10))
            .no_proxy()
            .build()?;
        Ok(Self {
            inner,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &RpcRequest) -> Result<Vec<u8>, RpcError> {
        let resp = self
            .inner
            .post(&self.endpoint)
            .json(request)
            .send()
            .await?;

        // aria2 的 RPC 错误以 400 + JSON 错误体返回，状态码不能直接当失败处理
        let status = resp.status();
        let body = resp.bytes().await?;
        debug!("{} -> {} ({} 字节)", request.method, status, body.len());

        if body.is_empty() && !status.is_success() {
            return Err(RpcError::Status(status.as_u16()));
        }
        Ok(body.to_vec())
    }
}
