use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    /// 连接被拒绝、超时等，引擎不可达
    #[error("网络请求失败: {0}")]
    Transport(String),

    #[error("HTTP 状态异常: {0}")]
    Status(u16),

    #[error("请求编码失败: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for RpcError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => RpcError::Status(status.as_u16()),
            None => RpcError::Transport(e.to_string()),
        }
    }
}
