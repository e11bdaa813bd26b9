use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("IO操作失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("历史记录格式错误: {0}")]
    Json(#[from] serde_json::Error),
}
