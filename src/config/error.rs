use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置失败 {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("配置格式错误 {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("写入配置失败: {0}")]
    Write(#[from] std::io::Error),

    #[error("序列化配置失败: {0}")]
    Serialize(#[from] serde_json::Error),
}
