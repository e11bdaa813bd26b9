use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("未找到 aria2c 可执行文件")]
    BinaryNotFound,

    #[error("启动引擎失败: {0}")]
    Spawn(#[source] std::io::Error),
}
