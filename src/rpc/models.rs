use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::task::Task;

/// removeDownloadResult 等操作成功时的返回值
pub const ACK: &str = "OK";

pub const JSONRPC_VERSION: &str = "2.0";

/// 本客户端用到的 aria2 方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcMethod {
    TellActive,
    TellWaiting,
    TellStopped,
    AddUri,
    AddTorrent,
    Pause,
    ForcePause,
    Unpause,
    ChangeOption,
    RemoveDownloadResult,
    ForceRemove,
}

impl RpcMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RpcMethod::TellActive => "aria2.tellActive",
            RpcMethod::TellWaiting => "aria2.tellWaiting",
            RpcMethod::TellStopped => "aria2.tellStopped",
            RpcMethod::AddUri => "aria2.addUri",
            RpcMethod::AddTorrent => "aria2.addTorrent",
            RpcMethod::Pause => "aria2.pause",
            RpcMethod::ForcePause => "aria2.forcePause",
            RpcMethod::Unpause => "aria2.unpause",
            RpcMethod::ChangeOption => "aria2.changeOption",
            RpcMethod::RemoveDownloadResult => "aria2.removeDownloadResult",
            RpcMethod::ForceRemove => "aria2.forceRemove",
        }
    }
}

impl fmt::Display for RpcMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub id: String,
    pub method: String,
    pub params: Vec<Value>,
}

impl RpcRequest {
    pub fn new(id: impl Into<String>, method: RpcMethod, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.into(),
            method: method.as_str().to_string(),
            params,
        }
    }
}

/// 引擎返回的错误对象
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RpcFault {
    pub code: i64,
    pub message: String,
}

/// 一次调用的解码结果，按 Bulk -> Scalar -> Fault 的顺序尝试
#[derive(Debug, Clone, PartialEq)]
pub enum RpcReply {
    /// 任务列表（tellActive / tellWaiting / tellStopped）
    Bulk(Vec<Task>),
    /// 单个字符串，通常是 gid 或 "OK"
    Scalar(String),
    Fault(RpcFault),
    /// 三种形状都不匹配
    Unrecognized,
}

impl RpcReply {
    pub fn decode(body: &[u8]) -> Self {
        if let Some(tasks) = decode_result::<Vec<Task>>(body) {
            return RpcReply::Bulk(tasks);
        }
        if let Some(value) = decode_result::<String>(body) {
            return RpcReply::Scalar(value);
        }
        if let Ok(envelope) = serde_json::from_slice::<Envelope<Value>>(body) {
            if let Some(fault) = envelope.error {
                return RpcReply::Fault(fault);
            }
        }
        RpcReply::Unrecognized
    }

    pub fn is_ok_ack(&self) -> bool {
        matches!(self, RpcReply::Scalar(s) if Self::is_ack_text(s))
    }

    /// 引擎对无返回值操作的确认文本
    pub fn is_ack_text(value: &str) -> bool {
        value == ACK
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: Option<T>,
    error: Option<RpcFault>,
}

fn decode_result<T: DeserializeOwned>(body: &[u8]) -> Option<T> {
    serde_json::from_slice::<Envelope<T>>(body)
        .ok()
        .and_then(|envelope| envelope.result)
}
