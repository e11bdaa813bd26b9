#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::watch;
use uuid::Uuid;

use maltex::notify::{CompletionNotice, Notifier};
use maltex::rpc::{RpcClient, RpcError, RpcRequest, Transport};
use maltex::store::{StoreTimings, TaskView};

/// 脚本化回复
#[derive(Debug, Clone)]
pub enum Reply {
    Result(Value),
    Fault(i64, String),
    Raw(String),
    Unreachable,
    /// 等待一段时间后再给出内层回复
    Delayed(Duration, Box<Reply>),
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub params: Vec<Value>,
    pub at: Instant,
}

/// 按方法名回复的内存传输层，记录每次调用
#[derive(Default)]
pub struct ScriptedTransport {
    calls: Mutex<Vec<RecordedCall>>,
    queued: Mutex<HashMap<String, VecDeque<Reply>>>,
    defaults: Mutex<HashMap<String, Reply>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 三个列表查询默认返回空列表
    pub fn with_empty_engine() -> Arc<Self> {
        let transport = Self::new();
        for method in ["aria2.tellActive", "aria2.tellWaiting", "aria2.tellStopped"] {
            transport.set_default(method, Reply::Result(json!([])));
        }
        transport
    }

    pub fn set_default(&self, method: &str, reply: Reply) {
        self.defaults
            .lock()
            .unwrap()
            .insert(method.to_string(), reply);
    }

    /// 只使用一次的回复，优先于默认回复
    pub fn push(&self, method: &str, reply: Reply) {
        self.queued
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == method)
            .collect()
    }

    fn next_reply(&self, method: &str) -> Reply {
        if let Some(reply) = self
            .queued
            .lock()
            .unwrap()
            .get_mut(method)
            .and_then(|q| q.pop_front())
        {
            return reply;
        }
        self.defaults
            .lock()
            .unwrap()
            .get(method)
            .cloned()
            .unwrap_or(Reply::Unreachable)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &RpcRequest) -> Result<Vec<u8>, RpcError> {
        self.calls.lock().unwrap().push(RecordedCall {
            method: request.method.clone(),
            params: request.params.clone(),
            at: Instant::now(),
        });
        let mut reply = self.next_reply(&request.method);
        while let Reply::Delayed(delay, inner) = reply {
            tokio::time::sleep(delay).await;
            reply = *inner;
        }
        let body = match reply {
            Reply::Result(result) => json!({"id": request.id, "jsonrpc": "2.0", "result": result}),
            Reply::Fault(code, message) => json!({
                "id": request.id,
                "jsonrpc": "2.0",
                "error": {"code": code, "message": message}
            }),
            Reply::Raw(raw) => return Ok(raw.into_bytes()),
            Reply::Unreachable => {
                return Err(RpcError::Transport("connection refused".to_string()));
            }
            Reply::Delayed(..) => unreachable!(),
        };
        Ok(serde_json::to_vec(&body).unwrap())
    }
}

pub fn client(transport: &Arc<ScriptedTransport>) -> RpcClient {
    RpcClient::new(transport.clone(), None)
}

/// 记录所有通知
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<CompletionNotice>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn notices(&self) -> Vec<CompletionNotice> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: &CompletionNotice) {
        self.notices.lock().unwrap().push(notice.clone());
    }
}

/// aria2 返回的任务 JSON，数字都是字符串
pub fn task_json(gid: &str, status: &str, completed: u64, total: u64) -> Value {
    json!({
        "gid": gid,
        "status": status,
        "totalLength": total.to_string(),
        "completedLength": completed.to_string(),
        "uploadLength": "0",
        "downloadSpeed": "1024",
        "uploadSpeed": "0",
        "connections": "1",
        "dir": "/downloads",
        "files": [{
            "index": "1",
            "path": format!("/downloads/{}.iso", gid),
            "length": total.to_string(),
            "completedLength": completed.to_string(),
            "selected": "true",
            "uris": []
        }]
    })
}

pub fn fast_timings() -> StoreTimings {
    StoreTimings {
        poll_interval: Duration::from_millis(40),
        settle_delay: Duration::from_millis(20),
        cleanup_delay: Duration::from_millis(150),
    }
}

pub fn temp_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("maltex-test-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// 等待发布的状态满足条件，超时则 panic
pub async fn wait_for<F>(views: &mut watch::Receiver<TaskView>, predicate: F) -> TaskView
where
    F: Fn(&TaskView) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        {
            let view = views.borrow_and_update();
            if predicate(&view) {
                return view.clone();
            }
        }
        match tokio::time::timeout_at(deadline, views.changed()).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => panic!("任务同步已停止"),
            Err(_) => panic!("等待状态超时: {:?}", &*views.borrow()),
        }
    }
}

/// 等待传输层收到满足条件的调用
pub async fn wait_for_calls<F>(transport: &ScriptedTransport, predicate: F) -> Vec<RecordedCall>
where
    F: Fn(&[RecordedCall]) -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let calls = transport.calls();
        if predicate(&calls) {
            return calls;
        }
        if Instant::now() > deadline {
            panic!("等待调用超时: {:?}", calls.iter().map(|c| &c.method).collect::<Vec<_>>());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
