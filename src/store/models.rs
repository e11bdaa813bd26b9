use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::time::Duration;

use itertools::Itertools;
use serde_json::Value;

use crate::config::Settings;
use crate::rpc::{RpcError, RpcFault, RpcReply};
use crate::task::Task;

/// 发布给界面层的状态快照
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskView {
    pub tasks: Vec<Task>,
    pub connected: bool,
    pub last_error: Option<String>,
    /// 最近一次添加任务返回的 gid
    pub last_added_gid: Option<String>,
    /// 最近一次操作返回的 gid
    pub last_affected_gid: Option<String>,
    /// pause / stop 批量操作中失败的调用累计数
    pub failed_commands: usize,
}

impl TaskView {
    pub fn task(&self, gid: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.gid == gid)
    }

    pub fn contains(&self, gid: &str) -> bool {
        self.task(gid).is_some()
    }
}

/// 轮询周期和各种等待时间
#[derive(Debug, Clone, Copy)]
pub struct StoreTimings {
    pub poll_interval: Duration,
    /// 操作成功后等待引擎状态稳定再额外拉取一次
    pub settle_delay: Duration,
    /// forceRemove 之后再次 removeDownloadResult 前的等待
    pub cleanup_delay: Duration,
}

impl Default for StoreTimings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            settle_delay: Duration::from_millis(500),
            cleanup_delay: Duration::from_secs(1),
        }
    }
}

/// changeOption 的选项。键名与 aria2 一致
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskOptions {
    pub dir: Option<String>,
    pub selected_files: Option<BTreeSet<u32>>,
    pub extra: BTreeMap<String, String>,
}

impl TaskOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dir(mut self, dir: impl Into<String>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    pub fn select_files(mut self, indices: impl IntoIterator<Item = u32>) -> Self {
        self.selected_files = Some(indices.into_iter().collect());
        self
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.dir.is_none() && self.selected_files.is_none() && self.extra.is_empty()
    }

    /// 转成 aria2 的选项对象，select-file 为升序逗号列表
    pub fn to_rpc_map(&self) -> serde_json::Map<String, Value> {
        let mut map = serde_json::Map::new();
        for (key, value) in &self.extra {
            map.insert(key.clone(), Value::String(value.clone()));
        }
        if let Some(dir) = &self.dir {
            map.insert("dir".to_string(), Value::String(dir.clone()));
        }
        if let Some(files) = &self.selected_files {
            map.insert(
                "select-file".to_string(),
                Value::String(files.iter().join(",")),
            );
        }
        map
    }
}

/// 界面层发来的指令
#[derive(Debug)]
pub enum StoreCommand {
    AddUri(Vec<String>),
    AddTorrent { path: PathBuf, paused: bool },
    Pause(Vec<String>),
    Resume(Vec<String>),
    ResumeWith { gid: String, options: TaskOptions },
    ChangeOption { gid: String, options: TaskOptions },
    Remove(Vec<String>),
    Stop(Vec<String>),
    Fetch,
    RestartEngine,
    UpdateSettings(Box<Settings>),
}

/// 需要把结果反馈给状态的操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    AddUri,
    AddTorrent,
    Pause,
    ForcePause,
    Unpause,
    ChangeOption,
}

impl CommandKind {
    pub fn is_add(&self) -> bool {
        matches!(self, CommandKind::AddUri | CommandKind::AddTorrent)
    }
}

/// 一次完整轮询（三个列表）的结果
#[derive(Debug)]
pub enum PollOutcome {
    Fetched(Vec<Task>),
    Fault(RpcFault),
    Unreachable(String),
    Unrecognized,
}

/// 后台调用完成后回送给状态所有者的事件
#[derive(Debug)]
pub enum StoreEvent {
    Polled {
        seq: u64,
        outcome: PollOutcome,
    },
    Replied {
        kind: CommandKind,
        result: Result<RpcReply, RpcError>,
    },
    BatchFinished {
        kind: CommandKind,
        total: usize,
        failures: usize,
    },
    RemovalConfirmed(String),
    RemovalFinished(String),
    /// 批量操作或删除中的传输失败，和轮询失败一样标记为未连接
    TransportFailed(String),
    FetchDue,
}
