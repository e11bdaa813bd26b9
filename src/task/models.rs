use std::fmt;

use serde::{Deserialize, Serialize};

use super::lenient;

/// 引擎侧任务状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Active,
    Waiting,
    Paused,
    Error,
    Complete,
    Removed,
}

impl TaskStatus {
    /// 仍处于引擎调度中、尚未到达终态
    pub fn is_live(&self) -> bool {
        matches!(self, TaskStatus::Active | TaskStatus::Waiting | TaskStatus::Paused)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Active => "正在下载",
            TaskStatus::Waiting => "等待下载",
            TaskStatus::Paused => "已暂停",
            TaskStatus::Error => "错误",
            TaskStatus::Complete => "已完成",
            TaskStatus::Removed => "已移除",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Active => "active",
            TaskStatus::Waiting => "waiting",
            TaskStatus::Paused => "paused",
            TaskStatus::Error => "error",
            TaskStatus::Complete => "complete",
            TaskStatus::Removed => "removed",
        };
        f.write_str(s)
    }
}

/// 单个下载任务，字段与 aria2 的 tellStatus 结构一致
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub gid: String,
    pub status: TaskStatus,
    #[serde(default, deserialize_with = "lenient::u64_or_zero")]
    pub total_length: u64,
    #[serde(default, deserialize_with = "lenient::u64_or_zero")]
    pub completed_length: u64,
    #[serde(default, deserialize_with = "lenient::u64_or_zero")]
    pub upload_length: u64,
    #[serde(default, deserialize_with = "lenient::u64_or_zero")]
    pub download_speed: u64,
    #[serde(default, deserialize_with = "lenient::u64_or_zero")]
    pub upload_speed: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_hash: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::optional_u32",
        skip_serializing_if = "Option::is_none"
    )]
    pub num_seeders: Option<u32>,
    #[serde(default, deserialize_with = "lenient::u32_or_zero")]
    pub connections: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub belongs_to: Option<String>,
    #[serde(default)]
    pub dir: String,
    #[serde(default)]
    pub files: Vec<TaskFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bittorrent: Option<BittorrentInfo>,
}

impl Task {
    /// 只带 gid 和状态的空任务，其余字段取零值
    pub fn new(gid: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            gid: gid.into(),
            status,
            total_length: 0,
            completed_length: 0,
            upload_length: 0,
            download_speed: 0,
            upload_speed: 0,
            info_hash: None,
            num_seeders: None,
            connections: 0,
            error_code: None,
            followed_by: None,
            belongs_to: None,
            dir: String::new(),
            files: Vec::new(),
            bittorrent: None,
        }
    }

    pub fn progress(&self) -> f64 {
        if self.total_length == 0 {
            return 0.0;
        }
        (self.completed_length as f64 / self.total_length as f64).clamp(0.0, 1.0)
    }

    /// 种子名 > 第一个文件名 > None
    pub fn content_name(&self) -> Option<String> {
        if let Some(name) = self
            .bittorrent
            .as_ref()
            .and_then(|bt| bt.info.as_ref())
            .and_then(|info| info.name.clone())
            .filter(|name| !name.is_empty())
        {
            return Some(name);
        }
        self.files
            .first()
            .and_then(|file| file.path.rsplit('/').next())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }

    pub fn display_name(&self) -> String {
        self.content_name().unwrap_or_else(|| "未知文件".to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskFile {
    #[serde(default, deserialize_with = "lenient::u32_or_zero")]
    pub index: u32,
    #[serde(default)]
    pub path: String,
    #[serde(default, deserialize_with = "lenient::u64_or_zero")]
    pub length: u64,
    #[serde(default, deserialize_with = "lenient::u64_or_zero")]
    pub completed_length: u64,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub selected: bool,
    #[serde(default)]
    pub uris: Vec<TaskUri>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskUri {
    pub uri: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BittorrentInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub announce_list: Option<Vec<Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::optional_i64",
        skip_serializing_if = "Option::is_none"
    )]
    pub creation_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<BittorrentName>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BittorrentName {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}
