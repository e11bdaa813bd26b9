use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::error::HistoryError;
use crate::task::{Task, TaskStatus};

/// 已归档任务（完成或被移除）的持久化列表，磁盘上是 Task 的 JSON 数组。
/// 每个 gid 最多一条记录，新记录插在最前面。
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    entries: Vec<Task>,
}

impl HistoryStore {
    /// 打开并加载历史文件，加载失败视为首次运行
    pub fn open(path: impl AsRef<Path>) -> Self {
        let mut store = Self::new(path);
        store.load();
        store
    }

    /// 空的历史记录，不读磁盘
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            entries: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[Task] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, gid: &str) -> bool {
        self.entries.iter().any(|t| t.gid == gid)
    }

    pub fn get(&self, gid: &str) -> Option<&Task> {
        self.entries.iter().find(|t| t.gid == gid)
    }

    /// 归档任务。gid 已存在时不做任何改动，返回是否插入。
    /// 仍在调度中的状态记为 removed，complete / error 原样保留。
    pub fn add(&mut self, task: &Task) -> bool {
        if self.contains(&task.gid) {
            return false;
        }
        let mut archived = task.clone();
        if archived.status.is_live() {
            archived.status = TaskStatus::Removed;
        }
        debug!("归档任务 {} ({})", archived.gid, archived.status);
        self.entries.insert(0, archived);
        self.persist();
        true
    }

    /// 删除所有匹配的记录，返回删除条数
    pub fn remove(&mut self, gid: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|t| t.gid != gid);
        let removed = before - self.entries.len();
        if removed > 0 {
            self.persist();
        }
        removed
    }

    /// 先写临时文件再重命名，保证文件内容完整
    pub fn save(&self) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(&self.entries)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// 读取失败（不存在或损坏）时清空，不返回错误
    pub fn load(&mut self) {
        match self.try_load() {
            Ok(entries) => {
                info!("已加载 {} 条历史记录", entries.len());
                self.entries = entries;
            }
            Err(e) => {
                info!("加载历史记录失败（可能是首次运行）: {}", e);
                self.entries = Vec::new();
            }
        }
    }

    fn try_load(&self) -> Result<Vec<Task>, HistoryError> {
        let data = std::fs::read(&self.path)?;
        let mut entries: Vec<Task> = serde_json::from_slice(&data)?;
        // 旧文件里可能有重复 gid，保留最前面的一条
        let mut seen = std::collections::HashSet::new();
        entries.retain(|t| seen.insert(t.gid.clone()));
        Ok(entries)
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            warn!("保存历史记录失败 {:?}: {}", self.path, e);
        }
    }
}
