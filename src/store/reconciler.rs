use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use super::history::HistoryStore;
use crate::task::{Task, TaskStatus};

/// 合并一次轮询拿到的三个列表，按 gid 去重。
/// 调用方按 stopped、active、waiting 的顺序传入，先出现的优先，
/// 这样在两次调用之间换了队列的任务会显示更靠后的状态。
pub fn merge_fetched<I>(lists: I) -> Vec<Task>
where
    I: IntoIterator<Item = Vec<Task>>,
{
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for list in lists {
        for task in list {
            if seen.insert(task.gid.clone()) {
                merged.push(task);
            }
        }
    }
    merged
}

/// 引擎任务 + 引擎里已经没有的历史任务，按 gid 降序
pub fn compose_view(fetched: &[Task], history: &[Task], hidden: &HashSet<String>) -> Vec<Task> {
    let engine_gids: HashSet<&str> = fetched.iter().map(|t| t.gid.as_str()).collect();

    let mut view: Vec<Task> = fetched
        .iter()
        .filter(|t| !hidden.contains(&t.gid))
        .cloned()
        .collect();
    view.extend(
        history
            .iter()
            .filter(|t| !engine_gids.contains(t.gid.as_str()) && !hidden.contains(&t.gid))
            .cloned(),
    );
    view.sort_by(|a, b| b.gid.cmp(&a.gid));
    view
}

/// 维护对外发布的任务列表。每次轮询整体替换，不做字段级增量更新。
#[derive(Debug, Default)]
pub struct TaskReconciler {
    tasks: Vec<Task>,
    /// 被删除的 gid，合并时跳过。
    /// 值为 None 表示删除流程未结束；Some(seq) 表示流程结束时最后发出的轮询序号，
    /// 序号更大的轮询应用后才解除屏蔽。
    hidden: HashMap<String, Option<u64>>,
    last_seq: u64,
}

impl TaskReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn is_hidden(&self, gid: &str) -> bool {
        self.hidden.contains_key(gid)
    }

    fn hidden_gids(&self) -> HashSet<String> {
        self.hidden.keys().cloned().collect()
    }

    /// 序号不大于已应用的最新轮询
    pub fn is_stale(&self, seq: u64) -> bool {
        seq <= self.last_seq
    }

    /// 第一次轮询之前先展示历史记录
    pub fn seed_from_history(&mut self, history: &HistoryStore) {
        self.tasks = compose_view(&[], history.entries(), &self.hidden_gids());
    }

    /// 应用一次轮询结果，返回本次新进入 complete 的任务。
    /// 比上一次已应用的轮询更旧的结果直接丢弃，返回 None。
    pub fn apply_poll(
        &mut self,
        seq: u64,
        fetched: Vec<Task>,
        history: &mut HistoryStore,
    ) -> Option<Vec<Task>> {
        if self.is_stale(seq) {
            debug!("丢弃过期的轮询结果 #{} (已应用 #{})", seq, self.last_seq);
            return None;
        }
        self.last_seq = seq;
        self.hidden
            .retain(|_, released_at| !matches!(released_at, Some(last) if seq > *last));
        let hidden = self.hidden_gids();

        let previous: HashMap<&str, TaskStatus> = self
            .tasks
            .iter()
            .map(|t| (t.gid.as_str(), t.status))
            .collect();

        // 只有上一轮也存在、且之前不是 complete 的任务才算刚完成
        let completed: Vec<Task> = fetched
            .iter()
            .filter(|t| t.status == TaskStatus::Complete && !hidden.contains(&t.gid))
            .filter(|t| {
                previous
                    .get(t.gid.as_str())
                    .is_some_and(|status| *status != TaskStatus::Complete)
            })
            .cloned()
            .collect();

        for task in &completed {
            info!("任务完成: {} {}", task.gid, task.display_name());
            history.add(task);
        }

        self.tasks = compose_view(&fetched, history.entries(), &hidden);
        Some(completed)
    }

    /// 本地立即删除：从历史和发布列表中去掉，并在删除流程结束前屏蔽该 gid
    pub fn remove_local(&mut self, gids: &[String], history: &mut HistoryStore) {
        for gid in gids {
            history.remove(gid);
            self.hidden.insert(gid.clone(), None);
        }
        self.tasks.retain(|t| !gids.contains(&t.gid));
    }

    /// 删除流程结束。last_issued 是此刻最后发出的轮询序号，
    /// 它之前发出的轮询仍可能带着这个 gid，不能解除屏蔽。
    pub fn release(&mut self, gid: &str, last_issued: u64) {
        if let Some(released_at) = self.hidden.get_mut(gid) {
            *released_at = Some(last_issued);
        }
    }
}
