use tracing::info;

use crate::common::logger::PrettyLogger;
use crate::task::Task;

pub const COMPLETION_TITLE: &str = "下载完成";
pub const UNKNOWN_FILE: &str = "未知文件";

/// 任务完成时发给系统通知的内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionNotice {
    pub gid: String,
    pub title: String,
    pub body: String,
}

impl CompletionNotice {
    pub fn for_task(task: &Task) -> Self {
        Self {
            gid: task.gid.clone(),
            title: COMPLETION_TITLE.to_string(),
            body: task
                .content_name()
                .unwrap_or_else(|| UNKNOWN_FILE.to_string()),
        }
    }
}

/// 外部通知渠道。在状态所有者的上下文里同步调用，实现不应阻塞。
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &CompletionNotice);
}

/// 默认实现：写日志并在终端打印
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: &CompletionNotice) {
        info!("{} [{}]: {}", notice.title, notice.gid, notice.body);
        PrettyLogger::success(&format!("{}: {}", notice.title, notice.body));
    }
}
