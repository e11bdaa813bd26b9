use std::path::PathBuf;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use futures::future::join_all;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use super::models::{CommandKind, PollOutcome, StoreEvent, TaskOptions};
use super::reconciler::merge_fetched;
use crate::rpc::{RpcClient, RpcError, RpcMethod, RpcReply};

/// 把用户操作翻译成一个或多个 RPC 调用。
/// 每个调用都在独立任务里执行，结果以 StoreEvent 回送，不直接改状态。
#[derive(Clone)]
pub struct CommandDispatcher {
    rpc: RpcClient,
    events: UnboundedSender<StoreEvent>,
    cleanup_delay: Duration,
}

impl CommandDispatcher {
    pub fn new(rpc: RpcClient, events: UnboundedSender<StoreEvent>, cleanup_delay: Duration) -> Self {
        Self {
            rpc,
            events,
            cleanup_delay,
        }
    }

    fn emit(events: &UnboundedSender<StoreEvent>, event: StoreEvent) {
        if events.send(event).is_err() {
            debug!("任务状态已关闭，丢弃事件");
        }
    }

    /// 拉取 active / waiting / stopped 三个列表
    pub fn poll(&self, seq: u64) {
        let rpc = self.rpc.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let (stopped, active, waiting) =
                tokio::join!(rpc.tell_stopped(), rpc.tell_active(), rpc.tell_waiting());
            let outcome = combine_poll([stopped, active, waiting]);
            Self::emit(&events, StoreEvent::Polled { seq, outcome });
        });
    }

    pub fn add_uri(&self, uris: Vec<String>) {
        let rpc = self.rpc.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = rpc.add_uri(&uris).await;
            Self::emit(
                &events,
                StoreEvent::Replied {
                    kind: CommandKind::AddUri,
                    result,
                },
            );
        });
    }

    /// 读取种子文件并以 base64 提交。paused 为 true 时任务添加后保持暂停，
    /// 方便界面先让用户选择文件。
    pub fn add_torrent(&self, path: PathBuf, paused: bool, download_dir: String) {
        let rpc = self.rpc.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("读取种子文件失败 {:?}: {}", path, e);
                    return;
                }
            };
            let encoded = STANDARD.encode(&bytes);

            let mut options = serde_json::Map::new();
            if paused {
                options.insert("pause".to_string(), Value::String("true".to_string()));
            }
            if !download_dir.is_empty() {
                options.insert("dir".to_string(), Value::String(download_dir));
            }

            let result = rpc.add_torrent(&encoded, &options).await;
            Self::emit(
                &events,
                StoreEvent::Replied {
                    kind: CommandKind::AddTorrent,
                    result,
                },
            );
        });
    }

    /// 每个 gid 独立调用，只统计失败数
    fn fire_and_forget(&self, kind: CommandKind, method: RpcMethod, gids: Vec<String>) {
        let rpc = self.rpc.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let total = gids.len();
            let results = join_all(gids.iter().map(|gid| rpc.call_gid(method, gid))).await;
            let failures = results
                .iter()
                .filter(|r| !matches!(r, Ok(RpcReply::Scalar(_))))
                .count();
            if failures > 0 {
                debug!("{}: {}/{} 个调用失败", method, failures, total);
            }
            if let Some(Err(e)) = results.iter().find(|r| r.is_err()) {
                Self::emit(&events, StoreEvent::TransportFailed(e.to_string()));
            }
            Self::emit(
                &events,
                StoreEvent::BatchFinished {
                    kind,
                    total,
                    failures,
                },
            );
        });
    }

    pub fn pause_tasks(&self, gids: Vec<String>) {
        self.fire_and_forget(CommandKind::Pause, RpcMethod::Pause, gids);
    }

    pub fn stop_tasks(&self, gids: Vec<String>) {
        self.fire_and_forget(CommandKind::ForcePause, RpcMethod::ForcePause, gids);
    }

    pub fn resume_tasks(&self, gids: Vec<String>) {
        for gid in gids {
            let rpc = self.rpc.clone();
            let events = self.events.clone();
            tokio::spawn(async move {
                let result = rpc.call_gid(RpcMethod::Unpause, &gid).await;
                Self::emit(
                    &events,
                    StoreEvent::Replied {
                        kind: CommandKind::Unpause,
                        result,
                    },
                );
            });
        }
    }

    /// 有选项时先 changeOption，等它返回后才 unpause：任务一旦运行，引擎会拒绝修改选项
    pub fn resume_task(&self, gid: String, options: TaskOptions) {
        let rpc = self.rpc.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            if !options.is_empty() {
                let result = rpc.change_option(&gid, &options.to_rpc_map()).await;
                Self::emit(
                    &events,
                    StoreEvent::Replied {
                        kind: CommandKind::ChangeOption,
                        result,
                    },
                );
            }
            let result = rpc.call_gid(RpcMethod::Unpause, &gid).await;
            Self::emit(
                &events,
                StoreEvent::Replied {
                    kind: CommandKind::Unpause,
                    result,
                },
            );
        });
    }

    pub fn change_option(&self, gid: String, options: TaskOptions) {
        let rpc = self.rpc.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = rpc.change_option(&gid, &options.to_rpc_map()).await;
            Self::emit(
                &events,
                StoreEvent::Replied {
                    kind: CommandKind::ChangeOption,
                    result,
                },
            );
        });
    }

    /// 删除流程（每个 gid 独立）：
    /// 1. removeDownloadResult，返回 "OK" 即结束；
    /// 2. 否则 forceRemove，等待 cleanup_delay 后再 removeDownloadResult 一次。
    /// 清理过程中的失败只记日志。
    pub fn remove_tasks(&self, gids: Vec<String>) {
        for gid in gids {
            let rpc = self.rpc.clone();
            let events = self.events.clone();
            let cleanup_delay = self.cleanup_delay;
            tokio::spawn(async move {
                let first = rpc.call_gid(RpcMethod::RemoveDownloadResult, &gid).await;
                if let Err(e) = &first {
                    Self::emit(&events, StoreEvent::TransportFailed(e.to_string()));
                }
                if matches!(&first, Ok(reply) if reply.is_ok_ack()) {
                    info!("已移除下载结果: {}", gid);
                    Self::emit(&events, StoreEvent::RemovalConfirmed(gid.clone()));
                } else {
                    debug!("移除结果未成功 {}: {}，改为强制移除", gid, describe(&first));
                    let forced = rpc.call_gid(RpcMethod::ForceRemove, &gid).await;
                    info!("已强制移除 {} ({})，稍后清理结果", gid, describe(&forced));

                    tokio::time::sleep(cleanup_delay).await;
                    let cleanup = rpc.call_gid(RpcMethod::RemoveDownloadResult, &gid).await;
                    info!("清理 {} 完成: {}", gid, describe(&cleanup));
                }
                Self::emit(&events, StoreEvent::RemovalFinished(gid));
            });
        }
    }
}

/// 三个列表都成功才算一次有效轮询；传输失败优先于引擎错误
pub fn combine_poll(results: [Result<RpcReply, RpcError>; 3]) -> PollOutcome {
    let mut lists = Vec::with_capacity(3);
    let mut fault = None;
    let mut unrecognized = false;

    for result in results {
        match result {
            Err(e) => return PollOutcome::Unreachable(e.to_string()),
            Ok(RpcReply::Bulk(tasks)) => lists.push(tasks),
            Ok(RpcReply::Fault(f)) => {
                fault.get_or_insert(f);
            }
            Ok(RpcReply::Scalar(_)) | Ok(RpcReply::Unrecognized) => unrecognized = true,
        }
    }

    if let Some(f) = fault {
        PollOutcome::Fault(f)
    } else if unrecognized {
        PollOutcome::Unrecognized
    } else {
        PollOutcome::Fetched(merge_fetched(lists))
    }
}

fn describe(result: &Result<RpcReply, RpcError>) -> String {
    match result {
        Ok(RpcReply::Scalar(s)) => s.clone(),
        Ok(RpcReply::Fault(f)) => format!("错误 {}: {}", f.code, f.message),
        Ok(RpcReply::Bulk(_)) | Ok(RpcReply::Unrecognized) => "无法识别的响应".to_string(),
        Err(e) => e.to_string(),
    }
}
