use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::dispatcher::CommandDispatcher;
use super::history::HistoryStore;
use super::models::{
    CommandKind, PollOutcome, StoreCommand, StoreEvent, StoreTimings, TaskOptions, TaskView,
};
use super::reconciler::TaskReconciler;
use crate::config::Settings;
use crate::engine::EngineSupervisor;
use crate::intake::Intent;
use crate::notify::{CompletionNotice, LogNotifier, Notifier};
use crate::rpc::{RpcClient, RpcError, RpcFault, RpcReply};

/// 任务状态的唯一所有者。
///
/// 轮询定时器、界面指令和后台 RPC 的完成结果都汇入同一个循环，
/// 任务列表和历史记录只在这里被修改。
pub struct TaskStore {
    rpc: RpcClient,
    reconciler: TaskReconciler,
    history: HistoryStore,
    dispatcher: CommandDispatcher,
    settings: Settings,
    notifier: Arc<dyn Notifier>,
    supervisor: Option<EngineSupervisor>,
    timings: StoreTimings,

    connected: bool,
    last_error: Option<String>,
    last_added_gid: Option<String>,
    last_affected_gid: Option<String>,
    failed_commands: usize,

    publisher: watch::Sender<TaskView>,
    commands: mpsc::UnboundedReceiver<StoreCommand>,
    events_tx: mpsc::UnboundedSender<StoreEvent>,
    events: mpsc::UnboundedReceiver<StoreEvent>,
    poll_seq: u64,
    last_outcome_seq: u64,
    cancel: CancellationToken,
}

impl TaskStore {
    pub fn new(
        rpc: RpcClient,
        history: HistoryStore,
        settings: Settings,
    ) -> (Self, TaskStoreHandle) {
        let (command_tx, commands) = mpsc::unbounded_channel();
        let (events_tx, events) = mpsc::unbounded_channel();
        let (publisher, view) = watch::channel(TaskView::default());
        let cancel = CancellationToken::new();
        let timings = StoreTimings::default();

        let store = Self {
            dispatcher: CommandDispatcher::new(rpc.clone(), events_tx.clone(), timings.cleanup_delay),
            rpc,
            reconciler: TaskReconciler::new(),
            history,
            settings,
            notifier: Arc::new(LogNotifier),
            supervisor: None,
            timings,
            connected: false,
            last_error: None,
            last_added_gid: None,
            last_affected_gid: None,
            failed_commands: 0,
            publisher,
            commands,
            events_tx,
            events,
            poll_seq: 0,
            last_outcome_seq: 0,
            cancel: cancel.clone(),
        };
        let handle = TaskStoreHandle {
            commands: command_tx,
            view,
            cancel,
        };
        (store, handle)
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// 交给 store 托管的引擎进程：restartEngine 会重启它，退出时会停止它
    pub fn with_supervisor(mut self, supervisor: EngineSupervisor) -> Self {
        self.supervisor = Some(supervisor);
        self
    }

    pub fn with_timings(mut self, timings: StoreTimings) -> Self {
        self.timings = timings;
        self.dispatcher = CommandDispatcher::new(
            self.rpc.clone(),
            self.events_tx.clone(),
            timings.cleanup_delay,
        );
        self
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        self.reconciler.seed_from_history(&self.history);
        self.publish();

        let mut ticker = tokio::time::interval(self.timings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("任务同步已启动 (轮询间隔 {:?})", self.timings.poll_interval);
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => self.poll_now(),
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(event) = self.events.recv() => self.handle_event(event),
            }
        }

        if let Some(supervisor) = &self.supervisor {
            supervisor.stop().await;
        }
        info!("任务同步已停止");
    }

    fn poll_now(&mut self) {
        self.poll_seq += 1;
        self.dispatcher.poll(self.poll_seq);
    }

    fn schedule_fetch(&self, delay: Duration) {
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(StoreEvent::FetchDue);
        });
    }

    fn handle_command(&mut self, command: StoreCommand) {
        debug!("收到指令: {:?}", command);
        match command {
            StoreCommand::AddUri(uris) => {
                if !uris.is_empty() {
                    self.dispatcher.add_uri(uris);
                }
            }
            StoreCommand::AddTorrent { path, paused } => {
                self.dispatcher
                    .add_torrent(path, paused, self.settings.download_path.clone());
            }
            StoreCommand::Pause(gids) => self.dispatcher.pause_tasks(gids),
            StoreCommand::Stop(gids) => self.dispatcher.stop_tasks(gids),
            StoreCommand::Resume(gids) => self.dispatcher.resume_tasks(gids),
            StoreCommand::ResumeWith { gid, options } => self.dispatcher.resume_task(gid, options),
            StoreCommand::ChangeOption { gid, options } => {
                self.dispatcher.change_option(gid, options)
            }
            StoreCommand::Remove(gids) => {
                // 先在本地删掉，不等网络结果
                self.reconciler.remove_local(&gids, &mut self.history);
                self.publish();
                self.dispatcher.remove_tasks(gids);
            }
            StoreCommand::Fetch => self.poll_now(),
            StoreCommand::RestartEngine => match self.supervisor.clone() {
                Some(supervisor) => {
                    let events = self.events_tx.clone();
                    tokio::spawn(async move {
                        supervisor.restart().await;
                        let _ = events.send(StoreEvent::FetchDue);
                    });
                }
                None => self.poll_now(),
            },
            StoreCommand::UpdateSettings(settings) => {
                self.settings = settings.normalized();
            }
        }
    }

    fn handle_event(&mut self, event: StoreEvent) {
        match event {
            StoreEvent::Polled { seq, outcome } => self.apply_poll(seq, outcome),
            StoreEvent::Replied { kind, result } => self.apply_reply(kind, result),
            StoreEvent::BatchFinished {
                kind,
                total,
                failures,
            } => {
                if failures > 0 {
                    warn!("{:?}: {} 个任务中有 {} 个操作失败", kind, total, failures);
                    self.failed_commands += failures;
                    self.publish();
                }
            }
            StoreEvent::RemovalConfirmed(gid) => {
                self.history.remove(&gid);
            }
            StoreEvent::RemovalFinished(gid) => {
                // 已发出的轮询可能还带着这个 gid，等之后发出的轮询应用后才解除屏蔽
                self.reconciler.release(&gid, self.poll_seq);
            }
            StoreEvent::TransportFailed(detail) => self.record_unreachable(&detail),
            StoreEvent::FetchDue => self.poll_now(),
        }
    }

    fn apply_poll(&mut self, seq: u64, outcome: PollOutcome) {
        if seq <= self.last_outcome_seq {
            debug!("丢弃过期的轮询 #{}", seq);
            return;
        }
        self.last_outcome_seq = seq;

        match outcome {
            PollOutcome::Fetched(tasks) => {
                let Some(completed) = self.reconciler.apply_poll(seq, tasks, &mut self.history)
                else {
                    return;
                };
                self.connected = true;
                self.last_error = None;
                if self.settings.notification_enabled {
                    for task in &completed {
                        self.notifier.notify(&CompletionNotice::for_task(task));
                    }
                }
                self.publish();
            }
            PollOutcome::Fault(fault) => self.record_fault(&fault),
            PollOutcome::Unreachable(detail) => self.record_unreachable(&detail),
            PollOutcome::Unrecognized => debug!("轮询返回了无法识别的响应，忽略"),
        }
    }

    fn apply_reply(&mut self, kind: CommandKind, result: Result<RpcReply, RpcError>) {
        match result {
            Ok(RpcReply::Scalar(value)) => {
                self.connected = true;
                self.last_error = None;
                if !RpcReply::is_ack_text(&value) {
                    if kind.is_add() {
                        info!("任务已添加: {}", value);
                        self.last_added_gid = Some(value.clone());
                    }
                    self.last_affected_gid = Some(value);
                }
                self.publish();
                self.schedule_fetch(self.timings.settle_delay);
                return;
            }
            Ok(RpcReply::Fault(fault)) => self.record_fault(&fault),
            Ok(RpcReply::Bulk(_)) | Ok(RpcReply::Unrecognized) => {
                debug!("{:?} 返回了无法识别的响应，忽略", kind);
            }
            Err(e) => self.record_unreachable(&e.to_string()),
        }

        // 恢复任务后无论成败都刷新一次
        if kind == CommandKind::Unpause {
            self.poll_now();
        }
    }

    fn record_fault(&mut self, fault: &RpcFault) {
        warn!("引擎返回错误 {}: {}", fault.code, fault.message);
        self.last_error = Some(format!("内核错误: {}", fault.message));
        self.publish();
    }

    fn record_unreachable(&mut self, detail: &str) {
        if self.connected {
            warn!("引擎连接失败: {}", detail);
        } else {
            debug!("引擎连接失败: {}", detail);
        }
        self.connected = false;
        self.last_error = Some(format!("引擎连接失败: {}", detail));
        self.publish();
    }

    fn publish(&self) {
        self.publisher.send_replace(TaskView {
            tasks: self.reconciler.tasks().to_vec(),
            connected: self.connected,
            last_error: self.last_error.clone(),
            last_added_gid: self.last_added_gid.clone(),
            last_affected_gid: self.last_affected_gid.clone(),
            failed_commands: self.failed_commands,
        });
    }
}

/// 界面层使用的句柄。所有方法立即返回，结果只体现在发布的 TaskView 里。
#[derive(Clone)]
pub struct TaskStoreHandle {
    commands: mpsc::UnboundedSender<StoreCommand>,
    view: watch::Receiver<TaskView>,
    cancel: CancellationToken,
}

impl TaskStoreHandle {
    fn send(&self, command: StoreCommand) {
        if self.commands.send(command).is_err() {
            debug!("任务同步已停止，忽略指令");
        }
    }

    pub fn add_uri<I, S>(&self, uris: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.send(StoreCommand::AddUri(uris.into_iter().map(Into::into).collect()));
    }

    /// 添加种子，默认暂停等待用户选择文件
    pub fn add_torrent(&self, path: impl Into<PathBuf>) {
        self.add_torrent_with(path, true);
    }

    pub fn add_torrent_with(&self, path: impl Into<PathBuf>, paused: bool) {
        self.send(StoreCommand::AddTorrent {
            path: path.into(),
            paused,
        });
    }

    pub fn pause_tasks<I, S>(&self, gids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.send(StoreCommand::Pause(unique(gids)));
    }

    pub fn resume_tasks<I, S>(&self, gids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.send(StoreCommand::Resume(unique(gids)));
    }

    pub fn resume_task(&self, gid: impl Into<String>, options: TaskOptions) {
        self.send(StoreCommand::ResumeWith {
            gid: gid.into(),
            options,
        });
    }

    pub fn change_option(&self, gid: impl Into<String>, options: TaskOptions) {
        self.send(StoreCommand::ChangeOption {
            gid: gid.into(),
            options,
        });
    }

    pub fn remove_tasks<I, S>(&self, gids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.send(StoreCommand::Remove(unique(gids)));
    }

    pub fn stop_tasks<I, S>(&self, gids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.send(StoreCommand::Stop(unique(gids)));
    }

    pub fn fetch_now(&self) {
        self.send(StoreCommand::Fetch);
    }

    pub fn restart_engine(&self) {
        self.send(StoreCommand::RestartEngine);
    }

    pub fn update_settings(&self, settings: Settings) {
        self.send(StoreCommand::UpdateSettings(Box::new(settings)));
    }

    /// 执行外部输入解析出的操作
    pub fn submit(&self, intent: Intent) {
        match intent {
            Intent::AddUri(uris) => self.add_uri(uris),
            Intent::AddTorrent(path) => self.add_torrent(path),
        }
    }

    /// 停止同步循环，托管的引擎随之停止
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn snapshot(&self) -> TaskView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TaskView> {
        self.view.clone()
    }
}

fn unique<I, S>(gids: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    gids.into_iter()
        .map(Into::into)
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}
