use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing::{debug, info, warn};

use maltex::common::logger::PrettyLogger;
use maltex::common::paths::DataPaths;
use maltex::config::{Settings, SettingsOverrides};
use maltex::engine::EngineSupervisor;
use maltex::intake;
use maltex::notify::LogNotifier;
use maltex::rpc::RpcClient;
use maltex::store::{HistoryStore, TaskStore, TaskView};

mod cli;

/// 读取设置文件并应用命令行覆盖
fn load_settings(args: &cli::Cli, settings_file: &Path) -> Result<(Settings, SettingsOverrides)> {
    let settings = if args.strict_config {
        Settings::load(settings_file).context("设置文件无效")?
    } else {
        Settings::load_or_default(settings_file)
    };

    let overrides = SettingsOverrides {
        rpc_port: args.rpc_port,
        rpc_secret: args.rpc_secret.clone(),
    };
    if !overrides.is_empty() {
        debug!("命令行覆盖设置: {:?}", overrides);
    }
    Ok((overrides.apply(settings), overrides))
}

/// 任务列表有变化时重新打印
fn render(view: &TaskView) {
    PrettyLogger::separator();
    let state = if view.connected {
        "已连接".green()
    } else {
        "未连接".red()
    };
    PrettyLogger::title(format!("引擎 {} · {} 个任务", state, view.tasks.len()));
    if let Some(error) = &view.last_error {
        maltex::log_error!("{}", error);
    }
    for task in &view.tasks {
        PrettyLogger::task_line(task);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    // 初始化日志
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    let paths = args
        .data_dir
        .clone()
        .map(DataPaths::new)
        .unwrap_or_else(DataPaths::platform_default);
    let settings_file = args.config.clone().unwrap_or_else(|| paths.settings_file());
    let (settings, overrides) = load_settings(&args, &settings_file)?;

    if args.init_config {
        settings
            .save(&settings_file)
            .with_context(|| format!("写入设置文件失败: {:?}", settings_file))?;
        maltex::log_success!("设置已写入 {:?}", settings_file);
        return Ok(());
    }

    std::fs::create_dir_all(paths.root())
        .with_context(|| format!("无法创建数据目录: {:?}", paths.root()))?;
    info!("数据目录: {:?}", paths.root());

    let supervisor = EngineSupervisor::new(paths.clone())
        .with_settings_file(settings_file)
        .with_overrides(overrides);
    if args.no_engine {
        maltex::log_info!("跳过引擎启动，连接 {}", settings.rpc_endpoint());
    } else {
        supervisor.start(&settings).await;
    }

    let rpc = RpcClient::from_settings(&settings).context("创建 RPC 客户端失败")?;
    let history = HistoryStore::open(paths.history_file());

    let (mut store, handle) = TaskStore::new(rpc, history, settings);
    store = store.with_notifier(Arc::new(LogNotifier));
    if !args.no_engine {
        store = store.with_supervisor(supervisor);
    }
    let worker = store.spawn();

    for input in &args.inputs {
        match intake::classify(input) {
            Some(intent) => {
                info!("添加任务: {}", input);
                handle.submit(intent);
            }
            None => maltex::log_warning!("无法识别的输入: {}", input),
        }
    }

    let mut views = handle.subscribe();
    let mut last_rendered: Option<TaskView> = None;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("收到退出信号");
                break;
            }
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                if last_rendered.as_ref() != Some(&view) {
                    render(&view);
                    last_rendered = Some(view);
                }
            }
        }
    }

    handle.shutdown();
    if let Err(e) = worker.await {
        warn!("任务同步异常退出: {}", e);
    }
    info!("{}", "已退出".green());
    Ok(())
}
