use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use colored::*;
use tracing::{info, warn};

use crate::common::format::{format_bytes, format_speed};
use crate::task::{Task, TaskStatus};

/// 应用诊断日志（maltex.log），追加写入，不存在则创建。
/// 写失败只会被吞掉，绝不向调用方抛错。
#[derive(Debug, Clone)]
pub struct AppLog {
    path: PathBuf,
}

impl AppLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn line(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        info!("{}", message);
        self.append(message);
    }

    /// 严重问题，同时以 warn 级别输出
    pub fn critical(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        warn!("{}", message);
        self.append(message);
    }

    fn append(&self, message: &str) {
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "[{}] {}", stamp, message));
        if let Err(e) = result {
            warn!("写入应用日志失败 {:?}: {}", self.path, e);
        }
    }
}

/// 终端输出工具
pub struct PrettyLogger;

impl PrettyLogger {
    /// 显示成功消息
    pub fn success(message: impl AsRef<str>) {
        println!("{} {}", "✓".green().bold(), message.as_ref());
    }

    /// 显示信息消息
    pub fn info(message: impl AsRef<str>) {
        println!("{} {}", "ℹ".blue().bold(), message.as_ref());
    }

    /// 显示警告消息
    pub fn warning(message: impl AsRef<str>) {
        println!("{} {}", "⚠".yellow().bold(), message.as_ref());
    }

    /// 显示错误消息
    pub fn error(message: impl AsRef<str>) {
        println!("{} {}", "✗".red().bold(), message.as_ref());
    }

    /// 显示分割线
    pub fn separator() {
        println!("{}", "─".repeat(60).bright_black());
    }

    /// 显示标题
    pub fn title(text: impl AsRef<str>) {
        let text = text.as_ref();
        let width = text.chars().count().min(58);
        let padding = (58 - width) / 2;
        println!(
            "{} {} {}",
            "─".repeat(padding).bright_black(),
            text.bold(),
            "─".repeat(58 - padding - width).bright_black()
        );
    }

    /// 一行任务信息：状态、进度条、速度、名称
    pub fn task_line(task: &Task) {
        let status = match task.status {
            TaskStatus::Active => task.status.label().blue(),
            TaskStatus::Waiting => task.status.label().cyan(),
            TaskStatus::Paused => task.status.label().yellow(),
            TaskStatus::Error => task.status.label().red(),
            TaskStatus::Complete => task.status.label().green(),
            TaskStatus::Removed => task.status.label().bright_black(),
        };

        let bar_width = 20;
        let filled = ((task.progress() * bar_width as f64) as usize).min(bar_width);
        let bar = format!(
            "[{}{}] {:>5.1}%",
            "█".repeat(filled).green(),
            "░".repeat(bar_width - filled).bright_black(),
            task.progress() * 100.0
        );

        println!(
            "{} {} {} {}/{} ⬇{} {}",
            task.gid.bright_black(),
            status,
            bar,
            format_bytes(task.completed_length),
            format_bytes(task.total_length),
            format_speed(task.download_speed),
            task.display_name().bold()
        );
    }
}

/// 便捷宏用于终端输出
#[macro_export]
macro_rules! log_success {
    ($($arg:tt)*) => {
        $crate::common::logger::PrettyLogger::success(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::common::logger::PrettyLogger::info(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warning {
    ($($arg:tt)*) => {
        $crate::common::logger::PrettyLogger::warning(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::common::logger::PrettyLogger::error(format!($($arg)*))
    };
}
