use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::args::{build_engine_args, mask_secrets, session_has_content};
use super::error::EngineError;
use crate::common::logger::AppLog;
use crate::common::paths::DataPaths;
use crate::config::{Settings, SettingsOverrides};

#[cfg(windows)]
pub const ENGINE_BINARY_NAME: &str = "aria2c.exe";
#[cfg(not(windows))]
pub const ENGINE_BINARY_NAME: &str = "aria2c";

/// 可通过该环境变量指定引擎路径
pub const ENGINE_PATH_ENV: &str = "MALTEX_ENGINE";

/// 启动后多久检查一次进程是否已退出
pub const LIVENESS_DELAY: Duration = Duration::from_secs(1);

/// 等待 SIGTERM 生效的最长时间，超时后强制结束
const GRACEFUL_STOP_TIMEOUT: Duration = Duration::from_secs(3);

struct ManagedChild {
    child: Child,
    generation: u64,
}

/// 独占管理 aria2c 子进程。所有失败只写日志，不向调用方返回错误。
#[derive(Clone)]
pub struct EngineSupervisor {
    paths: DataPaths,
    log: AppLog,
    settings_file: PathBuf,
    overrides: SettingsOverrides,
    child: Arc<Mutex<Option<ManagedChild>>>,
    generation: Arc<AtomicU64>,
    liveness_delay: Duration,
    kill_strays: bool,
}

impl EngineSupervisor {
    pub fn new(paths: DataPaths) -> Self {
        let log = AppLog::new(paths.app_log());
        let settings_file = paths.settings_file();
        Self {
            paths,
            log,
            settings_file,
            overrides: SettingsOverrides::default(),
            child: Arc::new(Mutex::new(None)),
            generation: Arc::new(AtomicU64::new(0)),
            liveness_delay: LIVENESS_DELAY,
            kill_strays: true,
        }
    }

    pub fn with_liveness_delay(mut self, delay: Duration) -> Self {
        self.liveness_delay = delay;
        self
    }

    /// restart 时读取的设置文件，默认为数据目录下的 settings.json
    pub fn with_settings_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_file = path.into();
        self
    }

    /// restart 重新读取设置后再应用的覆盖项
    pub fn with_overrides(mut self, overrides: SettingsOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// 关闭启动前的 `pkill aria2c`
    pub fn without_stray_cleanup(mut self) -> Self {
        self.kill_strays = false;
        self
    }

    pub fn paths(&self) -> &DataPaths {
        &self.paths
    }

    pub fn app_log(&self) -> &AppLog {
        &self.log
    }

    /// 启动引擎。先停掉旧进程和系统里残留的同名进程，失败时只记录日志。
    pub async fn start(&self, settings: &Settings) {
        if let Err(e) = self.try_start(settings).await {
            match e {
                EngineError::BinaryNotFound => {
                    self.log.critical("[Engine] CRITICAL: binary not found");
                }
                other => {
                    self.log.critical(format!("[Engine] Failed to run: {}", other));
                }
            }
        }
    }

    async fn try_start(&self, settings: &Settings) -> Result<(), EngineError> {
        self.stop().await;
        if self.kill_strays {
            kill_stray_engines().await;
        }

        if let Err(e) = std::fs::create_dir_all(self.paths.root()) {
            warn!("创建数据目录失败 {:?}: {}", self.paths.root(), e);
        }

        let binary = locate_binary(settings).ok_or(EngineError::BinaryNotFound)?;
        let resume = session_has_content(&self.paths.session_file());
        let args = build_engine_args(settings, &self.paths, resume);

        let stderr = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.paths.engine_stderr())
            .map(Stdio::from)
            .unwrap_or_else(|e| {
                warn!("无法打开引擎 stderr 日志: {}", e);
                Stdio::null()
            });

        self.log.line(format!(
            "[Engine] CMD: {} {}",
            binary.display(),
            mask_secrets(&args).join(" ")
        ));

        let child = Command::new(&binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(stderr)
            .kill_on_drop(true)
            .spawn()
            .map_err(EngineError::Spawn)?;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.line(format!(
            "[Engine] Process started with PID: {}",
            child.id().unwrap_or_default()
        ));
        *self.child.lock().await = Some(ManagedChild { child, generation });

        self.schedule_liveness_check(generation);
        Ok(())
    }

    /// 启动一段时间后确认进程没有立刻崩溃
    fn schedule_liveness_check(&self, generation: u64) {
        let slot = Arc::clone(&self.child);
        let log = self.log.clone();
        let delay = self.liveness_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut guard = slot.lock().await;
            let Some(managed) = guard.as_mut() else {
                return;
            };
            // 期间已经被重启或停止，不是同一个进程
            if managed.generation != generation {
                return;
            }
            match managed.child.try_wait() {
                Ok(Some(status)) => {
                    let code = status
                        .code()
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "signal".to_string());
                    log.critical(format!(
                        "[Engine] CRITICAL: Process exited immediately with code {}",
                        code
                    ));
                }
                Ok(None) => debug!("[Engine] Process is still running smoothly."),
                Err(e) => warn!("[Engine] 查询进程状态失败: {}", e),
            }
        });
    }

    /// 停止引擎；没有运行中的进程时什么也不做
    pub async fn stop(&self) {
        let Some(mut managed) = self.child.lock().await.take() else {
            return;
        };
        if let Ok(Some(_)) = managed.child.try_wait() {
            return;
        }
        terminate(&mut managed.child).await;
        self.log.line("[Engine] Process stopped");
    }

    /// 重新读取设置文件并重启
    pub async fn restart(&self) {
        let settings = self
            .overrides
            .apply(Settings::load_or_default(&self.settings_file));
        self.log.line("[Engine] Restarting");
        self.start(&settings).await;
    }

    pub async fn is_running(&self) -> bool {
        match self.child.lock().await.as_mut() {
            Some(managed) => matches!(managed.child.try_wait(), Ok(None)),
            None => false,
        }
    }
}

/// 先 SIGTERM 让 aria2 保存会话，超时再强杀
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        let sent = Command::new("kill")
            .arg("-TERM")
            .arg(pid.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false);
        if sent {
            if let Ok(Ok(_)) = tokio::time::timeout(GRACEFUL_STOP_TIMEOUT, child.wait()).await {
                return;
            }
        }
    }

    if let Err(e) = child.kill().await {
        warn!("[Engine] 结束进程失败: {}", e);
    }
}

async fn kill_stray_engines() {
    #[cfg(unix)]
    let mut cmd = {
        let mut cmd = Command::new("pkill");
        cmd.arg("-9").arg(ENGINE_BINARY_NAME);
        cmd
    };
    #[cfg(windows)]
    let mut cmd = {
        let mut cmd = Command::new("taskkill");
        cmd.args(["/F", "/IM", ENGINE_BINARY_NAME]);
        cmd
    };

    let result = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    if let Err(e) = result {
        debug!("清理残留引擎进程失败: {}", e);
    }
}

/// 查找引擎可执行文件。设置里显式指定了路径时只认这个路径。
pub fn locate_binary(settings: &Settings) -> Option<PathBuf> {
    if let Some(explicit) = settings.engine_binary.as_deref().filter(|s| !s.is_empty()) {
        let path = PathBuf::from(explicit);
        return path.is_file().then_some(path);
    }

    let mut candidates = Vec::new();
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.to_path_buf()))
    {
        candidates.push(exe_dir.join("engine").join(ENGINE_BINARY_NAME));
        candidates.push(exe_dir.join(ENGINE_BINARY_NAME));
    }
    if let Some(from_env) = std::env::var_os(ENGINE_PATH_ENV) {
        candidates.push(PathBuf::from(from_env));
    }
    if let Some(path_var) = std::env::var_os("PATH") {
        candidates.extend(std::env::split_paths(&path_var).map(|dir| dir.join(ENGINE_BINARY_NAME)));
    }

    candidates.into_iter().find(|p| p.is_file())
}
