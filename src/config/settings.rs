use std::path::Path;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::ConfigError;

pub const DEFAULT_TRACKERS: &str = "\
http://tracker.files.fm:6969/announce
http://tracker.gbitt.info:80/announce
http://tracker.noobsubs.net:80/announce
https://tracker.nanoha.org:443/announce
http://tracker.bt4g.com:2095/announce
udp://tracker.opentrackr.org:1337/announce
udp://tracker.openbittorrent.com:6969/announce
udp://exodus.desync.com:6969/announce
udp://www.torrent.eu.org:451/announce
udp://tracker.torrent.eu.org:451/announce
udp://retracker.lanta-net.ru:2710/announce
udp://open.stealth.si:80/announce
udp://ipv4.tracker.harry.lu:80/announce
udp://explodie.org:6969/announce";

/// 用户设置。核心只读取，不修改。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    // 常规
    pub download_path: String,
    pub max_concurrent_downloads: u32,
    pub max_connection_per_server: u32,
    pub launch_at_login: bool,
    pub auto_resume_tasks: bool,
    pub notification_enabled: bool,

    // RPC
    pub rpc_port: u16,
    pub rpc_secret: String,

    // 限速，KB/s，0 表示不限
    pub max_overall_download_limit: u64,
    pub max_overall_upload_limit: u64,

    // 代理
    pub proxy_enabled: bool,
    pub proxy_host: String,
    pub proxy_port: String,
    pub proxy_user: String,
    pub proxy_pass: String,

    // BT
    pub tracker_servers: String,
    pub bt_port: u16,
    pub dht_port: u16,
    pub upnp_enabled: bool,
    pub bt_save_metadata: bool,
    pub bt_auto_start: bool,
    pub bt_force_encryption: bool,

    /// 显式指定的 aria2c 路径
    pub engine_binary: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            download_path: dirs::download_dir()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
            max_concurrent_downloads: 5,
            max_connection_per_server: 16,
            launch_at_login: false,
            auto_resume_tasks: true,
            notification_enabled: true,
            rpc_port: 16800,
            rpc_secret: String::new(),
            max_overall_download_limit: 0,
            max_overall_upload_limit: 0,
            proxy_enabled: false,
            proxy_host: String::new(),
            proxy_port: String::new(),
            proxy_user: String::new(),
            proxy_pass: String::new(),
            tracker_servers: DEFAULT_TRACKERS.to_string(),
            bt_port: 6881,
            dht_port: 6882,
            upnp_enabled: true,
            bt_save_metadata: false,
            bt_auto_start: true,
            bt_force_encryption: false,
            engine_binary: None,
        }
    }
}

impl Settings {
    /// 读取设置文件；文件不存在时返回默认值
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("设置文件不存在，使用默认设置: {:?}", path);
            return Ok(Self::default());
        }
        let data = std::fs::read(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings =
            serde_json::from_slice(&data).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(settings.normalized())
    }

    /// 读取失败只记录警告，退回默认设置
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("{}，使用默认设置", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// 把并发数和单服务器连接数限制在界面允许的范围内
    pub fn normalized(mut self) -> Self {
        self.max_concurrent_downloads = self.max_concurrent_downloads.clamp(1, 10);
        self.max_connection_per_server = self.max_connection_per_server.clamp(1, 64);
        self
    }

    /// 按行拆分的 tracker 列表，去掉空行
    pub fn trackers(&self) -> Vec<String> {
        self.tracker_servers
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// 逗号拼接的 tracker 列表，没有可用 tracker 时为 None
    pub fn tracker_arg(&self) -> Option<String> {
        let trackers = self.trackers();
        if trackers.is_empty() {
            None
        } else {
            Some(trackers.iter().join(","))
        }
    }

    pub fn secret(&self) -> Option<&str> {
        if self.rpc_secret.is_empty() {
            None
        } else {
            Some(&self.rpc_secret)
        }
    }

    pub fn rpc_endpoint(&self) -> String {
        format!("http://127.0.0.1:{}/jsonrpc", self.rpc_port)
    }
}

/// 命令行对设置文件的覆盖，每次重新读取设置后都要再应用一次
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsOverrides {
    pub rpc_port: Option<u16>,
    pub rpc_secret: Option<String>,
}

impl SettingsOverrides {
    pub fn is_empty(&self) -> bool {
        self.rpc_port.is_none() && self.rpc_secret.is_none()
    }

    pub fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(port) = self.rpc_port {
            settings.rpc_port = port;
        }
        if let Some(secret) = &self.rpc_secret {
            settings.rpc_secret = secret.clone();
        }
        settings
    }
}
