use std::path::{Path, PathBuf};

pub const APP_DIR_NAME: &str = "Maltex";

/// 应用数据目录及其下的各个文件
#[derive(Debug, Clone)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// 平台数据目录下的 Maltex 子目录，取不到时退回当前目录
    pub fn platform_default() -> Self {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join(APP_DIR_NAME))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn history_file(&self) -> PathBuf {
        self.root.join("history.json")
    }

    pub fn session_file(&self) -> PathBuf {
        self.root.join("download.session")
    }

    pub fn engine_log(&self) -> PathBuf {
        self.root.join("aria2.log")
    }

    pub fn engine_stderr(&self) -> PathBuf {
        self.root.join("aria2_stderr.log")
    }

    pub fn app_log(&self) -> PathBuf {
        self.root.join("maltex.log")
    }

    pub fn settings_file(&self) -> PathBuf {
        self.root.join("settings.json")
    }
}
