use std::path::Path;

use crate::common::paths::DataPaths;
use crate::config::Settings;

/// 会话文件存在且非空时才作为 --input-file 传入
pub fn session_has_content(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.len() > 0)
        .unwrap_or(false)
}

/// 由设置生成 aria2c 启动参数。输出只取决于输入，顺序固定。
pub fn build_engine_args(settings: &Settings, paths: &DataPaths, resume_session: bool) -> Vec<String> {
    let dir = if settings.download_path.is_empty() {
        "/tmp"
    } else {
        settings.download_path.as_str()
    };
    let session = paths.session_file();

    let mut args = vec![
        "--enable-rpc".to_string(),
        "--rpc-listen-all=false".to_string(),
        format!("--rpc-listen-port={}", settings.rpc_port),
        "--rpc-allow-origin-all=true".to_string(),
        format!("--dir={}", dir),
        format!("--log={}", paths.engine_log().display()),
        "--log-level=notice".to_string(),
        format!("--max-concurrent-downloads={}", settings.max_concurrent_downloads),
        format!("--max-connection-per-server={}", settings.max_connection_per_server),
        format!("--split={}", settings.max_connection_per_server),
        "--disable-ipv6=true".to_string(),
        format!("--listen-port={}", settings.bt_port),
        format!("--dht-listen-port={}", settings.dht_port),
        format!("--bt-save-metadata={}", settings.bt_save_metadata),
    ];

    if resume_session {
        args.push(format!("--input-file={}", session.display()));
    }
    args.push(format!("--save-session={}", session.display()));

    if let Some(trackers) = settings.tracker_arg() {
        args.push(format!("--bt-tracker={}", trackers));
    }
    if settings.bt_force_encryption {
        args.push("--bt-force-encryption=true".to_string());
    }
    if let Some(secret) = settings.secret() {
        args.push(format!("--rpc-secret={}", secret));
    }
    if settings.max_overall_download_limit > 0 {
        args.push(format!(
            "--max-overall-download-limit={}K",
            settings.max_overall_download_limit
        ));
    }
    if settings.max_overall_upload_limit > 0 {
        args.push(format!(
            "--max-overall-upload-limit={}K",
            settings.max_overall_upload_limit
        ));
    }
    if settings.proxy_enabled && !settings.proxy_host.is_empty() {
        args.push(format!(
            "--all-proxy={}:{}",
            settings.proxy_host, settings.proxy_port
        ));
        if !settings.proxy_user.is_empty() {
            args.push(format!("--all-proxy-user={}", settings.proxy_user));
            args.push(format!("--all-proxy-passwd={}", settings.proxy_pass));
        }
    }

    args
}

/// 写日志用，隐藏密钥和代理密码
pub fn mask_secrets(args: &[String]) -> Vec<String> {
    args.iter()
        .map(|arg| {
            for prefix in ["--rpc-secret=", "--all-proxy-passwd="] {
                if arg.starts_with(prefix) {
                    return format!("{}******", prefix);
                }
            }
            arg.clone()
        })
        .collect()
}
