use std::path::PathBuf;

use url::Url;

/// 自定义协议前缀，例如 `maltex://new?url=magnet:...`
pub const APP_SCHEME: &str = "maltex";

const URI_SCHEMES: [&str; 6] = ["magnet:", "thunder:", "http://", "https://", "ftp://", "sftp://"];

/// 外部输入（命令行参数、协议唤起）解析出的操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    AddUri(Vec<String>),
    AddTorrent(PathBuf),
}

/// 识别一条外部输入；无法识别时返回 None
pub fn classify(input: &str) -> Option<Intent> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let lower = input.to_ascii_lowercase();

    if lower.starts_with("file://") {
        let path = Url::parse(input).ok()?.to_file_path().ok()?;
        let is_torrent = is_torrent_path(&path.to_string_lossy());
        return is_torrent.then_some(Intent::AddTorrent(path));
    }

    if lower.starts_with(&format!("{}:", APP_SCHEME)) {
        return from_app_scheme(input);
    }

    if URI_SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) {
        return Some(Intent::AddUri(vec![input.to_string()]));
    }

    if is_torrent_path(input) {
        return Some(Intent::AddTorrent(PathBuf::from(input)));
    }

    None
}

fn from_app_scheme(input: &str) -> Option<Intent> {
    let target = Url::parse(input)
        .ok()
        .and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key == "url")
                .map(|(_, value)| value.into_owned())
        })
        .unwrap_or_else(|| {
            let rest = &input[APP_SCHEME.len() + 1..];
            rest.trim_start_matches('/').to_string()
        });

    let target = target.trim();
    if target.is_empty() {
        return None;
    }
    if is_torrent_path(target) && !target.contains("://") {
        return Some(Intent::AddTorrent(PathBuf::from(target)));
    }
    Some(Intent::AddUri(vec![target.to_string()]))
}

fn is_torrent_path(text: &str) -> bool {
    text.to_ascii_lowercase().ends_with(".torrent")
}

