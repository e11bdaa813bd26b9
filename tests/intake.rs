use std::path::PathBuf;

use maltex::intake::{Intent, classify};
use maltex::notify::CompletionNotice;
use maltex::task::{BittorrentInfo, BittorrentName, Task, TaskFile, TaskStatus};

fn uri(text: &str) -> Option<Intent> {
    Some(Intent::AddUri(vec![text.to_string()]))
}

#[test]
fn test_plain_links() {
    assert_eq!(classify("magnet:?xt=urn:btih:abc"), uri("magnet:?xt=urn:btih:abc"));
    assert_eq!(classify("https://example.com/a.iso"), uri("https://example.com/a.iso"));
    assert_eq!(classify("  ftp://mirror/b.tar.gz  "), uri("ftp://mirror/b.tar.gz"));
    assert_eq!(classify("thunder://QUFodHRw"), uri("thunder://QUFodHRw"));
    assert_eq!(classify("sftp://host/file"), uri("sftp://host/file"));
}

#[test]
fn test_torrent_paths() {
    assert_eq!(
        classify("/tmp/Ubuntu.TORRENT"),
        Some(Intent::AddTorrent(PathBuf::from("/tmp/Ubuntu.TORRENT")))
    );
    assert_eq!(
        classify("file:///home/me/debian.torrent"),
        Some(Intent::AddTorrent(PathBuf::from("/home/me/debian.torrent")))
    );
    assert_eq!(classify("file:///home/me/notes.txt"), None);
}

#[test]
fn test_app_scheme() {
    assert_eq!(
        classify("maltex://new?url=magnet%3A%3Fxt%3Durn%3Abtih%3Aabc"),
        uri("magnet:?xt=urn:btih:abc")
    );
    assert_eq!(
        classify("maltex://https://example.com/c.zip"),
        uri("https://example.com/c.zip")
    );
    assert_eq!(classify("maltex://"), None);
    println!("✅ 自定义协议解析正确");
}

#[test]
fn test_unrecognized_input() {
    assert_eq!(classify(""), None);
    assert_eq!(classify("   "), None);
    assert_eq!(classify("notes.txt"), None);
    assert_eq!(classify("mailto:someone@example.com"), None);
}

#[test]
fn test_completion_notice_body() {
    let mut bt = Task::new("g1", TaskStatus::Complete);
    bt.bittorrent = Some(BittorrentInfo {
        info: Some(BittorrentName {
            name: Some("Big Buck Bunny".to_string()),
        }),
        ..Default::default()
    });
    assert_eq!(CompletionNotice::for_task(&bt).body, "Big Buck Bunny");

    let mut http = Task::new("g2", TaskStatus::Complete);
    http.files.push(TaskFile {
        index: 1,
        path: "/downloads/iso/debian.iso".to_string(),
        length: 10,
        completed_length: 10,
        selected: true,
        uris: vec![],
    });
    let notice = CompletionNotice::for_task(&http);
    assert_eq!(notice.title, "下载完成");
    assert_eq!(notice.body, "debian.iso");

    let bare = Task::new("g3", TaskStatus::Complete);
    assert_eq!(CompletionNotice::for_task(&bare).body, "未知文件");
}
