mod common;

use maltex::store::HistoryStore;
use maltex::task::{Task, TaskStatus};

fn finished(gid: &str) -> Task {
    let mut task = Task::new(gid, TaskStatus::Complete);
    task.total_length = 100;
    task.completed_length = 100;
    task
}

#[test]
fn test_add_is_idempotent() {
    let dir = common::temp_dir();
    let mut history = HistoryStore::new(dir.join("history.json"));

    assert!(history.add(&finished("a1")));
    let mut changed = finished("a1");
    changed.completed_length = 1;
    assert!(!history.add(&changed));

    assert_eq!(history.len(), 1);
    assert_eq!(history.get("a1").unwrap().completed_length, 100);
    println!("✅ 重复 gid 不会改变历史记录");
}

#[test]
fn test_live_status_archived_as_removed() {
    let dir = common::temp_dir();
    let mut history = HistoryStore::new(dir.join("history.json"));

    history.add(&Task::new("p1", TaskStatus::Paused));
    history.add(&Task::new("w1", TaskStatus::Waiting));
    history.add(&Task::new("e1", TaskStatus::Error));
    history.add(&finished("c1"));

    assert_eq!(history.get("p1").unwrap().status, TaskStatus::Removed);
    assert_eq!(history.get("w1").unwrap().status, TaskStatus::Removed);
    assert_eq!(history.get("e1").unwrap().status, TaskStatus::Error);
    assert_eq!(history.get("c1").unwrap().status, TaskStatus::Complete);

    // 新记录在最前
    assert_eq!(history.entries()[0].gid, "c1");
}

#[test]
fn test_remove_and_reload() {
    let dir = common::temp_dir();
    let path = dir.join("history.json");
    let mut history = HistoryStore::new(&path);
    history.add(&finished("a1"));
    history.add(&finished("b2"));

    assert_eq!(history.remove("a1"), 1);
    assert_eq!(history.remove("a1"), 0);

    let reloaded = HistoryStore::open(&path);
    assert_eq!(reloaded.entries(), history.entries());
    assert!(!reloaded.contains("a1"));
    assert!(reloaded.contains("b2"));
    println!("✅ 删除后写盘，重新加载结果一致");
}

#[test]
fn test_round_trip_keeps_fields() {
    let dir = common::temp_dir();
    let path = dir.join("history.json");
    let mut history = HistoryStore::new(&path);

    let mut task = finished("bt01");
    task.info_hash = Some("abcdef".to_string());
    task.num_seeders = Some(3);
    task.dir = "/data".to_string();
    history.add(&task);
    history.add(&Task::new("err9", TaskStatus::Error));

    let reloaded = HistoryStore::open(&path);
    assert_eq!(reloaded.len(), 2);
    assert_eq!(reloaded.get("bt01"), Some(&task));
}

#[test]
fn test_missing_or_corrupt_file_loads_empty() {
    let dir = common::temp_dir();

    let missing = HistoryStore::open(dir.join("nope.json"));
    assert!(missing.is_empty());

    let path = dir.join("broken.json");
    std::fs::write(&path, "{not json").unwrap();
    let corrupt = HistoryStore::open(&path);
    assert!(corrupt.is_empty());
    println!("✅ 历史文件缺失或损坏时按首次运行处理");
}

#[test]
fn test_duplicate_gids_on_disk_keep_first() {
    let dir = common::temp_dir();
    let path = dir.join("history.json");
    let mut first = finished("dup");
    first.completed_length = 7;
    let second = finished("dup");
    std::fs::write(&path, serde_json::to_vec(&vec![first, second]).unwrap()).unwrap();

    let history = HistoryStore::open(&path);
    assert_eq!(history.len(), 1);
    assert_eq!(history.get("dup").unwrap().completed_length, 7);
}
