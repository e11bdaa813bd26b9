mod common;

use maltex::common::format::{format_bytes, format_speed};
use maltex::config::{ConfigError, DEFAULT_TRACKERS, Settings, SettingsOverrides};

#[test]
fn test_defaults() {
    let settings = Settings::default();
    assert_eq!(settings.max_concurrent_downloads, 5);
    assert_eq!(settings.max_connection_per_server, 16);
    assert_eq!(settings.rpc_port, 16800);
    assert_eq!(settings.bt_port, 6881);
    assert_eq!(settings.dht_port, 6882);
    assert!(settings.notification_enabled);
    assert!(settings.secret().is_none());
    assert_eq!(settings.trackers().len(), DEFAULT_TRACKERS.lines().count());
    assert_eq!(settings.rpc_endpoint(), "http://127.0.0.1:16800/jsonrpc");
}

#[test]
fn test_partial_camel_case_file() {
    let dir = common::temp_dir();
    let path = dir.join("settings.json");
    std::fs::write(
        &path,
        r#"{"rpcPort": 6800, "rpcSecret": "abc", "maxConcurrentDownloads": 99, "maxConnectionPerServer": 0}"#,
    )
    .unwrap();

    let settings = Settings::load(&path).unwrap();
    assert_eq!(settings.rpc_port, 6800);
    assert_eq!(settings.secret(), Some("abc"));
    assert_eq!(settings.max_concurrent_downloads, 10);
    assert_eq!(settings.max_connection_per_server, 1);
    assert_eq!(settings.bt_port, 6881);
    println!("✅ 缺省字段使用默认值，超出范围的值被限制");
}

#[test]
fn test_corrupt_file() {
    let dir = common::temp_dir();
    let path = dir.join("settings.json");
    std::fs::write(&path, "rpcPort = 1").unwrap();

    assert!(matches!(Settings::load(&path), Err(ConfigError::Parse { .. })));
    assert_eq!(Settings::load_or_default(&path), Settings::default());
    assert_eq!(Settings::load(&dir.join("missing.json")).unwrap(), Settings::default());
}

#[test]
fn test_save_round_trip() {
    let dir = common::temp_dir();
    let path = dir.join("nested").join("settings.json");
    let settings = Settings {
        proxy_enabled: true,
        proxy_host: "127.0.0.1".to_string(),
        engine_binary: Some("/opt/aria2c".to_string()),
        ..Settings::default()
    };
    settings.save(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("\"proxyHost\""));
    assert!(text.contains("\"engineBinary\""));
    assert_eq!(Settings::load(&path).unwrap(), settings);
}

#[test]
fn test_tracker_list_and_overrides() {
    let settings = Settings {
        tracker_servers: " udp://a/announce \n\n\nhttp://b/announce".to_string(),
        ..Settings::default()
    };
    assert_eq!(
        settings.tracker_arg().as_deref(),
        Some("udp://a/announce,http://b/announce")
    );
    let empty = Settings {
        tracker_servers: "\n  \n".to_string(),
        ..Settings::default()
    };
    assert!(empty.tracker_arg().is_none());

    let overrides = SettingsOverrides {
        rpc_port: Some(6801),
        rpc_secret: Some("cli".to_string()),
    };
    let applied = overrides.apply(Settings::default());
    assert_eq!(applied.rpc_port, 6801);
    assert_eq!(applied.secret(), Some("cli"));
    assert!(SettingsOverrides::default().is_empty());
}

#[test]
fn test_format_helpers() {
    assert_eq!(format_bytes(0), "0 B");
    assert_eq!(format_bytes(999), "999 B");
    assert_eq!(format_bytes(1000), "1.0 KB");
    assert_eq!(format_bytes(1_500_000), "1.5 MB");
    assert_eq!(format_bytes(3_210_000_000), "3.2 GB");
    assert_eq!(format_speed(2048), "2.0 KB/s");
}
