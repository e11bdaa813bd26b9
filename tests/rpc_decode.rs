mod common;

use common::{Reply, ScriptedTransport, task_json};
use serde_json::json;

use maltex::rpc::{HttpTransport, RpcClient, RpcMethod, RpcReply};
use maltex::task::TaskStatus;
use std::sync::Arc;

#[test]
fn test_decode_bulk_with_string_numbers() {
    let body = json!({
        "id": "1",
        "jsonrpc": "2.0",
        "result": [task_json("2089b05ecca3d829", "active", 50, 100)]
    });
    let reply = RpcReply::decode(&serde_json::to_vec(&body).unwrap());

    let RpcReply::Bulk(tasks) = reply else {
        panic!("应解码为任务列表: {:?}", reply);
    };
    assert_eq!(tasks.len(), 1);
    let task = &tasks[0];
    assert_eq!(task.status, TaskStatus::Active);
    assert_eq!(task.completed_length, 50);
    assert_eq!(task.total_length, 100);
    assert!(task.files[0].selected);
    assert_eq!(task.display_name(), "2089b05ecca3d829.iso");
    println!("✅ 字符串数字正确解析");
}

#[test]
fn test_decode_shapes_in_priority_order() {
    assert_eq!(
        RpcReply::decode(br#"{"id":"1","jsonrpc":"2.0","result":[]}"#),
        RpcReply::Bulk(vec![])
    );
    assert_eq!(
        RpcReply::decode(br#"{"id":"1","jsonrpc":"2.0","result":"d3a1b2c4e5f60718"}"#),
        RpcReply::Scalar("d3a1b2c4e5f60718".to_string())
    );

    let fault = RpcReply::decode(
        br#"{"id":"1","jsonrpc":"2.0","error":{"code":1,"message":"GID 0 is not found"}}"#,
    );
    match fault {
        RpcReply::Fault(f) => {
            assert_eq!(f.code, 1);
            assert_eq!(f.message, "GID 0 is not found");
        }
        other => panic!("应解码为错误: {:?}", other),
    }

    assert!(RpcReply::decode(br#"{"id":"1","jsonrpc":"2.0","result":"OK"}"#).is_ok_ack());
}

#[test]
fn test_decode_unrecognized() {
    assert_eq!(RpcReply::decode(b""), RpcReply::Unrecognized);
    assert_eq!(RpcReply::decode(b"<html>"), RpcReply::Unrecognized);
    assert_eq!(RpcReply::decode(br#"{"id":"1"}"#), RpcReply::Unrecognized);
    assert_eq!(
        RpcReply::decode(br#"{"id":"1","result":{"status":"active"}}"#),
        RpcReply::Unrecognized
    );
}

#[tokio::test]
async fn test_client_prepends_secret_token() {
    let transport = ScriptedTransport::new();
    transport.set_default("aria2.pause", Reply::Result(json!("g1")));
    let client = RpcClient::new(transport.clone(), Some("s3cret".to_string()));

    let reply = client.call_gid(RpcMethod::Pause, "g1").await.unwrap();
    assert_eq!(reply, RpcReply::Scalar("g1".to_string()));

    let calls = transport.calls_to("aria2.pause");
    assert_eq!(calls[0].params, vec![json!("token:s3cret"), json!("g1")]);
}

#[tokio::test]
async fn test_client_paged_queries_without_secret() {
    let transport = ScriptedTransport::with_empty_engine();
    let client = RpcClient::new(transport.clone(), Some(String::new()));

    client.tell_waiting().await.unwrap();
    client.tell_stopped().await.unwrap();
    client.tell_active().await.unwrap();

    assert_eq!(transport.calls_to("aria2.tellWaiting")[0].params, vec![json!(0), json!(100)]);
    assert_eq!(transport.calls_to("aria2.tellStopped")[0].params, vec![json!(0), json!(100)]);
    assert!(transport.calls_to("aria2.tellActive")[0].params.is_empty());
}

#[tokio::test]
async fn test_transport_failure_is_an_error() {
    let transport = ScriptedTransport::new();
    let client = RpcClient::new(transport.clone(), None);
    assert!(client.tell_active().await.is_err());

    // 本机没有监听的端口
    let http = HttpTransport::new("http://127.0.0.1:9/jsonrpc").unwrap();
    let client = RpcClient::new(Arc::new(http), None);
    let result = client.tell_active().await;
    println!("连接失败: {:?}", result);
    assert!(result.is_err());
}
