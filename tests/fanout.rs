//! End-to-end delivery over real sinks
//!
//! - UDP and file enabled together receive identical payloads
//! - Each record kind lands as one NDJSON line with its fields

use std::fs;
use std::net::UdpSocket;
use std::time::Duration;

use bucker_logstash::{AccessRecord, DatagramConfig, Emitter, EmitterConfig};
use chrono::{TimeZone, Utc};
use serde_json::{Value, json};
use tempfile::TempDir;

fn receiver() -> (UdpSocket, u16) {
    let socket = UdpSocket::bind("127.0.0.1:0").expect("bind receiver");
    socket.set_read_timeout(Some(Duration::from_secs(2))).expect("timeout");
    let port = socket.local_addr().expect("addr").port();
    (socket, port)
}

fn read_lines(path: &std::path::Path) -> Vec<Value> {
    fs::read_to_string(path)
        .expect("read log file")
        .lines()
        .map(|line| serde_json::from_str(line).expect("line is JSON"))
        .collect()
}

#[test]
fn test_udp_and_file_receive_identical_payload() {
    let (socket, port) = receiver();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("logs").join("events.log");

    let config = EmitterConfig::default()
        .with_name("api")
        .with_udp(DatagramConfig { port })
        .with_file(&path);
    let mut emitter = Emitter::new(config).expect("build emitter");

    let time = Utc.with_ymd_and_hms(2026, 5, 4, 10, 0, 0).unwrap();
    emitter.log(time, "info", Some("auth"), "ok", &["x"]).expect("log");

    let mut buf = [0u8; 65536];
    let (len, _) = socket.recv_from(&mut buf).expect("one datagram");
    let datagram = std::str::from_utf8(&buf[..len]).expect("utf-8").to_string();

    let content = fs::read_to_string(&path).expect("read");
    assert_eq!(content, format!("{}\n", datagram));

    // no second datagram
    socket.set_read_timeout(Some(Duration::from_millis(200))).unwrap();
    assert!(socket.recv_from(&mut buf).is_err());

    let event: Value = serde_json::from_str(&datagram).unwrap();
    assert_eq!(event["@version"], json!(1));
    assert_eq!(event["@timestamp"], json!("2026-05-04T10:00:00.000Z"));
    assert_eq!(event["type"], json!("bucker"));
    assert_eq!(event["level"], json!("INFO"));
    assert_eq!(event["module"], json!("auth"));
}

#[test]
fn test_every_record_kind_appends_one_line() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("events.log");

    let mut config = EmitterConfig::default().with_name("worker").with_file(&path);
    config.source_host = Some("box-7".to_string());
    config.default_packet.insert("env".to_string(), json!("staging"));
    let mut emitter = Emitter::new(config).expect("build emitter");

    let time = Utc.with_ymd_and_hms(2026, 5, 4, 10, 0, 0).unwrap();
    emitter.log(time, "debug", None, json!({"job": 12}), &[]).unwrap();
    emitter
        .access(None, &AccessRecord::new(time, "GET", "/x", 200), &["edge"])
        .unwrap();
    emitter.exception(time, Some("jobs"), "Error: boom\n  at run", &[]).unwrap();
    emitter.stat(time, Some("m"), "latency", "ms", 42, &[]).unwrap();

    let lines = read_lines(&path);
    assert_eq!(lines.len(), 4);
    for line in &lines {
        assert_eq!(line["env"], json!("staging"));
        assert_eq!(line["source_host"], json!("box-7"));
        assert!(line["type"].as_str().is_some_and(|t| !t.is_empty()));
    }

    assert_eq!(lines[0]["message"], json!({"job": 12}));
    assert_eq!(lines[0]["source"], json!("worker"));

    assert_eq!(lines[1]["type"], json!("bucker_access"));
    assert_eq!(lines[1]["message"], json!("GET /x 200"));
    assert_eq!(lines[1]["tags"], json!(["edge"]));

    assert_eq!(lines[2]["stack"], json!(["Error: boom", "  at run"]));
    assert_eq!(lines[2]["level"], json!("EXCEPTION"));

    assert_eq!(lines[3]["type"], json!("ms"));
    assert_eq!(lines[3]["message"], json!("latency(ms): 42"));
}

#[test]
fn test_reopen_appends_after_existing_lines() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("events.log");
    let config = EmitterConfig::default().with_file(&path);

    let time = Utc::now();
    Emitter::new(config.clone()).unwrap().log(time, "info", None, "first", &[]).unwrap();
    Emitter::new(config).unwrap().log(time, "info", None, "second", &[]).unwrap();

    let messages: Vec<Value> = read_lines(&path).into_iter().map(|l| l["message"].clone()).collect();
    assert_eq!(messages, vec![json!("first"), json!("second")]);
}
