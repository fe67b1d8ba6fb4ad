//! Integration tests for the `arena-pulse serve` HTTP API.
//!
//! Each test starts the server as a child process on a unique port,
//! makes HTTP requests, and verifies the responses. Generation points at a
//! closed local port, so every prediction is the fallback record.

use std::io::Read;
use std::net::TcpStream;
use std::process::{Child, Command};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

/// Atomic port counter to avoid port conflicts between parallel tests.
/// Base port is derived from process ID so parallel test binaries don't
/// collide on the same port range.
static NEXT_PORT: AtomicU16 = AtomicU16::new(0);
static PORT_INIT: std::sync::Once = std::sync::Once::new();

fn next_port() -> u16 {
    PORT_INIT.call_once(|| {
        let base = 20000 + (std::process::id() as u16 % 20000);
        NEXT_PORT.store(base, Ordering::SeqCst);
    });
    NEXT_PORT.fetch_add(1, Ordering::SeqCst)
}

/// Kills the server when the test ends, pass or fail.
struct Server(Child);

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

/// Helper: start `arena-pulse serve` on the given port.
fn start_server(port: u16) -> Server {
    let dir = std::env::temp_dir();
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_arena-pulse"));
    cmd.current_dir(dir);
    cmd.env("ANTHROPIC_API_KEY", "test-key");
    cmd.env_remove("RUST_LOG");
    cmd.args([
        "serve",
        "--port",
        &port.to_string(),
        "--base-url",
        "http://127.0.0.1:9",
        "--timeout-secs",
        "5",
    ]);
    // Redirect stdout/stderr to avoid blocking
    cmd.stdout(std::process::Stdio::null());
    cmd.stderr(std::process::Stdio::null());

    let child = cmd.spawn().expect("failed to start arena-pulse serve");
    // Wait for server to be ready by polling the port
    for _ in 0..50 {
        if TcpStream::connect(format!("127.0.0.1:{}", port)).is_ok() {
            break;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    Server(child)
}

/// Helper: make a simple HTTP GET request and return (status, body).
fn http_get(port: u16, path: &str) -> (u16, String) {
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: localhost:{}\r\nConnection: close\r\n\r\n",
        path, port
    );
    send(port, &request)
}

/// Helper: make a simple HTTP POST request and return (status, body).
fn http_post(port: u16, path: &str, body: &str) -> (u16, String) {
    let request = format!(
        "POST {} HTTP/1.1\r\nHost: localhost:{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        path, port, body.len(), body
    );
    send(port, &request)
}

fn send(port: u16, request: &str) -> (u16, String) {
    let mut stream = TcpStream::connect(format!("127.0.0.1:{}", port)).expect("failed to connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(15)))
        .unwrap();
    std::io::Write::write_all(&mut stream, request.as_bytes()).expect("failed to write");

    let mut response = String::new();
    let _ = stream.read_to_string(&mut response);
    parse_http_response(&response)
}

/// Parse an HTTP response into (status_code, body).
fn parse_http_response(response: &str) -> (u16, String) {
    let status = response
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse().ok())
        .unwrap_or(0);
    let raw_body = response
        .split_once("\r\n\r\n")
        .map(|(_, b)| b)
        .unwrap_or("");
    (status, dechunk(raw_body))
}

/// Decode a chunked body; plain bodies pass through.
fn dechunk(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return trimmed.to_string();
    }
    let mut out = String::new();
    let mut rest = body;
    while let Some((size_line, after)) = rest.split_once("\r\n") {
        let size = usize::from_str_radix(size_line.trim(), 16).unwrap_or(0);
        if size == 0 || after.len() < size {
            break;
        }
        out.push_str(&after[..size]);
        rest = after[size..].trim_start_matches("\r\n");
    }
    out
}

const FOOTBALL: &str = r#"{"eventType":"football match","attendanceEstimate":65000,"timeWindowMinutes":30,"predictionKind":"crowd_flow"}"#;

#[test]
fn health_returns_ok_and_version() {
    let port = next_port();
    let _server = start_server(port);

    let (status, body) = http_get(port, "/health");
    assert_eq!(status, 200);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn unknown_route_is_json_404() {
    let port = next_port();
    let _server = start_server(port);

    let (status, body) = http_get(port, "/nowhere");
    assert_eq!(status, 404);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["error"], "not found");
}

#[test]
fn prediction_falls_back_with_200() {
    let port = next_port();
    let _server = start_server(port);

    let (status, body) = http_post(port, "/predictions", FOOTBALL);
    assert_eq!(status, 200, "body: {}", body);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["title"], "crowd_flow Prediction");
    assert_eq!(json["displayTime"], "30 min");
    assert_eq!(json["accuracyPercent"], 85.0);
    assert!(!json["id"].as_str().unwrap().is_empty());
}

#[test]
fn prediction_ids_differ_between_calls() {
    let port = next_port();
    let _server = start_server(port);

    let (_, first) = http_post(port, "/predictions", FOOTBALL);
    let (_, second) = http_post(port, "/predictions", FOOTBALL);
    let first: serde_json::Value = serde_json::from_str(&first).unwrap();
    let second: serde_json::Value = serde_json::from_str(&second).unwrap();
    assert_ne!(first["id"], second["id"]);
}

#[test]
fn invalid_bodies_are_rejected_with_400() {
    let port = next_port();
    let _server = start_server(port);

    let (status, body) = http_post(port, "/predictions", "{not json");
    assert_eq!(status, 400);
    assert!(body.contains("invalid JSON"), "body: {}", body);

    let (status, body) = http_post(
        port,
        "/predictions",
        r#"{"eventType":"concert","attendanceEstimate":-5,"timeWindowMinutes":10,"predictionKind":"parking"}"#,
    );
    assert_eq!(status, 400);
    assert!(body.contains("invalid request"), "body: {}", body);

    let (status, _) = http_post(
        port,
        "/predictions",
        r#"{"eventType":"concert","attendanceEstimate":5,"timeWindowMinutes":10,"predictionKind":"parking","extra":true}"#,
    );
    assert_eq!(status, 400);
}

#[test]
fn prediction_accepts_optional_context_fields() {
    let port = next_port();
    let _server = start_server(port);

    let (status, body) = http_post(
        port,
        "/predictions",
        r#"{"eventType":"concert","attendanceEstimate":18000,"timeWindowMinutes":90,"predictionKind":"parking","weatherCondition":"heavy rain","specialCircumstances":"road closure on the north side"}"#,
    );
    assert_eq!(status, 200, "body: {}", body);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["title"], "parking Prediction");
    assert_eq!(json["displayTime"], "90 min");
}

#[cfg(unix)]
#[test]
fn interrupt_shuts_down_cleanly() {
    let port = next_port();
    let mut server = start_server(port);

    let (status, _) = http_post(port, "/predictions", FOOTBALL);
    assert_eq!(status, 200);

    let sent = Command::new("kill")
        .args(["-INT", &server.0.id().to_string()])
        .status()
        .expect("failed to run kill");
    assert!(sent.success());

    let mut exited = None;
    for _ in 0..50 {
        if let Some(status) = server.0.try_wait().unwrap() {
            exited = Some(status);
            break;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    let exited = exited.expect("server did not exit after SIGINT");
    assert!(exited.success(), "exit status: {:?}", exited);
}
