//! HTTP and WebSocket route tests using warp's test client

mod mock_serial;

use mock_serial::{MockPortOpener, MockPortState, wait_for};
use serde_json::Value;
use sketchbrew::config::ServerConfig;
use sketchbrew::server::ServerState;
use sketchbrew::server::routes::create_routes;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const BLINK: &str = "void setup() {}\nvoid loop() {}\n";

struct TestServer {
    _temp_dir: TempDir,
    state: Arc<ServerState>,
    serial: MockPortState,
}

impl TestServer {
    async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    async fn with_config(customize: impl FnOnce(&mut ServerConfig)) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let mut config = ServerConfig {
            data_dir: temp_dir.path().to_path_buf(),
            toolchain_program: temp_dir
                .path()
                .join("missing-arduino-cli")
                .display()
                .to_string(),
            // Nothing listens on the discard port
            ollama_url: "http://127.0.0.1:9".to_string(),
            ai_probe_timeout_secs: 1,
            serial_poll_interval_ms: 2,
            ..ServerConfig::default()
        };
        customize(&mut config);

        let serial = MockPortState::new();
        let state = ServerState::with_port_opener(
            config,
            Arc::new(MockPortOpener::new(serial.clone())),
        )
        .unwrap();
        state.store.init().await.unwrap();

        Self {
            _temp_dir: temp_dir,
            state: Arc::new(state),
            serial,
        }
    }

    async fn request(&self, method: &str, path: &str, form: Option<&str>) -> (u16, Value) {
        let mut request = warp::test::request().method(method).path(path);
        if let Some(body) = form {
            request = request
                .header("content-type", "application/x-www-form-urlencoded")
                .body(body.to_string());
        }

        let response = request.reply(&create_routes(self.state.clone())).await;
        let status = response.status().as_u16();
        let body = serde_json::from_slice(response.body()).unwrap_or(Value::Null);
        (status, body)
    }
}

#[tokio::test]
async fn test_health_reports_server_info() {
    let server = TestServer::new().await;
    let (status, body) = server.request("GET", "/health", None).await;

    assert_eq!(status, 200);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["server"]["open_sessions"], 0);
}

#[tokio::test]
async fn test_board_catalog() {
    let server = TestServer::new().await;
    let (status, body) = server.request("GET", "/api/boards", None).await;

    assert_eq!(status, 200);
    assert_eq!(body["boards"]["arduino:avr:uno"], "Arduino Uno");
    assert_eq!(body["boards"].as_object().unwrap().len(), 6);
}

#[tokio::test]
async fn test_toolchain_status_when_missing() {
    let server = TestServer::new().await;
    let (status, body) = server.request("GET", "/api/toolchain", None).await;

    assert_eq!(status, 200);
    assert_eq!(body["available"], false);
}

#[tokio::test]
async fn test_sketch_crud() {
    let server = TestServer::new().await;

    let (status, body) = server
        .request(
            "POST",
            "/api/sketch/save",
            Some("sketch_name=blink&content=void+setup%28%29+%7B%7D%0D%0A"),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Sketch 'blink.ino' saved successfully");

    let (status, body) = server.request("GET", "/api/sketch/blink.ino", None).await;
    assert_eq!(status, 200);
    assert_eq!(body["name"], "blink.ino");
    assert_eq!(body["content"], "void setup() {}\n");

    let (_, body) = server.request("GET", "/api/sketches", None).await;
    assert_eq!(body["sketches"][0]["name"], "blink.ino");

    let (status, _) = server.request("DELETE", "/api/sketch/blink.ino", None).await;
    assert_eq!(status, 200);

    let (status, body) = server.request("GET", "/api/sketch/blink.ino", None).await;
    assert_eq!(status, 404);
    assert_eq!(body["success"], false);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn test_traversal_name_is_bad_request() {
    let server = TestServer::new().await;
    let (status, body) = server
        .request("GET", "/api/sketch/..%2F..%2Fetc%2Fpasswd", None)
        .await;

    assert_eq!(status, 400);
    assert_eq!(body["kind"], "bad_request");
}

#[tokio::test]
async fn test_default_templates_listed() {
    let server = TestServer::new().await;
    let (status, body) = server.request("GET", "/api/templates", None).await;
    assert_eq!(status, 200);
    assert_eq!(body["templates"].as_array().unwrap().len(), 5);

    let (status, body) = server.request("GET", "/api/template/blink.ino", None).await;
    assert_eq!(status, 200);
    assert!(body["content"].as_str().unwrap().contains("pinMode(13, OUTPUT)"));
}

#[tokio::test]
async fn test_compile_unknown_sketch_is_not_found() {
    let server = TestServer::new().await;
    let (status, body) = server
        .request(
            "POST",
            "/api/compile",
            Some("sketch_name=ghost.ino&board=arduino%3Aavr%3Auno"),
        )
        .await;

    assert_eq!(status, 404);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn test_upload_with_empty_port_is_bad_request() {
    let server = TestServer::new().await;
    server.state.store.write_sketch("blink.ino", BLINK).await.unwrap();

    let (status, body) = server
        .request(
            "POST",
            "/api/upload",
            Some("sketch_name=blink.ino&board=arduino%3Aavr%3Auno&port="),
        )
        .await;

    assert_eq!(status, 400);
    assert_eq!(body["kind"], "bad_request");
}

#[tokio::test]
async fn test_compile_with_missing_toolchain_is_failed_outcome() {
    let server = TestServer::new().await;
    server.state.store.write_sketch("blink.ino", BLINK).await.unwrap();

    let (status, body) = server
        .request(
            "POST",
            "/api/compile",
            Some("sketch_name=blink.ino&board=arduino%3Aavr%3Auno"),
        )
        .await;

    assert_eq!(status, 200);
    assert_eq!(body["success"], false);
    assert_eq!(body["stage"], "compile");
    assert_eq!(body["message"], "Compilation failed");
    assert_eq!(body["exit_status"], 127);
}

#[cfg(unix)]
#[tokio::test]
async fn test_compile_and_upload_with_stub_toolchain() {
    use std::os::unix::fs::PermissionsExt;

    let script_dir = TempDir::new().unwrap();
    let script = script_dir.path().join("arduino-cli");
    std::fs::write(&script, "#!/bin/sh\necho \"$1 done\"\n").unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let server = TestServer::with_config(|config| {
        config.toolchain_program = script.display().to_string();
    })
    .await;
    server.state.store.write_sketch("blink.ino", BLINK).await.unwrap();

    let (status, body) = server
        .request(
            "POST",
            "/api/compile",
            Some("sketch_name=blink.ino&board=arduino%3Aavr%3Auno"),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Compilation successful");
    assert_eq!(body["output"], "compile done\n");
    assert!(body["compile_dir"].as_str().unwrap().contains("compile_blink_"));

    let (status, body) = server
        .request(
            "POST",
            "/api/upload",
            Some("sketch_name=blink.ino&board=arduino%3Aavr%3Auno&port=%2Fdev%2FttyUSB0"),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Upload successful");
    assert_eq!(body["output"], "upload done\n");
}

#[tokio::test]
async fn test_ai_backend_down_is_unavailable() {
    let server = TestServer::new().await;

    let (status, body) = server
        .request("POST", "/api/ai/generate", Some("prompt=blink+an+led"))
        .await;
    assert_eq!(status, 503);
    assert_eq!(body["kind"], "unavailable");

    let (status, _) = server.request("GET", "/api/ai/models", None).await;
    assert_eq!(status, 503);
}

#[tokio::test]
async fn test_root_serves_fallback_page() {
    let server = TestServer::new().await;
    let response = warp::test::request()
        .path("/")
        .reply(&create_routes(server.state.clone()))
        .await;

    assert_eq!(response.status(), 200);
    let html = String::from_utf8_lossy(response.body());
    assert!(html.contains("Arduino Web IDE"));
}

#[tokio::test]
async fn test_serial_websocket_round_trip() {
    let server = TestServer::new().await;
    server.serial.push_incoming(b"hello\r\n");

    let mut client = warp::test::ws()
        .path("/ws/serial/%2Fdev%2FttyMOCK0?baud=115200")
        .handshake(create_routes(server.state.clone()))
        .await
        .expect("handshake");

    let message = tokio::time::timeout(Duration::from_secs(2), client.recv())
        .await
        .expect("timed out waiting for a line")
        .expect("websocket message");
    assert_eq!(message.to_str(), Ok("hello"));

    let session = server
        .state
        .registry()
        .get("/dev/ttyMOCK0")
        .await
        .expect("session registered under the decoded port");
    assert_eq!(session.baud_rate(), 115200);

    client.send_text("SEND:hi").await;
    let serial = server.serial.clone();
    assert!(wait_for(Duration::from_secs(2), || !serial.writes().is_empty()).await);
    assert_eq!(serial.written_bytes(), b"hi\n");
    assert_eq!(serial.writes()[0].baud_rate, 115200);

    drop(client);
    assert!(wait_for(Duration::from_secs(2), || serial.open_handles() == 0).await);
}
