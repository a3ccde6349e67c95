//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use security_sentinel::config::{SentinelConfig, WebhookConfig};

/// Security API key used by `test_config()`.
pub const API_KEY: &str = "test-api-key";

/// One request captured by the mock receiver.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub path: String,
    /// Header names are lowercased.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

/// A webhook receiver on a random local port.
pub struct MockReceiver {
    pub addr: SocketAddr,
    calls: Arc<AtomicU32>,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl MockReceiver {
    pub fn url(&self) -> String {
        format!("http://{}/hook", self.addr)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.captured.lock().unwrap().clone()
    }
}

/// Start a receiver that always answers with `status`.
pub async fn start_receiver(status: u16) -> MockReceiver {
    start_programmable_receiver(move |_| status).await
}

/// Start a receiver whose status is chosen per call (1-based call number).
pub async fn start_programmable_receiver<F>(f: F) -> MockReceiver
where
    F: Fn(u32) -> u16 + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let calls = Arc::new(AtomicU32::new(0));
    let captured = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let (task_calls, task_captured) = (calls.clone(), captured.clone());
    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else { break };
            let f = f.clone();
            let calls = task_calls.clone();
            let captured = task_captured.clone();
            tokio::spawn(async move {
                handle(socket, f, calls, captured).await;
            });
        }
    });

    MockReceiver { addr, calls, captured }
}

async fn handle<F>(
    mut socket: TcpStream,
    f: Arc<F>,
    calls: Arc<AtomicU32>,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
) where
    F: Fn(u32) -> u16 + Send + Sync + 'static,
{
    let Some(request) = read_request(&mut socket).await else { return };

    let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
    captured.lock().unwrap().push(request);

    let status = f(call);
    let status_text = match status {
        200 => "200 OK",
        204 => "204 No Content",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    };
    let response = format!("HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n", status_text);
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
    tokio::time::sleep(Duration::from_millis(10)).await;
}

async fn read_request(socket: &mut TcpStream) -> Option<CapturedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let path = lines.next()?.split_whitespace().nth(1)?.to_string();
    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body = buf[header_end..(header_end + content_length).min(buf.len())].to_vec();
    Some(CapturedRequest { path, headers, body })
}

/// Start a receiver that reads each request and never answers.
///
/// `calls()` counts requests received; connections stay open until the test ends.
pub async fn start_silent_receiver() -> MockReceiver {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let calls = Arc::new(AtomicU32::new(0));
    let captured = Arc::new(Mutex::new(Vec::new()));

    let (task_calls, task_captured) = (calls.clone(), captured.clone());
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else { break };
            let calls = task_calls.clone();
            let captured = task_captured.clone();
            tokio::spawn(async move {
                if let Some(request) = read_request(&mut socket).await {
                    calls.fetch_add(1, Ordering::SeqCst);
                    captured.lock().unwrap().push(request);
                }
                tokio::time::sleep(Duration::from_secs(3600)).await;
                drop(socket);
            });
        }
    });

    MockReceiver { addr, calls, captured }
}

/// A webhook config tuned for fast tests.
pub fn fast_webhook(url: String, secret: &str) -> WebhookConfig {
    let mut config = WebhookConfig::new(url, secret);
    config.retry.backoff_ms = 10;
    config.timeout_ms = 2000;
    config
}

/// Test configuration with background sweeps effectively disabled.
pub fn test_config() -> SentinelConfig {
    let mut config = SentinelConfig::default();
    config.environment = security_sentinel::config::Environment::Test;
    config.observability.metrics_enabled = false;
    config.api.api_key = API_KEY.to_string();
    config
}
