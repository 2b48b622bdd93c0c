//! Shared utilities for integration tests.

#![allow(dead_code)]

use admission_gateway::config::SecuritySettings;
use admission_gateway::security::clock::{Clock, ManualClock};
use admission_gateway::security::rate_limit::RateLimiter;
use admission_gateway::security::store::InMemoryStore;
use admission_gateway::security::AdmissionControl;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing_subscriber::fmt::MakeWriter;

pub const ALLOWED_ORIGIN: &str = "https://app.example.com";
pub const API_KEY: &str = "usk_test_key";
pub const INTERNAL_SECRET: &str = "s3cr3t-internal-value";

/// Settings as they would be read from the environment.
pub fn settings(pairs: &[(&str, &str)]) -> SecuritySettings {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    SecuritySettings::from_lookup(move |name: &str| map.get(name).cloned())
}

/// A production-like deployment with every secret configured.
pub fn configured_settings() -> SecuritySettings {
    settings(&[
        ("ALLOWED_ORIGINS", ALLOWED_ORIGIN),
        ("PUBLIC_API_KEY", API_KEY),
        ("INTERNAL_API_SECRET", INTERNAL_SECRET),
        ("APP_ENV", "production"),
        ("PUBLIC_BASE_URL", "https://example.com"),
    ])
}

pub fn manual_clock() -> Arc<ManualClock> {
    let start: DateTime<Utc> = DateTime::parse_from_rfc3339("2026-10-18T09:30:00Z")
        .unwrap()
        .with_timezone(&Utc);
    Arc::new(ManualClock::new(start))
}

/// Built-in profiles over a fresh in-memory store.
pub fn control(settings: SecuritySettings, clock: Arc<dyn Clock>) -> Arc<AdmissionControl> {
    let store = Arc::new(InMemoryStore::new(clock.clone()));
    Arc::new(AdmissionControl::with_builtin_profiles(
        Arc::new(settings),
        RateLimiter::new(store, clock),
    ))
}

/// Start a mock upstream on an ephemeral port. It answers every request with
/// 200 and echoes the request head (lower-cased) as the body.
pub async fn start_mock_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                loop {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            head.extend_from_slice(&buf[..n]);
                            if head.windows(4).any(|w| w == b"\r\n\r\n") {
                                break;
                            }
                        }
                    }
                }

                let body = String::from_utf8_lossy(&head).to_lowercase();
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Log sink for asserting on emitted events.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Install a thread-local subscriber writing to the returned sink.
pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}
