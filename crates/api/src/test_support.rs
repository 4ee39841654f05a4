//! Helpers for route tests: in-memory storage, session tokens and a local
//! HTTP server for remote image imports.

use std::sync::Arc;

use axum::body::Body;
use axum::http::Response;
use http_body_util::BodyExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use kiroku_core::profile::spawn_cleanup_worker;
use kiroku_core::storage::{OpendalBackend, StoragePrefix, StorageRegistry, StorageSettings};
use kiroku_shared::{JwtConfig, JwtService, UploadConfig};

use crate::{AppState, ImageFetcher};

pub const TEST_SECRET: &str = "route-test-secret";

/// State over OpenDAL's memory service. Must run inside a tokio runtime.
pub fn test_state() -> AppState {
    let settings = Arc::new(StorageSettings::minio(
        "http://127.0.0.1:9000",
        "app",
        "minioadmin",
        "minioadmin",
        None,
    ));
    let backend = Arc::new(OpendalBackend::in_memory().unwrap());
    let registry = Arc::new(StorageRegistry::new(settings, backend));
    let (cleanup, _worker) = spawn_cleanup_worker(registry.get(StoragePrefix::Avatars).clone());

    AppState::new(
        JwtService::new(&JwtConfig {
            secret: TEST_SECRET.to_string(),
        }),
        registry,
        cleanup,
        ImageFetcher::allowing_private_hosts().unwrap(),
        &UploadConfig::default(),
    )
}

/// Bearer header value for `user_id`.
pub fn bearer(state: &AppState, user_id: &str) -> String {
    let token = state
        .jwt_service
        .issue_token(user_id, chrono::Duration::minutes(5))
        .unwrap();
    format!("Bearer {token}")
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Serve `response` verbatim to every connection on a loopback port.
/// Returns an image URL on that server.
pub async fn serve(response: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let response = Arc::new(response);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let response = Arc::clone(&response);
            tokio::spawn(async move {
                let mut request = [0u8; 4096];
                let _ = socket.read(&mut request).await;
                // The client may hang up early on oversized bodies.
                let _ = socket.write_all(&response).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{addr}/avatar.png")
}

/// Response with a `Content-Length` matching `body`.
pub fn http_response(status: &str, content_type: &str, body: &[u8]) -> Vec<u8> {
    let mut response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    )
    .into_bytes();
    response.extend_from_slice(body);
    response
}

/// Chunked response of `size` bytes with no `Content-Length`.
pub fn chunked_response(content_type: &str, size: usize) -> Vec<u8> {
    const CHUNK: usize = 64 * 1024;

    let mut response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {content_type}\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n"
    )
    .into_bytes();

    let mut remaining = size;
    while remaining > 0 {
        let len = remaining.min(CHUNK);
        response.extend_from_slice(format!("{len:x}\r\n").as_bytes());
        response.extend(std::iter::repeat_n(b'x', len));
        response.extend_from_slice(b"\r\n");
        remaining -= len;
    }
    response.extend_from_slice(b"0\r\n\r\n");
    response
}
