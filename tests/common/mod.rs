//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, Response, StatusCode};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use proxy_gateway::config::{load_from_str, Config, ConfigFormat};
use proxy_gateway::http::request::path_and_query;
use proxy_gateway::lifecycle::{Shutdown, ShutdownOutcome};
use proxy_gateway::routing::{ResolvedTarget, TlsPolicy};
use proxy_gateway::transport::{Transport, TransportError};
use proxy_gateway::HttpServer;

/// Parse a YAML document into a validated config.
pub fn config_from_yaml(yaml: &str) -> Config {
    load_from_str(yaml, ConfigFormat::Yaml).expect("test config must be valid")
}

/// Response a mock backend sends.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
}

impl MockResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }
}

/// Read one HTTP/1.1 request (head plus a Content-Length body) as text.
async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if let Some(head_end) = text.find("\r\n\r\n") {
            let content_length = text[..head_end]
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= head_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        201 => "201 Created",
        302 => "302 Found",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        _ => "200 OK",
    }
}

/// Start a programmable mock backend on an ephemeral port.
///
/// The handler receives the raw request text.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MockResponse> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let request = read_request(&mut socket).await;
                        let response = f(request).await;
                        let mut head = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n",
                            status_text(response.status),
                            response.body.len()
                        );
                        for (name, value) in &response.headers {
                            head.push_str(&format!("{name}: {value}\r\n"));
                        }
                        head.push_str("\r\n");
                        let _ = socket.write_all(head.as_bytes()).await;
                        let _ = socket.write_all(response.body.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });
    addr
}

/// Backend answering every request with `body`.
pub async fn start_mock_backend(body: &'static str) -> SocketAddr {
    start_programmable_backend(move |_| async move { MockResponse::ok(body) }).await
}

/// Backend echoing the raw request it received as the body.
pub async fn start_echo_backend() -> SocketAddr {
    start_programmable_backend(|request| async move { MockResponse::ok(request) }).await
}

/// Backend that reads the request and then never answers.
pub async fn start_hanging_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((mut socket, _)) = listener.accept().await {
            let _ = read_request(&mut socket).await;
            held.push(socket);
        }
    });
    addr
}

/// Backend that switches to `websocket` and then echoes raw bytes.
///
/// Requests without `Upgrade: websocket` get a 400.
pub async fn start_upgrade_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let request = read_request(&mut socket).await.to_lowercase();
                if !request.contains("upgrade: websocket") {
                    let _ = socket
                        .write_all(b"HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                        .await;
                    return;
                }
                let _ = socket
                    .write_all(b"HTTP/1.1 101 Switching Protocols\r\nConnection: Upgrade\r\nUpgrade: websocket\r\n\r\n")
                    .await;
                let mut buf = [0u8; 1024];
                loop {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            if socket.write_all(&buf[..n]).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            });
        }
    });
    addr
}

/// Read a response head byte by byte, leaving anything after it unread.
pub async fn read_response_head(stream: &mut TcpStream) -> String {
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        match stream.read(&mut byte).await {
            Ok(0) | Err(_) => break,
            Ok(_) => head.push(byte[0]),
        }
    }
    String::from_utf8_lossy(&head).into_owned()
}

/// An address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Running gateway under test.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<ShutdownOutcome>,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the outcome.
    pub async fn stop(self) -> ShutdownOutcome {
        self.shutdown.trigger();
        self.handle.await.unwrap()
    }
}

pub async fn spawn_proxy(config: &Config) -> TestProxy {
    spawn_server(HttpServer::new(config).unwrap()).await
}

pub async fn spawn_server(server: HttpServer) -> TestProxy {
    let listener = proxy_gateway::net::listener::bind_addr("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let running = server.run(listener, shutdown.clone());
    let handle = tokio::spawn(async move { running.await.unwrap() });
    TestProxy {
        addr,
        shutdown,
        handle,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

/// What a [`RecordingTransport`] was asked to send.
#[derive(Debug, Clone)]
pub struct Forwarded {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub provider: Option<String>,
    pub tls: TlsPolicy,
}

/// Transport that records requests and answers with a canned response.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    forwarded: Mutex<Vec<Forwarded>>,
    response_headers: Vec<(&'static str, &'static str)>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_response_headers(headers: Vec<(&'static str, &'static str)>) -> Arc<Self> {
        Arc::new(Self {
            forwarded: Mutex::new(Vec::new()),
            response_headers: headers,
        })
    }

    pub fn forwarded(&self) -> Vec<Forwarded> {
        self.forwarded.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.forwarded.lock().unwrap().len()
    }

    pub fn last(&self) -> Forwarded {
        self.forwarded().pop().expect("nothing was forwarded")
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn forward(
        &self,
        request: Request<Body>,
        target: &ResolvedTarget,
    ) -> Result<Response<Body>, TransportError> {
        self.forwarded.lock().unwrap().push(Forwarded {
            method: request.method().clone(),
            url: target.url_for(path_and_query(&request)),
            headers: request.headers().clone(),
            provider: target.provider.clone(),
            tls: target.tls,
        });

        let mut response = Response::builder().status(StatusCode::OK);
        for (name, value) in &self.response_headers {
            response = response.header(*name, *value);
        }
        Ok(response.body(Body::from("upstream")).unwrap())
    }
}

/// Transport whose upstream always answers `101` without a usable stream.
#[derive(Debug, Default)]
pub struct SwitchingTransport;

#[async_trait]
impl Transport for SwitchingTransport {
    async fn forward(
        &self,
        _request: Request<Body>,
        _target: &ResolvedTarget,
    ) -> Result<Response<Body>, TransportError> {
        Ok(Response::builder()
            .status(StatusCode::SWITCHING_PROTOCOLS)
            .header("connection", "upgrade")
            .header("upgrade", "websocket")
            .body(Body::empty())
            .unwrap())
    }
}

/// Transport whose every exchange fails.
#[derive(Debug, Default)]
pub struct FailingTransport;

#[async_trait]
impl Transport for FailingTransport {
    async fn forward(
        &self,
        _request: Request<Body>,
        target: &ResolvedTarget,
    ) -> Result<Response<Body>, TransportError> {
        Err(TransportError::InvalidUrl {
            url: target.to_string(),
            source: url::ParseError::EmptyHost,
        })
    }
}
