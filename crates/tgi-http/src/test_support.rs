//! In-process fakes shared by the handler tests.

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request},
    response::Response,
};

use tgi_core::{
    config::Config,
    domain::AccountCredentials,
    lifecycle::SessionManager,
    protocol::{ProtocolError, ProtocolResult, TelegramClient, TelegramConnector},
    store::EnvFileStore,
    Result,
};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    task::JoinHandle,
};

use crate::router::AppState;

pub const PROVISIONED: &str = "# accounts\n\
0917598103_api_id=12345678\n\
0917598103_api_hash=abcdef\n\
0917598103_phone_number=+66917598103\n\
API_BEARER_TOKEN=secret\n";

#[derive(Default)]
pub struct FakeNetwork {
    accepted_code: String,
    refuse_connect: bool,
    builds: AtomicUsize,
    issued_hashes: Mutex<Vec<String>>,
    add_errors: Mutex<HashMap<String, ProtocolError>>,
    added: Mutex<Vec<(String, String)>>,
}

impl FakeNetwork {
    pub fn accepting(code: &str) -> Arc<Self> {
        Arc::new(Self {
            accepted_code: code.to_string(),
            ..Default::default()
        })
    }

    pub fn refusing() -> Arc<Self> {
        Arc::new(Self {
            refuse_connect: true,
            ..Default::default()
        })
    }

    pub fn fail_add(&self, user: &str, err: ProtocolError) {
        self.add_errors
            .lock()
            .unwrap()
            .insert(user.to_string(), err);
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    pub fn added(&self) -> Vec<(String, String)> {
        self.added.lock().unwrap().clone()
    }
}

struct FakeClient {
    net: Arc<FakeNetwork>,
    connected: AtomicBool,
    signed_in: AtomicBool,
}

#[async_trait]
impl TelegramClient for FakeClient {
    async fn connect(&self) -> ProtocolResult<()> {
        if self.net.refuse_connect {
            return Err(ProtocolError::Transport("connection refused".to_string()));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> ProtocolResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send_code(&self, _phone: &str) -> ProtocolResult<String> {
        let mut hashes = self.net.issued_hashes.lock().unwrap();
        let hash = format!("hash-{}", hashes.len() + 1);
        hashes.push(hash.clone());
        Ok(hash)
    }

    async fn sign_in(&self, _phone: &str, code_hash: &str, code: &str) -> ProtocolResult<()> {
        if !self.is_connected() {
            return Err(ProtocolError::NotConnected);
        }
        let known = self
            .net
            .issued_hashes
            .lock()
            .unwrap()
            .iter()
            .any(|h| h == code_hash);
        if !known || code != self.net.accepted_code {
            return Err(ProtocolError::InvalidCode("PHONE_CODE_INVALID".to_string()));
        }
        self.signed_in.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn export_session(&self) -> ProtocolResult<String> {
        if !self.signed_in.load(Ordering::SeqCst) {
            return Err(ProtocolError::NotConnected);
        }
        Ok("session-token-1".to_string())
    }

    async fn add_member(&self, chat: &str, user: &str) -> ProtocolResult<()> {
        if let Some(err) = self.net.add_errors.lock().unwrap().get(user) {
            return Err(err.clone());
        }
        self.net
            .added
            .lock()
            .unwrap()
            .push((chat.to_string(), user.to_string()));
        Ok(())
    }
}

struct FakeConnector(Arc<FakeNetwork>);

impl TelegramConnector for FakeConnector {
    fn build(
        &self,
        _account: &AccountCredentials,
        _session: Option<&str>,
    ) -> Result<Box<dyn TelegramClient>> {
        self.0.builds.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeClient {
            net: self.0.clone(),
            connected: AtomicBool::new(false),
            signed_in: AtomicBool::new(false),
        }))
    }
}

fn tmp_path(prefix: &str, ext: &str) -> PathBuf {
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_nanos();
    let pid = std::process::id();
    PathBuf::from(format!("/tmp/{prefix}-{pid}-{ts}.{ext}"))
}

/// App state over a fresh env file holding `contents`. Returns the file path
/// so the test can remove it.
pub fn test_state(prefix: &str, contents: &str, net: Arc<FakeNetwork>) -> (AppState, PathBuf) {
    build_state(prefix, contents, net, None)
}

pub fn test_state_with_token(
    prefix: &str,
    contents: &str,
    net: Arc<FakeNetwork>,
    token: &str,
) -> (AppState, PathBuf) {
    build_state(prefix, contents, net, Some(token.to_string()))
}

fn build_state(
    prefix: &str,
    contents: &str,
    net: Arc<FakeNetwork>,
    token: Option<String>,
) -> (AppState, PathBuf) {
    let env_file = tmp_path(prefix, "env");
    std::fs::write(&env_file, contents).unwrap();

    let cfg = Config {
        env_file: env_file.clone(),
        host: "127.0.0.1".to_string(),
        port: 0,
        api_bearer_token: token,
        invite_delay: Duration::ZERO,
        code_webhook_url: None,
        code_webhook_timeout: Duration::from_secs(1),
        audit_log_path: tmp_path(prefix, "audit.log"),
        audit_log_json: true,
    };
    let manager = SessionManager::new(
        Arc::new(EnvFileStore::new(&env_file)),
        Arc::new(FakeConnector(net)),
    )
    .with_invite_delay(cfg.invite_delay);

    let state = AppState::new(Arc::new(cfg), Arc::new(manager)).unwrap();
    (state, env_file)
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_json(res: Response) -> serde_json::Value {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// One-shot code webhook answering 200 with `body`. The handle yields the
/// request line it received.
pub async fn code_webhook_stub(body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/code", listener.local_addr().unwrap());
    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        let reply = format!(
            "HTTP/1.1 200 OK\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(reply.as_bytes()).await.unwrap();
        stream.shutdown().await.unwrap();
        let head = String::from_utf8_lossy(&buf).into_owned();
        head.lines().next().unwrap_or_default().to_string()
    });
    (url, handle)
}
