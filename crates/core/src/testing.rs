//! In-process HTTP backend used by the API and view tests.

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};

/// A request as seen by the mock backend, with the `/api` prefix stripped.
#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn body_json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone)]
struct Reply {
    status: u16,
    content_type: &'static str,
    body: String,
}

#[derive(Default)]
struct MockState {
    routes: HashMap<(String, String), Reply>,
    requests: Vec<RecordedRequest>,
}

/// Minimal HTTP/1.1 server answering canned replies per `(method, path)`.
pub(crate) struct MockBackend {
    base_url: String,
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock backend");
        let addr = listener.local_addr().expect("mock backend address");
        let state = Arc::new(Mutex::new(MockState::default()));

        let accept_state = state.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = accept_state.clone();
                tokio::spawn(async move {
                    let _ = handle(stream, state).await;
                });
            }
        });

        Self {
            base_url: format!("http://{addr}/api"),
            state,
        }
    }

    pub fn base_url(&self) -> String {
        self.base_url.clone()
    }

    /// Answer `method path` with `status` and `body` until replaced.
    pub fn respond(&self, method: &str, path: &str, status: u16, body: Value) {
        let body = if body.is_null() {
            String::new()
        } else {
            body.to_string()
        };
        self.insert(method, path, Reply { status, content_type: "application/json", body });
    }

    /// Answer `method path` with a non-JSON body, e.g. a server error page.
    pub fn respond_raw(
        &self,
        method: &str,
        path: &str,
        status: u16,
        content_type: &'static str,
        body: &str,
    ) {
        let body = body.to_string();
        self.insert(method, path, Reply { status, content_type, body });
    }

    fn insert(&self, method: &str, path: &str, reply: Reply) {
        self.state
            .lock()
            .routes
            .insert((method.to_string(), path.to_string()), reply);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|request| request.method == method && request.path == path)
            .count()
    }
}

async fn handle(mut stream: TcpStream, state: Arc<Mutex<MockState>>) -> std::io::Result<()> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            return Ok(());
        }
        buffer.extend_from_slice(&chunk[..read]);
        if let Some(pos) = buffer.windows(4).position(|window| window == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default();
    let path = target
        .strip_prefix("/api")
        .unwrap_or(target)
        .split('?')
        .next()
        .unwrap_or_default()
        .to_string();

    let mut content_length = 0usize;
    let mut authorization = None;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            match name.trim().to_ascii_lowercase().as_str() {
                "content-length" => content_length = value.trim().parse().unwrap_or(0),
                "authorization" => authorization = Some(value.trim().to_string()),
                _ => {}
            }
        }
    }

    while buffer.len() < header_end + content_length {
        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
    }
    let body_end = (header_end + content_length).min(buffer.len());
    let body = String::from_utf8_lossy(&buffer[header_end..body_end]).to_string();

    let reply = {
        let mut state = state.lock();
        state.requests.push(RecordedRequest {
            method: method.clone(),
            path: path.clone(),
            authorization,
            body,
        });
        state
            .routes
            .get(&(method, path))
            .cloned()
            .unwrap_or_else(|| Reply {
                status: 404,
                content_type: "application/json",
                body: r#"{"detail":"Not found."}"#.to_string(),
            })
    };

    let response = if reply.status == 204 {
        "HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n".to_string()
    } else {
        format!(
            "HTTP/1.1 {} Mock\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            reply.status,
            reply.content_type,
            reply.body.len(),
            reply.body
        )
    };
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}
