//! In-process stand-in for the database, speaking the same wire protocol.
//!
//! Binds to an ephemeral port on 127.0.0.1 and keeps entries in memory. Every
//! request is counted so tests can assert that argument checks happen before
//! anything is sent.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use percent_encoding::percent_decode_str;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[derive(Clone, Default)]
struct State {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
    requests: Arc<AtomicUsize>,
    locked: Arc<Mutex<HashSet<String>>>,
    fail_with: Option<StatusCode>,
}

pub struct StubServer {
    addr: SocketAddr,
    state: State,
    task: JoinHandle<()>,
}

impl StubServer {
    /// A working in-memory database
    pub async fn start() -> Self {
        Self::spawn(None).await
    }

    /// A database answering every request with `status`
    pub async fn failing(status: StatusCode) -> Self {
        Self::spawn(Some(status)).await
    }

    async fn spawn(fail_with: Option<StatusCode>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub server");
        let addr = listener.local_addr().expect("stub server address");
        let state = State {
            fail_with,
            ..Default::default()
        };

        let server_state = state.clone();
        let task = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    continue;
                };
                let state = server_state.clone();
                tokio::spawn(async move {
                    let service = service_fn(move |req| {
                        let state = state.clone();
                        async move { Ok::<_, Infallible>(handle(&state, req).await) }
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });

        Self { addr, state, task }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn request_count(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.state
            .entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    /// Make DELETE of `key` answer 500 while leaving the entry in place
    pub fn lock_key(&self, key: &str) {
        self.state.locked.lock().unwrap().insert(key.to_string());
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.state.entries.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.state.entries.lock().unwrap().keys().cloned().collect()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// An address nothing listens on.
pub async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("address");
    drop(listener);
    format!("http://{}", addr)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

async fn handle(state: &State, req: Request<Incoming>) -> Response<Full<Bytes>> {
    state.requests.fetch_add(1, Ordering::SeqCst);

    if let Some(status) = state.fail_with {
        return text_response(status, "stub failure");
    }

    let method = req.method().as_str().to_string();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(|q| q.to_string());

    match (method.as_str(), path.as_str()) {
        ("GET", "/") => handle_list(state, query.as_deref()),
        ("POST", "/") => handle_set(state, req).await,
        ("GET", _) => handle_get(state, &decode_key(&path)),
        ("DELETE", _) if path.len() > 1 => handle_delete(state, &decode_key(&path)),
        _ => text_response(StatusCode::NOT_FOUND, "Path not found"),
    }
}

fn decode_key(path: &str) -> String {
    percent_decode_str(&path[1..]).decode_utf8_lossy().into_owned()
}

fn handle_list(state: &State, query: Option<&str>) -> Response<Full<Bytes>> {
    let prefix = query
        .and_then(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .find(|(k, _)| k == "prefix")
                .map(|(_, v)| v.into_owned())
        })
        .unwrap_or_default();

    let entries = state.entries.lock().unwrap();
    let keys: Vec<&str> = entries
        .keys()
        .filter(|k| k.starts_with(&prefix))
        .map(String::as_str)
        .collect();
    text_response(StatusCode::OK, &keys.join("\n"))
}

async fn handle_set(state: &State, req: Request<Incoming>) -> Response<Full<Bytes>> {
    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => return text_response(StatusCode::BAD_REQUEST, "unreadable body"),
    };

    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(&body)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if pairs.is_empty() {
        return text_response(StatusCode::BAD_REQUEST, "empty form");
    }

    let mut entries = state.entries.lock().unwrap();
    for (key, value) in pairs {
        entries.insert(key, value);
    }
    text_response(StatusCode::OK, "")
}

fn handle_get(state: &State, key: &str) -> Response<Full<Bytes>> {
    match state.entries.lock().unwrap().get(key) {
        Some(value) => text_response(StatusCode::OK, value),
        None => text_response(StatusCode::NOT_FOUND, ""),
    }
}

fn handle_delete(state: &State, key: &str) -> Response<Full<Bytes>> {
    if state.locked.lock().unwrap().contains(key) {
        return text_response(StatusCode::INTERNAL_SERVER_ERROR, "key is locked");
    }
    match state.entries.lock().unwrap().remove(key) {
        Some(_) => text_response(StatusCode::OK, ""),
        None => text_response(StatusCode::NOT_FOUND, ""),
    }
}

fn text_response(status: StatusCode, body: &str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body.to_string())));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert("content-type", hyper::header::HeaderValue::from_static("text/plain"));
    response
}
