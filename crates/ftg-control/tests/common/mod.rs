//! In-process stand-in for the control server, bound to an ephemeral loopback port.

#![allow(dead_code)]

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use ftg_control::{ClientConfig, ControlClient, CredentialStore, MemoryBackend, PreferenceFile};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub struct FakeDaemon {
    pub healthy: AtomicBool,
    /// `/health` answers 200 with a non-JSON body.
    pub garbled_health: AtomicBool,
    pub running: AtomicBool,
    pub exec_delay_ms: AtomicU64,
    /// Replaces the normal `/exec` reply when set.
    pub exec_reply: Mutex<Option<Value>>,
    pub exec_calls: Mutex<Vec<String>>,
    pub tokens_seen: Mutex<Vec<String>>,
    pub bot_config: Mutex<Map<String, Value>>,
    pub llm_config: Mutex<Map<String, Value>>,
    pub log_lines: Mutex<Vec<String>>,
    pub bodies: Mutex<Vec<(String, Value)>>,
}

impl Default for FakeDaemon {
    fn default() -> Self {
        let bot = json!({
            "auto_reply_enabled": false,
            "auto_reply_mode": "off",
            "allowlist_chats": ["alice", 1001],
            "blocklist_chats": [],
            "silent_reading": true,
            "min_reply_interval_seconds": 10,
            "reply_prompt": ""
        });
        let llm = json!({
            "base_url": "http://127.0.0.1:1234/v1",
            "model": "local-model",
            "api_key": "",
            "request_timeout_seconds": 60
        });
        Self {
            healthy: AtomicBool::new(true),
            garbled_health: AtomicBool::new(false),
            running: AtomicBool::new(false),
            exec_delay_ms: AtomicU64::new(0),
            exec_reply: Mutex::new(None),
            exec_calls: Mutex::new(Vec::new()),
            tokens_seen: Mutex::new(Vec::new()),
            bot_config: Mutex::new(bot.as_object().cloned().unwrap_or_default()),
            llm_config: Mutex::new(llm.as_object().cloned().unwrap_or_default()),
            log_lines: Mutex::new((1..=5).map(|n| format!("line {n}")).collect()),
            bodies: Mutex::new(Vec::new()),
        }
    }
}

impl FakeDaemon {
    pub fn exec_count(&self, action: &str) -> usize {
        self.exec_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.as_str() == action)
            .count()
    }

    pub fn last_body(&self, path: &str) -> Option<Value> {
        self.bodies
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(p, _)| p == path)
            .map(|(_, b)| b.clone())
    }

    fn record(&self, headers: &HeaderMap) {
        let token = headers
            .get("X-FTG-Token")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        self.tokens_seen.lock().unwrap().push(token);
    }
}

type Shared = Arc<FakeDaemon>;

async fn health(State(d): State<Shared>, headers: HeaderMap) -> Response {
    d.record(&headers);
    if !d.healthy.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    if d.garbled_health.load(Ordering::SeqCst) {
        return (StatusCode::OK, "not json").into_response();
    }
    let ftg = if d.running.load(Ordering::SeqCst) { "running" } else { "stopped" };
    Json(json!({"status": "ok", "ftg": ftg})).into_response()
}

async fn exec(
    State(d): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    d.record(&headers);
    let action = body["action"].as_str().unwrap_or_default().to_string();
    d.exec_calls.lock().unwrap().push(action.clone());
    let delay = d.exec_delay_ms.load(Ordering::SeqCst);
    if delay > 0 && action != "status" {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    let override_reply = d.exec_reply.lock().unwrap().clone();
    if let (Some(reply), false) = (override_reply, action == "status") {
        return Json(reply);
    }
    match action.as_str() {
        "start" | "restart" => d.running.store(true, Ordering::SeqCst),
        "stop" => d.running.store(false, Ordering::SeqCst),
        _ => {}
    }
    Json(json!({"ok": true, "running": d.running.load(Ordering::SeqCst)}))
}

fn merge(target: &Mutex<Map<String, Value>>, patch: Value) {
    let mut target = target.lock().unwrap();
    if let Value::Object(patch) = patch {
        for (k, v) in patch {
            if !v.is_null() {
                target.insert(k, v);
            }
        }
    }
}

async fn get_bot(State(d): State<Shared>, headers: HeaderMap) -> Json<Value> {
    d.record(&headers);
    let config = d.bot_config.lock().unwrap().clone();
    Json(json!({"ok": true, "config": config}))
}

async fn post_bot(
    State(d): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    d.record(&headers);
    d.bodies.lock().unwrap().push(("/bot/config".to_string(), body.clone()));
    merge(&d.bot_config, body);
    Json(json!({"ok": true}))
}

async fn get_llm(State(d): State<Shared>, headers: HeaderMap) -> Json<Value> {
    d.record(&headers);
    let mut config = d.llm_config.lock().unwrap().clone();
    if config.get("api_key").and_then(Value::as_str).is_some_and(|k| !k.is_empty()) {
        config.insert("api_key".to_string(), json!("***"));
    }
    Json(json!({"ok": true, "config": config}))
}

async fn post_llm(
    State(d): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    d.record(&headers);
    d.bodies.lock().unwrap().push(("/llm/config".to_string(), body.clone()));
    merge(&d.llm_config, body);
    Json(json!({"ok": true}))
}

async fn providers(State(d): State<Shared>, headers: HeaderMap) -> Json<Value> {
    d.record(&headers);
    Json(json!({"providers": [
        {"id": "lmstudio", "name": "LM Studio", "base_url": "http://127.0.0.1:1234/v1"},
        {"id": "groq", "name": "Groq", "base_url": "https://api.groq.com/openai/v1"}
    ]}))
}

async fn logs_tail(
    State(d): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    d.record(&headers);
    let n: usize = params.get("lines").and_then(|v| v.parse().ok()).unwrap_or(200);
    let lines = d.log_lines.lock().unwrap().clone();
    let start = lines.len().saturating_sub(n);
    Json(json!({"lines": lines[start..].to_vec()}))
}

async fn chat(
    State(d): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    d.record(&headers);
    let prompt = body["prompt"].as_str().unwrap_or_default();
    Json(json!({"ok": true, "reply": format!("echo: {prompt}")}))
}

async fn send_message(
    State(d): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    d.record(&headers);
    d.bodies.lock().unwrap().push(("/send_message".to_string(), body));
    Json(json!({"ok": true}))
}

/// Serve `daemon` on `127.0.0.1:0` and return its base URL.
pub async fn spawn(daemon: Shared) -> String {
    let app = Router::new()
        .route("/health", get(health))
        .route("/exec", post(exec))
        .route("/bot/config", get(get_bot).post(post_bot))
        .route("/llm/config", get(get_llm).post(post_llm))
        .route("/llm/providers", get(providers))
        .route("/llm/chat", post(chat))
        .route("/logs/tail", get(logs_tail))
        .route("/send_message", post(send_message))
        .with_state(daemon);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Client with an in-memory secure store and a throwaway preference file.
pub struct TestClient {
    pub client: Arc<ControlClient>,
    pub credentials: Arc<CredentialStore>,
    _dir: TempDir,
}

pub fn client_for(base_url: &str, secure: MemoryBackend) -> TestClient {
    let dir = tempfile::tempdir().unwrap();
    let config = ClientConfig {
        base_url: base_url.to_string(),
        request_timeout_secs: 2,
        ..ClientConfig::default()
    };
    let credentials = Arc::new(CredentialStore::new(
        Box::new(secure),
        PreferenceFile::new(dir.path().join("prefs.toml")),
    ));
    let client = Arc::new(ControlClient::new(&config, Arc::clone(&credentials)));
    TestClient {
        client,
        credentials,
        _dir: dir,
    }
}

pub async fn start() -> (Arc<FakeDaemon>, TestClient) {
    let daemon = Arc::new(FakeDaemon::default());
    let url = spawn(Arc::clone(&daemon)).await;
    (daemon, client_for(&url, MemoryBackend::new()))
}
