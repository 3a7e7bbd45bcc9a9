#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use maze_vault::config::Config;
use maze_vault::db::VaultStorage;
use maze_vault::router::{MazeState, maze_router};
use serde_json::Value;
use std::{
    fs,
    path::PathBuf,
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};
use tower::ServiceExt;

pub const ADMIN_KEY: &str = "test-admin-key";

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// App wired to a throwaway SQLite file. The file is removed on drop.
pub struct TestApp {
    pub router: Router,
    pub storage: VaultStorage,
    db_path: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.db_path);
    }
}

/// Defaults tuned for tests: cheap Argon2 parameters and a known admin key.
pub fn test_config() -> Config {
    let mut cfg = Config::default();
    cfg.security.admin_key = ADMIN_KEY.to_string();
    cfg.security.argon2_memory_kib = 1024;
    cfg.security.argon2_iterations = 1;
    cfg.breach.max_retries = 0;
    cfg.breach.requests_per_minute = 1000;
    cfg.breach.timeout_secs = 2;
    cfg
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config()).await
}

pub async fn spawn_app_with(cfg: Config) -> TestApp {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();
    let mut db_path = std::env::temp_dir();
    db_path.push(format!(
        "maze-vault-test-{}-{}-{}.sqlite",
        std::process::id(),
        nanos,
        COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    let database_url = format!("sqlite:{}", db_path.display());
    let storage = VaultStorage::connect(&database_url, 1)
        .await
        .expect("failed to open test database");
    let state = MazeState::new(storage.clone(), cfg).expect("failed to build state");
    TestApp {
        router: maze_router(state),
        storage,
        db_path,
    }
}

/// JSON request with an optional bearer token.
pub fn build_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).expect("failed to build request")
}

impl TestApp {
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        self.send(build_request(method, uri, token, body)).await
    }

    pub async fn admin(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-admin-key", ADMIN_KEY);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).expect("failed to build request"))
            .await
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("request failed");
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("failed to read response body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }

    /// Register and log in; returns `(user_id, token)`.
    pub async fn signup(&self, email: &str) -> (String, String) {
        let creds = serde_json::json!({ "email": email, "password": "Sup3r-secret!" });
        let (status, body) = self
            .request("POST", "/api/auth/register", None, Some(creds.clone()))
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        let (status, body) = self
            .request("POST", "/api/auth/login", None, Some(creds))
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        (
            body["user_id"].as_str().expect("user_id").to_string(),
            body["token"].as_str().expect("token").to_string(),
        )
    }

    pub async fn create_vault(&self, token: &str, name: &str) -> String {
        let (status, body) = self
            .request(
                "POST",
                "/api/vaults",
                Some(token),
                Some(serde_json::json!({ "name": name })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create vault failed: {body}");
        body["vault"]["id"].as_str().expect("vault id").to_string()
    }

    pub async fn create_entry(&self, token: &str, vault_id: &str, title: &str, secret: &str) -> String {
        let (status, body) = self
            .request(
                "POST",
                &format!("/api/vaults/{vault_id}/passwords"),
                Some(token),
                Some(serde_json::json!({
                    "title": title,
                    "username": "me@example.com",
                    "password": secret,
                    "url": format!("https://{}.example.com", title.to_lowercase()),
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create entry failed: {body}");
        body["password"]["id"].as_str().expect("entry id").to_string()
    }

    pub async fn vault_count(&self, token: &str, vault_id: &str) -> i64 {
        let (status, body) = self
            .request("GET", &format!("/api/vaults/{vault_id}"), Some(token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        body["vault"]["password_count"].as_i64().expect("count")
    }
}
