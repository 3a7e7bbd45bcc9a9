mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{Duration, Utc};
use common::{TestApp, spawn_app, spawn_app_with, test_config};
use serde_json::json;

async fn session_count(app: &TestApp, user_id: &str) -> i64 {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(app.storage.pool())
        .await
        .expect("count sessions");
    count
}

async fn expire_sessions(app: &TestApp, user_id: &str) {
    sqlx::query("UPDATE sessions SET expires_at = ? WHERE user_id = ?")
        .bind(Utc::now() - Duration::minutes(1))
        .bind(user_id)
        .execute(app.storage.pool())
        .await
        .expect("expire sessions");
}

async fn login(app: &TestApp, email: &str, password: &str) -> StatusCode {
    let (status, _) = app
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await;
    status
}

#[tokio::test]
async fn register_twice_with_same_email_conflicts() {
    let app = spawn_app().await;
    let creds = json!({ "email": "alice@example.com", "password": "Sup3r-secret!" });

    let (status, body) = app
        .request("POST", "/api/auth/register", None, Some(creds))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["email"], "alice@example.com");

    let (status, body) = app
        .request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "email": "ALICE@example.com", "password": "another-pass" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn register_validates_input() {
    let app = spawn_app().await;

    let (status, _) = app
        .request("POST", "/api/auth/register", None, Some(json!({ "email": "bob@example.com" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "email": "not-an-email", "password": "long-enough" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "email": "bob@example.com", "password": "short" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn account_password_is_stored_hashed() {
    let app = spawn_app().await;
    app.signup("carol@example.com").await;

    let user = app
        .storage
        .get_user_by_email("carol@example.com")
        .await
        .expect("query")
        .expect("user exists");
    assert!(user.password_hash.starts_with("$argon2id$"));
    assert!(!user.password_hash.contains("Sup3r-secret!"));
}

#[tokio::test]
async fn wrong_password_is_rejected_then_account_locks() {
    let mut cfg = test_config();
    cfg.security.max_failed_logins = 3;
    let app = spawn_app_with(cfg).await;
    app.signup("dave@example.com").await;

    let wrong = json!({ "email": "dave@example.com", "password": "wrong-password" });
    for _ in 0..2 {
        let (status, body) = app
            .request("POST", "/api/auth/login", None, Some(wrong.clone()))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["message"], "Invalid credentials");
    }
    let (status, body) = app
        .request("POST", "/api/auth/login", None, Some(wrong))
        .await;
    assert_eq!(status, StatusCode::LOCKED);
    assert_eq!(body["error"]["code"], "ACCOUNT_LOCKED");

    // Locked even with the right password.
    let (status, _) = app
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "dave@example.com", "password": "Sup3r-secret!" })),
        )
        .await;
    assert_eq!(status, StatusCode::LOCKED);
}

#[tokio::test]
async fn unknown_email_looks_like_wrong_password() {
    let app = spawn_app().await;
    let (status, body) = app
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "nobody@example.com", "password": "whatever1" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["message"], "Invalid credentials");
}

#[tokio::test]
async fn profile_requires_session_and_logout_revokes_it() {
    let app = spawn_app().await;
    let (user_id, token) = app.signup("erin@example.com").await;

    let (status, _) = app.request("GET", "/api/auth/profile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .request("GET", "/api/auth/profile", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], user_id.as_str());
    assert_eq!(body["subscription_plan"], "free");

    let (status, _) = app
        .request("POST", "/api/auth/logout", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request("GET", "/api/auth/profile", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn user_id_header_is_ignored_unless_enabled() {
    let app = spawn_app().await;
    let (user_id, _) = app.signup("frank@example.com").await;
    let req = || {
        Request::builder()
            .method("GET")
            .uri("/api/auth/profile")
            .header("x-user-id", user_id.as_str())
            .body(Body::empty())
            .expect("request")
    };
    let (status, _) = app.send(req()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut cfg = test_config();
    cfg.security.trust_user_id_header = true;
    let legacy = spawn_app_with(cfg).await;
    let (legacy_id, _) = legacy.signup("frank@example.com").await;
    let (status, body) = legacy
        .send(
            Request::builder()
                .method("GET")
                .uri("/api/auth/profile")
                .header("x-user-id", legacy_id.as_str())
                .body(Body::empty())
                .expect("request"),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "frank@example.com");

    let (status, _) = legacy
        .send(
            Request::builder()
                .method("GET")
                .uri("/api/auth/profile")
                .header("x-user-id", "no-such-user")
                .body(Body::empty())
                .expect("request"),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_session_is_rejected_and_removed() {
    let app = spawn_app().await;
    let (user_id, token) = app.signup("gina@example.com").await;
    assert_eq!(session_count(&app, &user_id).await, 1);
    expire_sessions(&app, &user_id).await;

    let (status, body) = app
        .request("GET", "/api/auth/profile", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert_eq!(session_count(&app, &user_id).await, 0);
}

#[tokio::test]
async fn login_prunes_expired_sessions() {
    let app = spawn_app().await;
    let (user_id, _) = app.signup("hank@example.com").await;
    assert_eq!(login(&app, "hank@example.com", "Sup3r-secret!").await, StatusCode::OK);
    assert_eq!(session_count(&app, &user_id).await, 2);
    expire_sessions(&app, &user_id).await;

    assert_eq!(login(&app, "hank@example.com", "Sup3r-secret!").await, StatusCode::OK);
    assert_eq!(session_count(&app, &user_id).await, 1);
}

#[tokio::test]
async fn login_works_again_once_lock_expires() {
    let mut cfg = test_config();
    cfg.security.max_failed_logins = 3;
    let app = spawn_app_with(cfg).await;
    let (user_id, _) = app.signup("iris@example.com").await;

    for expected in [
        StatusCode::UNAUTHORIZED,
        StatusCode::UNAUTHORIZED,
        StatusCode::LOCKED,
    ] {
        assert_eq!(login(&app, "iris@example.com", "wrong-password").await, expected);
    }
    assert_eq!(login(&app, "iris@example.com", "Sup3r-secret!").await, StatusCode::LOCKED);

    sqlx::query("UPDATE users SET locked_until = ? WHERE id = ?")
        .bind(Utc::now() - Duration::seconds(1))
        .bind(&user_id)
        .execute(app.storage.pool())
        .await
        .expect("backdate lock");

    assert_eq!(login(&app, "iris@example.com", "Sup3r-secret!").await, StatusCode::OK);
    let user = app
        .storage
        .get_user(&user_id)
        .await
        .expect("query")
        .expect("user exists");
    assert!(user.locked_until.is_none());
    assert_eq!(user.failed_attempts, 0);
}

#[tokio::test]
async fn successful_login_resets_failed_attempts() {
    let mut cfg = test_config();
    cfg.security.max_failed_logins = 3;
    let app = spawn_app_with(cfg).await;
    let (user_id, _) = app.signup("jack@example.com").await;

    for _ in 0..2 {
        assert_eq!(
            login(&app, "jack@example.com", "wrong-password").await,
            StatusCode::UNAUTHORIZED
        );
    }
    let user = app.storage.get_user(&user_id).await.expect("query").expect("user");
    assert_eq!(user.failed_attempts, 2);

    assert_eq!(login(&app, "jack@example.com", "Sup3r-secret!").await, StatusCode::OK);
    let user = app.storage.get_user(&user_id).await.expect("query").expect("user");
    assert_eq!(user.failed_attempts, 0);

    // The counter started over, so two more misses do not lock.
    for _ in 0..2 {
        assert_eq!(
            login(&app, "jack@example.com", "wrong-password").await,
            StatusCode::UNAUTHORIZED
        );
    }
    assert_eq!(login(&app, "jack@example.com", "Sup3r-secret!").await, StatusCode::OK);
}
