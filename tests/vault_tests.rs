mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use common::{build_request, spawn_app};
use serde_json::json;
use tokio::task::JoinSet;
use tower::ServiceExt;

/// Fire all requests at once and collect the response statuses.
async fn send_concurrently(router: &Router, requests: Vec<Request<Body>>) -> Vec<StatusCode> {
    let mut tasks = JoinSet::new();
    for req in requests {
        let router = router.clone();
        tasks.spawn(async move {
            router
                .oneshot(req)
                .await
                .expect("request failed")
                .status()
        });
    }
    tasks.join_all().await
}

#[tokio::test]
async fn users_cannot_see_each_others_vaults() {
    let app = spawn_app().await;
    let (_, alice) = app.signup("alice@example.com").await;
    let (_, bob) = app.signup("bob@example.com").await;
    let vault_id = app.create_vault(&alice, "Personal").await;
    let entry_id = app.create_entry(&alice, &vault_id, "Github", "Xk9#mP2$vL7@qR4!").await;

    for (method, uri) in [
        ("GET", format!("/api/vaults/{vault_id}")),
        ("GET", format!("/api/vaults/{vault_id}/passwords")),
        ("DELETE", format!("/api/vaults/{vault_id}")),
        ("GET", format!("/api/passwords/{entry_id}")),
        ("DELETE", format!("/api/passwords/{entry_id}")),
    ] {
        let (status, body) = app.request(method, &uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{method} {uri}: {body}");
    }

    let (status, body) = app.request("GET", "/api/vaults", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["vaults"].as_array().map(Vec::len), Some(0));

    // Still intact for the owner.
    assert_eq!(app.vault_count(&alice, &vault_id).await, 1);
}

#[tokio::test]
async fn vault_crud_and_defaults() {
    let app = spawn_app().await;
    let (_, token) = app.signup("carol@example.com").await;

    let (status, _) = app
        .request("POST", "/api/vaults", Some(&token), Some(json!({ "name": "  " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let vault_id = app.create_vault(&token, "Work").await;
    let (status, body) = app
        .request("GET", &format!("/api/vaults/{vault_id}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["vault"]["icon"], "🔐");
    assert_eq!(body["vault"]["password_count"], 0);

    let (status, body) = app
        .request(
            "PUT",
            &format!("/api/vaults/{vault_id}"),
            Some(&token),
            Some(json!({ "name": "Office", "icon": "💼" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["vault"]["name"], "Office");
    assert_eq!(body["vault"]["icon"], "💼");
}

#[tokio::test]
async fn deleting_a_vault_removes_its_passwords() {
    let app = spawn_app().await;
    let (user_id, token) = app.signup("dave@example.com").await;
    let vault_id = app.create_vault(&token, "Temp").await;
    let first = app.create_entry(&token, &vault_id, "One", "Secret-one-1").await;
    app.create_entry(&token, &vault_id, "Two", "Secret-two-2").await;

    let (status, body) = app
        .request("DELETE", &format!("/api/vaults/{vault_id}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted_passwords"], 2);

    let (status, _) = app
        .request("GET", &format!("/api/passwords/{first}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.storage.count_passwords(&user_id).await.expect("count"), 0);
}

#[tokio::test]
async fn password_counts_follow_create_move_delete() {
    let app = spawn_app().await;
    let (_, token) = app.signup("erin@example.com").await;
    let a = app.create_vault(&token, "A").await;
    let b = app.create_vault(&token, "B").await;

    let e1 = app.create_entry(&token, &a, "Mail", "Secret-mail-1").await;
    app.create_entry(&token, &a, "Bank", "Secret-bank-2").await;
    assert_eq!(app.vault_count(&token, &a).await, 2);
    assert_eq!(app.vault_count(&token, &b).await, 0);

    let (status, body) = app
        .request(
            "PUT",
            &format!("/api/passwords/{e1}"),
            Some(&token),
            Some(json!({ "vault_id": b, "title": "Webmail" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["password"]["vault_id"], b.as_str());
    assert_eq!(body["password"]["title"], "Webmail");
    assert_eq!(app.vault_count(&token, &a).await, 1);
    assert_eq!(app.vault_count(&token, &b).await, 1);

    let (status, _) = app
        .request("DELETE", &format!("/api/passwords/{e1}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.vault_count(&token, &b).await, 0);

    let (status, _) = app
        .request("DELETE", &format!("/api/passwords/{e1}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn moving_into_a_foreign_vault_is_not_found() {
    let app = spawn_app().await;
    let (_, alice) = app.signup("alice@example.com").await;
    let (_, mallory) = app.signup("mallory@example.com").await;
    let mine = app.create_vault(&alice, "Mine").await;
    let theirs = app.create_vault(&mallory, "Theirs").await;
    let entry = app.create_entry(&alice, &mine, "Forum", "Secret-forum-1").await;

    let (status, _) = app
        .request(
            "PUT",
            &format!("/api/passwords/{entry}"),
            Some(&alice),
            Some(json!({ "vault_id": theirs })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.vault_count(&alice, &mine).await, 1);
    assert_eq!(app.vault_count(&mallory, &theirs).await, 0);
}

#[tokio::test]
async fn entry_fields_are_required() {
    let app = spawn_app().await;
    let (_, token) = app.signup("frank@example.com").await;
    let vault_id = app.create_vault(&token, "V").await;

    let (status, _) = app
        .request(
            "POST",
            &format!("/api/vaults/{vault_id}/passwords"),
            Some(&token),
            Some(json!({ "title": "No secret", "username": "me" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.vault_count(&token, &vault_id).await, 0);
}

#[tokio::test]
async fn search_matches_title_username_and_url() {
    let app = spawn_app().await;
    let (_, token) = app.signup("grace@example.com").await;
    let (_, other) = app.signup("heidi@example.com").await;
    let v1 = app.create_vault(&token, "One").await;
    let v2 = app.create_vault(&token, "Two").await;
    app.create_entry(&token, &v1, "GitHub", "Secret-gh-1").await;
    app.create_entry(&token, &v2, "Gitlab", "Secret-gl-2").await;
    app.create_entry(&token, &v2, "Bank", "Secret-bank-3").await;
    let ov = app.create_vault(&other, "Other").await;
    app.create_entry(&other, &ov, "GitHub", "Secret-other-4").await;

    let (status, body) = app
        .request("GET", "/api/passwords/search?q=git", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    // matches the url column
    let (_, body) = app
        .request("GET", "/api/passwords/search?q=bank.example", Some(&token), None)
        .await;
    assert_eq!(body["count"], 1);

    // LIKE wildcards are literal
    let (_, body) = app
        .request("GET", "/api/passwords/search?q=%25", Some(&token), None)
        .await;
    assert_eq!(body["count"], 0);

    let (status, _) = app
        .request("GET", "/api/passwords/search?q=", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn free_plan_limits_vaults() {
    let app = spawn_app().await;
    let (_, token) = app.signup("ivan@example.com").await;
    for i in 0..3 {
        app.create_vault(&token, &format!("Vault {i}")).await;
    }
    let (status, body) = app
        .request("POST", "/api/vaults", Some(&token), Some(json!({ "name": "Fourth" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "PLAN_LIMIT");
}

#[tokio::test]
async fn free_plan_limits_passwords_across_vaults() {
    let app = spawn_app().await;
    let (_, token) = app.signup("judy@example.com").await;
    let a = app.create_vault(&token, "A").await;
    let b = app.create_vault(&token, "B").await;
    for i in 0..50 {
        let vault = if i % 2 == 0 { &a } else { &b };
        app.create_entry(&token, vault, &format!("Site{i}"), "Secret-shared-1").await;
    }
    let (status, body) = app
        .request(
            "POST",
            &format!("/api/vaults/{a}/passwords"),
            Some(&token),
            Some(json!({ "title": "One more", "username": "me", "password": "x-y-z-1-2-3" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "PLAN_LIMIT");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_vault_creates_stop_at_the_free_limit() {
    let app = spawn_app().await;
    let (user_id, token) = app.signup("kate@example.com").await;
    let requests = (0..8)
        .map(|i| {
            build_request(
                "POST",
                "/api/vaults",
                Some(&token),
                Some(json!({ "name": format!("Vault {i}") })),
            )
        })
        .collect();

    let statuses = send_concurrently(&app.router, requests).await;
    let created = statuses.iter().filter(|s| **s == StatusCode::CREATED).count();
    assert_eq!(created, 3, "{statuses:?}");
    assert!(
        statuses
            .iter()
            .all(|s| *s == StatusCode::CREATED || *s == StatusCode::FORBIDDEN)
    );
    assert_eq!(app.storage.count_vaults(&user_id).await.expect("count"), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_entry_creates_stop_at_the_free_limit() {
    let app = spawn_app().await;
    let (user_id, token) = app.signup("leo@example.com").await;
    let vault = app.create_vault(&token, "Main").await;
    for i in 0..48 {
        app.create_entry(&token, &vault, &format!("Site{i}"), "Secret-shared-1").await;
    }
    let uri = format!("/api/vaults/{vault}/passwords");
    let requests = (0..8)
        .map(|i| {
            build_request(
                "POST",
                &uri,
                Some(&token),
                Some(json!({
                    "title": format!("Extra{i}"),
                    "username": "me",
                    "password": "x-y-z-1-2-3",
                })),
            )
        })
        .collect();

    let statuses = send_concurrently(&app.router, requests).await;
    let created = statuses.iter().filter(|s| **s == StatusCode::CREATED).count();
    assert_eq!(created, 2, "{statuses:?}");
    assert_eq!(app.storage.count_passwords(&user_id).await.expect("count"), 50);
    assert_eq!(app.vault_count(&token, &vault).await, 50);
}

#[tokio::test]
async fn generator_respects_options() {
    let app = spawn_app().await;
    let (status, body) = app
        .request(
            "GET",
            "/api/tools/generate-password?length=24&symbols=false",
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let pw = body["password"].as_str().expect("password");
    assert_eq!(pw.len(), 24);
    assert!(pw.chars().all(char::is_alphanumeric));

    let (status, _) = app
        .request("GET", "/api/tools/generate-password?length=4", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
