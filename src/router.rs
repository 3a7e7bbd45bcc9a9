use std::sync::Arc;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::VaultStorage;
use crate::error::MazeError;
use crate::handlers::{admin, auth, billing, health, passwords, security, vaults};
use crate::service::breach::BreachService;
use crate::service::credentials::AccountHasher;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct MazeState {
    pub storage: VaultStorage,
    pub breach: BreachService,
    pub hasher: AccountHasher,
    pub config: Arc<Config>,
}

impl MazeState {
    pub fn new(storage: VaultStorage, config: Config) -> Result<Self, MazeError> {
        let breach = BreachService::new(&config.breach)?;
        let hasher = AccountHasher::new(&config.security)?;
        Ok(Self {
            storage,
            breach,
            hasher,
            config: Arc::new(config),
        })
    }
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": { "code": "NOT_FOUND", "message": "Endpoint not found" }
        })),
    )
}

pub fn maze_router(state: MazeState) -> Router {
    let body_limit = state.config.basic.body_limit;

    let api = Router::new()
        .route("/health", get(health::health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/profile", get(auth::profile))
        .route(
            "/vaults",
            get(vaults::list_vaults).post(vaults::create_vault),
        )
        .route(
            "/vaults/{id}",
            get(vaults::get_vault)
                .put(vaults::update_vault)
                .delete(vaults::delete_vault),
        )
        .route(
            "/vaults/{id}/passwords",
            get(passwords::list_passwords).post(passwords::create_password),
        )
        .route("/passwords/search", get(passwords::search_passwords))
        .route(
            "/passwords/{id}",
            get(passwords::get_password)
                .put(passwords::update_password)
                .delete(passwords::delete_password),
        )
        .route("/tools/generate-password", get(passwords::generate_password))
        .route("/plans", get(billing::list_plans))
        .route("/subscription", get(billing::subscription))
        .route("/payments", get(billing::list_payments))
        .route("/payments/upi/methods", get(billing::upi_methods))
        .route("/payments/upi/create-order", post(billing::create_order))
        .route("/payments/upi/verify", post(billing::verify_payment))
        .route("/security/check-breach", post(security::check_breach))
        .route("/security/scan", post(security::security_scan))
        .route("/security/scans", get(security::list_scans))
        .route("/security/password-health", get(security::password_health))
        .route("/admin/pending-payments", get(admin::pending_payments))
        .route("/admin/payments/{id}/approve", post(admin::approve_payment))
        .route("/admin/payments/{id}/reject", post(admin::reject_payment))
        .route("/admin/notifications", get(admin::notifications))
        .route(
            "/admin/notifications/{id}/read",
            post(admin::mark_notification_read),
        )
        .route("/admin/stats", get(admin::stats));

    Router::new()
        .nest("/api", api)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
