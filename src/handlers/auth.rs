use axum::{Json, extract::State, http::StatusCode};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::error::MazeError;
use crate::middleware::{ApiJson, RequireUser};
use crate::router::MazeState;
use crate::service::credentials::{hash_session_token, new_session_token};
use crate::service::entitlements::effective_plan;

#[derive(Deserialize)]
pub struct CredentialsBody {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// `local@domain.tld` with no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.len() > 254 || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((name, tld)) => !name.is_empty() && tld.len() >= 2 && !name.starts_with('.'),
        None => false,
    }
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<MazeState>,
    ApiJson(body): ApiJson<CredentialsBody>,
) -> Result<(StatusCode, Json<Value>), MazeError> {
    let email = body.email.trim().to_ascii_lowercase();
    if email.is_empty() || body.password.is_empty() {
        return Err(MazeError::validation("Email and password required"));
    }
    if !is_valid_email(&email) {
        return Err(MazeError::validation("Invalid email address"));
    }
    let min_len = state.config.security.min_password_length;
    if body.password.chars().count() < min_len {
        return Err(MazeError::validation(format!(
            "Password must be at least {min_len} characters"
        )));
    }
    if state.storage.get_user_by_email(&email).await?.is_some() {
        return Err(MazeError::Conflict("User already exists".to_string()));
    }

    let hash = state.hasher.hash_blocking(body.password).await?;
    let user = state.storage.create_user(&email, &hash).await?;
    info!(user_id = %user.id, "account registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "user_id": user.id,
            "email": user.email,
            "message": "Registration successful",
        })),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<MazeState>,
    ApiJson(body): ApiJson<CredentialsBody>,
) -> Result<Json<Value>, MazeError> {
    let email = body.email.trim();
    if email.is_empty() || body.password.is_empty() {
        return Err(MazeError::validation("Email and password required"));
    }
    let Some(user) = state.storage.get_user_by_email(email).await? else {
        state.hasher.verify_dummy_blocking(body.password).await?;
        return Err(MazeError::InvalidCredentials);
    };

    let now = Utc::now();
    if let Some(until) = user.locked_until.filter(|_| user.is_locked(now)) {
        return Err(MazeError::AccountLocked(until));
    }

    let ok = state
        .hasher
        .verify_blocking(body.password, user.password_hash.clone())
        .await?;
    if !ok {
        let sec = &state.config.security;
        let locked = state
            .storage
            .record_failed_login(
                &user.id,
                sec.max_failed_logins,
                Duration::minutes(sec.lockout_minutes),
            )
            .await?;
        if let Some(until) = locked {
            warn!(user_id = %user.id, locked_until = %until, "account locked after failed logins");
            return Err(MazeError::AccountLocked(until));
        }
        return Err(MazeError::InvalidCredentials);
    }

    state.storage.record_successful_login(&user.id).await?;
    let token = new_session_token();
    let expires_at = now + Duration::hours(state.config.security.session_ttl_hours.max(1));
    state
        .storage
        .create_session(&user.id, &hash_session_token(&token), expires_at)
        .await?;
    let plan = effective_plan(&state.storage, &user).await?;
    info!(user_id = %user.id, "login succeeded");

    Ok(Json(json!({
        "success": true,
        "token": token,
        "user_id": user.id,
        "email": user.email,
        "subscription_plan": plan.plan,
        "expires_at": expires_at,
    })))
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<MazeState>,
    auth: RequireUser,
) -> Result<Json<Value>, MazeError> {
    if let Some(token_hash) = auth.session.as_deref() {
        state.storage.delete_session(token_hash).await?;
    }
    info!(user_id = %auth.user.id, "logged out");
    Ok(Json(json!({ "success": true })))
}

/// GET /api/auth/profile
pub async fn profile(
    State(state): State<MazeState>,
    RequireUser { user, .. }: RequireUser,
) -> Result<Json<Value>, MazeError> {
    let plan = effective_plan(&state.storage, &user).await?;
    Ok(Json(json!({
        "user_id": user.id,
        "email": user.email,
        "subscription_plan": plan.plan,
        "subscription_status": plan.status,
        "subscription_expires_at": plan.expires_at,
        "created_at": user.created_at,
        "last_login": user.last_login,
    })))
}
