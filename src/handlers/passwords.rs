use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::db::{EntryInsert, NewPassword, PasswordPatch};
use crate::error::MazeError;
use crate::middleware::{ApiJson, ApiQuery, RequireUser};
use crate::router::MazeState;
use crate::service::entitlements::password_capacity;
use crate::service::password_gen::{self, GenerateOptions};
use crate::service::password_health::{strength, strength_label};

/// GET /api/vaults/{id}/passwords
pub async fn list_passwords(
    State(state): State<MazeState>,
    RequireUser { user, .. }: RequireUser,
    Path(vault_id): Path<String>,
) -> Result<Json<Value>, MazeError> {
    let passwords = state
        .storage
        .list_passwords(&user.id, &vault_id)
        .await?
        .ok_or(MazeError::NotFound("Vault"))?;
    Ok(Json(json!({ "passwords": passwords })))
}

/// POST /api/vaults/{id}/passwords
pub async fn create_password(
    State(state): State<MazeState>,
    RequireUser { user, .. }: RequireUser,
    Path(vault_id): Path<String>,
    ApiJson(body): ApiJson<NewPassword>,
) -> Result<(StatusCode, Json<Value>), MazeError> {
    if body.title.trim().is_empty() || body.username.is_empty() || body.password.is_empty() {
        return Err(MazeError::validation(
            "Title, username and password are required",
        ));
    }
    let capacity = password_capacity(&state.storage, &user).await?;
    let entry = match state
        .storage
        .create_password(&user.id, &vault_id, body, capacity.limit)
        .await?
    {
        EntryInsert::Created(entry) => entry,
        EntryInsert::VaultNotFound => return Err(MazeError::NotFound("Vault")),
        EntryInsert::LimitReached => return Err(capacity.exceeded()),
    };
    info!(user_id = %user.id, vault_id = %vault_id, password_id = %entry.id, "entry created");
    Ok((StatusCode::CREATED, Json(json!({ "password": entry }))))
}

/// GET /api/passwords/{id}
pub async fn get_password(
    State(state): State<MazeState>,
    RequireUser { user, .. }: RequireUser,
    Path(password_id): Path<String>,
) -> Result<Json<Value>, MazeError> {
    let entry = state
        .storage
        .get_password(&user.id, &password_id)
        .await?
        .ok_or(MazeError::NotFound("Password"))?;
    Ok(Json(json!({ "password": entry })))
}

/// PUT /api/passwords/{id}
pub async fn update_password(
    State(state): State<MazeState>,
    RequireUser { user, .. }: RequireUser,
    Path(password_id): Path<String>,
    ApiJson(patch): ApiJson<PasswordPatch>,
) -> Result<Json<Value>, MazeError> {
    let blank = |v: &Option<String>, trim: bool| {
        v.as_deref()
            .is_some_and(|s| if trim { s.trim().is_empty() } else { s.is_empty() })
    };
    if blank(&patch.title, true) || blank(&patch.username, false) || blank(&patch.password, false)
    {
        return Err(MazeError::validation(
            "Title, username and password cannot be empty",
        ));
    }
    let entry = state
        .storage
        .update_password(&user.id, &password_id, patch)
        .await?
        .ok_or(MazeError::NotFound("Password"))?;
    info!(user_id = %user.id, password_id = %entry.id, "entry updated");
    Ok(Json(json!({ "password": entry })))
}

/// DELETE /api/passwords/{id}
pub async fn delete_password(
    State(state): State<MazeState>,
    RequireUser { user, .. }: RequireUser,
    Path(password_id): Path<String>,
) -> Result<Json<Value>, MazeError> {
    if !state.storage.delete_password(&user.id, &password_id).await? {
        return Err(MazeError::NotFound("Password"));
    }
    info!(user_id = %user.id, password_id = %password_id, "entry deleted");
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// GET /api/passwords/search?q=
pub async fn search_passwords(
    State(state): State<MazeState>,
    RequireUser { user, .. }: RequireUser,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<Value>, MazeError> {
    let q = query.q.trim();
    if q.is_empty() {
        return Err(MazeError::validation("Search query `q` is required"));
    }
    let passwords = state.storage.search_passwords(&user.id, q).await?;
    Ok(Json(json!({
        "query": q,
        "count": passwords.len(),
        "passwords": passwords,
    })))
}

/// GET /api/tools/generate-password
pub async fn generate_password(
    ApiQuery(opts): ApiQuery<GenerateOptions>,
) -> Result<Json<Value>, MazeError> {
    let password = password_gen::generate(&opts)?;
    let score = strength(&password);
    Ok(Json(json!({
        "password": password,
        "length": opts.length,
        "strength": score,
        "strength_label": strength_label(score),
    })))
}
