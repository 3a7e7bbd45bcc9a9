use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::{Value, json};
use tracing::info;

use crate::db::{NewVault, VaultPatch};
use crate::error::MazeError;
use crate::middleware::{ApiJson, RequireUser};
use crate::router::MazeState;
use crate::service::entitlements::vault_capacity;

/// GET /api/vaults
pub async fn list_vaults(
    State(state): State<MazeState>,
    RequireUser { user, .. }: RequireUser,
) -> Result<Json<Value>, MazeError> {
    let vaults = state.storage.list_vaults(&user.id).await?;
    Ok(Json(json!({ "vaults": vaults })))
}

/// POST /api/vaults
pub async fn create_vault(
    State(state): State<MazeState>,
    RequireUser { user, .. }: RequireUser,
    ApiJson(body): ApiJson<NewVault>,
) -> Result<(StatusCode, Json<Value>), MazeError> {
    if body.name.trim().is_empty() {
        return Err(MazeError::validation("Vault name is required"));
    }
    let capacity = vault_capacity(&state.storage, &user).await?;
    let vault = state
        .storage
        .create_vault(&user.id, body, capacity.limit)
        .await?
        .ok_or_else(|| capacity.exceeded())?;
    info!(user_id = %user.id, vault_id = %vault.id, "vault created");
    Ok((StatusCode::CREATED, Json(json!({ "vault": vault }))))
}

/// GET /api/vaults/{id}
pub async fn get_vault(
    State(state): State<MazeState>,
    RequireUser { user, .. }: RequireUser,
    Path(vault_id): Path<String>,
) -> Result<Json<Value>, MazeError> {
    let vault = state
        .storage
        .get_vault(&user.id, &vault_id)
        .await?
        .ok_or(MazeError::NotFound("Vault"))?;
    Ok(Json(json!({ "vault": vault })))
}

/// PUT /api/vaults/{id}
pub async fn update_vault(
    State(state): State<MazeState>,
    RequireUser { user, .. }: RequireUser,
    Path(vault_id): Path<String>,
    ApiJson(patch): ApiJson<VaultPatch>,
) -> Result<Json<Value>, MazeError> {
    if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(MazeError::validation("Vault name cannot be empty"));
    }
    let vault = state
        .storage
        .update_vault(&user.id, &vault_id, patch)
        .await?
        .ok_or(MazeError::NotFound("Vault"))?;
    Ok(Json(json!({ "vault": vault })))
}

/// DELETE /api/vaults/{id}
pub async fn delete_vault(
    State(state): State<MazeState>,
    RequireUser { user, .. }: RequireUser,
    Path(vault_id): Path<String>,
) -> Result<Json<Value>, MazeError> {
    let deleted = state
        .storage
        .delete_vault(&user.id, &vault_id)
        .await?
        .ok_or(MazeError::NotFound("Vault"))?;
    info!(user_id = %user.id, vault_id = %vault_id, deleted_passwords = deleted, "vault deleted");
    Ok(Json(json!({
        "success": true,
        "deleted_passwords": deleted,
    })))
}
