use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::error::MazeError;
use crate::middleware::{ApiJsonOrDefault, ApiQuery, RequireAdmin};
use crate::router::MazeState;
use crate::types::plans::format_paise;

/// GET /api/admin/pending-payments
pub async fn pending_payments(
    State(state): State<MazeState>,
    _admin: RequireAdmin,
) -> Result<Json<Value>, MazeError> {
    let payments = state.storage.list_pending_payments().await?;
    Ok(Json(json!({
        "count": payments.len(),
        "payments": payments,
    })))
}

/// POST /api/admin/payments/{id}/approve
pub async fn approve_payment(
    State(state): State<MazeState>,
    _admin: RequireAdmin,
    Path(payment_id): Path<String>,
) -> Result<Json<Value>, MazeError> {
    let subscription = state
        .storage
        .approve_payment(&payment_id, state.config.billing.subscription_days)
        .await?;
    info!(
        payment_id = %payment_id,
        user_id = %subscription.user_id,
        plan = %subscription.plan,
        "payment approved"
    );
    Ok(Json(json!({
        "success": true,
        "payment_id": payment_id,
        "subscription": subscription,
    })))
}

#[derive(Debug, Default, Deserialize)]
pub struct RejectBody {
    pub reason: Option<String>,
}

/// POST /api/admin/payments/{id}/reject
pub async fn reject_payment(
    State(state): State<MazeState>,
    _admin: RequireAdmin,
    Path(payment_id): Path<String>,
    ApiJsonOrDefault(body): ApiJsonOrDefault<RejectBody>,
) -> Result<Json<Value>, MazeError> {
    let reason = body
        .reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());
    let payment = state.storage.reject_payment(&payment_id, reason).await?;
    info!(payment_id = %payment_id, user_id = %payment.user_id, "payment rejected");
    Ok(Json(json!({
        "success": true,
        "payment": payment,
    })))
}

#[derive(Debug, Default, Deserialize)]
pub struct NotificationsQuery {
    #[serde(default)]
    pub unread_only: bool,
}

/// GET /api/admin/notifications
pub async fn notifications(
    State(state): State<MazeState>,
    _admin: RequireAdmin,
    ApiQuery(query): ApiQuery<NotificationsQuery>,
) -> Result<Json<Value>, MazeError> {
    let notifications = state.storage.list_notifications(query.unread_only).await?;
    Ok(Json(json!({ "notifications": notifications })))
}

/// POST /api/admin/notifications/{id}/read
pub async fn mark_notification_read(
    State(state): State<MazeState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<Value>, MazeError> {
    let id: i64 = id
        .parse()
        .map_err(|_| MazeError::validation("Notification id must be an integer"))?;
    if !state.storage.mark_notification_read(id).await? {
        return Err(MazeError::NotFound("Notification"));
    }
    Ok(Json(json!({ "success": true })))
}

/// GET /api/admin/stats
pub async fn stats(
    State(state): State<MazeState>,
    _admin: RequireAdmin,
) -> Result<Json<Value>, MazeError> {
    let stats = state.storage.admin_stats().await?;
    let revenue = format_paise(stats.verified_revenue_paise);
    Ok(Json(json!({
        "stats": stats,
        "verified_revenue": revenue,
    })))
}
