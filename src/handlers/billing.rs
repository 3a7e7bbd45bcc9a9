use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::db::models::{DbPayment, PaymentStatus};
use crate::db::sqlite::new_id;
use crate::error::MazeError;
use crate::middleware::{ApiJson, RequireUser};
use crate::router::MazeState;
use crate::service::entitlements::effective_plan;
use crate::types::plans::{PLANS, PlanId, format_paise};
use crate::types::upi::{UPI_APPS, UpiLink, is_valid_utr};

/// GET /api/plans
pub async fn list_plans() -> Json<Value> {
    Json(json!({ "plans": &*PLANS }))
}

/// GET /api/subscription
pub async fn subscription(
    State(state): State<MazeState>,
    RequireUser { user, .. }: RequireUser,
) -> Result<Json<Value>, MazeError> {
    let effective = effective_plan(&state.storage, &user).await?;
    let plan = effective.details();
    let vaults = state.storage.count_vaults(&user.id).await?;
    let passwords = state.storage.count_passwords(&user.id).await?;
    Ok(Json(json!({
        "plan": effective.plan,
        "plan_name": plan.name,
        "status": effective.status,
        "expires_at": effective.expires_at,
        "limits": plan.limits,
        "usage": {
            "vaults": vaults,
            "passwords": passwords,
        },
    })))
}

/// GET /api/payments
pub async fn list_payments(
    State(state): State<MazeState>,
    RequireUser { user, .. }: RequireUser,
) -> Result<Json<Value>, MazeError> {
    let payments = state.storage.list_user_payments(&user.id).await?;
    Ok(Json(json!({ "payments": payments })))
}

/// GET /api/payments/upi/methods
pub async fn upi_methods() -> Json<Value> {
    Json(json!(&*UPI_APPS))
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderBody {
    #[serde(default)]
    pub plan_id: String,
    pub upi_app: Option<String>,
}

/// POST /api/payments/upi/create-order
pub async fn create_order(
    State(state): State<MazeState>,
    RequireUser { user, .. }: RequireUser,
    ApiJson(body): ApiJson<CreateOrderBody>,
) -> Result<(StatusCode, Json<Value>), MazeError> {
    let plan_id: PlanId = body.plan_id.parse().map_err(MazeError::Validation)?;
    let plan = plan_id.plan();
    if !plan.is_paid() {
        return Err(MazeError::validation("The free plan does not need a payment"));
    }
    let upi_app = match body.upi_app.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(app) => {
            let app = app.to_ascii_lowercase();
            if !UPI_APPS.contains_key(app.as_str()) {
                return Err(MazeError::validation(format!("Unsupported UPI app `{app}`")));
            }
            Some(app)
        }
    };

    let billing = &state.config.billing;
    let now = Utc::now();
    let payment = DbPayment {
        id: new_id(),
        user_id: user.id.clone(),
        plan: plan_id,
        amount_paise: plan.price_paise,
        currency: plan.currency.to_string(),
        upi_app,
        status: PaymentStatus::Created,
        utr: None,
        note: None,
        created_at: now,
        expires_at: now + Duration::minutes(billing.order_ttl_minutes.max(1)),
        updated_at: now,
    };
    state.storage.insert_payment(&payment).await?;

    let note = format!("Maze {} subscription", plan.name);
    let upi_link = UpiLink {
        payee_vpa: &billing.payee_vpa,
        payee_name: &billing.payee_name,
        amount_paise: payment.amount_paise,
        note: &note,
        reference: &payment.id,
    }
    .to_uri();
    info!(
        user_id = %user.id,
        order_id = %payment.id,
        plan = %plan_id,
        amount_paise = payment.amount_paise,
        "payment order created"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "order_id": payment.id,
            "plan_id": plan_id,
            "amount": plan.price_rupees(),
            "amount_paise": payment.amount_paise,
            "currency": payment.currency,
            "upi_app": payment.upi_app,
            "upi_link": upi_link,
            "payee_vpa": billing.payee_vpa,
            "payee_name": billing.payee_name,
            "expires_at": payment.expires_at,
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct VerifyBody {
    #[serde(default)]
    pub order_id: String,
    #[serde(default)]
    pub utr: String,
}

/// POST /api/payments/upi/verify
///
/// Records the UTR the user reports and hands the order to an admin; no
/// payment gateway is consulted.
pub async fn verify_payment(
    State(state): State<MazeState>,
    RequireUser { user, .. }: RequireUser,
    ApiJson(body): ApiJson<VerifyBody>,
) -> Result<Json<Value>, MazeError> {
    let order_id = body.order_id.trim();
    let utr = body.utr.trim();
    if order_id.is_empty() || utr.is_empty() {
        return Err(MazeError::validation("order_id and utr are required"));
    }
    let payment = state
        .storage
        .get_user_payment(&user.id, order_id)
        .await?
        .ok_or(MazeError::NotFound("Order"))?;
    if payment.status != PaymentStatus::Created {
        return Err(MazeError::Conflict(format!(
            "Order is already {}",
            payment.status.as_str()
        )));
    }
    if payment.expires_at <= Utc::now() {
        return Err(MazeError::validation("Order has expired; create a new one"));
    }
    if !is_valid_utr(utr) {
        return Err(MazeError::validation("UTR must be exactly 12 digits"));
    }

    let message = format!(
        "{} submitted UTR {} for {} ({} INR)",
        user.email,
        utr,
        payment.plan,
        format_paise(payment.amount_paise)
    );
    state
        .storage
        .submit_payment(&payment.id, utr, &message)
        .await?;
    info!(user_id = %user.id, order_id = %payment.id, "payment submitted for verification");

    Ok(Json(json!({
        "status": "pending_verification",
        "order_id": payment.id,
        "message": "Payment submitted; it will be activated once an admin verifies it",
    })))
}
