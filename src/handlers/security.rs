use axum::{Json, extract::State};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::db::models::DbScan;
use crate::db::sqlite::new_id;
use crate::error::MazeError;
use crate::handlers::auth::is_valid_email;
use crate::middleware::{ApiJson, ApiJsonOrDefault, RequireUser};
use crate::router::MazeState;
use crate::service::password_health::analyze;
use crate::service::threat::{assess, domain_reputation};
use crate::types::breach::BreachStatus;

const SCAN_HISTORY_LIMIT: i64 = 50;

#[derive(Debug, Default, Deserialize)]
pub struct EmailBody {
    pub email: Option<String>,
}

fn normalize_email(email: &str) -> Result<String, MazeError> {
    let email = email.trim().to_ascii_lowercase();
    if !is_valid_email(&email) {
        return Err(MazeError::validation("A valid email is required"));
    }
    Ok(email)
}

/// POST /api/security/check-breach
pub async fn check_breach(
    State(state): State<MazeState>,
    RequireUser { user, .. }: RequireUser,
    ApiJson(body): ApiJson<EmailBody>,
) -> Result<Json<Value>, MazeError> {
    let email = normalize_email(body.email.as_deref().unwrap_or_default())?;
    let report = state.breach.check(&email).await?;
    info!(
        user_id = %user.id,
        breaches_found = report.breaches_found,
        "breach check completed"
    );
    Ok(Json(json!(report)))
}

/// POST /api/security/scan
///
/// A failed breach lookup does not fail the scan; the report then carries
/// `breach_status: "unknown"` and a warning.
pub async fn security_scan(
    State(state): State<MazeState>,
    RequireUser { user, .. }: RequireUser,
    ApiJsonOrDefault(body): ApiJsonOrDefault<EmailBody>,
) -> Result<Json<Value>, MazeError> {
    let email = match body.email.as_deref().map(str::trim) {
        Some(e) if !e.is_empty() => normalize_email(e)?,
        _ => user.email.to_ascii_lowercase(),
    };
    let domain = email
        .rsplit_once('@')
        .map(|(_, d)| d.to_string())
        .unwrap_or_default();

    let mut warnings = Vec::new();
    let breaches = match state.breach.breaches_for(&email).await {
        Ok(found) => Some(found),
        Err(e) => {
            warn!(user_id = %user.id, error = %e, "breach lookup failed during scan");
            warnings.push(format!("Breach lookup unavailable: {e}"));
            None
        }
    };
    let breach_status = match &breaches {
        Some(found) if found.is_empty() => BreachStatus::Safe,
        Some(_) => BreachStatus::Compromised,
        None => BreachStatus::Unknown,
    };

    let entries = state.storage.list_user_passwords(&user.id).await?;
    let health = analyze(&entries);
    let reputation = domain_reputation(&domain);
    let now = Utc::now();
    let assessment = assess(breaches.as_deref(), &reputation, &health, now);

    let scan = DbScan {
        id: new_id(),
        user_id: user.id.clone(),
        email: email.clone(),
        domain: reputation.domain.clone(),
        breach_count: breaches.as_ref().map_or(0, |b| b.len() as i64),
        threat_level: assessment.level,
        security_score: i64::from(assessment.security_score),
        scanned_at: now,
    };
    state.storage.insert_scan(&scan).await?;
    info!(
        user_id = %user.id,
        scan_id = %scan.id,
        threat_level = ?assessment.level,
        "security scan stored"
    );

    Ok(Json(json!({
        "scan_id": scan.id,
        "email": email,
        "breach_status": breach_status,
        "breaches_found": scan.breach_count,
        "breaches": breaches.unwrap_or_default(),
        "domain_reputation": reputation,
        "password_health": {
            "total": health.total,
            "weak": health.weak.len(),
            "reused": health.reused_extra(),
            "score": health.score,
        },
        "threat_points": assessment.points,
        "threat_level": assessment.level,
        "security_score": assessment.security_score,
        "factors": assessment.factors,
        "recommendations": assessment.recommendations,
        "warnings": warnings,
        "scanned_at": now,
    })))
}

/// GET /api/security/scans
pub async fn list_scans(
    State(state): State<MazeState>,
    RequireUser { user, .. }: RequireUser,
) -> Result<Json<Value>, MazeError> {
    let scans = state.storage.list_scans(&user.id, SCAN_HISTORY_LIMIT).await?;
    Ok(Json(json!({ "scans": scans })))
}

/// GET /api/security/password-health
pub async fn password_health(
    State(state): State<MazeState>,
    RequireUser { user, .. }: RequireUser,
) -> Result<Json<Value>, MazeError> {
    let entries = state.storage.list_user_passwords(&user.id).await?;
    Ok(Json(json!(analyze(&entries))))
}
