use axum::RequestPartsExt;
use axum::extract::FromRequestParts;
use axum::http::{HeaderName, HeaderValue, request::Parts};
use axum_extra::TypedHeader;
use chrono::Utc;
use headers::authorization::Bearer;
use headers::{Authorization, Header};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::db::models::DbUser;
use crate::error::MazeError;
use crate::router::MazeState;
use crate::service::credentials::hash_session_token;

static X_USER_ID: HeaderName = HeaderName::from_static("x-user-id");
static X_ADMIN_KEY: HeaderName = HeaderName::from_static("x-admin-key");

fn decode_single<'i, I>(values: &mut I) -> Result<String, headers::Error>
where
    I: Iterator<Item = &'i HeaderValue>,
{
    let value = values.next().ok_or_else(headers::Error::invalid)?;
    let value = value
        .to_str()
        .map_err(|_| headers::Error::invalid())?
        .trim();
    if value.is_empty() {
        return Err(headers::Error::invalid());
    }
    Ok(value.to_string())
}

fn encode_single<E: Extend<HeaderValue>>(value: &str, values: &mut E) {
    if let Ok(v) = HeaderValue::from_str(value) {
        values.extend(std::iter::once(v));
    }
}

/// Legacy `X-User-ID` header, honoured only when
/// `security.trust_user_id_header` is set.
#[derive(Debug, Clone)]
pub struct XUserId(pub String);

impl Header for XUserId {
    fn name() -> &'static HeaderName {
        &X_USER_ID
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        decode_single(values).map(XUserId)
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        encode_single(&self.0, values);
    }
}

/// `X-Admin-Key` shared secret for the admin routes.
#[derive(Clone)]
pub struct XAdminKey(pub String);

impl Header for XAdminKey {
    fn name() -> &'static HeaderName {
        &X_ADMIN_KEY
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        decode_single(values).map(XAdminKey)
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        encode_single(&self.0, values);
    }
}

/// Authenticated account for the request.
///
/// Accepts `Authorization: Bearer <session token>`; when configured, also
/// the legacy `X-User-ID` header. `session` carries the stored token hash
/// for bearer logins so logout can revoke it.
#[derive(Debug, Clone)]
pub struct RequireUser {
    pub user: DbUser,
    pub session: Option<String>,
}

impl FromRequestParts<MazeState> for RequireUser {
    type Rejection = MazeError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &MazeState,
    ) -> Result<Self, Self::Rejection> {
        let bearer = parts
            .extract::<Option<TypedHeader<Authorization<Bearer>>>>()
            .await
            .map_err(|_| MazeError::Unauthorized)?;

        if let Some(TypedHeader(Authorization(bearer))) = bearer {
            let token_hash = hash_session_token(bearer.token());
            let session = state
                .storage
                .get_session(&token_hash)
                .await?
                .ok_or(MazeError::Unauthorized)?;
            if session.expires_at <= Utc::now() {
                debug!(user_id = %session.user_id, "session expired");
                state.storage.delete_session(&token_hash).await?;
                return Err(MazeError::Unauthorized);
            }
            let user = state
                .storage
                .get_user(&session.user_id)
                .await?
                .ok_or(MazeError::Unauthorized)?;
            return Ok(Self {
                user,
                session: Some(token_hash),
            });
        }

        if state.config.security.trust_user_id_header
            && let Some(TypedHeader(XUserId(user_id))) = parts
                .extract::<Option<TypedHeader<XUserId>>>()
                .await
                .map_err(|_| MazeError::Unauthorized)?
        {
            let user = state
                .storage
                .get_user(&user_id)
                .await?
                .ok_or(MazeError::Unauthorized)?;
            return Ok(Self {
                user,
                session: None,
            });
        }

        Err(MazeError::Unauthorized)
    }
}

/// Compare a presented admin key against the configured one.
/// An empty configured key disables admin access entirely.
pub fn ensure_admin(expected: &str, provided: Option<&str>) -> Result<(), MazeError> {
    if expected.is_empty() {
        return Err(MazeError::Forbidden);
    }
    let provided = provided.ok_or(MazeError::Unauthorized)?;
    if bool::from(expected.as_bytes().ct_eq(provided.as_bytes())) {
        Ok(())
    } else {
        warn!("rejected admin request with wrong key");
        Err(MazeError::Forbidden)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin;

impl FromRequestParts<MazeState> for RequireAdmin {
    type Rejection = MazeError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &MazeState,
    ) -> Result<Self, Self::Rejection> {
        let key = parts
            .extract::<Option<TypedHeader<XAdminKey>>>()
            .await
            .map_err(|_| MazeError::Unauthorized)?;
        let provided = key.as_ref().map(|TypedHeader(XAdminKey(k))| k.as_str());
        ensure_admin(&state.config.security.admin_key, provided)?;
        Ok(Self)
    }
}
