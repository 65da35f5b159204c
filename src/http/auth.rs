use super::{ApiJson, AppState};
use crate::core::auth::{AuthOutcome, SigninRequest, SignupRequest};
use crate::domain::model::{Role, Session};
use crate::utils::error::AppError;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{async_trait, Json, Router};
use serde_json::{json, Value};

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Any signed-in user.
pub struct AuthSession(pub Session);

/// A signed-in user with the admin role.
pub struct AdminSession(pub Session);

#[async_trait]
impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(AppError::Unauthorized)?;
        let session = state.auth.authenticate(token).await?;
        Ok(AuthSession(session))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthSession(session) = AuthSession::from_request_parts(parts, state).await?;
        if session.role != Role::Admin {
            return Err(AppError::Forbidden);
        }
        Ok(AdminSession(session))
    }
}

async fn signup(
    State(st): State<AppState>,
    ApiJson(request): ApiJson<SignupRequest>,
) -> Result<(StatusCode, Json<AuthOutcome>), AppError> {
    let outcome = st.auth.signup(request).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn signin(
    State(st): State<AppState>,
    ApiJson(request): ApiJson<SigninRequest>,
) -> Result<Json<AuthOutcome>, AppError> {
    Ok(Json(st.auth.signin(request).await?))
}

async fn signout(
    State(st): State<AppState>,
    AuthSession(session): AuthSession,
) -> Result<Json<Value>, AppError> {
    st.auth.signout(&session.token).await?;
    Ok(Json(json!({ "success": true })))
}

async fn current_session(AuthSession(session): AuthSession) -> Json<Value> {
    Json(json!({
        "userId": session.user_id,
        "role": session.role,
        "expiresAt": session.expires_at,
    }))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/signin", post(signin))
        .route("/auth/signout", post(signout))
        .route("/auth/session", get(current_session))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
