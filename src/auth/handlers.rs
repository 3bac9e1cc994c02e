use axum::{
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::auth::dto::{
    is_valid_email, parse_principal_type, parse_social_provider, validate_password,
    ForgotPasswordRequest, MessageResponse, PublicPrincipal, RefreshRequest, ResetPasswordRequest,
    SignInRequest, SignOutRequest, SocialLoginRequest,
};
use crate::auth::extractors::AuthPrincipal;
use crate::auth::principal::PrincipalRef;
use crate::auth::resolver::{LocalCredentials, SocialIdentity};
use crate::auth::session::{ClientInfo, SessionTokens};
use crate::error::AuthError;
use crate::state::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signin", post(sign_in))
        .route("/auth/social", post(social_login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/signout", post(sign_out))
        .route("/auth/password/forgot", post(forgot_password))
        .route("/auth/password/reset", post(reset_password))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

/// Best-effort client metadata from proxy headers; absent values become
/// "unknown" rather than failing the request.
fn client_info(headers: &HeaderMap) -> ClientInfo {
    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .unwrap_or("unknown")
        .to_string();
    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    ClientInfo {
        ip_address,
        user_agent,
    }
}

#[instrument(skip(state, payload))]
async fn sign_in(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mut payload): Json<SignInRequest>,
) -> Result<Json<SessionTokens>, AuthError> {
    let principal_type = parse_principal_type(&payload.user_type)?;
    payload.email = payload.email.trim().to_lowercase();
    if !is_valid_email(&payload.email) {
        return Err(AuthError::InvalidRequest("Invalid email".into()));
    }

    let creds = LocalCredentials {
        email: payload.email,
        password: payload.password,
        principal_type,
    };
    let tokens = state.sessions.sign_in(&creds, &client_info(&headers)).await?;
    Ok(Json(tokens))
}

#[instrument(skip(state, payload))]
async fn social_login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SocialLoginRequest>,
) -> Result<Json<SessionTokens>, AuthError> {
    let provider = parse_social_provider(&payload.provider)?;
    if payload.provider_id.trim().is_empty() {
        return Err(AuthError::InvalidRequest("Missing provider id".into()));
    }

    let identity = SocialIdentity {
        provider,
        provider_id: payload.provider_id,
        email: payload.email,
        first_name: payload.first_name,
        last_name: payload.last_name,
        profile_picture: payload.profile_picture,
    };
    let tokens = state
        .sessions
        .social_login(&identity, &client_info(&headers))
        .await?;
    Ok(Json(tokens))
}

#[instrument(skip(state, payload))]
async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<SessionTokens>, AuthError> {
    let tokens = state.sessions.refresh(&payload.refresh_token).await?;
    Ok(Json(tokens))
}

#[instrument(skip(state, caller, payload))]
async fn sign_out(
    State(state): State<AppState>,
    AuthPrincipal(caller): AuthPrincipal,
    payload: Option<Json<SignOutRequest>>,
) -> Result<Json<MessageResponse>, AuthError> {
    let body = payload.map(|Json(b)| b).unwrap_or_default();
    let kind = match body.user_type.as_deref() {
        Some(v) => parse_principal_type(v)?,
        None => caller.principal_type,
    };
    let target = PrincipalRef {
        id: body.user_id.unwrap_or(caller.sub),
        kind,
    };

    state.sessions.sign_out(&caller, target).await?;
    Ok(Json(MessageResponse {
        message: "Logged out successfully".into(),
    }))
}

#[instrument(skip(state, payload))]
async fn forgot_password(
    State(state): State<AppState>,
    Json(mut payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    payload.email = payload.email.trim().to_lowercase();
    if !is_valid_email(&payload.email) {
        return Err(AuthError::InvalidRequest("Invalid email".into()));
    }

    state.sessions.request_password_reset(&payload.email).await?;
    Ok(Json(MessageResponse {
        message: "Password reset sent successfully. Check your email for more instructions".into(),
    }))
}

#[instrument(skip(state, payload))]
async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    validate_password(&payload.new_password)?;
    state
        .sessions
        .reset_password(&payload.token, &payload.new_password)
        .await?;
    Ok(Json(MessageResponse {
        message: "Password reset successful".into(),
    }))
}

#[instrument(skip(state, caller))]
async fn get_me(
    State(state): State<AppState>,
    AuthPrincipal(caller): AuthPrincipal,
) -> Result<Json<PublicPrincipal>, AuthError> {
    let target = PrincipalRef {
        id: caller.sub,
        kind: caller.principal_type,
    };
    let principal = state
        .store
        .find_by_id(target, false)
        .await
        .map_err(AuthError::unavailable)?
        .ok_or(AuthError::PrincipalNotFound)?;

    Ok(Json(PublicPrincipal {
        id: principal.id(),
        email: principal.email().to_string(),
        principal_type: principal.principal_type(),
        role: principal.role().to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_info_prefers_the_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        headers.insert("x-real-ip", "10.0.0.2".parse().unwrap());
        headers.insert(
            axum::http::header::USER_AGENT,
            "Mozilla/5.0".parse().unwrap(),
        );
        let client = client_info(&headers);
        assert_eq!(client.ip_address, "203.0.113.9");
        assert_eq!(client.user_agent, "Mozilla/5.0");
    }

    #[test]
    fn client_info_defaults_when_headers_are_missing() {
        let client = client_info(&HeaderMap::new());
        assert_eq!(client.ip_address, "unknown");
        assert_eq!(client.user_agent, "");
    }
}
