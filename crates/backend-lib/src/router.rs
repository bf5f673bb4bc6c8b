// ============================
// crates/backend-lib/src/router.rs
// ============================
//! HTTP router and handlers.
//!
//! Thin glue over the registration service and the auth gateway. The
//! interesting invariants live below this layer; handlers only move
//! proofs between HTTP carriers (cookie / Authorization header) and
//! the gateway.
use crate::auth::gateway::AuthProof;
use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use pms_common::{LoginRequest, LoginResponse, MessageResponse, RegisterRequest, RegisterResponse};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "pms_session";

/// Create the HTTP router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/ping", get(ping))
        .route("/api/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/auth/logout", post(logout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root() -> &'static str {
    "Root API is running!"
}

async fn ping() -> &'static str {
    "pong"
}

/// `POST /api/register`: self-service registration
async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id = state.registration.register(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Identity registered successfully".to_string(),
            id,
        }),
    ))
}

/// `POST /auth/login`: authenticate and issue the configured proof
async fn login(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, AppError> {
    if !state.rate_limiter.check_rate_limit(addr.ip()) {
        return Err(AppError::RateLimited);
    }

    let (proof, user) = match state.gateway.login(&request.unique_key, &request.password).await {
        Ok(outcome) => {
            state.rate_limiter.record_success(addr.ip());
            outcome
        },
        Err(e) => {
            if matches!(e, AppError::InvalidCredentials) {
                state.rate_limiter.record_failed_attempt(addr.ip());
            }
            return Err(e);
        },
    };

    let response = match proof {
        AuthProof::SessionCookie(token) => {
            let cookie = format!(
                "{SESSION_COOKIE}={token}; HttpOnly; Path=/; Max-Age={}; SameSite=Lax",
                state.settings.session_ttl_secs
            );
            (
                [(header::SET_COOKIE, cookie)],
                Json(LoginResponse {
                    message: "Login successful".to_string(),
                    user,
                    token: None,
                }),
            )
                .into_response()
        },
        AuthProof::BearerToken(token) => Json(LoginResponse {
            message: "Login successful".to_string(),
            user,
            token: Some(token),
        })
        .into_response(),
    };
    Ok(response)
}

/// `GET /auth/me`: resolve the presented proof to the identity view
async fn me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let presented = extract_proof(&headers).ok_or(AppError::Unauthenticated)?;
    let user = state.gateway.authenticate(&presented).await?;
    Ok(Json(user))
}

/// `POST /auth/logout`: destroy the presented session (session mode)
async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let presented = extract_proof(&headers).ok_or(AppError::Unauthenticated)?;
    state.gateway.logout(&presented).await?;

    // Instruct the client to discard the cookie as well
    let clear = format!("{SESSION_COOKIE}=; HttpOnly; Path=/; Max-Age=0");
    Ok((
        [(header::SET_COOKIE, clear)],
        Json(MessageResponse {
            message: "Logged out successfully".to_string(),
        }),
    )
        .into_response())
}

/// Pull the proof out of its HTTP carrier: Authorization bearer header
/// first, session cookie second.
fn extract_proof(headers: &HeaderMap) -> Option<String> {
    if let Some(auth) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        if let Some(token) = auth.strip_prefix("Bearer ") {
            let token = token.trim();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }

    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
    })
}
