//! Auth route handlers.
//!
//! Registration and login answer with the session token in both the JSON
//! payload (for API clients) and a cookie whose max-age matches the token's
//! embedded expiry (for browser clients).

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderName, StatusCode, header},
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::Result;
use crate::middleware::{CurrentUser, SESSION_COOKIE_NAME};
use crate::models::UserView;
use crate::routes::MessageResponse;
use crate::services::{Registration, TOKEN_TTL_SECS};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/profile", get(profile))
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Successful register/login payload.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    pub user: UserView,
    pub token: String,
}

/// Profile payload.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub user: UserView,
}

/// `Set-Cookie` header installing the session token.
fn session_cookie(token: &str, max_age: i64) -> (HeaderName, String) {
    (
        header::SET_COOKIE,
        format!("{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}"),
    )
}

#[instrument(skip(state, req))]
async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let (user, issued) = state
        .auth()
        .register(Registration {
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            password: req.password,
        })
        .await?;

    tracing::info!(user_id = %user.id, "user registered");

    let cookie = session_cookie(&issued.token, TOKEN_TTL_SECS);
    Ok((
        StatusCode::CREATED,
        AppendHeaders([cookie]),
        Json(AuthResponse {
            success: true,
            message: "Registered successfully".to_owned(),
            user: UserView::from(&user),
            token: issued.token,
        }),
    ))
}

#[instrument(skip(state, req))]
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    let (user, issued) = state.auth().login(&req.email, &req.password).await?;

    tracing::info!(user_id = %user.id, "user logged in");

    let cookie = session_cookie(&issued.token, TOKEN_TTL_SECS);
    Ok((
        AppendHeaders([cookie]),
        Json(AuthResponse {
            success: true,
            message: "Login successful".to_owned(),
            user: UserView::from(&user),
            token: issued.token,
        }),
    ))
}

#[instrument(skip(state, user))]
async fn logout(State(state): State<AppState>, user: CurrentUser) -> Result<impl IntoResponse> {
    state.auth().logout(&user.token, user.expires_at).await?;

    tracing::info!(user_id = %user.user_id, "user logged out");

    // Expire the cookie immediately
    let cookie = session_cookie("", 0);
    Ok((
        AppendHeaders([cookie]),
        Json(MessageResponse::ok("Logged out successfully")),
    ))
}

#[instrument(skip(state, user))]
async fn profile(State(state): State<AppState>, user: CurrentUser) -> Result<impl IntoResponse> {
    let user = state.auth().user(user.user_id).await?;
    Ok(Json(ProfileResponse {
        success: true,
        user: UserView::from(&user),
    }))
}
