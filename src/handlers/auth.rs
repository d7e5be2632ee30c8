// src/handlers/auth.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::current_user,
    models::user::{ChangePasswordRequest, LoginRequest, Profile, RegisterRequest, Role, User},
    state::AppState,
    utils::{
        hash::{hash_password, verify_password},
        jwt::{Session, SessionAuthority, clear_session_cookie, session_cookie},
    },
};

/// Registers a new teacher account.
///
/// Students are never self-registered; teachers import them.
/// Returns 201 Created and the public profile.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = User {
        id: Uuid::new_v4(),
        username: payload.username,
        password: hash_password(&payload.password)?,
        role: Role::Teacher,
        name: payload.name,
        class_name: None,
        number: payload.number,
        belong_to: None,
        created_at: Utc::now(),
    };
    state.store.insert_user(&user).await?;

    tracing::info!(user_id = %user.id, username = %user.username, "Teacher registered");
    Ok((StatusCode::CREATED, Json(Profile::from(&user))))
}

/// Authenticates a user and returns a session token.
///
/// The token is returned in the body (for `Authorization: Bearer`) and as
/// the `token` cookie.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, AppError> {
    payload.validate()?;

    // Same message for both failures so usernames cannot be probed.
    let invalid = || AppError::AuthError("Username or password does not match".to_string());

    let user = state
        .store
        .find_user_by_username(&payload.username)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(invalid());
    }

    let token = state.sessions.issue(user.role, Some(&user.id.to_string()))?;
    let ttl = state.sessions.ttl();

    let mut response = Json(json!({
        "token": token,
        "type": "Bearer",
        "role": user.role,
        "expires_in": ttl.num_seconds(),
    }))
    .into_response();
    response
        .headers_mut()
        .insert(header::SET_COOKIE, session_cookie(&token, ttl));
    Ok(response)
}

/// Revokes the presented token and clears the cookie.
pub async fn logout(
    State(sessions): State<Arc<SessionAuthority>>,
    Extension(session): Extension<Session>,
) -> impl IntoResponse {
    if let Some(token) = &session.token {
        sessions.revoke(token);
        tracing::info!(subject = ?session.subject, "Session revoked");
    }

    (
        [(header::SET_COOKIE, clear_session_cookie())],
        Json(json!({ "message": "Logged out" })),
    )
}

/// Changes the caller's own password after checking the original one.
pub async fn change_password(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = current_user(&state, &session).await?;
    if !verify_password(&payload.original_password, &user.password)? {
        return Err(AppError::BadRequest(
            "Original password is incorrect".to_string(),
        ));
    }

    let hashed = hash_password(&payload.new_password)?;
    if !state.store.update_password(user.id, &hashed).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(Json(json!({ "message": "Password changed" })))
}
