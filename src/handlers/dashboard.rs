// src/handlers/dashboard.rs

use axum::{
    Extension, Json,
    extract::State,
    http::header,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde_json::json;

use crate::{
    config::EXAM_LIST_LIMIT,
    error::AppError,
    handlers::{
        current_user,
        student::{current_exam_for, scores_for},
        teacher::students_of,
    },
    models::user::{Profile, Role},
    state::AppState,
    utils::jwt::{Session, clear_session_cookie},
};

/// Landing and login pages. An already authenticated caller is sent to
/// the dashboard instead.
pub async fn landing(Extension(session): Extension<Session>) -> Response {
    if session.is_authenticated() {
        return Redirect::to("/dashboard").into_response();
    }
    Json(json!({ "view": "login" })).into_response()
}

/// Role-specific dashboard.
///
/// A token whose user no longer exists is revoked and the cookie cleared.
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Response, AppError> {
    let user = match current_user(&state, &session).await {
        Ok(user) => user,
        Err(err @ AppError::AuthError(_)) => {
            let mut response = err.into_response();
            response
                .headers_mut()
                .insert(header::SET_COOKIE, clear_session_cookie());
            return Ok(response);
        }
        Err(err) => return Err(err),
    };

    let profile = Profile::from(&user);
    let body = match user.role {
        Role::Student => {
            let current = current_exam_for(&state, user.id, Utc::now()).await?;
            let scores = scores_for(&state, user.id).await?;
            json!({
                "view": "student",
                "profile": profile,
                "current": current,
                "scores": scores,
            })
        }
        Role::Teacher => {
            let exams = state.store.list_exams(Some(EXAM_LIST_LIMIT)).await?;
            let students = students_of(&state, user.id).await?;
            json!({
                "view": "teacher",
                "profile": profile,
                "exams": exams,
                "students": students,
            })
        }
        Role::Unauthenticated => {
            return Err(AppError::AuthError("Not logged in".to_string()));
        }
    };

    Ok(Json(body).into_response())
}
