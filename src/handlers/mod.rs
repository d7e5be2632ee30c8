// src/handlers/mod.rs

use crate::{error::AppError, models::user::User, state::AppState, utils::jwt::Session};

pub mod auth;
pub mod dashboard;
pub mod student;
pub mod teacher;

/// Loads the user behind an authenticated session.
///
/// A valid token naming a user that no longer exists means stale data or a
/// leaked signing secret: the token is revoked and the caller must log in again.
pub(crate) async fn current_user(state: &AppState, session: &Session) -> Result<User, AppError> {
    let user_id = session.user_id()?;

    match state.store.find_user(user_id).await? {
        Some(user) => Ok(user),
        None => {
            tracing::warn!(%user_id, "Valid token for a missing user; forcing re-authentication");
            if let Some(token) = &session.token {
                state.sessions.revoke(token);
            }
            Err(AppError::AuthError(
                "Session user no longer exists".to_string(),
            ))
        }
    }
}
