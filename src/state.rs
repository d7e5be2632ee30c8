// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config, services::schedule::ExamScheduler, store::Store,
    utils::jwt::SessionAuthority,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Config,
    pub sessions: Arc<SessionAuthority>,
    pub scheduler: Arc<ExamScheduler>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        let sessions = Arc::new(SessionAuthority::new(
            &config.jwt_secret,
            config.jwt_expiration,
        ));
        Self {
            store,
            config,
            sessions,
            scheduler: Arc::new(ExamScheduler::new()),
        }
    }
}

impl FromRef<AppState> for Arc<SessionAuthority> {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}
