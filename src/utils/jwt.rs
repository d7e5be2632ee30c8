// src/utils/jwt.rs

use std::{
    collections::HashSet,
    sync::{Arc, PoisonError, RwLock},
};

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, Request, header},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, models::user::Role};

/// Name of the cookie carrying the session token.
pub const TOKEN_COOKIE: &str = "token";

// Ten years.
const MAX_TOKEN_TTL_SECONDS: i64 = 10 * 365 * 24 * 60 * 60;

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject - the user id, absent for anonymous credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    pub role: Role,
    /// Issued-at as Unix timestamp.
    pub iat: i64,
    /// Expiration time as Unix timestamp.
    pub exp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Token has expired")]
    Expired,
    #[error("Token is malformed or has an invalid signature")]
    Malformed,
    #[error("Token has been revoked")]
    Revoked,
}

/// Tokens invalidated by logout.
///
/// Kept apart from signature checks so the backing storage can change
/// without touching validation.
pub trait RevocationList: Send + Sync {
    fn revoke(&self, token: &str);
    fn is_revoked(&self, token: &str) -> bool;
}

/// Process-local revocation set. Entries are never swept, so a restart
/// forgets every logout; tokens issued before it become usable again until
/// they expire.
#[derive(Debug, Default)]
pub struct InMemoryRevocations {
    tokens: RwLock<HashSet<String>>,
}

impl InMemoryRevocations {
    pub fn len(&self) -> usize {
        self.tokens.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RevocationList for InMemoryRevocations {
    fn revoke(&self, token: &str) {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.to_owned());
    }

    fn is_revoked(&self, token: &str) -> bool {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(token)
    }
}

/// Issues, validates and revokes role-carrying session tokens (HS256).
pub struct SessionAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    revoked: Arc<dyn RevocationList>,
}

impl SessionAuthority {
    pub fn new(secret: &str, ttl_seconds: u64) -> Self {
        Self::with_revocations(secret, ttl_seconds, Arc::new(InMemoryRevocations::default()))
    }

    pub fn with_revocations(
        secret: &str,
        ttl_seconds: u64,
        revoked: Arc<dyn RevocationList>,
    ) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::seconds(
                i64::try_from(ttl_seconds)
                    .unwrap_or(MAX_TOKEN_TTL_SECONDS)
                    .min(MAX_TOKEN_TTL_SECONDS),
            ),
            revoked,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Signs a new token for `role`, valid from now for the configured lifetime.
    pub fn issue(&self, role: Role, identity: Option<&str>) -> Result<String, AppError> {
        self.issue_at(role, identity, Utc::now())
    }

    pub fn issue_at(
        &self,
        role: Role,
        identity: Option<&str>,
        issued_at: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let claims = Claims {
            sub: identity.map(str::to_owned),
            role,
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::InternalServerError(e.to_string()))
    }

    /// Signature and expiry only; ignores revocation.
    pub fn verify_signature(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Malformed,
            })
    }

    pub fn is_revoked(&self, token: &str) -> bool {
        self.revoked.is_revoked(token)
    }

    /// Full check: signature, expiry, then revocation.
    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.verify_signature(token)?;
        if self.is_revoked(token) {
            return Err(AuthError::Revoked);
        }
        Ok(claims)
    }

    pub fn revoke(&self, token: &str) {
        self.revoked.revoke(token);
    }
}

/// The caller's resolved credential, injected into request extensions.
#[derive(Debug, Clone)]
pub struct Session {
    pub role: Role,
    /// Raw `sub` claim.
    pub subject: Option<String>,
    /// The token the caller presented, if it validated.
    pub token: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self {
            role: Role::Unauthenticated,
            subject: None,
            token: None,
        }
    }

    fn from_claims(claims: Claims, token: String) -> Self {
        Self {
            role: claims.role,
            subject: claims.sub,
            token: Some(token),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.role.is_authenticated()
    }

    /// The user id behind an authenticated session.
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        self.subject
            .as_deref()
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| AppError::AuthError("Authentication required".to_string()))
    }
}

/// Reads the token from `Authorization: Bearer <token>` or the `token` cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    if let Some(token) = bearer {
        return Some(token.trim().to_owned());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == TOKEN_COOKIE)
        .map(|(_, value)| value.to_owned())
        .filter(|value| !value.is_empty())
}

pub fn session_cookie(token: &str, max_age: Duration) -> HeaderValue {
    let cookie = format!(
        "{TOKEN_COOKIE}={token}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax",
        max_age.num_seconds()
    );
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| clear_session_cookie())
}

pub fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static("token=; Max-Age=0; Path=/; HttpOnly; SameSite=Lax")
}

/// Axum Middleware: Session resolution.
///
/// Validates the presented token and injects a `Session` into the request
/// extensions. Expired, malformed or revoked tokens degrade the caller to
/// `Unauthenticated` instead of failing the request.
pub async fn session_middleware(
    State(sessions): State<Arc<SessionAuthority>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let session = match extract_token(req.headers()) {
        Some(token) => match sessions.validate(&token) {
            Ok(claims) => Session::from_claims(claims, token),
            Err(e) => {
                tracing::debug!("Ignoring presented token: {}", e);
                Session::anonymous()
            }
        },
        None => Session::anonymous(),
    };

    req.extensions_mut().insert(session);
    next.run(req).await
}

fn ensure_role(req: &Request<Body>, required: Option<Role>) -> Result<(), AppError> {
    let role = req
        .extensions()
        .get::<Session>()
        .map(|s| s.role)
        .unwrap_or(Role::Unauthenticated);

    if !role.is_authenticated() {
        return Err(AppError::AuthError("Authentication required".to_string()));
    }
    match required {
        Some(required) if required != role => Err(AppError::PermissionDenied(format!(
            "This resource requires the {} role",
            required
        ))),
        _ => Ok(()),
    }
}

/// Axum Middleware: any authenticated role.
///
/// Must be used AFTER `session_middleware`.
pub async fn authenticated_middleware(
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    ensure_role(&req, None)?;
    Ok(next.run(req).await)
}

/// Axum Middleware: Student routes. 401 when anonymous, 403 for teachers.
pub async fn student_middleware(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    ensure_role(&req, Some(Role::Student))?;
    Ok(next.run(req).await)
}

/// Axum Middleware: Teacher routes. 401 when anonymous, 403 for students.
pub async fn teacher_middleware(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    ensure_role(&req, Some(Role::Teacher))?;
    Ok(next.run(req).await)
}
