// src/models/user.rs

use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

static USERNAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{3,24}$").expect("username pattern is valid"));

/// Role carried by a session credential.
///
/// Persisted users are only ever `Student` or `Teacher`; `Unauthenticated`
/// exists for callers without a valid credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Unauthenticated,
    Student,
    Teacher,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Unauthenticated => "unauthenticated",
            Role::Student => "student",
            Role::Teacher => "teacher",
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Role::Unauthenticated)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unauthenticated" => Ok(Role::Unauthenticated),
            "student" => Ok(Role::Student),
            "teacher" => Ok(Role::Teacher),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,

    /// Unique login name, `[A-Za-z0-9]{3,24}`.
    pub username: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    #[sqlx(try_from = "String")]
    pub role: Role,

    /// Display name.
    pub name: String,

    pub class_name: Option<String>,

    /// Student or staff number.
    pub number: i64,

    /// Teacher who imported this student, if any.
    pub belong_to: Option<Uuid>,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for registering a teacher account.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(custom(function = validate_username))]
    pub username: String,
    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub password: String,
    #[validate(custom(function = validate_display_name))]
    pub name: String,
    #[validate(range(min = 1, max = 4294967295_i64, message = "Number is out of range."))]
    pub number: i64,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// DTO for changing the caller's own password.
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, max = 128))]
    pub original_password: String,
    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub new_password: String,
}

/// One parsed student row from a teacher's import.
#[derive(Debug, Deserialize, Validate)]
pub struct StudentImport {
    #[validate(custom(function = validate_username))]
    pub username: String,
    #[validate(length(min = 4, max = 128))]
    pub password: String,
    #[validate(custom(function = validate_display_name))]
    pub name: String,
    #[validate(length(max = 30))]
    pub class_name: Option<String>,
    #[validate(range(min = 1, max = 4294967295_i64, message = "Number is out of range."))]
    pub number: i64,
}

/// Public profile returned to dashboards.
#[derive(Debug, Serialize)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub class_name: Option<String>,
    pub number: i64,
    pub role: Role,
}

impl From<&User> for Profile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            name: user.name.clone(),
            class_name: user.class_name.clone(),
            number: user.number,
            role: user.role,
        }
    }
}

fn validate_username(username: &str) -> Result<(), validator::ValidationError> {
    if USERNAME_PATTERN.is_match(username) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("invalid_username")
            .with_message("Username must be 3 to 24 letters or digits.".into()))
    }
}

// 15 CJK characters at three bytes each.
fn validate_display_name(name: &str) -> Result<(), validator::ValidationError> {
    if name.is_empty() || name.len() > 45 {
        return Err(validator::ValidationError::new("invalid_name")
            .with_message("Name must be between 1 and 45 bytes.".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_text() {
        for role in [Role::Unauthenticated, Role::Student, Role::Teacher] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn username_rules() {
        assert!(validate_username("abc").is_ok());
        assert!(validate_username("Teacher01").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"a".repeat(25)).is_err());
    }

    #[test]
    fn register_request_rejects_out_of_range_number() {
        let req = RegisterRequest {
            username: "teacher1".to_string(),
            password: "secret".to_string(),
            name: "Ada".to_string(),
            number: 0,
        };
        assert!(req.validate().is_err());
    }
}
