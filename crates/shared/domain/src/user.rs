//! User aggregate and related types.
//!
//! A [`NewUser`] is the validated, not yet persisted form of a user and has
//! no identity. Storage assigns `id` and `created_at` and hands back a
//! [`User`].

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::constants::{
    MAX_EMAIL_LENGTH, MAX_FULL_NAME_LENGTH, MAX_USERNAME_LENGTH, MIN_USERNAME_LENGTH,
};
use crate::error::{DomainError, DomainResult};

/// Persisted user entity (aggregate root)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub created_at: NaiveDateTime,
}

impl User {
    /// Replace the full name, returning the updated entity.
    ///
    /// The new value must be non-empty and fit the column width.
    pub fn change_full_name(self, full_name: impl Into<String>) -> DomainResult<Self> {
        let full_name = full_name.into();
        validate_full_name_change(&full_name)?;

        Ok(Self {
            full_name: Some(full_name),
            ..self
        })
    }
}

/// Validated user that has not been stored yet.
///
/// Fields are private so the only way to obtain one is [`NewUser::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    username: String,
    email: String,
    full_name: Option<String>,
}

impl NewUser {
    /// Factory: validate username/email/full name and build the entity.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        full_name: Option<String>,
    ) -> DomainResult<Self> {
        let username = username.into();
        let email = email.into();

        validate_username(&username)?;
        validate_email(&email)?;
        if let Some(name) = full_name.as_deref() {
            validate_full_name(name)?;
        }

        Ok(Self {
            username,
            email,
            full_name,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn full_name(&self) -> Option<&str> {
        self.full_name.as_deref()
    }
}

impl TryFrom<CreateUser> for NewUser {
    type Error = DomainError;

    fn try_from(cmd: CreateUser) -> DomainResult<Self> {
        NewUser::new(cmd.username, cmd.email, cmd.full_name)
    }
}

fn validate_username(username: &str) -> DomainResult<()> {
    let len = username.chars().count();
    if len < MIN_USERNAME_LENGTH {
        return Err(DomainError::validation(format!(
            "Username must be at least {} characters",
            MIN_USERNAME_LENGTH
        )));
    }
    if len > MAX_USERNAME_LENGTH {
        return Err(DomainError::validation(format!(
            "Username must be at most {} characters",
            MAX_USERNAME_LENGTH
        )));
    }
    Ok(())
}

/// Accepts `local@domain` where both parts are non-empty and the domain
/// contains a dot that is neither leading nor trailing.
fn validate_email(email: &str) -> DomainResult<()> {
    if email.chars().count() > MAX_EMAIL_LENGTH {
        return Err(DomainError::validation(format!(
            "Email must be at most {} characters",
            MAX_EMAIL_LENGTH
        )));
    }

    let invalid = || DomainError::validation("Invalid email format");
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;

    if local.is_empty()
        || domain.is_empty()
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(invalid());
    }
    Ok(())
}

fn validate_full_name(full_name: &str) -> DomainResult<()> {
    if full_name.chars().count() > MAX_FULL_NAME_LENGTH {
        return Err(DomainError::validation(format!(
            "Full name must be at most {} characters",
            MAX_FULL_NAME_LENGTH
        )));
    }
    Ok(())
}

fn validate_full_name_change(full_name: &str) -> DomainResult<()> {
    if full_name.is_empty() {
        return Err(DomainError::validation("Full name cannot be empty"));
    }
    validate_full_name(full_name)
}

/// User creation data transfer object
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    /// Unique login name
    pub username: String,
    /// Unique email address
    pub email: String,
    /// Optional display name
    pub full_name: Option<String>,
}

/// User update data transfer object
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUser {
    /// New display name (`None` leaves it unchanged)
    pub full_name: Option<String>,
}

impl UpdateUser {
    /// Check the requested changes without touching a stored user.
    pub fn validate(&self) -> DomainResult<()> {
        match self.full_name.as_deref() {
            Some(name) => validate_full_name_change(name),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn stored_user() -> User {
        User {
            id: 1,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            full_name: None,
            created_at: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_new_user_valid() {
        let user = NewUser::new("alice", "alice@example.com", Some("Alice".to_string())).unwrap();

        assert_eq!(user.username(), "alice");
        assert_eq!(user.email(), "alice@example.com");
        assert_eq!(user.full_name(), Some("Alice"));
    }

    #[test]
    fn test_username_too_short() {
        let result = NewUser::new("al", "alice@example.com", None);
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_username_boundaries() {
        assert!(NewUser::new("abc", "a@b.co", None).is_ok());
        assert!(NewUser::new("a".repeat(100), "a@b.co", None).is_ok());
        assert!(NewUser::new("a".repeat(101), "a@b.co", None).is_err());
    }

    #[test]
    fn test_username_counts_characters_not_bytes() {
        // 100 two-byte characters still fit
        assert!(NewUser::new("é".repeat(100), "a@b.co", None).is_ok());
    }

    #[test]
    fn test_invalid_emails() {
        for email in [
            "alice",
            "@example.com",
            "alice@",
            "alice@example",
            "alice@.example.com",
            "alice@example.com.",
        ] {
            assert!(
                NewUser::new("alice", email, None).is_err(),
                "{} should be rejected",
                email
            );
        }
    }

    #[test]
    fn test_email_too_long() {
        let email = format!("{}@example.com", "a".repeat(250));
        assert!(NewUser::new("alice", email, None).is_err());
    }

    #[test]
    fn test_full_name_too_long() {
        let result = NewUser::new("alice", "alice@example.com", Some("x".repeat(256)));
        assert!(result.is_err());
    }

    #[test]
    fn test_try_from_create_command() {
        let cmd = CreateUser {
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            full_name: None,
        };

        let user = NewUser::try_from(cmd).unwrap();
        assert_eq!(user.username(), "bob");
        assert_eq!(user.full_name(), None);
    }

    #[test]
    fn test_change_full_name() {
        let user = stored_user();
        let created_at = user.created_at;

        let updated = user.change_full_name("Alice Liddell").unwrap();

        assert_eq!(updated.id, 1);
        assert_eq!(updated.full_name.as_deref(), Some("Alice Liddell"));
        assert_eq!(updated.created_at, created_at);
    }

    #[test]
    fn test_change_full_name_rejects_empty() {
        let result = stored_user().change_full_name("");
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_update_command_validation() {
        assert!(UpdateUser::default().validate().is_ok());

        let empty = UpdateUser {
            full_name: Some(String::new()),
        };
        assert!(empty.validate().is_err());

        let too_long = UpdateUser {
            full_name: Some("x".repeat(256)),
        };
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn test_user_serializes_null_full_name() {
        let json = serde_json::to_value(stored_user()).unwrap();

        assert_eq!(json["id"], 1);
        assert_eq!(json["username"], "alice");
        assert!(json["full_name"].is_null());
    }
}
