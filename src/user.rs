//! User accounts and per-user settings.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::task::{now_string, ValidationError};

/// Unique identifier for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered user. The password hash never leaves the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    /// Build a user from registration data and an already computed hash.
    pub fn new(name: &str, email: &str, password_hash: String) -> Self {
        let now = now_string();
        Self {
            id: UserId::new(),
            name: name.trim().to_string(),
            email: normalize_email(email),
            password_hash,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Display preferences, one row per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    pub theme: String,
    pub notifications_enabled: bool,
    pub default_view: String,
    pub first_day_of_week: String,
    pub date_format: String,
    pub language: String,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            notifications_enabled: true,
            default_view: "calendar".to_string(),
            first_day_of_week: "monday".to_string(),
            date_format: "24-hour".to_string(),
            language: "en-US".to_string(),
        }
    }
}

/// Registration request.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        validate_email(&self.email)?;
        if self.password.is_empty() {
            return Err(ValidationError::EmptyPassword);
        }
        Ok(())
    }
}

/// Profile update. The password, when present, is plain text and gets hashed
/// before it reaches the store.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl UserPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(ValidationError::EmptyName);
            }
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(password) = &self.password {
            if password.is_empty() {
                return Err(ValidationError::EmptyPassword);
            }
        }
        Ok(())
    }
}

/// Emails are compared case-insensitively; store them lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail(email.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_normalized() {
        let user = User::new(" Ada ", " Ada@Example.COM ", "hash".to_string());
        assert_eq!(user.name, "Ada");
        assert_eq!(user.email, "ada@example.com");
    }

    #[test]
    fn password_hash_is_not_serialized() {
        let user = User::new("Ada", "ada@example.com", "pbkdf2:secret".to_string());
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "ada@example.com");
    }

    #[test]
    fn registration_validation() {
        let ok = NewUser {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "hunter2".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad_email = NewUser {
            email: "ada.example.com".to_string(),
            ..ok.clone()
        };
        assert!(matches!(bad_email.validate(), Err(ValidationError::InvalidEmail(_))));

        let no_password = NewUser {
            password: String::new(),
            ..ok
        };
        assert_eq!(no_password.validate(), Err(ValidationError::EmptyPassword));
    }

    #[test]
    fn settings_defaults() {
        let settings = UserSettings::default();
        assert_eq!(settings.theme, "light");
        assert!(settings.notifications_enabled);
        assert_eq!(settings.default_view, "calendar");
        assert_eq!(settings.first_day_of_week, "monday");
        assert_eq!(settings.date_format, "24-hour");
        assert_eq!(settings.language, "en-US");
    }

    #[test]
    fn patch_rejects_unknown_fields() {
        assert!(serde_json::from_str::<UserPatch>(r#"{"id": "x"}"#).is_err());
        let patch: UserPatch = serde_json::from_str(r#"{"name": "Grace"}"#).unwrap();
        assert_eq!(patch.name.as_deref(), Some("Grace"));
    }
}
