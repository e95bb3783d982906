use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::ApiError;
use crate::models::identity::looks_like_email;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(ApiError::Validation(format!("Unknown role: {}", other))),
        }
    }
}

/// Login form contents. Never persisted.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    pub is_employee: bool,
    pub org_id: i64,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("is_employee", &self.is_employee)
            .field("org_id", &self.org_id)
            .finish()
    }
}

impl Credentials {
    pub fn validate(&self) -> Result<(), ApiError> {
        if !looks_like_email(&self.email) {
            return Err(ApiError::Validation("A valid email is required".into()));
        }
        if self.password.is_empty() {
            return Err(ApiError::Validation("Password is required".into()));
        }
        if self.org_id <= 0 {
            return Err(ApiError::Validation("An organization id is required".into()));
        }
        Ok(())
    }
}

/// The persisted half of a session (everything but the token).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub org_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logged_in_at: Option<DateTime<Utc>>,
}

/// An authenticated identity. Always carries a non-empty token.
#[derive(Clone, PartialEq)]
pub struct Session {
    profile: Profile,
    token: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("profile", &self.profile)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl Session {
    /// Build a session, refusing an empty token.
    pub fn new(profile: Profile, token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return None;
        }
        Some(Self { profile, token })
    }

    pub fn id(&self) -> &str {
        &self.profile.id
    }

    pub fn email(&self) -> &str {
        &self.profile.email
    }

    pub fn role(&self) -> Role {
        self.profile.role
    }

    pub fn org_id(&self) -> i64 {
        self.profile.org_id
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn logged_in_at(&self) -> Option<DateTime<Utc>> {
        self.profile.logged_in_at
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Guard for role-restricted areas. A mismatch never ends the session.
    pub fn require_role(&self, role: Role) -> Result<(), ApiError> {
        if self.profile.role == role {
            Ok(())
        } else {
            Err(ApiError::Authorization(format!(
                "This area requires the {} role; you are logged in as {}",
                role, self.profile.role
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(role: Role) -> Profile {
        Profile {
            id: "abc123".into(),
            email: "a@b.com".into(),
            role,
            org_id: 2,
            logged_in_at: None,
        }
    }

    #[test]
    fn test_session_rejects_empty_token() {
        assert!(Session::new(profile(Role::User), "").is_none());
        assert!(Session::new(profile(Role::User), "   ").is_none());
        let session = Session::new(profile(Role::User), "T").unwrap();
        assert_eq!(session.token(), "T");
    }

    #[test]
    fn test_profile_json_layout() {
        let json = serde_json::to_value(profile(Role::Admin)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": "abc123", "email": "a@b.com", "role": "admin", "orgId": 2})
        );
    }

    #[test]
    fn test_require_role() {
        let session = Session::new(profile(Role::User), "T").unwrap();
        assert!(session.require_role(Role::User).is_ok());
        assert!(matches!(
            session.require_role(Role::Admin),
            Err(ApiError::Authorization(_))
        ));
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let credentials = Credentials {
            email: "a@b.com".into(),
            password: "hunter2".into(),
            is_employee: false,
            org_id: 2,
        };
        assert!(!format!("{:?}", credentials).contains("hunter2"));

        let session = Session::new(profile(Role::User), "secret-token").unwrap();
        assert!(!format!("{:?}", session).contains("secret-token"));
    }

    #[test]
    fn test_credentials_validation() {
        let credentials = Credentials {
            email: "a@b.com".into(),
            password: "pw".into(),
            is_employee: true,
            org_id: 2,
        };
        assert!(credentials.validate().is_ok());

        let mut no_password = credentials.clone();
        no_password.password.clear();
        assert!(no_password.validate().is_err());

        let mut no_org = credentials;
        no_org.org_id = 0;
        assert!(no_org.validate().is_err());
    }
}
