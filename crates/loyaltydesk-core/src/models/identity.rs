use serde::{Deserialize, Deserializer, Serialize};

use crate::api::ApiError;

/// Response of the identity endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    #[serde(default)]
    pub token: String,
    #[serde(default, alias = "user_id", alias = "userId", deserialize_with = "opaque_id")]
    pub id: Option<String>,
}

/// Ids arrive as either numbers or strings; keep them opaque.
fn opaque_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Signup form, optionally carrying the referring user's id.
#[derive(Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub referrer: Option<String>,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("referrer", &self.referrer)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RegistrationBody<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub confirmation_flag: bool,
    pub org_id: i64,
    pub redirect_url: &'a str,
}

impl Registration {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::Validation("Name is required".into()));
        }
        if !looks_like_email(&self.email) {
            return Err(ApiError::Validation("A valid email is required".into()));
        }
        if self.password.is_empty() {
            return Err(ApiError::Validation("Password is required".into()));
        }
        if self.password != self.confirm_password {
            return Err(ApiError::Validation("Passwords do not match.".into()));
        }
        Ok(())
    }

    pub(crate) fn body<'a>(&'a self, org_id: i64, redirect_url: &'a str) -> RegistrationBody<'a> {
        RegistrationBody {
            name: self.name.trim(),
            email: self.email.trim(),
            password: &self.password,
            confirmation_flag: true,
            org_id,
            redirect_url,
        }
    }
}

/// Minimal shape check; the server does the real validation.
pub fn looks_like_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> Registration {
        Registration {
            name: "Mona".into(),
            email: "mona@example.com".into(),
            password: "secret".into(),
            confirm_password: "secret".into(),
            referrer: None,
        }
    }

    #[test]
    fn test_token_grant_ids() {
        let grant: TokenGrant = serde_json::from_str(r#"{"token": "T", "id": 42}"#).unwrap();
        assert_eq!(grant.token, "T");
        assert_eq!(grant.id.as_deref(), Some("42"));

        let grant: TokenGrant = serde_json::from_str(r#"{"token": "T", "userId": "u-1"}"#).unwrap();
        assert_eq!(grant.id.as_deref(), Some("u-1"));

        let grant: TokenGrant = serde_json::from_str(r#"{"token": "T"}"#).unwrap();
        assert_eq!(grant.id, None);

        let grant: TokenGrant = serde_json::from_str(r#"{}"#).unwrap();
        assert!(grant.token.is_empty());
    }

    #[test]
    fn test_registration_validation() {
        assert!(registration().validate().is_ok());

        let mismatch = Registration {
            confirm_password: "other".into(),
            ..registration()
        };
        match mismatch.validate() {
            Err(ApiError::Validation(msg)) => assert_eq!(msg, "Passwords do not match."),
            other => panic!("unexpected result: {other:?}"),
        }

        let bad_email = Registration {
            email: "mona".into(),
            ..registration()
        };
        assert!(matches!(bad_email.validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_registration_debug_hides_password() {
        let debug = format!("{:?}", registration());
        assert!(!debug.contains("secret"));
        assert!(debug.contains("mona@example.com"));
    }

    #[test]
    fn test_looks_like_email() {
        assert!(looks_like_email("a@b.com"));
        assert!(!looks_like_email("@b.com"));
        assert!(!looks_like_email("a@com"));
        assert!(!looks_like_email("a@.com"));
    }
}
