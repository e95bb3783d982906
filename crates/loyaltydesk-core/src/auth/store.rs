use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::error::PERMISSION_DENIED_MESSAGE;
use crate::api::{ApiClient, ApiError};
use crate::storage::{KeyValueStore, StorageError};

use super::session::{Credentials, Profile, Role, Session};

/// Storage key for the bearer token
pub const TOKEN_KEY: &str = "userToken";

/// Storage key for the JSON profile
pub const PROFILE_KEY: &str = "userData";

/// Length of generated session ids when the identity service sends none
const SESSION_ID_LEN: usize = 9;

/// Single source of truth for who is logged in.
///
/// Two states: anonymous (`None`) and authenticated (`Some`). The only way in
/// is `login`; the only ways out are `logout` and the unauthorized hook,
/// which calls `logout`.
pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
    state: watch::Sender<Option<Session>>,
    // Serializes storage and state updates so they land as a unit
    write_lock: Mutex<()>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            storage,
            state,
            write_lock: Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // The guarded data is (), so a poisoned lock carries no broken state
        self.write_lock.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn current(&self) -> Option<Session> {
        self.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// Observe every session transition.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.state.subscribe()
    }

    /// Rebuild the session from durable storage.
    ///
    /// Missing, partial or malformed entries leave the store anonymous and
    /// are cleared; they are never reported as errors.
    pub fn restore(&self) -> Option<Session> {
        let _guard = self.lock();
        let session = match self.read_stored() {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Discarding stored session");
                self.clear_storage();
                None
            }
        };
        debug!(authenticated = session.is_some(), "Session restored");
        self.state.send_replace(session.clone());
        session
    }

    fn read_stored(&self) -> Result<Option<Session>> {
        let token = self.storage.get(TOKEN_KEY).context("Failed to read stored token")?;
        let profile = self.storage.get(PROFILE_KEY).context("Failed to read stored profile")?;

        match (token, profile) {
            (None, None) => Ok(None),
            (Some(token), Some(profile)) => {
                let profile: Profile =
                    serde_json::from_str(&profile).context("Failed to parse stored profile")?;
                Session::new(profile, token)
                    .map(Some)
                    .ok_or_else(|| anyhow!("Stored token is empty"))
            }
            (Some(_), None) => Err(anyhow!("Stored token has no profile")),
            (None, Some(_)) => Err(anyhow!("Stored profile has no token")),
        }
    }

    /// Authenticate against the identity service and make the result current.
    ///
    /// On any failure the previous session, in memory and in storage, is
    /// left exactly as it was.
    pub async fn login(
        &self,
        client: &ApiClient,
        credentials: &Credentials,
        role: Role,
    ) -> Result<Session, ApiError> {
        credentials.validate()?;
        info!(email = %credentials.email, %role, employee = credentials.is_employee, "Logging in");

        let grant = client.issue_token(credentials, role).await.map_err(|e| {
            warn!(error = %e, "Login failed");
            ApiError::Authentication(Self::login_failure_message(&e))
        })?;

        let profile = Profile {
            id: grant.id.unwrap_or_else(Self::generate_id),
            email: credentials.email.trim().to_string(),
            role,
            org_id: credentials.org_id,
            logged_in_at: Some(Utc::now()),
        };
        let session = Session::new(profile, grant.token).ok_or_else(|| {
            ApiError::Authentication("Identity service returned no token".into())
        })?;

        let _guard = self.lock();
        self.persist(&session)?;
        self.state.send_replace(Some(session.clone()));
        info!(email = %session.email(), %role, "Logged in");
        Ok(session)
    }

    fn login_failure_message(error: &ApiError) -> String {
        match error {
            ApiError::Remote { message, .. } => message.clone(),
            ApiError::Authorization(message) if message != PERMISSION_DENIED_MESSAGE => {
                message.clone()
            }
            ApiError::Network(e) => format!("Could not reach the identity service: {}", e),
            ApiError::InvalidResponse(_) => {
                "Unexpected response from the identity service".to_string()
            }
            _ => "Please check your credentials and try again".to_string(),
        }
    }

    fn generate_id() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SESSION_ID_LEN)
            .map(char::from)
            .collect::<String>()
            .to_ascii_lowercase()
    }

    /// Write both entries, restoring the previous values if either write fails.
    fn persist(&self, session: &Session) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(session.profile());
        let profile = encoded.map_err(|source| StorageError::Encode {
            key: PROFILE_KEY.to_string(),
            source,
        })?;

        let previous_token = self.storage.get(TOKEN_KEY)?;
        let previous_profile = self.storage.get(PROFILE_KEY)?;

        let result = self
            .storage
            .set(PROFILE_KEY, &profile)
            .and_then(|_| self.storage.set(TOKEN_KEY, session.token()));

        if let Err(e) = result {
            warn!(error = %e, "Failed to persist session, rolling back");
            self.restore_entry(TOKEN_KEY, previous_token.as_deref());
            self.restore_entry(PROFILE_KEY, previous_profile.as_deref());
            return Err(e);
        }
        Ok(())
    }

    fn restore_entry(&self, key: &str, value: Option<&str>) {
        let result = match value {
            Some(v) => self.storage.set(key, v),
            None => self.storage.remove(key),
        };
        if let Err(e) = result {
            warn!(key, error = %e, "Failed to roll back session entry");
        }
    }

    /// End the session. Always succeeds and is idempotent.
    pub fn logout(&self) {
        let _guard = self.lock();
        self.clear_storage();
        if self.state.send_replace(None).is_some() {
            info!("Logged out");
        }
    }

    fn clear_storage(&self) {
        for key in [TOKEN_KEY, PROFILE_KEY] {
            if let Err(e) = self.storage.remove(key) {
                warn!(key, error = %e, "Failed to clear session entry");
            }
        }
    }
}
