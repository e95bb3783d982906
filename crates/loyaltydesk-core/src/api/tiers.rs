//! Tier and tier-configuration endpoints.
//!
//! These back the employee dashboard, which probes them with accounts that
//! may lack permission. Every request here opts out of the unauthorized hook
//! so a 401 surfaces as a permission error instead of ending the session.

use reqwest::Method;
use tracing::info;

use crate::models::{Tier, TierConfig, TierConfigDraft, TierDraft};

use super::transport::ApiRequest;
use super::{ApiClient, ApiError};

impl ApiClient {
    fn tier_request(&self, method: Method, path: &str) -> Result<ApiRequest, ApiError> {
        Ok(ApiRequest::new(method, self.endpoints().api(path))
            .credential(self.bearer()?)
            .skip_unauthorized_hook())
    }

    pub async fn list_tiers(&self) -> Result<Vec<Tier>, ApiError> {
        let request = self.tier_request(Method::GET, "loyalty/tier/list")?;
        self.fetch_json(request).await
    }

    /// Create a tier, or update it when the draft carries a tier id.
    pub async fn save_tier(&self, draft: &TierDraft) -> Result<(), ApiError> {
        draft.validate()?;
        let body = serde_json::to_value(draft.body())
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        let request = self.tier_request(Method::POST, "loyalty/tier/update")?.json(body);
        self.send(request).await?;
        info!(tier = %draft.name, operation = ?draft.operation(), "Tier saved");
        Ok(())
    }

    pub async fn delete_tier(&self, tier_id: i64) -> Result<(), ApiError> {
        let request = self
            .tier_request(Method::DELETE, "loyalty/tier/delete")?
            .query("tier_id", tier_id);
        self.send(request).await?;
        info!(tier_id, "Tier deleted");
        Ok(())
    }

    pub async fn list_tier_configs(&self) -> Result<Vec<TierConfig>, ApiError> {
        let request = self.tier_request(Method::GET, "loyalty/config/list")?;
        self.fetch_json(request).await
    }

    /// Create a tier configuration, or update it when the draft carries an id.
    pub async fn save_tier_config(&self, draft: &TierConfigDraft) -> Result<(), ApiError> {
        draft.validate()?;
        let request = self
            .tier_request(Method::POST, "loyalty/config/update")?
            .json(draft.body());
        self.send(request).await?;
        info!(
            default_tier = draft.default_tier_id,
            operation = ?draft.operation(),
            "Tier config saved"
        );
        Ok(())
    }

    pub async fn delete_tier_config(&self, config_id: i64) -> Result<(), ApiError> {
        let request = self
            .tier_request(Method::DELETE, "loyalty/config/delete")?
            .query("id", config_id);
        self.send(request).await?;
        info!(config_id, "Tier config deleted");
        Ok(())
    }
}
