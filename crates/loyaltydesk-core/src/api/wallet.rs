use reqwest::Method;
use tracing::info;

use crate::models::WalletBranding;

use super::transport::ApiRequest;
use super::{ApiClient, ApiError};

impl ApiClient {
    fn wallet_request(
        &self,
        method: Method,
        tier_id: i64,
        branding: &WalletBranding,
    ) -> Result<ApiRequest, ApiError> {
        if tier_id <= 0 {
            return Err(ApiError::Validation("Please select a tier".into()));
        }
        let path = format!("organization/loyalty-wallet/tier/{}", tier_id);
        Ok(ApiRequest::new(method, self.endpoints().api(&path))
            .credential(self.bearer()?)
            .multipart(branding.form_parts()))
    }

    /// Brand the wallet pass issued for a tier. All colors and images are required.
    pub async fn create_wallet(
        &self,
        tier_id: i64,
        branding: &WalletBranding,
    ) -> Result<(), ApiError> {
        branding.validate_for_create()?;
        let request = self.wallet_request(Method::POST, tier_id, branding)?;
        self.send(request).await?;
        info!(tier_id, "Loyalty wallet created");
        Ok(())
    }

    /// Change some of a tier's wallet branding; only provided fields are sent.
    pub async fn update_wallet(
        &self,
        tier_id: i64,
        branding: &WalletBranding,
    ) -> Result<(), ApiError> {
        branding.validate_for_update()?;
        let request = self.wallet_request(Method::PUT, tier_id, branding)?;
        self.send(request).await?;
        info!(tier_id, "Loyalty wallet updated");
        Ok(())
    }
}
