use reqwest::Method;
use tracing::info;

use crate::models::checkin::{validate_reward_points, validate_shop_id, ShopRewardBody};
use crate::models::{CheckIn, QrCode};

use super::transport::ApiRequest;
use super::{ApiClient, ApiError};

impl ApiClient {
    /// Fetch the PNG QR code customers scan to check in at a shop.
    pub async fn qr_code(&self, shop_id: i64, shop_url_page: &str) -> Result<QrCode, ApiError> {
        validate_shop_id(shop_id)?;
        if shop_url_page.trim().is_empty() {
            return Err(ApiError::Validation(
                "Please enter both Shop ID and Shop URL Page.".into(),
            ));
        }

        let url = self.endpoints().api("shop_check_in/reward/qrCode");
        let request = ApiRequest::new(Method::GET, url)
            .credential(self.bearer()?)
            .accept("image/png")
            .query("shopId", shop_id)
            .query("shopUrlPage", shop_url_page.trim());
        let response = self.dispatch(request).await?;
        QrCode::from_png(response.body)
    }

    pub async fn create_shop_reward(&self, shop_id: i64, points: i64) -> Result<(), ApiError> {
        self.save_shop_reward(Method::POST, shop_id, points).await
    }

    pub async fn update_shop_reward(&self, shop_id: i64, points: i64) -> Result<(), ApiError> {
        self.save_shop_reward(Method::PUT, shop_id, points).await
    }

    async fn save_shop_reward(
        &self,
        method: Method,
        shop_id: i64,
        points: i64,
    ) -> Result<(), ApiError> {
        validate_shop_id(shop_id)?;
        validate_reward_points(points)?;

        let path = format!("shop_check_in/organization/config/shop/{}", shop_id);
        let body = serde_json::to_value(ShopRewardBody { points })
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        let request = ApiRequest::new(method.clone(), self.endpoints().api(&path))
            .credential(self.bearer()?)
            .json(body);
        self.send(request).await?;
        info!(shop_id, points, %method, "Shop check-in reward saved");
        Ok(())
    }

    /// Record a check-in at a shop; the server grants the reward points.
    pub async fn check_in(&self, check_in: &CheckIn) -> Result<(), ApiError> {
        check_in.validate()?;
        let body = serde_json::to_value(check_in.body())
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        let request = ApiRequest::new(Method::POST, self.endpoints().api("shop_check_in/reward"))
            .credential(self.bearer()?)
            .query("shopId", check_in.shop_id)
            .json(body);
        self.send(request).await?;
        info!(shop_id = check_in.shop_id, "Checked in");
        Ok(())
    }
}
