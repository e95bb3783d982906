use reqwest::Method;
use tracing::info;

use crate::models::points::{validate_order_amount, CheckoutRewardBody};
use crate::models::{
    CheckoutReward, PointTransaction, PointsBalance, Redemption, SharePointsRequest,
};

use super::transport::ApiRequest;
use super::{ApiClient, ApiError};

impl ApiClient {
    pub async fn points_balance(&self) -> Result<PointsBalance, ApiError> {
        let request = ApiRequest::new(Method::GET, self.endpoints().api("loyalty/points"))
            .credential(self.bearer()?);
        self.fetch_json(request).await
    }

    /// Spendable point transactions for the logged-in user.
    pub async fn points_history(&self) -> Result<Vec<PointTransaction>, ApiError> {
        let request = ApiRequest::new(Method::GET, self.endpoints().api("loyalty/points/spendable"))
            .credential(self.bearer()?);
        self.fetch_json(request).await
    }

    pub async fn share_points(&self, share: &SharePointsRequest) -> Result<(), ApiError> {
        share.validate()?;
        let body = serde_json::to_value(share)
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        let request = ApiRequest::new(Method::POST, self.endpoints().api("loyalty/points/share"))
            .credential(self.bearer()?)
            .json(body);
        self.send(request).await?;
        info!(points = share.points, "Points shared");
        Ok(())
    }

    /// Redeem a points code against an order.
    ///
    /// This endpoint takes the token in the `User-Token` header rather than as
    /// a bearer credential.
    pub async fn redeem_code(&self, redemption: &Redemption) -> Result<(), ApiError> {
        redemption.validate()?;
        let url = self.endpoints().api("loyalty/points/code/redeem");
        let request = ApiRequest::new(Method::POST, url)
            .credential(self.user_token()?)
            .query("order_id", redemption.order_id.trim())
            .query("code", redemption.code.trim())
            .query("points", redemption.points)
            .json(serde_json::json!({}));
        self.send(request).await?;
        info!(order_id = %redemption.order_id, points = redemption.points, "Points redeemed");
        Ok(())
    }

    pub async fn checkout_reward(&self, order_amount: f64) -> Result<CheckoutReward, ApiError> {
        validate_order_amount(order_amount)?;
        let body = serde_json::to_value(CheckoutRewardBody { order_amount })
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        let request = ApiRequest::new(Method::POST, self.endpoints().api("loyalty/points/checkout"))
            .credential(self.bearer()?)
            .json(body);
        self.fetch_json(request).await
    }
}

#[cfg(test)]
mod tests {
    use crate::api::client::test_support::*;
    use crate::api::transport::{Credential, RequestBody};
    use crate::api::ApiError;
    use crate::models::{Redemption, SharePointsRequest};

    #[tokio::test]
    async fn test_balance_and_history() {
        let (client, stub, _) = stub_client();
        stub.respond(200, r#"{"points": 1250}"#).respond(
            200,
            r#"[{"id": "1", "points": 500, "transactionDate": "2024-01-15",
                "description": "Purchase reward"}]"#,
        );

        assert_eq!(client.points_balance().await.unwrap().points, 1250);
        let history = client.points_history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].description, "Purchase reward");
    }

    #[tokio::test]
    async fn test_redeem_uses_user_token_header() {
        let (client, stub, _) = stub_client();
        stub.respond(200, "");

        let redemption = Redemption {
            order_id: "1001".into(),
            code: "SAVE10".into(),
            points: 10,
        };
        client.redeem_code(&redemption).await.unwrap();

        let request = stub.last_request();
        assert_eq!(request.url, "https://loyalty.test/v1/loyalty/points/code/redeem");
        assert_eq!(request.credential, Credential::UserToken("T".into()));
        assert_eq!(
            request.query,
            vec![
                ("order_id".to_string(), "1001".to_string()),
                ("code".to_string(), "SAVE10".to_string()),
                ("points".to_string(), "10".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_share_points() {
        let (client, stub, _) = stub_client();
        stub.respond(200, "");

        let share = SharePointsRequest {
            org_id: 2,
            email: "friend@example.com".into(),
            points: 40,
        };
        client.share_points(&share).await.unwrap();
        assert_eq!(
            stub.last_request().body,
            RequestBody::Json(serde_json::json!({
                "orgId": 2,
                "email": "friend@example.com",
                "points": 40
            }))
        );
    }

    #[tokio::test]
    async fn test_checkout_reward() {
        let (client, stub, _) = stub_client();
        stub.respond(200, r#"{"rewardPoints": 12, "message": "Thanks"}"#);

        let reward = client.checkout_reward(120.0).await.unwrap();
        assert_eq!(reward.reward_points, 12);
        assert_eq!(
            stub.last_request().body,
            RequestBody::Json(serde_json::json!({"orderAmount": 120.0}))
        );

        assert!(matches!(client.checkout_reward(-1.0).await, Err(ApiError::Validation(_))));
    }
}
