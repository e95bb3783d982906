use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::ApiError;
use crate::models::identity::looks_like_email;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PointsBalance {
    pub points: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointTransaction {
    pub id: String,
    pub points: i64,
    pub transaction_date: String,
    #[serde(default)]
    pub description: String,
}

impl PointTransaction {
    pub fn date(&self) -> Option<NaiveDate> {
        let day = self.transaction_date.get(..10)?;
        NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharePointsRequest {
    pub org_id: i64,
    pub email: String,
    pub points: i64,
}

impl SharePointsRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if !looks_like_email(&self.email) || self.points <= 0 {
            return Err(ApiError::Validation(
                "Please enter a valid email and points amount".into(),
            ));
        }
        Ok(())
    }
}

/// Redeem a points code against an order.
#[derive(Debug, Clone, PartialEq)]
pub struct Redemption {
    pub order_id: String,
    pub code: String,
    pub points: i64,
}

impl Redemption {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.order_id.trim().is_empty() || self.code.trim().is_empty() || self.points <= 0 {
            return Err(ApiError::Validation(
                "Please enter an order id, a code and a positive points amount".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CheckoutRewardBody {
    pub order_amount: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReward {
    pub reward_points: i64,
    #[serde(default)]
    pub message: String,
}

pub(crate) fn validate_order_amount(amount: f64) -> Result<(), ApiError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ApiError::Validation("Please enter a valid order amount".into()));
    }
    Ok(())
}
