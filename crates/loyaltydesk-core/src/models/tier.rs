//! Loyalty tiers and tier configurations.
//!
//! The tier list endpoint has been observed returning both snake_case and
//! camelCase field names, so the response types accept either spelling.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::api::ApiError;

/// Constraint key for online orders (cashback ratio)
pub const ORDER_ONLINE: &str = "ORDER_ONLINE";
/// Constraint key for referrals
pub const REFERRAL: &str = "REFERRAL";
/// Constraint key for product reviews
pub const REVIEW_PRODUCT: &str = "REVIEW_PRODUCT";

/// Default points awarded for referrals and reviews in a new configuration
pub const DEFAULT_EVENT_AMOUNT: &str = "50";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tier {
    #[serde(alias = "tier_id")]
    pub id: i64,
    #[serde(default, rename = "tier_name", alias = "tierName")]
    pub name: String,
    #[serde(default, alias = "isActive")]
    pub is_active: bool,
    #[serde(default, alias = "isSpecial")]
    pub is_special: bool,
    #[serde(default, alias = "noOfPurchaseFrom")]
    pub no_of_purchase_from: Option<i64>,
    #[serde(default, alias = "noOfPurchaseTo")]
    pub no_of_purchase_to: Option<i64>,
    #[serde(default, alias = "sellingPrice")]
    pub selling_price: Option<f64>,
    #[serde(default, alias = "orgId")]
    pub org_id: Option<i64>,
    #[serde(default, alias = "cashBackPercentage")]
    pub cash_back_percentage: Option<f64>,
    #[serde(default)]
    pub constraints: BTreeMap<String, f64>,
}

impl Tier {
    /// Cashback for online orders as a percentage (0-100).
    pub fn cashback_percent(&self) -> Option<f64> {
        self.constraints
            .get(ORDER_ONLINE)
            .map(|ratio| ratio * 100.0)
            .or(self.cash_back_percentage)
    }

    pub fn purchase_range_display(&self) -> String {
        match (self.no_of_purchase_from, self.no_of_purchase_to) {
            (Some(from), Some(to)) => format!("{}-{}", from, to),
            (Some(from), None) => format!("{}+", from),
            (None, Some(to)) => format!("up to {}", to),
            (None, None) => "-".to_string(),
        }
    }

    /// Pre-fill an edit form from an existing tier.
    pub fn to_draft(&self) -> TierDraft {
        TierDraft {
            tier_id: Some(self.id),
            name: self.name.clone(),
            is_active: self.is_active,
            is_special: self.is_special,
            purchase_from: self.no_of_purchase_from.unwrap_or(0),
            purchase_to: self.no_of_purchase_to.unwrap_or(0),
            cashback_percent: self.cashback_percent().unwrap_or(0.0),
        }
    }
}

/// Create or update operation sent with tier and config saves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveOperation {
    Create,
    Update,
}

/// Tier form contents. `tier_id` is set when editing an existing tier.
#[derive(Debug, Clone, PartialEq)]
pub struct TierDraft {
    pub tier_id: Option<i64>,
    pub name: String,
    pub is_active: bool,
    pub is_special: bool,
    pub purchase_from: i64,
    pub purchase_to: i64,
    pub cashback_percent: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct TierUpdateBody {
    pub tier_name: String,
    pub is_active: bool,
    pub is_special: bool,
    pub no_of_purchase_from: i64,
    pub no_of_purchase_to: i64,
    pub operation: SaveOperation,
    pub constraints: BTreeMap<&'static str, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier_id: Option<i64>,
}

impl TierDraft {
    pub fn operation(&self) -> SaveOperation {
        if self.tier_id.is_some() {
            SaveOperation::Update
        } else {
            SaveOperation::Create
        }
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::Validation("Tier name is required".into()));
        }
        if !self.cashback_percent.is_finite() || self.cashback_percent < 0.0 {
            return Err(ApiError::Validation(
                "Cashback percentage must be zero or more.".into(),
            ));
        }
        if self.cashback_percent >= 100.0 {
            return Err(ApiError::Validation(
                "Cashback percentage must be below 100.".into(),
            ));
        }
        if self.purchase_from < 0 || self.purchase_to < 0 {
            return Err(ApiError::Validation("Order numbers cannot be negative".into()));
        }
        if self.purchase_from > self.purchase_to {
            return Err(ApiError::Validation(format!(
                "Minimum order number ({}) exceeds maximum ({})",
                self.purchase_from, self.purchase_to
            )));
        }
        if self.is_active && self.is_special {
            return Err(ApiError::Validation(
                "A tier is either active or special, not both".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn body(&self) -> TierUpdateBody {
        let constraints = BTreeMap::from([
            (ORDER_ONLINE, self.cashback_percent / 100.0),
            (REFERRAL, 1.0),
            (REVIEW_PRODUCT, 1.0),
        ]);
        TierUpdateBody {
            tier_name: self.name.trim().to_string(),
            is_active: self.is_active,
            is_special: self.is_special,
            no_of_purchase_from: self.purchase_from,
            no_of_purchase_to: self.purchase_to,
            operation: self.operation(),
            constraints,
            tier_id: self.tier_id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatioConstraint {
    #[serde(default, deserialize_with = "lenient_string")]
    pub ratio_from: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub ratio_to: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_opt_string"
    )]
    pub amount: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierRef {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierConfig {
    pub id: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub default_tier: Option<TierRef>,
    #[serde(default)]
    pub constraints: BTreeMap<String, RatioConstraint>,
}

impl TierConfig {
    pub fn constraint(&self, key: &str) -> Option<&RatioConstraint> {
        self.constraints.get(key)
    }

    /// Pre-fill an edit form from an existing configuration.
    pub fn to_draft(&self) -> TierConfigDraft {
        let order = self.constraint(ORDER_ONLINE).cloned().unwrap_or_default();
        let amount = |key: &str| {
            self.constraint(key)
                .and_then(|c| c.amount.clone())
                .unwrap_or_else(|| DEFAULT_EVENT_AMOUNT.to_string())
        };
        TierConfigDraft {
            id: Some(self.id),
            description: self.description.clone(),
            default_tier_id: self.default_tier.map(|t| t.id).unwrap_or_default(),
            required_points: order.ratio_from,
            cashback_reward: order.ratio_to,
            referral_amount: amount(REFERRAL),
            review_amount: amount(REVIEW_PRODUCT),
        }
    }
}

/// Tier configuration form. `id` is set when editing.
#[derive(Debug, Clone, PartialEq)]
pub struct TierConfigDraft {
    pub id: Option<i64>,
    pub description: String,
    pub default_tier_id: i64,
    /// Points required per online order (`ORDER_ONLINE.ratio_from`)
    pub required_points: String,
    /// Cashback granted for those points (`ORDER_ONLINE.ratio_to`)
    pub cashback_reward: String,
    pub referral_amount: String,
    pub review_amount: String,
}

impl TierConfigDraft {
    pub fn new(default_tier_id: i64, required_points: &str, cashback_reward: &str) -> Self {
        Self {
            id: None,
            description: String::new(),
            default_tier_id,
            required_points: required_points.to_string(),
            cashback_reward: cashback_reward.to_string(),
            referral_amount: DEFAULT_EVENT_AMOUNT.to_string(),
            review_amount: DEFAULT_EVENT_AMOUNT.to_string(),
        }
    }

    pub fn operation(&self) -> SaveOperation {
        if self.id.is_some() {
            SaveOperation::Update
        } else {
            SaveOperation::Create
        }
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.default_tier_id <= 0 {
            return Err(ApiError::Validation("A default tier must be selected".into()));
        }
        let fields = [
            ("Points required per order", &self.required_points),
            ("Cashback reward", &self.cashback_reward),
            ("Referral amount", &self.referral_amount),
            ("Review amount", &self.review_amount),
        ];
        for (label, value) in fields {
            match value.trim().parse::<f64>() {
                Ok(v) if v.is_finite() && v >= 0.0 => {}
                _ => {
                    return Err(ApiError::Validation(format!(
                        "{} must be a non-negative number",
                        label
                    )))
                }
            }
        }
        Ok(())
    }

    pub(crate) fn body(&self) -> serde_json::Value {
        let event = |amount: &str| RatioConstraint {
            ratio_from: "1".to_string(),
            ratio_to: "1".to_string(),
            amount: Some(amount.trim().to_string()),
        };
        let mut body = serde_json::json!({
            "description": self.description.trim(),
            "default_tier": TierRef { id: self.default_tier_id },
            "operation": self.operation(),
            "constraints": {
                ORDER_ONLINE: RatioConstraint {
                    ratio_from: self.required_points.trim().to_string(),
                    ratio_to: self.cashback_reward.trim().to_string(),
                    amount: None,
                },
                REFERRAL: event(&self.referral_amount),
                REVIEW_PRODUCT: event(&self.review_amount),
            },
        });
        if let (Some(id), Some(map)) = (self.id, body.as_object_mut()) {
            map.insert("id".to_string(), id.into());
        }
        body
    }
}

/// Ratios come back as strings or numbers depending on who saved them.
fn lenient_string<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(lenient_opt_string(deserializer)?.unwrap_or_default())
}

fn lenient_opt_string<'de, D: serde::Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> TierDraft {
        TierDraft {
            tier_id: None,
            name: "Gold".into(),
            is_active: true,
            is_special: false,
            purchase_from: 5,
            purchase_to: 10,
            cashback_percent: 12.5,
        }
    }

    #[test]
    fn test_parse_tier_list_both_spellings() {
        let json = r#"[
            {"id": 1, "tier_name": "Silver", "is_active": true, "is_special": false,
             "no_of_purchase_from": 0, "no_of_purchase_to": 4,
             "constraints": {"ORDER_ONLINE": 0.05, "REFERRAL": 1, "REVIEW_PRODUCT": 1}},
            {"tier_id": 2, "tierName": "Gold", "isActive": false, "isSpecial": true,
             "noOfPurchaseFrom": 5, "cashBackPercentage": 10}
        ]"#;
        let tiers: Vec<Tier> = serde_json::from_str(json).unwrap();
        assert_eq!(tiers.len(), 2);

        assert_eq!(tiers[0].name, "Silver");
        assert_eq!(tiers[0].cashback_percent(), Some(5.0));
        assert_eq!(tiers[0].purchase_range_display(), "0-4");

        assert_eq!(tiers[1].id, 2);
        assert_eq!(tiers[1].name, "Gold");
        assert!(tiers[1].is_special);
        assert_eq!(tiers[1].cashback_percent(), Some(10.0));
        assert_eq!(tiers[1].purchase_range_display(), "5+");
    }

    #[test]
    fn test_tier_body_for_create_and_update() {
        let body = serde_json::to_value(draft().body()).unwrap();
        assert_eq!(body["tier_name"], "Gold");
        assert_eq!(body["operation"], "create");
        assert_eq!(body["constraints"]["ORDER_ONLINE"], 0.125);
        assert_eq!(body["constraints"]["REFERRAL"], 1.0);
        assert!(body.get("tier_id").is_none());

        let update = TierDraft {
            tier_id: Some(9),
            ..draft()
        };
        let body = serde_json::to_value(update.body()).unwrap();
        assert_eq!(body["operation"], "update");
        assert_eq!(body["tier_id"], 9);
    }

    #[test]
    fn test_tier_validation() {
        assert!(draft().validate().is_ok());

        let invalid: [fn(&mut TierDraft); 5] = [
            |d| d.cashback_percent = 100.0,
            |d| d.cashback_percent = -1.0,
            |d| d.name = "  ".into(),
            |d| d.purchase_from = 11,
            |d| d.is_special = true,
        ];
        for mutate in invalid {
            let mut case = draft();
            mutate(&mut case);
            assert!(
                matches!(case.validate(), Err(ApiError::Validation(_))),
                "expected validation failure for {case:?}"
            );
        }
    }

    #[test]
    fn test_tier_to_draft_restores_percent() {
        let tier: Tier = serde_json::from_str(
            r#"{"id": 3, "tier_name": "Bronze", "is_active": true,
                "no_of_purchase_from": 1, "no_of_purchase_to": 2,
                "constraints": {"ORDER_ONLINE": 0.25}}"#,
        )
        .unwrap();
        let draft = tier.to_draft();
        assert_eq!(draft.tier_id, Some(3));
        assert_eq!(draft.operation(), SaveOperation::Update);
        assert_eq!(draft.cashback_percent, 25.0);
    }

    #[test]
    fn test_config_body_shape() {
        let draft = TierConfigDraft {
            description: "Default rewards".into(),
            ..TierConfigDraft::new(4, "100", "10")
        };
        assert!(draft.validate().is_ok());

        let body = draft.body();
        assert_eq!(body["default_tier"]["id"], 4);
        assert_eq!(body["operation"], "create");
        assert_eq!(body["constraints"]["ORDER_ONLINE"]["ratio_from"], "100");
        assert_eq!(body["constraints"]["ORDER_ONLINE"]["ratio_to"], "10");
        assert!(body["constraints"]["ORDER_ONLINE"].get("amount").is_none());
        assert_eq!(body["constraints"]["REFERRAL"]["amount"], "50");
        assert_eq!(body["constraints"]["REVIEW_PRODUCT"]["ratio_from"], "1");
        assert!(body.get("id").is_none());
    }

    #[test]
    fn test_config_validation() {
        assert!(matches!(
            TierConfigDraft::new(0, "100", "10").validate(),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            TierConfigDraft::new(1, "lots", "10").validate(),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn test_parse_config_and_round_trip_to_draft() {
        let json = r#"{"id": 8, "description": "Main",
            "default_tier": {"id": 2},
            "constraints": {
                "ORDER_ONLINE": {"ratio_from": 200, "ratio_to": "20"},
                "REFERRAL": {"ratio_from": "1", "ratio_to": "1", "amount": "75"}
            }}"#;
        let config: TierConfig = serde_json::from_str(json).unwrap();
        let draft = config.to_draft();
        assert_eq!(draft.id, Some(8));
        assert_eq!(draft.default_tier_id, 2);
        assert_eq!(draft.required_points, "200");
        assert_eq!(draft.referral_amount, "75");
        // Missing constraint falls back to the default amount
        assert_eq!(draft.review_amount, DEFAULT_EVENT_AMOUNT);
        assert_eq!(draft.body()["id"], 8);
        assert_eq!(draft.body()["operation"], "update");
    }
}
