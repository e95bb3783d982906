use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shop {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "orgId")]
    pub org_id: Option<i64>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubArea {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "shopId")]
    pub shop_id: Option<i64>,
}

/// A shop merged with its sub-areas.
#[derive(Debug, Clone, Serialize)]
pub struct ShopOverview {
    pub shop: Shop,
    pub sub_areas: Vec<SubArea>,
    /// False when the sub-area lookup failed and `sub_areas` is a placeholder
    pub complete: bool,
}

impl ShopOverview {
    pub fn display_sub_areas(&self) -> String {
        if !self.complete {
            return "unavailable".to_string();
        }
        match self.sub_areas.len() {
            0 => "none".to_string(),
            1 => "1 sub-area".to_string(),
            n => format!("{} sub-areas", n),
        }
    }
}
