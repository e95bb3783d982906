use futures::future::join_all;
use reqwest::Method;
use tracing::{debug, warn};

use crate::models::{Shop, ShopOverview, SubArea};

use super::transport::ApiRequest;
use super::{ApiClient, ApiError};

impl ApiClient {
    pub async fn list_shops(&self, org_id: i64) -> Result<Vec<Shop>, ApiError> {
        let request = ApiRequest::new(Method::GET, self.endpoints().api("organization/shops"))
            .credential(self.bearer()?)
            .query("org_id", org_id);
        self.fetch_json(request).await
    }

    pub async fn list_sub_areas(&self, shop_id: i64) -> Result<Vec<SubArea>, ApiError> {
        let path = format!("organization/shops/{}/sub-areas", shop_id);
        let request = ApiRequest::new(Method::GET, self.endpoints().api(&path))
            .credential(self.bearer()?);
        self.fetch_json(request).await
    }

    /// List shops and enrich each with its sub-areas.
    ///
    /// Sub-area lookups run concurrently. A failed lookup marks that shop
    /// incomplete; an expired session aborts the whole overview.
    pub async fn shop_overviews(&self, org_id: i64) -> Result<Vec<ShopOverview>, ApiError> {
        let shops = self.list_shops(org_id).await?;
        debug!(count = shops.len(), "Fetching sub-areas for shops");

        let lookups = join_all(shops.iter().map(|shop| self.list_sub_areas(shop.id))).await;

        let mut overviews = Vec::with_capacity(shops.len());
        for (shop, result) in shops.into_iter().zip(lookups) {
            match result {
                Ok(sub_areas) => overviews.push(ShopOverview {
                    shop,
                    sub_areas,
                    complete: true,
                }),
                Err(ApiError::SessionExpired) => return Err(ApiError::SessionExpired),
                Err(e) => {
                    warn!(shop_id = shop.id, error = %e, "Failed to fetch sub-areas");
                    overviews.push(ShopOverview {
                        shop,
                        sub_areas: Vec::new(),
                        complete: false,
                    });
                }
            }
        }
        Ok(overviews)
    }
}
