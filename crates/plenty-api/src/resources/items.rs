// Item endpoints
//
// Items, variations, attributes and manufacturers, plus the image
// availability write call.

use serde_json::json;
use tracing::debug;

use crate::client::{Outcome, PlentyClient, Request};
use crate::dates;
use crate::error::Error;
use crate::pagination::Record;
use crate::query::{Filters, Query, sanitize};
use crate::route::Route;
use crate::transform;

use super::with_updated_at;

/// Where an item image is made available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageTarget {
    /// Order referrer id, e.g. `4.01`.
    Marketplace(String),
    /// Plenty id of a client (mandant).
    Mandant(String),
    Listing(String),
}

impl ImageTarget {
    fn kind(&self) -> &'static str {
        match self {
            Self::Marketplace(_) => "marketplace",
            Self::Mandant(_) => "mandant",
            Self::Listing(_) => "listing",
        }
    }

    fn value(&self) -> &str {
        match self {
            Self::Marketplace(id) | Self::Mandant(id) | Self::Listing(id) => id,
        }
    }
}

impl PlentyClient {
    /// `GET /rest/items`
    ///
    /// `last_update` is sent as the `updatedBetween` unix timestamp.
    pub async fn get_items(
        &self,
        filters: &Filters,
        last_update: Option<&str>,
    ) -> Result<Vec<Record>, Error> {
        let mut query = sanitize(Route::Items, Query::new(), filters);
        if let Some(raw) = last_update {
            query.set("updatedBetween", dates::date_to_timestamp(raw)?.to_string());
        }
        self.collect_all(Route::Items, None, query).await
    }

    /// `GET /rest/items/variations`
    pub async fn get_variations(&self, filters: &Filters) -> Result<Vec<Record>, Error> {
        let query = sanitize(Route::Variations, Query::new(), filters);
        self.collect_all(Route::Variations, None, query).await
    }

    /// `GET /rest/items/attributes`
    ///
    /// With `variation_map` every attribute value gets a `linked_variations`
    /// list. This costs a second aggregation over all variations, and forces
    /// `values` into the response.
    pub async fn get_attributes(
        &self,
        additional: &[String],
        last_update: Option<&str>,
        variation_map: bool,
    ) -> Result<Vec<Record>, Error> {
        let mut filters = Filters {
            additional: additional.to_vec(),
            ..Filters::default()
        };
        if variation_map && !additional.iter().any(|value| value == "values") {
            filters.additional.push("values".into());
        }
        let query = sanitize(Route::Attributes, Query::new(), &filters);
        let query = with_updated_at(query, last_update)?;

        let attributes = self.collect_all(Route::Attributes, None, query).await?;
        if !variation_map {
            return Ok(attributes);
        }

        let variations = self
            .get_variations(&Filters::new().additional("variationAttributeValues"))
            .await?;
        Ok(transform::attribute_variation_mapping(&variations, attributes))
    }

    /// `GET /rest/items/manufacturers`
    pub async fn get_manufacturers(
        &self,
        filters: &Filters,
        last_update: Option<&str>,
    ) -> Result<Vec<Record>, Error> {
        let query = sanitize(Route::Manufacturers, Query::new(), filters);
        let query = with_updated_at(query, last_update)?;
        self.collect_all(Route::Manufacturers, None, query).await
    }

    /// Make an item image available for one marketplace, client or listing.
    ///
    /// `POST /rest/items/{itemId}/images/{imageId}/availabilities`
    pub async fn set_image_availability(
        &self,
        item_id: u64,
        image_id: u64,
        target: &ImageTarget,
    ) -> Result<Outcome, Error> {
        debug!(item_id, image_id, ?target, "setting image availability");
        let body = json!({
            "imageId": image_id,
            "type": target.kind(),
            "value": target.value(),
        });
        let request = Request::post(Route::Items)
            .path(format!("/{item_id}/images/{image_id}/availabilities"))
            .json(&body)?;
        self.send(&request).await
    }
}
