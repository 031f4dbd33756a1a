// Price and VAT configuration endpoints

use std::collections::BTreeMap;

use crate::client::PlentyClient;
use crate::error::Error;
use crate::pagination::Record;
use crate::query::Query;
use crate::route::Route;
use crate::transform::{self, PriceConfiguration, VatCountry};

use super::with_updated_at;

impl PlentyClient {
    /// VAT configuration ids per country id, optionally limited to `subset`.
    ///
    /// `GET /rest/vat`
    pub async fn get_vat_id_mappings(
        &self,
        subset: Option<&[u64]>,
    ) -> Result<BTreeMap<String, VatCountry>, Error> {
        let entries = self.collect_all(Route::Vat, None, Query::new()).await?;
        Ok(transform::create_vat_mapping(&entries, subset))
    }

    /// `GET /rest/items/sales_prices`
    pub async fn get_price_configuration(
        &self,
        last_update: Option<&str>,
    ) -> Result<Vec<Record>, Error> {
        let query = with_updated_at(Query::new(), last_update)?;
        self.collect_all(Route::SalesPrices, None, query).await
    }

    /// Like [`get_price_configuration`](Self::get_price_configuration), but
    /// reduced to the ids relevant for pricing.
    pub async fn get_minimal_price_configuration(
        &self,
        last_update: Option<&str>,
    ) -> Result<Vec<PriceConfiguration>, Error> {
        let prices = self.get_price_configuration(last_update).await?;
        Ok(prices
            .iter()
            .filter_map(transform::shrink_price_configuration)
            .collect())
    }
}
