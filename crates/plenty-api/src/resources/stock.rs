// Stock management endpoints

use crate::client::PlentyClient;
use crate::error::Error;
use crate::pagination::Record;
use crate::query::{Filters, Query, sanitize};
use crate::route::Route;

impl PlentyClient {
    /// Stock per variation and warehouse.
    ///
    /// `GET /rest/stockmanagement/stock`
    pub async fn get_stock(&self, filters: &Filters) -> Result<Vec<Record>, Error> {
        let query = sanitize(Route::Stock, Query::new(), filters);
        self.collect_all(Route::Stock, None, query).await
    }

    /// `GET /rest/stockmanagement/warehouses`
    pub async fn get_warehouses(&self) -> Result<Vec<Record>, Error> {
        self.collect_all(Route::Warehouses, None, Query::new()).await
    }

    /// Storage locations of one warehouse.
    ///
    /// `GET /rest/stockmanagement/warehouses/{id}/management/storageLocations`
    pub async fn get_storage_locations(&self, warehouse_id: u64) -> Result<Vec<Record>, Error> {
        let path = format!("/{warehouse_id}/management/storageLocations");
        self.collect_all(Route::Warehouses, Some(&path), Query::new())
            .await
    }
}
