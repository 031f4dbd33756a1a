// Order endpoints
//
// Date-bounded order listing, order referrers and the order write calls the
// redistribution workflow is built from: creation, transactions, date
// updates and booking.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::{Outcome, PlentyClient, Request};
use crate::dates::{self, OrderDateType};
use crate::error::Error;
use crate::pagination::Record;
use crate::query::{Filters, Query, sanitize};
use crate::redistribution::TransactionRecord;
use crate::route::Route;

/// Order date type id marking the start of a redistribution.
pub const INITIATION_DATE_TYPE: u32 = 16;

/// Order date type id marking the end of a redistribution.
pub const FINISH_DATE_TYPE: u32 = 18;

/// Referrer fields `get_referrers` can be restricted to.
pub const REFERRER_COLUMNS: &[&str] = &[
    "backendName",
    "id",
    "isEditable",
    "isFilterable",
    "name",
    "orderOwnderId",
    "origin",
];

/// One entry of the `dates` list of an order update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDate {
    pub type_id: u32,
    /// W3C timestamp.
    pub date: String,
}

impl OrderDate {
    pub fn initiated(date: impl Into<String>) -> Self {
        Self {
            type_id: INITIATION_DATE_TYPE,
            date: date.into(),
        }
    }

    pub fn finished(date: impl Into<String>) -> Self {
        Self {
            type_id: FINISH_DATE_TYPE,
            date: date.into(),
        }
    }
}

#[derive(Serialize)]
struct DatesBody<'a> {
    dates: &'a [OrderDate],
}

impl PlentyClient {
    /// All orders whose `date_type` date lies between `start` and `end`.
    ///
    /// `GET /rest/orders` with `{stem}From` / `{stem}To`, e.g.
    /// `createdAtFrom`. The range must be ordered and lie in the past.
    pub async fn get_orders_by_date(
        &self,
        start: &str,
        end: &str,
        date_type: OrderDateType,
        filters: &Filters,
    ) -> Result<Vec<Record>, Error> {
        let range = dates::build_date_range(start, end)?;
        dates::check_date_range(&range)?;

        let stem = date_type.query_stem();
        let query = Query::new()
            .with(format!("{stem}From"), range.start)
            .with(format!("{stem}To"), range.end);
        let query = sanitize(Route::Orders, query, filters);

        self.collect_all(Route::Orders, None, query).await
    }

    /// Order referrers (marketplaces and other order origins).
    ///
    /// `GET /rest/orders/referrers`. The endpoint is not paginated and can
    /// only export a single `column`; unknown columns are dropped.
    pub async fn get_referrers(&self, column: Option<&str>) -> Result<Value, Error> {
        let mut query = Query::new();
        if let Some(column) = column {
            if REFERRER_COLUMNS.contains(&column) {
                query.set("columns", column);
            } else {
                warn!(column, "invalid column argument removed");
            }
        }

        self.send(&Request::get(Route::Referrers).query(query))
            .await?
            .into_result()
    }

    /// `POST /rest/orders`
    pub async fn create_order<B: Serialize + ?Sized>(&self, body: &B) -> Result<Outcome, Error> {
        debug!("creating order");
        self.send(&Request::post(Route::Orders).json(body)?).await
    }

    /// `POST /rest/redistributions`
    pub async fn create_redistribution_order<B: Serialize + ?Sized>(
        &self,
        body: &B,
    ) -> Result<Outcome, Error> {
        debug!("creating redistribution order");
        self.send(&Request::post(Route::Redistributions).json(body)?)
            .await
    }

    /// Book one stock movement onto an order item.
    ///
    /// `POST /rest/orders/items/{orderItemId}/transactions`
    pub async fn create_transaction(
        &self,
        transaction: &TransactionRecord,
    ) -> Result<Outcome, Error> {
        debug!(
            order_item = transaction.order_item_id,
            location = transaction.warehouse_location_id,
            direction = ?transaction.direction,
            "creating transaction"
        );
        let request = Request::post(Route::OrderItems)
            .path(format!("/{}/transactions", transaction.order_item_id))
            .json(transaction)?;
        self.send(&request).await
    }

    /// Set dates on a redistribution order.
    ///
    /// `PUT /rest/redistributions/{orderId}` with `{"dates": [...]}`
    pub async fn update_order_dates(
        &self,
        order_id: u64,
        dates: &[OrderDate],
    ) -> Result<Outcome, Error> {
        debug!(order_id, ?dates, "updating order dates");
        let request = Request::put(Route::Redistributions)
            .path(format!("/{order_id}"))
            .json(&DatesBody { dates })?;
        self.send(&request).await
    }

    /// Book all pending transactions of an order.
    ///
    /// `POST /rest/orders/{orderId}/booking`
    pub async fn book_order(&self, order_id: u64) -> Result<Outcome, Error> {
        debug!(order_id, "booking order");
        let request = Request::post(Route::Orders).path(format!("/{order_id}/booking"));
        self.send(&request).await
    }
}
