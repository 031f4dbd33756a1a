// Resource methods
//
// One thin method per REST resource. Each assembles a query through the
// sanitizer and hands it to the aggregator (collections) or the dispatcher
// (single calls and writes). Split by resource group, one file each.

mod contacts;
mod items;
mod orders;
mod prices;
mod stock;

pub use items::ImageTarget;
pub use orders::{FINISH_DATE_TYPE, INITIATION_DATE_TYPE, OrderDate, REFERRER_COLUMNS};

use crate::dates;
use crate::error::Error;
use crate::query::Query;

/// Add `updatedAt` in W3C format when a last update date was given.
fn with_updated_at(mut query: Query, last_update: Option<&str>) -> Result<Query, Error> {
    if let Some(raw) = last_update {
        query.set("updatedAt", dates::parse_date(raw)?);
    }
    Ok(query)
}
