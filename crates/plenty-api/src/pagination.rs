// Pagination aggregator
//
// Collection endpoints answer `{entries, page, isLastPage, ...}`. The
// aggregator walks the pages strictly in order, concatenating entries until
// the server reports the last page. Any failure aborts the walk; entries from
// earlier pages are never returned on their own.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::client::{Outcome, PlentyClient, Request};
use crate::error::Error;
use crate::query::Query;
use crate::route::Route;

/// An opaque entry record. The client never interprets its schema.
pub type Record = Map<String, Value>;

/// One page of a collection endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    pub entries: Vec<Record>,
    pub page: u64,
    pub is_last_page: bool,
}

impl PageResponse {
    /// Whether a body carries the page keys at all.
    fn is_page_shaped(value: &Value) -> bool {
        value.as_object().is_some_and(|obj| {
            ["entries", "page", "isLastPage"]
                .iter()
                .all(|key| obj.contains_key(*key))
        })
    }
}

impl PlentyClient {
    /// Fetch every page of `route` and return all entries in page order.
    ///
    /// The first request carries no `page` parameter; each following one asks
    /// for `page + 1` of the previous response. A body without page keys on
    /// the first request means the endpoint is not paginated: a list is
    /// returned element-wise, an object as a single record. The walk is capped
    /// at `TransportConfig::max_pages`.
    pub async fn collect_all(
        &self,
        route: Route,
        path: Option<&str>,
        query: Query,
    ) -> Result<Vec<Record>, Error> {
        let mut request = Request::get(route).query(query);
        request.path = path.map(str::to_owned);
        request.query.remove("page");

        let max_pages = self.transport().max_pages;
        let mut entries: Vec<Record> = Vec::new();
        let mut fetched: u32 = 0;

        loop {
            if fetched >= max_pages {
                error!(%route, max_pages, "server never reported the last page");
                return Err(Error::PaginationLimit {
                    route: route.to_string(),
                    max_pages,
                });
            }
            fetched += 1;

            let value = match self.send(&request).await.and_then(Outcome::into_result) {
                Ok(value) => value,
                Err(e) => {
                    if fetched > 1 {
                        error!(%route, page = fetched, error = %e, "subsequent request failed");
                    }
                    return Err(e);
                }
            };

            if !PageResponse::is_page_shaped(&value) {
                if fetched == 1 {
                    debug!(%route, "response is not paginated");
                    return unpaginated(route, value);
                }
                return Err(Error::UnexpectedShape {
                    route: route.to_string(),
                    message: "page keys missing from a follow-up page".into(),
                });
            }

            let page: PageResponse =
                serde_json::from_value(value).map_err(|e| Error::UnexpectedShape {
                    route: route.to_string(),
                    message: e.to_string(),
                })?;

            debug!(
                %route,
                page = page.page,
                count = page.entries.len(),
                last = page.is_last_page,
                "page received"
            );
            entries.extend(page.entries);

            if page.is_last_page {
                return Ok(entries);
            }
            request.query.set("page", (page.page + 1).to_string());
        }
    }
}

fn unpaginated(route: Route, value: Value) -> Result<Vec<Record>, Error> {
    match value {
        Value::Object(record) => Ok(vec![record]),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(record) => Ok(record),
                other => Err(Error::UnexpectedShape {
                    route: route.to_string(),
                    message: format!("expected records, found {other}"),
                }),
            })
            .collect(),
        Value::Null => Ok(Vec::new()),
        other => Err(Error::UnexpectedShape {
            route: route.to_string(),
            message: format!("expected records, found {other}"),
        }),
    }
}
