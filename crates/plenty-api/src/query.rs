// Query construction and parameter sanitization.
//
// Callers pass loosely typed filters (`refine`), response extensions
// (`additional`) and a language code. Each route has a whitelist of accepted
// keys and values; anything outside it is dropped with a warning before the
// query reaches the dispatcher.

use indexmap::IndexMap;
use tracing::warn;

use crate::route::Route;

/// Languages the REST API can render texts in.
pub const VALID_LANGUAGES: &[&str] = &[
    "bg", "cn", "cz", "da", "de", "en", "es", "fr", "it", "nl", "nn", "pl", "pt", "ro", "ru",
    "se", "sk", "tr", "vn",
];

/// A single query parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Single(String),
    /// Rendered as one `key=value` pair per element (e.g. `with[]`).
    Repeated(Vec<String>),
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_owned())
    }
}

/// Insertion-ordered query parameters with unique keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query(IndexMap<String, QueryValue>);

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a parameter.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<QueryValue> {
        self.0.shift_remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Flatten into the pair list reqwest expects.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.0.len());
        for (key, value) in &self.0 {
            match value {
                QueryValue::Single(v) => pairs.push((key.clone(), v.clone())),
                QueryValue::Repeated(values) => {
                    pairs.extend(values.iter().map(|v| (key.clone(), v.clone())));
                }
            }
        }
        pairs
    }
}

// ── Whitelists ───────────────────────────────────────────────────────

impl Route {
    /// Filter keys the route accepts in `refine`.
    pub fn refine_keys(self) -> &'static [&'static str] {
        match self {
            Self::Orders => &[
                "orderType",
                "contactId",
                "referrerId",
                "shippingProfileId",
                "shippingServiceProviderId",
                "ownerUserId",
                "warehouseId",
                "isEbayPlus",
                "includedVariation",
                "includedItem",
                "orderIds",
                "countryId",
                "orderItemName",
                "variationNumber",
                "sender.contact",
                "sender.warehouse",
                "receiver.contact",
                "receiver.warehouse",
                "externalOrderId",
                "clientId",
                "paymentStatus",
                "statusFrom",
                "statusTo",
                "hasDocument",
                "hasDocumentNumber",
                "parentOrderId",
            ],
            Self::Items => &["name", "manufacturerId", "id", "flagOne", "flagTwo"],
            Self::Variations => &[
                "id",
                "itemId",
                "flagOne",
                "flagTwo",
                "categoryId",
                "isMain",
                "isActive",
                "barcode",
                "referrerId",
                "sku",
                "date",
            ],
            Self::Manufacturers => &["name"],
            Self::Stock | Self::Warehouses => &["variationId"],
            Self::Contacts => &[
                "fullText",
                "contactEmail",
                "email",
                "postalCode",
                "plentyId",
                "externalId",
                "number",
                "typeId",
                "rating",
                "createdAtBefore",
                "createdAtAfter",
                "updatedAtBefore",
                "updatedAtAfter",
                "lastOrderAtBefore",
                "lastOrderAtAfter",
                "newsletterAllowanceAfter",
                "newsletterAllowanceBefore",
                "newsletterAllowance",
                "contactId",
                "contactAddress",
                "countryId",
                "userId",
                "referrerId",
                "name",
                "nameOrId",
                "town",
                "privatePhone",
                "billingAddressId",
                "deliveryAddressId",
                "tagIds",
            ],
            _ => &[],
        }
    }

    /// Values the route accepts in `additional` (the `with` parameter).
    pub fn additional_values(self) -> &'static [&'static str] {
        match self {
            Self::Orders => &[
                "addresses",
                "relations",
                "comments",
                "location",
                "payments",
                "documents",
                "contactSender",
                "contactReceiver",
                "warehouseSender",
                "warehouseReceiver",
                "orderItems.variation",
                "orderItems.giftCardCodes",
                "orderItems.transactions",
                "orderItems.serialNumbers",
                "orderItems.variationBarcodes",
                "orderItems.comments",
                "originOrderReferences",
                "shippingPackages",
            ],
            Self::Items => &[
                "itemProperties",
                "itemCrossSelling",
                "variations",
                "itemImages",
                "itemShippingProfiles",
                "ebayTitles",
            ],
            Self::Variations => &[
                "properties",
                "variationProperties",
                "variationBarcodes",
                "variationBundleComponents",
                "variationComponentBundles",
                "variationSalesPrices",
                "marketItemNumbers",
                "variationCategories",
                "variationClients",
                "variationMarkets",
                "variationDefaultCategory",
                "variationSuppliers",
                "variationWarehouses",
                "images",
                "itemImages",
                "variationAttributeValues",
                "variationSkus",
                "variationAdditionalSkus",
                "unit",
                "parent",
                "item",
                "stock",
            ],
            Self::Manufacturers => &["commisions", "externals"],
            Self::Attributes => &["names", "values", "maps"],
            Self::Contacts => &[
                "addresses",
                "accounts",
                "options",
                "orderSummary",
                "primaryBillingAddress",
            ],
            _ => &[],
        }
    }
}

// ── Sanitizer ────────────────────────────────────────────────────────

/// Caller-supplied filter arguments for a GET resource method.
#[derive(Debug, Clone, Default)]
pub struct Filters {
    /// Filter key/value pairs, e.g. `("referrerId", "1")`.
    pub refine: Vec<(String, String)>,
    /// Extra response elements, e.g. `"variations"`.
    pub additional: Vec<String>,
    /// Language code for product texts.
    pub lang: Option<String>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refine(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.refine.push((key.into(), value.into()));
        self
    }

    pub fn additional(mut self, value: impl Into<String>) -> Self {
        self.additional.push(value.into());
        self
    }

    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }
}

/// Merge whitelisted filters into `query`.
///
/// Unknown refine keys, unknown additional values and unsupported language
/// codes are dropped with a warning rather than failing the call. Orders take
/// their extensions as repeated `with[]` parameters, every other route as a
/// single comma-joined `with`.
pub fn sanitize(route: Route, mut query: Query, filters: &Filters) -> Query {
    let allowed_keys = route.refine_keys();
    for (key, value) in &filters.refine {
        if allowed_keys.contains(&key.as_str()) {
            query.set(key.clone(), value.clone());
        } else {
            warn!(%route, key, "invalid refine argument removed");
        }
    }

    let allowed_values = route.additional_values();
    let (accepted, rejected): (Vec<&String>, Vec<&String>) = filters
        .additional
        .iter()
        .partition(|value| allowed_values.contains(&value.as_str()));
    if !rejected.is_empty() {
        warn!(%route, ?rejected, "invalid additional argument removed");
    }
    if !accepted.is_empty() {
        let accepted: Vec<String> = accepted.into_iter().cloned().collect();
        if route == Route::Orders {
            query.set("with[]", QueryValue::Repeated(accepted));
        } else {
            query.set("with", accepted.join(","));
        }
    }

    if let Some(lang) = filters.lang.as_deref() {
        match language(lang) {
            Some(lang) => query.set("lang", lang),
            None => warn!(lang, "invalid language removed"),
        }
    }

    query
}

/// Normalize a language code, returning `None` if it is not supported.
pub fn language(lang: &str) -> Option<String> {
    let lower = lang.to_lowercase();
    VALID_LANGUAGES.contains(&lower.as_str()).then_some(lower)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn invalid_refine_keys_are_dropped() {
        let filters = Filters::new()
            .refine("referrerId", "1")
            .refine("bogus", "x")
            .refine("orderType", "1,4");

        let query = sanitize(Route::Orders, Query::new(), &filters);

        assert_eq!(
            query.to_pairs(),
            vec![
                ("referrerId".to_owned(), "1".to_owned()),
                ("orderType".to_owned(), "1,4".to_owned()),
            ]
        );
    }

    #[test]
    fn order_extensions_use_repeated_with() {
        let filters = Filters::new()
            .additional("addresses")
            .additional("nonsense")
            .additional("documents");

        let query = sanitize(Route::Orders, Query::new(), &filters);

        assert_eq!(
            query.to_pairs(),
            vec![
                ("with[]".to_owned(), "addresses".to_owned()),
                ("with[]".to_owned(), "documents".to_owned()),
            ]
        );
    }

    #[test]
    fn other_extensions_are_comma_joined() {
        let filters = Filters::new().additional("variations").additional("itemImages");

        let query = sanitize(Route::Items, Query::new(), &filters);

        assert_eq!(
            query.get("with"),
            Some(&QueryValue::Single("variations,itemImages".into()))
        );
    }

    #[test]
    fn everything_rejected_leaves_query_untouched() {
        let base = Query::new().with("updatedAt", "2020-01-01");
        let filters = Filters::new().refine("name", "x").additional("values");

        // Vat has no whitelist at all.
        let query = sanitize(Route::Vat, base.clone(), &filters);

        assert_eq!(query, base);
    }

    #[test]
    fn language_is_normalized_or_dropped() {
        let query = sanitize(Route::Variations, Query::new(), &Filters::new().lang("DE"));
        assert_eq!(query.get("lang"), Some(&QueryValue::Single("de".into())));

        let query = sanitize(Route::Variations, Query::new(), &Filters::new().lang("xx"));
        assert!(!query.contains("lang"));
    }

    #[test]
    fn set_replaces_existing_key_in_place() {
        let mut query = Query::new().with("a", "1").with("page", "1").with("b", "2");
        query.set("page", "2");

        assert_eq!(
            query.to_pairs(),
            vec![
                ("a".to_owned(), "1".to_owned()),
                ("page".to_owned(), "2".to_owned()),
                ("b".to_owned(), "2".to_owned()),
            ]
        );
    }
}
