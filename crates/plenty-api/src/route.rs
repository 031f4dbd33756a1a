// Route allow-list and base URL validation.
//
// Every request the client issues targets one of the fixed `Route`
// variants; nothing else can be addressed. The base URL must belong to a
// PlentyMarkets cloud system unless explicitly trusted.

use std::fmt;

use url::Url;

use crate::error::Error;

/// A fixed REST collection path of the PlentyMarkets API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Orders,
    OrderItems,
    Referrers,
    Items,
    Variations,
    Attributes,
    Manufacturers,
    SalesPrices,
    Vat,
    Stock,
    Warehouses,
    Contacts,
    Redistributions,
}

/// Loose domain prefixes accepted by [`Route::from_domain`], checked in order.
const DOMAIN_PREFIXES: &[(&str, Route)] = &[
    ("order", Route::Orders),
    ("item", Route::Items),
    ("variation", Route::Variations),
    ("vat", Route::Vat),
    ("prices", Route::SalesPrices),
    ("manufacturer", Route::Manufacturers),
    ("attribute", Route::Attributes),
    ("referrer", Route::Referrers),
    ("stockmanagement", Route::Stock),
    ("warehouses", Route::Warehouses),
    ("contact", Route::Contacts),
    ("redistribution", Route::Redistributions),
];

impl Route {
    /// Path of the collection relative to the system root.
    pub fn path(self) -> &'static str {
        match self {
            Self::Login => "/rest/login",
            Self::Orders => "/rest/orders",
            Self::OrderItems => "/rest/orders/items",
            Self::Referrers => "/rest/orders/referrers",
            Self::Items => "/rest/items",
            Self::Variations => "/rest/items/variations",
            Self::Attributes => "/rest/items/attributes",
            Self::Manufacturers => "/rest/items/manufacturers",
            Self::SalesPrices => "/rest/items/sales_prices",
            Self::Vat => "/rest/vat",
            Self::Stock => "/rest/stockmanagement/stock",
            Self::Warehouses => "/rest/stockmanagement/warehouses",
            Self::Contacts => "/rest/accounts/contacts",
            Self::Redistributions => "/rest/redistributions",
        }
    }

    /// Map a loose domain name ("orders", "Item", "variations") onto a route.
    ///
    /// A domain matches when it starts with one of the known prefixes,
    /// compared case-insensitively.
    pub fn from_domain(domain: &str) -> Result<Self, Error> {
        let lower = domain.to_lowercase();
        DOMAIN_PREFIXES
            .iter()
            .find(|(prefix, _)| lower.starts_with(prefix))
            .map(|(_, route)| *route)
            .ok_or_else(|| Error::UnknownRoute(domain.to_owned()))
    }

    /// Whether a successful body is returned without looking for an
    /// `error` key.
    ///
    /// Referrers answer with a bare list whose records may carry
    /// `error`-like keys of their own.
    pub fn returns_bare_body(self) -> bool {
        matches!(self, Self::Referrers)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

// ── Base URL ─────────────────────────────────────────────────────────

/// Validated root URL of a PlentyMarkets system,
/// e.g. `https://shop.plentymarkets-cloud01.com`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl(Url);

impl BaseUrl {
    /// Parse and validate a base URL.
    ///
    /// Only `https` URLs whose host is a subdomain of a `plentymarkets*.com`
    /// domain are accepted.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let url = Url::parse(raw.trim())?;
        let reject = |reason: &str| Error::UnsupportedHost {
            url: raw.to_owned(),
            reason: reason.to_owned(),
        };

        if url.scheme() != "https" {
            return Err(reject("scheme must be https"));
        }
        let host = url.host_str().ok_or_else(|| reject("missing host"))?;
        if !is_plenty_host(host) {
            return Err(reject(
                "host must look like <name>.plentymarkets-cloud01.com",
            ));
        }

        Ok(Self::trusted(url))
    }

    /// Accept any URL without the host check (reverse proxies, test servers).
    pub fn trusted(mut url: Url) -> Self {
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&path);
        url.set_query(None);
        url.set_fragment(None);
        Self(url)
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Full endpoint for a route plus optional sub-path (`/{id}/images`).
    pub fn endpoint(&self, route: Route, sub_path: Option<&str>) -> Result<Url, Error> {
        let base = self.0.as_str().trim_end_matches('/');
        let sub = sub_path.unwrap_or("");
        let sep = if sub.is_empty() || sub.starts_with('/') {
            ""
        } else {
            "/"
        };
        Ok(Url::parse(&format!("{base}{}{sep}{sub}", route.path()))?)
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str().trim_end_matches('/'))
    }
}

fn is_plenty_host(host: &str) -> bool {
    let labels: Vec<&str> = host.split('.').collect();
    match labels.as_slice() {
        [subdomains @ .., domain, "com"] => {
            !subdomains.is_empty()
                && subdomains.iter().all(|label| !label.is_empty())
                && domain.starts_with("plentymarkets")
        }
        _ => false,
    }
}
