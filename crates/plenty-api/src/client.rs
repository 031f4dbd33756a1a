// PlentyMarkets REST client and request dispatcher
//
// Owns the HTTP client, the validated base URL and the authenticated
// session. `send` is the single exit point to the network: it attaches the
// bearer token, waits out throttling, decodes the body and classifies it into
// an `Outcome`. Resource methods live in `resources/` as inherent methods.

use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, trace, warn};

use crate::auth::{AuthMode, Credential};
use crate::error::Error;
use crate::query::Query;
use crate::route::{BaseUrl, Route};
use crate::session::Session;
use crate::transport::TransportConfig;

// ── Request / Outcome ────────────────────────────────────────────────

/// Everything needed to issue one call.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub route: Route,
    /// Appended to the route path, e.g. `/42/transactions`.
    pub path: Option<String>,
    pub query: Query,
    pub body: Option<Value>,
}

impl Request {
    pub fn new(method: Method, route: Route) -> Self {
        Self {
            method,
            route,
            path: None,
            query: Query::new(),
            body: None,
        }
    }

    pub fn get(route: Route) -> Self {
        Self::new(Method::GET, route)
    }

    pub fn post(route: Route) -> Self {
        Self::new(Method::POST, route)
    }

    pub fn put(route: Route) -> Self {
        Self::new(Method::PUT, route)
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    /// Attach a JSON body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, Error> {
        let value = serde_json::to_value(body).map_err(|e| {
            Error::InvalidArgument(format!("request body could not be serialized: {e}"))
        })?;
        self.body = Some(value);
        Ok(self)
    }
}

/// Classified result of a call that produced a decodable body.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(Value),
    /// The body carried an `error` key, or the status was not a success.
    ServerError {
        status: u16,
        message: String,
        body: Value,
    },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Turn a server error into `Error::Api`.
    pub fn into_result(self) -> Result<Value, Error> {
        match self {
            Self::Success(value) => Ok(value),
            Self::ServerError {
                status, message, ..
            } => Err(Error::Api { status, message }),
        }
    }
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for one PlentyMarkets system.
///
/// Each instance carries its own session; there is no shared global state
/// between clients. All calls are awaited strictly one after the other by
/// the aggregation and workflow layers.
#[derive(Debug)]
pub struct PlentyClient {
    http: reqwest::Client,
    base_url: BaseUrl,
    session: Session,
    transport: TransportConfig,
}

impl PlentyClient {
    /// Build the HTTP client, log in according to `mode` and return a
    /// ready-to-use client.
    pub async fn connect(
        base_url: BaseUrl,
        mode: &AuthMode,
        transport: TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        let session = Session::authenticate(&http, &base_url, mode).await?;
        debug!(%base_url, "connected");
        Ok(Self {
            http,
            base_url,
            session,
            transport,
        })
    }

    /// Create a client around an existing `reqwest::Client` and credential.
    pub fn with_credential(
        http: reqwest::Client,
        base_url: BaseUrl,
        credential: Credential,
        transport: TransportConfig,
    ) -> Self {
        Self {
            http,
            base_url,
            session: Session::from_credential(credential),
            transport,
        }
    }

    pub fn base_url(&self) -> &BaseUrl {
        &self.base_url
    }

    pub fn transport(&self) -> &TransportConfig {
        &self.transport
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    // ── Dispatch ─────────────────────────────────────────────────────

    /// Issue one request and classify the response.
    ///
    /// HTTP 429 is retried after a fixed backoff until the server stops
    /// throttling or `max_throttle_retries` is used up. Long throttling
    /// stalls every caller awaiting this request, including whole
    /// redistribution workflows.
    pub async fn send(&self, request: &Request) -> Result<Outcome, Error> {
        let url = self.base_url.endpoint(request.route, request.path.as_deref())?;
        let params = request.query.to_pairs();
        debug!(method = %request.method, %url, ?params, "dispatching request");

        let mut throttled: u32 = 0;
        let resp = loop {
            let resp = self.build(request, url.clone(), &params)?.send().await?;
            if resp.status() != StatusCode::TOO_MANY_REQUESTS {
                break resp;
            }
            if throttled >= self.transport.max_throttle_retries {
                error!(%url, attempts = throttled, "request still throttled, giving up");
                return Err(Error::ExhaustedRetries { attempts: throttled });
            }
            throttled += 1;
            warn!(
                %url,
                attempt = throttled,
                "request throttled, limit for subscription reached"
            );
            tokio::time::sleep(self.transport.throttle_backoff).await;
        };

        let status = resp.status();
        trace!(%status, url = %resp.url(), "response received");
        let body = resp.text().await?;

        let value: Value = serde_json::from_str(&body).map_err(|e| {
            error!(method = %request.method, %url, "no decodable response for request");
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })?;

        Ok(classify(request.route, status, value))
    }

    fn build(
        &self,
        request: &Request,
        url: url::Url,
        params: &[(String, String)],
    ) -> Result<reqwest::RequestBuilder, Error> {
        let header = self.session.credential().header_value();
        let mut auth =
            HeaderValue::from_str(header.expose_secret()).map_err(|e| Error::Authentication {
                message: format!("invalid bearer token header value: {e}"),
            })?;
        auth.set_sensitive(true);

        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .header(AUTHORIZATION, auth);
        if !params.is_empty() {
            builder = builder.query(params);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        Ok(builder)
    }
}

/// Decide the outcome once, at the dispatcher boundary.
fn classify(route: Route, status: StatusCode, value: Value) -> Outcome {
    if route.returns_bare_body() && status.is_success() {
        return Outcome::Success(value);
    }

    if let Some(err) = value.as_object().and_then(|obj| obj.get("error")) {
        let message = error_message(err);
        error!(%route, %status, %message, "request failed");
        return Outcome::ServerError {
            status: status.as_u16(),
            message,
            body: value,
        };
    }

    if !status.is_success() {
        error!(%route, %status, "request failed");
        return Outcome::ServerError {
            status: status.as_u16(),
            message: format!("HTTP {status}"),
            body: value,
        };
    }

    Outcome::Success(value)
}

/// The API nests the message as `{"error": {"message": "..."}}`, but a
/// plain string also occurs.
fn error_message(err: &Value) -> String {
    match err {
        Value::String(message) => message.clone(),
        Value::Object(obj) => obj
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| err.to_string(), str::to_owned),
        other => other.to_string(),
    }
}
