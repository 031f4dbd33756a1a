use thiserror::Error;

use crate::redistribution::ValidationError;

/// Top-level error type for the `plenty-api` crate.
///
/// Covers every failure mode of the client: authentication, transport,
/// response decoding, server-reported errors, bounded retries and caller
/// input validation.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login failed for a reason not covered by the variants below.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The login endpoint answered HTTP 403.
    #[error(
        "Login rejected: the account is locked (unlock it under Setup > Settings > Accounts)"
    )]
    AccountLocked,

    /// The server reported `invalid_credentials` and no retry was left.
    #[error("Invalid credentials for user '{username}'")]
    InvalidCredentials { username: String },

    /// The login response carried neither an error nor a complete token.
    #[error("Login response did not contain a bearer token")]
    MissingToken,

    /// A credential collaborator (store, prompt, decryptor) failed.
    #[error("Credential source failed: {message}")]
    Credentials { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The base URL does not point at a PlentyMarkets system.
    #[error("Unsupported base URL '{url}': {reason}")]
    UnsupportedHost { url: String, reason: String },

    /// The requested domain does not map onto a known route.
    #[error("Unknown route for domain '{0}'")]
    UnknownRoute(String),

    /// Still throttled (HTTP 429) after the configured number of retries.
    #[error("Request throttled, gave up after {attempts} retries")]
    ExhaustedRetries { attempts: u32 },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// A response had a different shape than the endpoint promised.
    #[error("Unexpected response shape from {route}: {message}")]
    UnexpectedShape { route: String, message: String },

    /// The server signalled more pages than the safety valve allows.
    #[error("Pagination of {route} exceeded {max_pages} pages")]
    PaginationLimit { route: String, max_pages: u32 },

    // ── Server ──────────────────────────────────────────────────────
    /// Error payload reported by the REST API.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Caller input ────────────────────────────────────────────────
    /// A redistribution template violated its quantity invariants.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A date argument could not be parsed or the range is invalid.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Any other rejected argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// Returns `true` for errors raised while obtaining the bearer token.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. }
                | Self::AccountLocked
                | Self::InvalidCredentials { .. }
                | Self::MissingToken
                | Self::Credentials { .. }
        )
    }

    /// Returns `true` if this is a transient error worth retrying later.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::ExhaustedRetries { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the error was reported by the server itself.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Api { .. })
    }
}
