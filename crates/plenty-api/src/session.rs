// Login flow
//
// Exchanges username/password for a bearer token at `POST /rest/login`.
// The credentials travel as query parameters, which is what the endpoint
// expects. An `invalid_credentials` answer in persistent mode clears the
// store, re-prompts and retries exactly once; everything else is terminal.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::auth::{AuthMode, Credential, LoginCredentials, PasswordSource};
use crate::error::Error;
use crate::route::{BaseUrl, Route};

/// Error code the login endpoint uses for a wrong username/password.
const INVALID_CREDENTIALS: &str = "invalid_credentials";

#[derive(Deserialize)]
struct LoginResponse {
    token_type: Option<String>,
    access_token: Option<String>,
    error: Option<Value>,
}

/// What one login attempt produced.
enum Attempt {
    Token(Credential),
    Rejected,
}

/// Authenticated state of a client: the bearer credential of this instance.
#[derive(Debug, Clone)]
pub struct Session {
    credential: Credential,
}

impl Session {
    /// Wrap an already obtained credential.
    pub fn from_credential(credential: Credential) -> Self {
        Self { credential }
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Log in according to `mode`.
    pub async fn authenticate(
        http: &reqwest::Client,
        base_url: &BaseUrl,
        mode: &AuthMode,
    ) -> Result<Self, Error> {
        let credentials = initial_credentials(mode)?;

        if let Attempt::Token(credential) = login(http, base_url, &credentials).await? {
            persist(mode, &credentials)?;
            return Ok(Self { credential });
        }

        let AuthMode::Persistent { store, prompt } = mode else {
            error!(username = %credentials.username, "login rejected: invalid credentials");
            return Err(Error::InvalidCredentials {
                username: credentials.username,
            });
        };

        warn!("wrong credentials stored, asking for new ones");
        store.delete()?;
        let retry = prompt.prompt()?;
        store.save(&retry)?;

        match login(http, base_url, &retry).await? {
            Attempt::Token(credential) => Ok(Self { credential }),
            Attempt::Rejected => {
                error!(username = %retry.username, "login rejected again, giving up");
                Err(Error::InvalidCredentials {
                    username: retry.username,
                })
            }
        }
    }
}

fn initial_credentials(mode: &AuthMode) -> Result<LoginCredentials, Error> {
    match mode {
        AuthMode::Persistent { store, prompt } => match store.load()? {
            Some(credentials) => Ok(credentials),
            None => prompt.prompt(),
        },
        AuthMode::Interactive { prompt } => prompt.prompt(),
        AuthMode::Direct { username, password } => {
            let password = match password {
                PasswordSource::Plain(secret) => secret.clone(),
                PasswordSource::EncryptedFile { path, decryptor } => decryptor.decrypt(path)?,
            };
            Ok(LoginCredentials {
                username: username.clone(),
                password,
            })
        }
    }
}

/// Save credentials that just worked, for the persistent mode only.
fn persist(mode: &AuthMode, credentials: &LoginCredentials) -> Result<(), Error> {
    if let AuthMode::Persistent { store, .. } = mode {
        store.save(credentials)?;
    }
    Ok(())
}

async fn login(
    http: &reqwest::Client,
    base_url: &BaseUrl,
    credentials: &LoginCredentials,
) -> Result<Attempt, Error> {
    let url = base_url.endpoint(Route::Login, None)?;
    debug!(username = %credentials.username, "logging in at {}", url);

    let resp = http
        .post(url)
        .query(&[
            ("username", credentials.username.as_str()),
            ("password", credentials.password.expose_secret()),
        ])
        .send()
        .await?;

    let status = resp.status();
    if status == reqwest::StatusCode::FORBIDDEN {
        error!("login failed: account is locked");
        return Err(Error::AccountLocked);
    }

    let body = resp.text().await?;
    let parsed: LoginResponse = serde_json::from_str(&body).map_err(|e| {
        error!(%status, "login response could not be read");
        Error::Deserialization {
            message: format!("login response: {e}"),
            body: String::new(),
        }
    })?;

    if let (Some(token_type), Some(access_token)) = (parsed.token_type, parsed.access_token) {
        debug!("login successful");
        return Ok(Attempt::Token(Credential::new(
            token_type,
            SecretString::from(access_token),
        )));
    }

    match parsed.error {
        Some(Value::String(code)) if code == INVALID_CREDENTIALS => Ok(Attempt::Rejected),
        Some(other) => {
            error!(%status, error = %other, "login token retrieval was unsuccessful");
            Err(Error::Authentication {
                message: format!("HTTP {status}: {other}"),
            })
        }
        None => {
            error!(%status, "login token retrieval was unsuccessful");
            Err(Error::MissingToken)
        }
    }
}
