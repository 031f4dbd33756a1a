// Authentication types and credential collaborators.
//
// The login flow itself lives in `session.rs`; this module defines what it
// consumes: the acquisition mode, the traits that source username/password
// pairs, and the bearer credential it produces.

use std::fmt;
use std::path::PathBuf;
use std::process::Command;
use std::sync::{Arc, Mutex};

use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

/// Bearer credential returned by `/rest/login`.
#[derive(Clone)]
pub struct Credential {
    token_type: String,
    access_token: SecretString,
}

impl Credential {
    pub fn new(token_type: impl Into<String>, access_token: SecretString) -> Self {
        Self {
            token_type: token_type.into(),
            access_token,
        }
    }

    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    /// `Authorization` header value: `<token_type> <access_token>`.
    pub fn header_value(&self) -> SecretString {
        SecretString::from(format!(
            "{} {}",
            self.token_type,
            self.access_token.expose_secret()
        ))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token_type", &self.token_type)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Username/password pair sent to the login endpoint.
#[derive(Debug, Clone)]
pub struct LoginCredentials {
    pub username: String,
    pub password: SecretString,
}

impl LoginCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

// ── Collaborator traits ──────────────────────────────────────────────

/// Persistent credential storage (system keyring, secrets manager, ...).
///
/// Not designed for several clients updating the same entry at once.
pub trait CredentialStore: Send + Sync {
    /// Stored credentials, or `None` if nothing was saved yet.
    fn load(&self) -> Result<Option<LoginCredentials>, Error>;
    fn save(&self, credentials: &LoginCredentials) -> Result<(), Error>;
    fn delete(&self) -> Result<(), Error>;
}

/// Source of interactively entered credentials.
pub trait CredentialPrompt: Send + Sync {
    fn prompt(&self) -> Result<LoginCredentials, Error>;
}

/// Decrypts a password file referenced by [`PasswordSource::EncryptedFile`].
pub trait PasswordDecryptor: Send + Sync {
    fn decrypt(&self, path: &std::path::Path) -> Result<SecretString, Error>;
}

// ── Acquisition modes ────────────────────────────────────────────────

/// Where the password of a [`AuthMode::Direct`] login comes from.
#[derive(Clone)]
pub enum PasswordSource {
    Plain(SecretString),
    EncryptedFile {
        path: PathBuf,
        decryptor: Arc<dyn PasswordDecryptor>,
    },
}

impl fmt::Debug for PasswordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(_) => f.write_str("Plain([REDACTED])"),
            Self::EncryptedFile { path, .. } => {
                f.debug_struct("EncryptedFile").field("path", path).finish()
            }
        }
    }
}

/// How the client acquires its login credentials.
#[derive(Clone)]
pub enum AuthMode {
    /// Read from the store; prompt and save when it is empty. An
    /// `invalid_credentials` answer clears the store and re-prompts once.
    Persistent {
        store: Arc<dyn CredentialStore>,
        prompt: Arc<dyn CredentialPrompt>,
    },
    /// Prompt every time, never persist.
    Interactive { prompt: Arc<dyn CredentialPrompt> },
    /// Credentials supplied by the caller.
    Direct {
        username: String,
        password: PasswordSource,
    },
}

impl AuthMode {
    pub fn direct(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Direct {
            username: username.into(),
            password: PasswordSource::Plain(SecretString::from(password.into())),
        }
    }
}

impl fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Persistent { .. } => f.write_str("Persistent"),
            Self::Interactive { .. } => f.write_str("Interactive"),
            Self::Direct { username, password } => f
                .debug_struct("Direct")
                .field("username", username)
                .field("password", password)
                .finish(),
        }
    }
}

// ── Implementations ──────────────────────────────────────────────────

/// In-process credential store. Useful for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    inner: Mutex<Option<LoginCredentials>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: LoginCredentials) -> Self {
        Self {
            inner: Mutex::new(Some(credentials)),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<LoginCredentials>>, Error> {
        self.inner.lock().map_err(|_| Error::Credentials {
            message: "credential store lock poisoned".into(),
        })
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<LoginCredentials>, Error> {
        Ok(self.lock()?.clone())
    }

    fn save(&self, credentials: &LoginCredentials) -> Result<(), Error> {
        *self.lock()? = Some(credentials.clone());
        Ok(())
    }

    fn delete(&self) -> Result<(), Error> {
        *self.lock()? = None;
        Ok(())
    }
}

/// Prompts on the controlling terminal.
///
/// Usernames and passwords shorter than two characters are asked for again.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl CredentialPrompt for TerminalPrompt {
    fn prompt(&self) -> Result<LoginCredentials, Error> {
        let prompt_failed = |e: dialoguer::Error| Error::Credentials {
            message: format!("prompt failed: {e}"),
        };

        let username: String = dialoguer::Input::new()
            .with_prompt("Username")
            .validate_with(|input: &String| -> Result<(), &str> {
                if input.trim().len() < 2 {
                    Err("username too short")
                } else {
                    Ok(())
                }
            })
            .interact_text()
            .map_err(prompt_failed)?;

        let password = dialoguer::Password::new()
            .with_prompt("Password")
            .validate_with(|input: &String| -> Result<(), &str> {
                if input.len() < 2 {
                    Err("password too short")
                } else {
                    Ok(())
                }
            })
            .interact()
            .map_err(prompt_failed)?;

        Ok(LoginCredentials::new(username.trim(), password))
    }
}

/// Decrypts password files with the `gpg` binary on `PATH`.
#[derive(Debug, Clone)]
pub struct GpgDecryptor {
    program: PathBuf,
}

impl Default for GpgDecryptor {
    fn default() -> Self {
        Self {
            program: PathBuf::from("gpg"),
        }
    }
}

impl GpgDecryptor {
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl PasswordDecryptor for GpgDecryptor {
    fn decrypt(&self, path: &std::path::Path) -> Result<SecretString, Error> {
        if !path.is_file() {
            return Err(Error::Credentials {
                message: format!("password file {} does not exist", path.display()),
            });
        }

        let output = Command::new(&self.program)
            .args(["--quiet", "--batch", "--decrypt"])
            .arg(path)
            .output()
            .map_err(|e| Error::Credentials {
                message: format!("failed to run {}: {e}", self.program.display()),
            })?;

        if !output.status.success() {
            return Err(Error::Credentials {
                message: format!(
                    "decryption of {} failed: {}",
                    path.display(),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let plain = String::from_utf8(output.stdout).map_err(|_| Error::Credentials {
            message: "decrypted password is not valid UTF-8".into(),
        })?;
        Ok(SecretString::from(plain.trim_end_matches(['\n', '\r']).to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn header_value_joins_type_and_token() {
        let credential = Credential::new("Bearer", SecretString::from("abc".to_owned()));
        assert_eq!(credential.header_value().expose_secret(), "Bearer abc");
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let credential = Credential::new("Bearer", SecretString::from("abc".to_owned()));
        let rendered = format!("{credential:?}");
        assert!(!rendered.contains("abc"));

        let mode = AuthMode::direct("admin", "hunter2");
        assert!(!format!("{mode:?}").contains("hunter2"));
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryCredentialStore::new();
        assert!(store.load().unwrap().is_none());

        store.save(&LoginCredentials::new("admin", "pw")).unwrap();
        assert_eq!(store.load().unwrap().unwrap().username, "admin");

        store.delete().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn gpg_decryptor_rejects_missing_file() {
        let result = GpgDecryptor::default().decrypt(std::path::Path::new("/nonexistent/pw.gpg"));
        assert!(matches!(result, Err(Error::Credentials { .. })));
    }
}
