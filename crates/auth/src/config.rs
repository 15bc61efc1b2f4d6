use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::{AuthError, Result};

/// Shell origin used when neither the session nor the URL names one.
pub const DEFAULT_SHELL_ORIGIN: &str = "https://bcombuddy.netlify.app";

/// Default path of the durable auth store.
pub const DEFAULT_STORE_PATH: &str = "taxlab-auth.json";

/// Default Identity Toolkit endpoint.
pub const DEFAULT_FIREBASE_AUTH_URL: &str = "https://identitytoolkit.googleapis.com/v1/";

/// Firebase Identity Toolkit configuration.
#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    pub api_key: String,
    /// Base URL of the Identity Toolkit REST API (overridable for the emulator).
    pub auth_url: Url,
    /// `requestUri` sent with federated sign-in.
    pub request_uri: Url,
    pub request_timeout: Duration,
}

/// Complete auth configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Last-resort logout redirect target.
    pub default_shell_origin: Url,
    pub store_path: PathBuf,
    pub firebase: Option<FirebaseConfig>,
}

impl AuthConfig {
    /// Load from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SHELL_DOMAIN`: Default shell origin (default: `https://bcombuddy.netlify.app`)
    /// - `AUTH_STORE_PATH`: Path of the durable auth store (default: `taxlab-auth.json`)
    /// - `FIREBASE_API_KEY`: Firebase web API key (optional, enables the Firebase provider)
    /// - `FIREBASE_AUTH_URL`: Identity Toolkit base URL (default: `https://identitytoolkit.googleapis.com/v1/`)
    /// - `FIREBASE_REQUEST_URI`: `requestUri` for federated sign-in (default: `http://localhost`)
    /// - `FIREBASE_TIMEOUT_SECS`: HTTP timeout in seconds (default: 10)
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Config` if a URL variable does not parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AuthConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let default_shell_origin = parse_url(
            "SHELL_DOMAIN",
            &lookup("SHELL_DOMAIN").unwrap_or_else(|| DEFAULT_SHELL_ORIGIN.to_string()),
        )?;

        let store_path = lookup("AUTH_STORE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH));

        let firebase = match lookup("FIREBASE_API_KEY").filter(|k| !k.is_empty()) {
            Some(api_key) => Some(FirebaseConfig {
                api_key,
                auth_url: parse_url(
                    "FIREBASE_AUTH_URL",
                    &lookup("FIREBASE_AUTH_URL")
                        .unwrap_or_else(|| DEFAULT_FIREBASE_AUTH_URL.to_string()),
                )?,
                request_uri: parse_url(
                    "FIREBASE_REQUEST_URI",
                    &lookup("FIREBASE_REQUEST_URI")
                        .unwrap_or_else(|| "http://localhost".to_string()),
                )?,
                request_timeout: lookup("FIREBASE_TIMEOUT_SECS")
                    .and_then(|s| s.parse::<u64>().ok())
                    .map(Duration::from_secs)
                    .unwrap_or(Duration::from_secs(10)),
            }),
            None => None,
        };

        Ok(Self {
            default_shell_origin,
            store_path,
            firebase,
        })
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            default_shell_origin: Url::parse(DEFAULT_SHELL_ORIGIN)
                .expect("DEFAULT_SHELL_ORIGIN must be valid URL"),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            firebase: None,
        }
    }
}

fn parse_url(name: &str, value: &str) -> Result<Url> {
    Url::parse(value).map_err(|e| AuthError::Config(format!("{} must be a valid URL: {}", name, e)))
}
