use taxlab_core::auth::{ProviderError, ProviderErrorCode, StoreError};
use thiserror::Error;

/// Auth errors for the taxlab_auth crate.
///
/// This wraps the core `AuthError` and adds the variants that only make sense
/// in the imperative shell.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Error from the core auth module (provider, storage, token)
    #[error(transparent)]
    Core(#[from] taxlab_core::auth::AuthError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP client setup failed
    #[error("HTTP client error: {0}")]
    Http(String),

    /// A second observer was attached to the same resolver
    #[error("a session observer is already attached to this resolver")]
    ObserverAlreadyAttached,
}

impl AuthError {
    /// The stable provider code, when the failure came from the identity provider.
    pub fn provider_code(&self) -> Option<ProviderErrorCode> {
        match self {
            AuthError::Core(taxlab_core::auth::AuthError::Provider(e)) => Some(e.code),
            _ => None,
        }
    }

    /// Message safe to show to the end user.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Core(taxlab_core::auth::AuthError::Provider(e)) => {
                e.user_message().to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<ProviderError> for AuthError {
    fn from(error: ProviderError) -> Self {
        AuthError::Core(error.into())
    }
}

impl From<StoreError> for AuthError {
    fn from(error: StoreError) -> Self {
        AuthError::Core(error.into())
    }
}

/// Result type for shell auth operations.
pub type Result<T> = std::result::Result<T, AuthError>;
