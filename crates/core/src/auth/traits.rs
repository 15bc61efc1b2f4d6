use async_trait::async_trait;
use chrono::{DateTime, Utc};
use url::Url;

use super::{IdentitySession, ProviderError, StoreError, Subscription};

/// Result type for identity provider operations.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Durable client-side key/value storage.
///
/// The analogue of a browser's local storage: string keys, string values,
/// survives restarts.
pub trait KeyValueStore: Send + Sync {
    /// Reads a value.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Writes a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes a value. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// The page location and its history entry.
pub trait Location: Send + Sync {
    /// The current URL.
    fn href(&self) -> Url;

    /// Replaces the current history entry without navigating.
    fn replace(&self, url: Url);

    /// Navigates away to `url`.
    fn assign(&self, url: Url);
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Current time as epoch seconds.
    fn epoch_seconds(&self) -> i64 {
        self.now().timestamp()
    }
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Abstraction over the external identity service.
///
/// Implementations surface failures as [`ProviderError`] with a stable code
/// and never retry on their own.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Signs in with email and password.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> ProviderResult<IdentitySession>;

    /// Interactive federated (Google) sign-in.
    async fn sign_in_federated(&self) -> ProviderResult<IdentitySession>;

    /// Creates an email/password account and signs it in.
    async fn create_account(&self, email: &str, password: &str)
        -> ProviderResult<IdentitySession>;

    /// Ends the provider session.
    async fn sign_out(&self) -> ProviderResult<()>;

    /// The session the provider currently holds, if any.
    fn current_session(&self) -> Option<IdentitySession>;

    /// Subscribes to session changes. Every sign-in, sign-out or identity
    /// change is delivered for as long as the subscription is held.
    fn subscribe(&self) -> Subscription;
}
