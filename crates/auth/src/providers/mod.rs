//! Identity provider implementations.
//!
//! This module contains implementations of `IdentityProvider` for:
//! - In-memory accounts (development and tests)
//! - Firebase Identity Toolkit over REST (behind the `firebase` feature)

#[cfg(feature = "firebase")]
mod firebase;
mod memory;

#[cfg(feature = "firebase")]
pub use firebase::{
    map_firebase_error, FederatedCredential, FederatedPrompt, FirebaseProvider, NoFederatedPrompt,
    FIREBASE_USER_KEY,
};
pub use memory::{MemoryProvider, ProviderOperation};
