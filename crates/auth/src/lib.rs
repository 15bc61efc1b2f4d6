//! Authentication for taxlab.
//!
//! This crate provides:
//! - SSO handoff token handling for sessions started by the shell application
//! - Durable session storage (in memory or a JSON file)
//! - Identity providers (in-memory, Firebase Identity Toolkit behind the `firebase` feature)
//! - The `AuthResolver` that decides who the current user is, and the
//!   `SessionObserver` that keeps it in sync with the provider

mod clock;
mod codec;
mod config;
mod diagnostics;
mod error;
mod location;
mod observer;
mod providers;
mod resolver;
mod session_store;
mod stores;

pub use clock::FixedClock;
pub use codec::TokenCodec;
pub use config::{
    AuthConfig, FirebaseConfig, DEFAULT_FIREBASE_AUTH_URL, DEFAULT_SHELL_ORIGIN,
    DEFAULT_STORE_PATH,
};
pub use diagnostics::{Diagnostic, DiagnosticSink, RecordingSink, TracingSink};
pub use error::{AuthError, Result};
pub use location::MemoryLocation;
pub use observer::SessionObserver;
#[cfg(feature = "firebase")]
pub use providers::{
    map_firebase_error, FederatedCredential, FederatedPrompt, FirebaseProvider, NoFederatedPrompt,
    FIREBASE_USER_KEY,
};
pub use providers::{MemoryProvider, ProviderOperation};
pub use resolver::{AuthResolver, AuthResolverBuilder, LogoutOutcome, ResolverPhase};
pub use session_store::{SessionStore, AUTH_TYPE_KEY, SSO_AUTH_TYPE, SSO_USER_KEY};
pub use stores::{FileStore, MemoryStore};
