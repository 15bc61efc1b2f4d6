//! The auth resolver.
//!
//! Arbitrates between an SSO handoff session and the identity provider's own
//! session, and exposes the result as a single [`AuthSnapshot`].
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized ──init()──▶ Resolving ──▶ SsoActive
//!                                     ├──▶ DirectActive
//!                                     └──▶ Unauthenticated ──reinitialize()──▶ Resolving
//! ```
//!
//! Resolution order is fixed: a token in the URL, then a stored SSO session,
//! then the provider's current session. Once an SSO session is active the
//! provider cannot displace it; only `logout()` ends it.
//!
//! Every state change runs under one async lock, so a provider notification
//! that races `init()` is applied after resolution, never before it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use taxlab_core::auth::{
    resolve_shell_origin, shell_param, AuthSnapshot, Clock, IdentityEvent, IdentityProvider,
    IdentitySession, KeyValueStore, Location, SsoSession, SystemClock, UnifiedSession,
};
use tokio::sync::{watch, Mutex};
use url::Url;

use crate::codec::TokenCodec;
use crate::config::{AuthConfig, DEFAULT_SHELL_ORIGIN};
use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::error::{AuthError, Result};
use crate::session_store::SessionStore;

/// Where the resolver is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolverPhase {
    Uninitialized,
    Resolving,
    SsoActive,
    DirectActive,
    Unauthenticated,
}

impl ResolverPhase {
    /// Whether resolution has finished.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            Self::SsoActive | Self::DirectActive | Self::Unauthenticated
        )
    }
}

/// What `logout()` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoutOutcome {
    /// The SSO session was cleared and the page sent back to the shell.
    RedirectedToShell(Url),
    /// The identity provider session was signed out.
    SignedOut,
    /// Nobody was signed in.
    NotAuthenticated,
}

/// Builder for [`AuthResolver`].
pub struct AuthResolverBuilder {
    provider: Arc<dyn IdentityProvider>,
    storage: Arc<dyn KeyValueStore>,
    location: Arc<dyn Location>,
    clock: Arc<dyn Clock>,
    diagnostics: Arc<dyn DiagnosticSink>,
    default_shell_origin: Option<Url>,
}

impl AuthResolverBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Last-resort logout redirect target.
    pub fn default_shell_origin(mut self, origin: Url) -> Self {
        self.default_shell_origin = Some(origin);
        self
    }

    /// Applies the settings from `config` that concern the resolver.
    pub fn config(self, config: &AuthConfig) -> Self {
        self.default_shell_origin(config.default_shell_origin.clone())
    }

    /// Builds the resolver.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Config` if no default shell origin was given and
    /// the built-in one cannot be parsed.
    pub fn build(self) -> Result<AuthResolver> {
        let default_shell_origin = match self.default_shell_origin {
            Some(origin) => origin,
            None => Url::parse(DEFAULT_SHELL_ORIGIN)
                .map_err(|e| AuthError::Config(format!("default shell origin: {e}")))?,
        };

        let store = SessionStore::new(self.storage, self.diagnostics.clone());
        let codec = TokenCodec::new(
            self.location.clone(),
            store.clone(),
            self.clock.clone(),
            self.diagnostics.clone(),
        );
        let (snapshot, _) = watch::channel(AuthSnapshot::loading());
        let (phase, _) = watch::channel(ResolverPhase::Uninitialized);

        Ok(AuthResolver {
            provider: self.provider,
            location: self.location,
            clock: self.clock,
            diagnostics: self.diagnostics,
            store,
            codec,
            default_shell_origin,
            handoff_shell: RwLock::new(None),
            transitions: Mutex::new(()),
            phase,
            snapshot,
            observer_attached: AtomicBool::new(false),
        })
    }
}

/// Resolves who the current user is.
///
/// Construct once at startup, share behind an `Arc`, and call
/// [`AuthResolver::init`]. Consumers read [`AuthResolver::snapshot`] or
/// follow [`AuthResolver::watch`].
pub struct AuthResolver {
    provider: Arc<dyn IdentityProvider>,
    location: Arc<dyn Location>,
    clock: Arc<dyn Clock>,
    diagnostics: Arc<dyn DiagnosticSink>,
    store: SessionStore,
    codec: TokenCodec,
    default_shell_origin: Url,
    /// The `shell` parameter seen at init, before the codec strips it.
    handoff_shell: RwLock<Option<String>>,
    /// Serializes every state transition.
    transitions: Mutex<()>,
    phase: watch::Sender<ResolverPhase>,
    snapshot: watch::Sender<AuthSnapshot>,
    observer_attached: AtomicBool,
}

impl AuthResolver {
    /// Starts building a resolver. Clock, diagnostics and default shell
    /// origin fall back to the wall clock, `tracing` and the built-in origin.
    pub fn builder(
        provider: Arc<dyn IdentityProvider>,
        storage: Arc<dyn KeyValueStore>,
        location: Arc<dyn Location>,
    ) -> AuthResolverBuilder {
        AuthResolverBuilder {
            provider,
            storage,
            location,
            clock: Arc::new(SystemClock),
            diagnostics: Arc::new(TracingSink),
            default_shell_origin: None,
        }
    }

    /// The current read model.
    pub fn snapshot(&self) -> AuthSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Follows the read model. The receiver sees every distinct snapshot.
    pub fn watch(&self) -> watch::Receiver<AuthSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn phase(&self) -> ResolverPhase {
        *self.phase.borrow()
    }

    /// The identity provider this resolver arbitrates against.
    pub fn provider(&self) -> &Arc<dyn IdentityProvider> {
        &self.provider
    }

    /// Runs the startup resolution. Never fails.
    ///
    /// Only the first call resolves; later calls, including ones made while
    /// the first is still running, return the snapshot as it stands.
    pub async fn init(&self) -> AuthSnapshot {
        if self.phase() != ResolverPhase::Uninitialized {
            return self.snapshot();
        }

        let _guard = self.transitions.lock().await;
        if self.phase() != ResolverPhase::Uninitialized {
            return self.snapshot();
        }

        self.resolve();
        self.snapshot()
    }

    /// Resolves again after a logout. Does nothing unless the resolver is
    /// `Unauthenticated`.
    pub async fn reinitialize(&self) -> AuthSnapshot {
        let _guard = self.transitions.lock().await;
        if self.phase() != ResolverPhase::Unauthenticated {
            return self.snapshot();
        }

        self.snapshot.send_replace(AuthSnapshot::loading());
        self.resolve();
        self.snapshot()
    }

    /// Applies a provider session change.
    ///
    /// Ignored while an SSO session is active, and before `init()` has run,
    /// since resolution reads the provider itself.
    pub async fn on_provider_change(&self, event: IdentityEvent) {
        let _guard = self.transitions.lock().await;
        self.apply_provider_session(event);
    }

    /// Signs in through the provider and applies the result.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSnapshot> {
        let session = self.provider.sign_in_with_password(email, password).await?;
        Ok(self.apply_signed_in(session).await)
    }

    /// Interactive federated sign-in through the provider.
    pub async fn sign_in_federated(&self) -> Result<AuthSnapshot> {
        let session = self.provider.sign_in_federated().await?;
        Ok(self.apply_signed_in(session).await)
    }

    /// Creates a provider account and applies the resulting session.
    pub async fn create_account(&self, email: &str, password: &str) -> Result<AuthSnapshot> {
        let session = self.provider.create_account(email, password).await?;
        Ok(self.apply_signed_in(session).await)
    }

    /// Ends the current session.
    ///
    /// An SSO session is cleared and the page is sent back to the shell. A
    /// provider session is signed out; if that fails the error is returned
    /// and nothing changes.
    pub async fn logout(&self) -> Result<LogoutOutcome> {
        let _guard = self.transitions.lock().await;

        match self.phase() {
            ResolverPhase::SsoActive => self.logout_sso(),
            ResolverPhase::DirectActive => {
                self.provider.sign_out().await?;
                tracing::info!("Signed out of identity provider");
                self.settle(ResolverPhase::Unauthenticated, None);
                Ok(LogoutOutcome::SignedOut)
            }
            ResolverPhase::Uninitialized
            | ResolverPhase::Resolving
            | ResolverPhase::Unauthenticated => Ok(LogoutOutcome::NotAuthenticated),
        }
    }

    /// Shell origin the SSO logout would redirect to right now.
    pub fn shell_origin(&self) -> Url {
        let stored = self
            .snapshot()
            .current_user
            .and_then(|user| match user {
                UnifiedSession::Sso(session) => session.shell_origin,
                UnifiedSession::Direct(_) => None,
            });
        let param = self
            .handoff_shell
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .or_else(|| shell_param(&self.location.href()));

        resolve_shell_origin(
            stored.as_deref(),
            param.as_deref(),
            &self.default_shell_origin,
        )
    }

    fn logout_sso(&self) -> Result<LogoutOutcome> {
        let target = self.shell_origin();

        self.store.clear()?;
        tracing::info!(%target, "Cleared SSO session, returning to shell");

        self.location.assign(target.clone());
        self.settle(ResolverPhase::Unauthenticated, None);
        Ok(LogoutOutcome::RedirectedToShell(target))
    }

    /// Runs resolution. Caller holds the transition lock.
    fn resolve(&self) {
        self.phase.send_replace(ResolverPhase::Resolving);

        let shell = shell_param(&self.location.href());
        if shell.is_some() {
            *self
                .handoff_shell
                .write()
                .unwrap_or_else(PoisonError::into_inner) = shell;
        }

        if let Some(session) = self.codec.decode_and_validate() {
            self.settle(ResolverPhase::SsoActive, Some(UnifiedSession::Sso(session)));
            return;
        }

        if let Some(session) = self.stored_sso_session() {
            tracing::debug!(subject_id = %session.subject_id, "Restored SSO session");
            self.settle(ResolverPhase::SsoActive, Some(UnifiedSession::Sso(session)));
            return;
        }

        match self.provider.current_session() {
            Some(session) => {
                tracing::debug!(subject_id = %session.subject_id, "Using identity provider session");
                self.settle(
                    ResolverPhase::DirectActive,
                    Some(UnifiedSession::Direct(session)),
                );
            }
            None => self.settle(ResolverPhase::Unauthenticated, None),
        }
    }

    /// The stored SSO session, unless it has expired. Expired sessions are
    /// cleared.
    fn stored_sso_session(&self) -> Option<SsoSession> {
        let session = self.store.load_active()?;
        let now = self.clock.epoch_seconds();

        if let Some(expires_at) = session.expires_at.filter(|_| session.is_expired(now)) {
            self.diagnostics.report(Diagnostic::StoredSessionExpired {
                subject_id: session.subject_id.clone(),
                expires_at,
            });
            if let Err(e) = self.store.clear() {
                self.diagnostics.report(Diagnostic::StorageFailed(e));
            }
            return None;
        }

        Some(session)
    }

    async fn apply_signed_in(&self, session: IdentitySession) -> AuthSnapshot {
        let _guard = self.transitions.lock().await;
        self.apply_provider_session(Some(session));
        self.snapshot()
    }

    /// Caller holds the transition lock.
    fn apply_provider_session(&self, event: IdentityEvent) {
        match self.phase() {
            ResolverPhase::SsoActive => {
                self.diagnostics.report(Diagnostic::ProviderEventIgnored {
                    reason: "sso session active",
                });
            }
            ResolverPhase::Uninitialized | ResolverPhase::Resolving => {
                self.diagnostics.report(Diagnostic::ProviderEventIgnored {
                    reason: "resolution not complete",
                });
            }
            ResolverPhase::DirectActive | ResolverPhase::Unauthenticated => match event {
                Some(session) => self.settle(
                    ResolverPhase::DirectActive,
                    Some(UnifiedSession::Direct(session)),
                ),
                None => self.settle(ResolverPhase::Unauthenticated, None),
            },
        }
    }

    fn settle(&self, phase: ResolverPhase, user: Option<UnifiedSession>) {
        self.phase.send_replace(phase);
        let next = AuthSnapshot::resolved(user);
        self.snapshot.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    /// Claims the single observer slot. Returns `false` if already taken.
    pub(crate) fn claim_observer_slot(&self) -> bool {
        self.observer_attached
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn release_observer_slot(&self) {
        self.observer_attached.store(false, Ordering::Release);
    }
}

impl std::fmt::Debug for AuthResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthResolver")
            .field("phase", &self.phase())
            .field("default_shell_origin", &self.default_shell_origin.as_str())
            .finish_non_exhaustive()
    }
}
