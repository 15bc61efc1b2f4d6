//! Persisted SSO session.

use std::sync::Arc;

use taxlab_core::auth::{KeyValueStore, SsoSession, StoreError};

use crate::diagnostics::{Diagnostic, DiagnosticSink};

/// Key holding the JSON-serialized SSO session.
pub const SSO_USER_KEY: &str = "sso_user_data";

/// Key holding the auth-kind marker.
pub const AUTH_TYPE_KEY: &str = "auth_type";

/// Marker value written alongside an SSO session.
pub const SSO_AUTH_TYPE: &str = "sso";

/// The SSO session blob and its auth-kind marker in durable storage.
///
/// Corrupt or unreadable values are reported as diagnostics and read back
/// as "no session"; they never fail a load.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn KeyValueStore>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn KeyValueStore>, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            backend,
            diagnostics,
        }
    }

    /// Writes the session and the `sso` marker.
    pub fn save(&self, session: &SsoSession) -> Result<(), StoreError> {
        let json = serde_json::to_string(session)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.backend.set(SSO_USER_KEY, &json)?;
        self.backend.set(AUTH_TYPE_KEY, SSO_AUTH_TYPE)?;
        Ok(())
    }

    /// Reads the stored session, if one is present and decodes.
    pub fn load(&self) -> Option<SsoSession> {
        let json = self.read(SSO_USER_KEY)?;
        match serde_json::from_str(&json) {
            Ok(session) => Some(session),
            Err(e) => {
                self.diagnostics.report(Diagnostic::StorageCorrupt {
                    key: SSO_USER_KEY,
                    reason: e.to_string(),
                });
                None
            }
        }
    }

    /// True iff a session loads and the marker says `sso`.
    pub fn is_active(&self) -> bool {
        self.load_active().is_some()
    }

    /// The stored session, only when the marker says `sso`.
    pub fn load_active(&self) -> Option<SsoSession> {
        if self.read(AUTH_TYPE_KEY).as_deref() != Some(SSO_AUTH_TYPE) {
            return None;
        }
        self.load()
    }

    /// Removes both keys. Both removals are attempted even if the first fails.
    pub fn clear(&self) -> Result<(), StoreError> {
        let user = self.backend.remove(SSO_USER_KEY);
        let marker = self.backend.remove(AUTH_TYPE_KEY);
        user.and(marker)
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value,
            Err(e) => {
                self.diagnostics.report(Diagnostic::StorageFailed(e));
                None
            }
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}
