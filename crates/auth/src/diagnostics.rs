//! Structured diagnostics for resolution-time problems.
//!
//! Malformed tokens, corrupt storage and similar conditions never reach the
//! caller as errors. They are reported to a [`DiagnosticSink`] instead, which
//! logs them through `tracing` by default and can be swapped out in tests.

use std::sync::{Mutex, PoisonError};

use taxlab_core::auth::{StoreError, TokenError};

/// Something the resolver noticed and recovered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The URL carried a handoff token that was rejected.
    TokenRejected(TokenError),
    /// A persisted value could not be decoded; treated as absent.
    StorageCorrupt { key: &'static str, reason: String },
    /// The durable store failed to read or write.
    StorageFailed(StoreError),
    /// A stored SSO session outlived its token and was discarded.
    StoredSessionExpired { subject_id: String, expires_at: i64 },
    /// An SSO handoff was accepted.
    SsoLoginSucceeded { subject_id: String, email: String },
    /// A provider session change was not applied.
    ProviderEventIgnored { reason: &'static str },
}

impl Diagnostic {
    /// Whether the condition points at a real problem rather than normal flow.
    pub fn is_problem(&self) -> bool {
        !matches!(
            self,
            Diagnostic::SsoLoginSucceeded { .. } | Diagnostic::ProviderEventIgnored { .. }
        )
    }
}

/// Receives diagnostics from the resolver and its collaborators.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        match diagnostic {
            Diagnostic::TokenRejected(reason) => {
                tracing::error!(%reason, "Error validating SSO token");
            }
            Diagnostic::StorageCorrupt { key, reason } => {
                tracing::warn!(key, %reason, "Ignoring corrupt stored value");
            }
            Diagnostic::StorageFailed(error) => {
                tracing::error!(%error, "Auth storage failed");
            }
            Diagnostic::StoredSessionExpired {
                subject_id,
                expires_at,
            } => {
                tracing::info!(%subject_id, expires_at, "Stored SSO session expired");
            }
            Diagnostic::SsoLoginSucceeded { subject_id, email } => {
                tracing::info!(%subject_id, %email, "SSO login successful");
            }
            Diagnostic::ProviderEventIgnored { reason } => {
                tracing::debug!(reason, "Ignoring provider session change");
            }
        }
    }
}

/// Keeps every diagnostic in memory, in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    entries: Mutex<Vec<Diagnostic>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything reported so far.
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Only the entries that point at a problem.
    pub fn problems(&self) -> Vec<Diagnostic> {
        self.entries()
            .into_iter()
            .filter(Diagnostic::is_problem)
            .collect()
    }
}

impl DiagnosticSink for RecordingSink {
    fn report(&self, diagnostic: Diagnostic) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_keeps_order() {
        let sink = RecordingSink::new();
        sink.report(Diagnostic::TokenRejected(TokenError::MissingClaim("uid")));
        sink.report(Diagnostic::ProviderEventIgnored {
            reason: "sso session active",
        });

        let entries = sink.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0],
            Diagnostic::TokenRejected(TokenError::MissingClaim("uid"))
        );
    }

    #[test]
    fn problems_exclude_normal_flow() {
        let sink = RecordingSink::new();
        sink.report(Diagnostic::SsoLoginSucceeded {
            subject_id: "u1".to_string(),
            email: "a@x.com".to_string(),
        });
        sink.report(Diagnostic::StorageCorrupt {
            key: "sso_user_data",
            reason: "expected value".to_string(),
        });

        assert_eq!(sink.problems().len(), 1);
    }

    #[test]
    fn tracing_sink_accepts_every_variant() {
        let sink = TracingSink;
        sink.report(Diagnostic::StorageFailed(StoreError::Io("denied".to_string())));
        sink.report(Diagnostic::StoredSessionExpired {
            subject_id: "u1".to_string(),
            expires_at: 1,
        });
    }
}
