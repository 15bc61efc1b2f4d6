//! SSO handoff token validation.

use std::sync::Arc;

use taxlab_core::auth::{
    decode_token, extract_sso_token, session_from_claims, strip_handoff_params, Clock, Location,
    SsoSession,
};

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::session_store::SessionStore;

/// Validates the SSO token the shell puts in the page URL.
///
/// On success the session is persisted and the handoff parameters are
/// removed from the URL, so a reload does not replay a stale token. Every
/// failure resolves to `None` and a diagnostic; nothing is raised.
#[derive(Clone)]
pub struct TokenCodec {
    location: Arc<dyn Location>,
    store: SessionStore,
    clock: Arc<dyn Clock>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl TokenCodec {
    pub fn new(
        location: Arc<dyn Location>,
        store: SessionStore,
        clock: Arc<dyn Clock>,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            location,
            store,
            clock,
            diagnostics,
        }
    }

    /// Looks for a handoff token in the current URL and validates it.
    pub fn decode_and_validate(&self) -> Option<SsoSession> {
        let url = self.location.href();
        let raw = extract_sso_token(&url)?;

        let now = self.clock.epoch_seconds();
        let session = match decode_token(&raw).and_then(|claims| session_from_claims(claims, now))
        {
            Ok(session) => session,
            Err(reason) => {
                self.diagnostics.report(Diagnostic::TokenRejected(reason));
                return None;
            }
        };

        if let Err(e) = self.store.save(&session) {
            self.diagnostics.report(Diagnostic::StorageFailed(e));
            return None;
        }

        self.location.replace(strip_handoff_params(&url));

        self.diagnostics.report(Diagnostic::SsoLoginSucceeded {
            subject_id: session.subject_id.clone(),
            email: session.email.clone(),
        });

        Some(session)
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use taxlab_core::auth::{KeyValueStore, TokenError};
    use url::Url;

    use super::*;
    use crate::clock::FixedClock;
    use crate::diagnostics::RecordingSink;
    use crate::location::MemoryLocation;
    use crate::stores::MemoryStore;

    const NOW: i64 = 1_700_000_000;

    struct Harness {
        codec: TokenCodec,
        location: Arc<MemoryLocation>,
        backend: MemoryStore,
        store: SessionStore,
        sink: Arc<RecordingSink>,
    }

    fn harness(url: &str) -> Harness {
        let location = Arc::new(MemoryLocation::new(Url::parse(url).unwrap()));
        let backend = MemoryStore::new();
        let sink = Arc::new(RecordingSink::new());
        let store = SessionStore::new(Arc::new(backend.clone()), sink.clone());
        let codec = TokenCodec::new(
            location.clone(),
            store.clone(),
            Arc::new(FixedClock::new(NOW)),
            sink.clone(),
        );
        Harness {
            codec,
            location,
            backend,
            store,
            sink,
        }
    }

    fn handoff_url(json: &str) -> String {
        format!(
            "https://tax.example/?token={}&sso=true",
            encode_component(json)
        )
    }

    fn encode_component(value: &str) -> String {
        url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
    }

    #[test]
    fn test_url_without_token_has_no_side_effects() {
        let h = harness("https://tax.example/?tab=salary");
        assert_eq!(h.codec.decode_and_validate(), None);
        assert!(h.backend.is_empty());
        assert_eq!(h.location.href().as_str(), "https://tax.example/?tab=salary");
        assert!(h.sink.entries().is_empty());
    }

    #[test]
    fn test_token_without_sso_flag_is_ignored() {
        let h = harness("https://tax.example/?token=%7B%7D");
        assert_eq!(h.codec.decode_and_validate(), None);
        assert!(h.backend.is_empty());
        assert!(h.sink.entries().is_empty());
    }

    #[test]
    fn test_valid_token_persists_and_cleans_url() {
        let h = harness(&handoff_url(
            r#"{"uid":"u1","email":"a@x.com","name":"A","exp":9999999999}"#,
        ));

        let session = h.codec.decode_and_validate().unwrap();
        assert_eq!(session.email, "a@x.com");
        assert_eq!(session.display_name, "A");

        assert_eq!(h.store.load_active(), Some(session));
        assert_eq!(h.location.href().as_str(), "https://tax.example/");
        assert!(h.location.navigations().is_empty());
    }

    #[test]
    fn test_second_call_after_cleanup_returns_none() {
        let h = harness(&handoff_url(r#"{"uid":"u1","email":"a@x.com"}"#));
        assert!(h.codec.decode_and_validate().is_some());
        assert_eq!(h.codec.decode_and_validate(), None);
        assert!(h.store.is_active());
    }

    #[test]
    fn test_malformed_json_is_reported() {
        let h = harness("https://tax.example/?token=%7Bbroken&sso=true");
        assert_eq!(h.codec.decode_and_validate(), None);
        assert!(h.backend.is_empty());
        assert!(matches!(
            h.sink.entries()[0],
            Diagnostic::TokenRejected(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn test_missing_email_is_rejected() {
        let h = harness(&handoff_url(r#"{"uid":"u1"}"#));
        assert_eq!(h.codec.decode_and_validate(), None);
        assert_eq!(
            h.sink.entries(),
            vec![Diagnostic::TokenRejected(TokenError::MissingClaim("email"))]
        );
    }

    #[test]
    fn test_expired_token_is_rejected_and_url_kept() {
        let url = handoff_url(&format!(
            r#"{{"uid":"u1","email":"a@x.com","exp":{}}}"#,
            NOW - 1
        ));
        let h = harness(&url);

        assert_eq!(h.codec.decode_and_validate(), None);
        assert!(h.backend.is_empty());
        assert_eq!(h.location.href().as_str(), url);
    }

    #[test]
    fn test_token_expiring_now_is_rejected() {
        let h = harness(&handoff_url(&format!(
            r#"{{"uid":"u1","email":"a@x.com","exp":{}}}"#,
            NOW
        )));
        assert_eq!(h.codec.decode_and_validate(), None);
    }

    #[test]
    fn test_shell_param_is_stripped_too() {
        let h = harness(&format!(
            "{}&shell=https%3A%2F%2Fshell.example&tab=hp",
            handoff_url(r#"{"uid":"u1","email":"a@x.com"}"#)
        ));
        assert!(h.codec.decode_and_validate().is_some());
        assert_eq!(h.location.href().as_str(), "https://tax.example/?tab=hp");
    }

    #[test]
    fn test_storage_failure_resolves_to_none() {
        let h = harness(&handoff_url(r#"{"uid":"u1","email":"a@x.com"}"#));
        h.backend.set_read_only(true);

        assert_eq!(h.codec.decode_and_validate(), None);
        assert!(matches!(h.sink.entries()[0], Diagnostic::StorageFailed(_)));
        assert!(h.location.href().query().is_some());
    }

    #[test]
    fn test_existing_session_is_overwritten_by_new_token() {
        let h = harness(&handoff_url(r#"{"uid":"u2","email":"b@x.com"}"#));
        h.backend
            .set(
                crate::session_store::SSO_USER_KEY,
                r#"{"uid":"u1","email":"a@x.com","name":"A","yearOfStudy":"1","role":"student","isAdmin":false}"#,
            )
            .unwrap();

        let session = h.codec.decode_and_validate().unwrap();
        assert_eq!(session.subject_id, "u2");
        assert_eq!(h.store.load().unwrap().subject_id, "u2");
    }
}
