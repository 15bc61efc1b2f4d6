//! In-memory identity provider for development and testing.
//!
//! Holds accounts in a map, simulates the federated popup with a preset
//! account, and lets tests inject one-shot failures per operation.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use taxlab_core::auth::{
    IdentityEvents, IdentityProvider, IdentityProviderKind, IdentitySession, ProviderError,
    ProviderErrorCode, ProviderResult, Subscription,
};
use uuid::Uuid;

/// Minimum password length accepted by [`MemoryProvider::create_account`].
const MIN_PASSWORD_LEN: usize = 6;

/// Provider operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderOperation {
    SignInWithPassword,
    SignInFederated,
    CreateAccount,
    SignOut,
}

#[derive(Debug, Clone)]
struct Account {
    subject_id: String,
    password: String,
    display_name: Option<String>,
    disabled: bool,
}

#[derive(Debug, Default)]
struct State {
    /// Keyed by lowercased email.
    accounts: HashMap<String, Account>,
    current: Option<IdentitySession>,
    /// Account the federated popup signs in as. `None` means the user
    /// closes the popup.
    federated: Option<IdentitySession>,
    failures: HashMap<ProviderOperation, ProviderErrorCode>,
}

/// In-memory identity provider.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    state: Mutex<State>,
    events: IdentityEvents,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an email/password account (builder form).
    pub fn with_account(self, email: &str, password: &str) -> Self {
        self.add_account(email, password, None);
        self
    }

    /// Starts with a session already signed in, as if restored from the
    /// provider's own persistence.
    pub fn with_current_session(self, session: IdentitySession) -> Self {
        self.lock().current = Some(session);
        self
    }

    /// Adds an email/password account and returns its subject id.
    pub fn add_account(&self, email: &str, password: &str, display_name: Option<&str>) -> String {
        let subject_id = format!("mem-{}", Uuid::new_v4());
        self.lock().accounts.insert(
            email.to_lowercase(),
            Account {
                subject_id: subject_id.clone(),
                password: password.to_string(),
                display_name: display_name.map(String::from),
                disabled: false,
            },
        );
        subject_id
    }

    /// Disables an account; later sign-ins fail with `auth/user-disabled`.
    pub fn disable_account(&self, email: &str) {
        if let Some(account) = self.lock().accounts.get_mut(&email.to_lowercase()) {
            account.disabled = true;
        }
    }

    /// Sets the account the federated popup returns. `None` simulates the
    /// user closing the popup.
    pub fn set_federated_account(&self, session: Option<IdentitySession>) {
        self.lock().federated = session;
    }

    /// Makes the next call to `operation` fail with `code`.
    pub fn fail_next(&self, operation: ProviderOperation, code: ProviderErrorCode) {
        self.lock().failures.insert(operation, code);
    }

    /// Simulates a provider-side change (another tab signing in, a token
    /// refresh switching identity) and notifies subscribers.
    pub fn emit_change(&self, session: Option<IdentitySession>) {
        self.lock().current = session.clone();
        self.events.publish(session);
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.events.subscriber_count()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_failure(&self, operation: ProviderOperation) -> ProviderResult<()> {
        match self.lock().failures.remove(&operation) {
            Some(code) => Err(ProviderError::with_detail(code, "injected failure")),
            None => Ok(()),
        }
    }

    fn establish(&self, session: IdentitySession) -> IdentitySession {
        self.lock().current = Some(session.clone());
        self.events.publish(Some(session.clone()));
        session
    }
}

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.contains('@'),
        None => false,
    }
}

#[async_trait]
impl IdentityProvider for MemoryProvider {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> ProviderResult<IdentitySession> {
        self.take_failure(ProviderOperation::SignInWithPassword)?;

        if !is_valid_email(email) {
            return Err(ProviderErrorCode::InvalidEmail.into());
        }

        let account = self
            .lock()
            .accounts
            .get(&email.to_lowercase())
            .cloned()
            .ok_or(ProviderErrorCode::UserNotFound)?;

        if account.disabled {
            return Err(ProviderErrorCode::UserDisabled.into());
        }
        if account.password != password {
            return Err(ProviderErrorCode::WrongPassword.into());
        }

        Ok(self.establish(IdentitySession {
            subject_id: account.subject_id,
            email: email.to_lowercase(),
            display_name: account.display_name,
            provider: IdentityProviderKind::Password,
        }))
    }

    async fn sign_in_federated(&self) -> ProviderResult<IdentitySession> {
        self.take_failure(ProviderOperation::SignInFederated)?;

        let session = self
            .lock()
            .federated
            .clone()
            .ok_or(ProviderErrorCode::PopupClosedByUser)?;

        Ok(self.establish(session))
    }

    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> ProviderResult<IdentitySession> {
        self.take_failure(ProviderOperation::CreateAccount)?;

        if !is_valid_email(email) {
            return Err(ProviderErrorCode::InvalidEmail.into());
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ProviderErrorCode::WeakPassword.into());
        }
        if self.lock().accounts.contains_key(&email.to_lowercase()) {
            return Err(ProviderErrorCode::EmailAlreadyInUse.into());
        }

        let subject_id = self.add_account(email, password, None);
        Ok(self.establish(IdentitySession {
            subject_id,
            email: email.to_lowercase(),
            display_name: None,
            provider: IdentityProviderKind::Password,
        }))
    }

    async fn sign_out(&self) -> ProviderResult<()> {
        self.take_failure(ProviderOperation::SignOut)?;
        self.lock().current = None;
        self.events.publish(None);
        Ok(())
    }

    fn current_session(&self) -> Option<IdentitySession> {
        self.lock().current.clone()
    }

    fn subscribe(&self) -> Subscription {
        self.events.subscribe()
    }
}
