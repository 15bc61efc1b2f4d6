//! Firebase Identity Toolkit provider.
//!
//! Talks to the Identity Toolkit REST API with `reqwest`. The interactive
//! Google step is delegated to a [`FederatedPrompt`], which hands back a
//! Google ID token that is then exchanged through `accounts:signInWithIdp`.
//!
//! The signed-in user is persisted under [`FIREBASE_USER_KEY`] and restored
//! on construction, the way the web SDK keeps its user in local storage.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use taxlab_core::auth::{
    IdentityEvents, IdentityProvider, IdentityProviderKind, IdentitySession, KeyValueStore,
    ProviderError, ProviderErrorCode, ProviderResult, Subscription,
};
use url::Url;

use crate::config::FirebaseConfig;
use crate::error::{AuthError, Result};

/// Storage key for the persisted Firebase user.
pub const FIREBASE_USER_KEY: &str = "firebase_auth_user";

const GOOGLE_PROVIDER_ID: &str = "google.com";

/// Credential produced by the interactive federated step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedCredential {
    pub id_token: String,
}

/// Runs the interactive part of a federated sign-in.
#[async_trait]
pub trait FederatedPrompt: Send + Sync {
    /// Obtains a Google ID token from the user.
    async fn google_credential(&self) -> ProviderResult<FederatedCredential>;
}

/// Prompt for environments that cannot show one.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFederatedPrompt;

#[async_trait]
impl FederatedPrompt for NoFederatedPrompt {
    async fn google_credential(&self) -> ProviderResult<FederatedCredential> {
        Err(ProviderError::with_detail(
            ProviderErrorCode::PopupBlocked,
            "no federated prompt configured",
        ))
    }
}

/// Maps an Identity Toolkit error message to a stable code.
///
/// Messages look like `WEAK_PASSWORD : Password should be at least 6
/// characters`; only the part before ` : ` is significant.
pub fn map_firebase_error(message: &str) -> ProviderErrorCode {
    let reason = message.split(" : ").next().unwrap_or_default().trim();
    match reason {
        "EMAIL_NOT_FOUND" => ProviderErrorCode::UserNotFound,
        "INVALID_PASSWORD" | "MISSING_PASSWORD" => ProviderErrorCode::WrongPassword,
        "USER_DISABLED" => ProviderErrorCode::UserDisabled,
        "TOO_MANY_ATTEMPTS_TRY_LATER" => ProviderErrorCode::TooManyRequests,
        "INVALID_LOGIN_CREDENTIALS" | "INVALID_IDP_RESPONSE" => {
            ProviderErrorCode::InvalidCredential
        }
        "INVALID_EMAIL" | "MISSING_EMAIL" => ProviderErrorCode::InvalidEmail,
        "EMAIL_EXISTS" => ProviderErrorCode::EmailAlreadyInUse,
        "WEAK_PASSWORD" => ProviderErrorCode::WeakPassword,
        _ => ProviderErrorCode::Internal,
    }
}

fn map_transport_error(error: reqwest::Error) -> ProviderError {
    let code = if error.is_timeout() || error.is_connect() || error.is_request() {
        ProviderErrorCode::NetworkRequestFailed
    } else {
        ProviderErrorCode::Internal
    };
    ProviderError::with_detail(code, error.to_string())
}

/// Successful response shared by the sign-in endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// What is persisted between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredUser {
    session: IdentitySession,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

impl StoredUser {
    fn from_response(
        response: AccountResponse,
        fallback_email: &str,
        provider: IdentityProviderKind,
    ) -> Self {
        Self {
            session: IdentitySession {
                subject_id: response.local_id,
                email: response
                    .email
                    .filter(|e| !e.is_empty())
                    .unwrap_or_else(|| fallback_email.to_string()),
                display_name: response.display_name.filter(|n| !n.is_empty()),
                provider,
            },
            id_token: response.id_token,
            refresh_token: response.refresh_token,
        }
    }
}

/// Firebase-backed identity provider.
pub struct FirebaseProvider {
    config: FirebaseConfig,
    http: reqwest::Client,
    store: Arc<dyn KeyValueStore>,
    prompt: Arc<dyn FederatedPrompt>,
    current: Mutex<Option<StoredUser>>,
    events: IdentityEvents,
}

impl FirebaseProvider {
    /// Create a provider, restoring any user persisted in `store`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Http` if the HTTP client cannot be built.
    pub fn new(config: FirebaseConfig, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AuthError::Http(format!("Failed to build HTTP client: {e}")))?;

        let current = restore_user(store.as_ref());

        Ok(Self {
            config,
            http,
            store,
            prompt: Arc::new(NoFederatedPrompt),
            current: Mutex::new(current),
            events: IdentityEvents::new(),
        })
    }

    /// Use `prompt` for the interactive step of federated sign-in.
    pub fn with_prompt(mut self, prompt: Arc<dyn FederatedPrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    /// The Identity Toolkit endpoint for `method`, with the API key attached.
    fn endpoint(&self, method: &str) -> ProviderResult<Url> {
        let base = self.config.auth_url.as_str().trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}/accounts:{method}")).map_err(|e| {
            ProviderError::with_detail(ProviderErrorCode::Internal, e.to_string())
        })?;
        url.query_pairs_mut()
            .append_pair("key", &self.config.api_key);
        Ok(url)
    }

    async fn call(&self, method: &str, body: serde_json::Value) -> ProviderResult<AccountResponse> {
        let url = self.endpoint(method)?;
        tracing::debug!(method, "Calling Identity Toolkit");

        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(map_transport_error)?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorEnvelope>(&bytes)
                .map(|envelope| envelope.error.message)
                .unwrap_or_else(|_| format!("HTTP {status}"));
            let code = map_firebase_error(&message);
            tracing::warn!(method, %status, %code, "Identity Toolkit request failed");
            return Err(ProviderError::with_detail(code, message));
        }

        serde_json::from_slice(&bytes)
            .map_err(|e| ProviderError::with_detail(ProviderErrorCode::Internal, e.to_string()))
    }

    fn lock(&self) -> MutexGuard<'_, Option<StoredUser>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Persist and publish a newly signed-in user.
    fn establish(&self, user: StoredUser) -> IdentitySession {
        match serde_json::to_string(&user) {
            Ok(json) => {
                if let Err(e) = self.store.set(FIREBASE_USER_KEY, &json) {
                    tracing::warn!(error = %e, "Failed to persist Firebase user");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to serialize Firebase user"),
        }

        let session = user.session.clone();
        *self.lock() = Some(user);
        self.events.publish(Some(session.clone()));
        session
    }
}

fn restore_user(store: &dyn KeyValueStore) -> Option<StoredUser> {
    let raw = match store.get(FIREBASE_USER_KEY) {
        Ok(raw) => raw?,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read persisted Firebase user");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(user) => Some(user),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring corrupt persisted Firebase user");
            None
        }
    }
}

#[async_trait]
impl IdentityProvider for FirebaseProvider {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> ProviderResult<IdentitySession> {
        let response = self
            .call(
                "signInWithPassword",
                serde_json::json!({
                    "email": email,
                    "password": password,
                    "returnSecureToken": true,
                }),
            )
            .await?;

        Ok(self.establish(StoredUser::from_response(
            response,
            email,
            IdentityProviderKind::Password,
        )))
    }

    async fn sign_in_federated(&self) -> ProviderResult<IdentitySession> {
        let credential = self.prompt.google_credential().await?;

        let post_body = format!(
            "id_token={}&providerId={GOOGLE_PROVIDER_ID}",
            urlencoding::encode(&credential.id_token)
        );
        let response = self
            .call(
                "signInWithIdp",
                serde_json::json!({
                    "postBody": post_body,
                    "requestUri": self.config.request_uri.as_str(),
                    "returnSecureToken": true,
                    "returnIdpCredential": true,
                }),
            )
            .await?;

        Ok(self.establish(StoredUser::from_response(
            response,
            "",
            IdentityProviderKind::Google,
        )))
    }

    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> ProviderResult<IdentitySession> {
        let response = self
            .call(
                "signUp",
                serde_json::json!({
                    "email": email,
                    "password": password,
                    "returnSecureToken": true,
                }),
            )
            .await?;

        Ok(self.establish(StoredUser::from_response(
            response,
            email,
            IdentityProviderKind::Password,
        )))
    }

    /// Signing out is local: the persisted user is dropped and ID tokens
    /// simply age out.
    async fn sign_out(&self) -> ProviderResult<()> {
        self.store.remove(FIREBASE_USER_KEY).map_err(|e| {
            ProviderError::with_detail(ProviderErrorCode::Internal, e.to_string())
        })?;
        *self.lock() = None;
        self.events.publish(None);
        Ok(())
    }

    fn current_session(&self) -> Option<IdentitySession> {
        self.lock().as_ref().map(|user| user.session.clone())
    }

    fn subscribe(&self) -> Subscription {
        self.events.subscribe()
    }
}

impl std::fmt::Debug for FirebaseProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseProvider")
            .field("auth_url", &self.config.auth_url.as_str())
            .field("signed_in", &self.lock().is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use super::*;
    use crate::stores::MemoryStore;

    fn config() -> FirebaseConfig {
        FirebaseConfig {
            api_key: "test-key".to_string(),
            auth_url: Url::parse("http://127.0.0.1:9099/identitytoolkit.googleapis.com/v1/")
                .unwrap(),
            request_uri: Url::parse("http://localhost").unwrap(),
            request_timeout: Duration::from_secs(1),
        }
    }

    fn stored_user() -> StoredUser {
        StoredUser {
            session: IdentitySession {
                subject_id: "fb-1".to_string(),
                email: "a@x.com".to_string(),
                display_name: Some("A".to_string()),
                provider: IdentityProviderKind::Google,
            },
            id_token: Some("id".to_string()),
            refresh_token: None,
        }
    }

    #[test]
    fn test_map_firebase_error() {
        assert_eq!(
            map_firebase_error("EMAIL_NOT_FOUND"),
            ProviderErrorCode::UserNotFound
        );
        assert_eq!(
            map_firebase_error("INVALID_PASSWORD"),
            ProviderErrorCode::WrongPassword
        );
        assert_eq!(
            map_firebase_error("TOO_MANY_ATTEMPTS_TRY_LATER : Access temporarily disabled"),
            ProviderErrorCode::TooManyRequests
        );
        assert_eq!(
            map_firebase_error("WEAK_PASSWORD : Password should be at least 6 characters"),
            ProviderErrorCode::WeakPassword
        );
        assert_eq!(
            map_firebase_error("INVALID_LOGIN_CREDENTIALS"),
            ProviderErrorCode::InvalidCredential
        );
        assert_eq!(
            map_firebase_error("EMAIL_EXISTS"),
            ProviderErrorCode::EmailAlreadyInUse
        );
        assert_eq!(
            map_firebase_error("SOMETHING_NEW"),
            ProviderErrorCode::Internal
        );
    }

    #[test]
    fn test_endpoint_carries_method_and_key() {
        let provider = FirebaseProvider::new(config(), Arc::new(MemoryStore::new())).unwrap();
        let url = provider.endpoint("signInWithPassword").unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:9099/identitytoolkit.googleapis.com/v1/accounts:signInWithPassword?key=test-key"
        );
    }

    #[test]
    fn test_response_email_falls_back_to_request() {
        let response = AccountResponse {
            local_id: "fb-1".to_string(),
            email: None,
            display_name: Some(String::new()),
            id_token: None,
            refresh_token: None,
        };
        let user =
            StoredUser::from_response(response, "a@x.com", IdentityProviderKind::Password);
        assert_eq!(user.session.email, "a@x.com");
        assert_eq!(user.session.display_name, None);
    }

    #[test]
    fn test_restores_persisted_user() {
        let store = MemoryStore::new();
        store
            .set(FIREBASE_USER_KEY, &serde_json::to_string(&stored_user()).unwrap())
            .unwrap();

        let provider = FirebaseProvider::new(config(), Arc::new(store)).unwrap();
        assert_eq!(provider.current_session(), Some(stored_user().session));
    }

    #[test]
    fn test_corrupt_persisted_user_starts_signed_out() {
        let store = MemoryStore::new();
        store.set(FIREBASE_USER_KEY, "{not json").unwrap();

        let provider = FirebaseProvider::new(config(), Arc::new(store)).unwrap();
        assert_eq!(provider.current_session(), None);
    }

    #[tokio::test]
    async fn test_sign_out_clears_persisted_user_and_notifies() {
        let store = MemoryStore::new();
        store
            .set(FIREBASE_USER_KEY, &serde_json::to_string(&stored_user()).unwrap())
            .unwrap();
        let provider = FirebaseProvider::new(config(), Arc::new(store.clone())).unwrap();
        let mut subscription = provider.subscribe();

        provider.sign_out().await.unwrap();

        assert_eq!(provider.current_session(), None);
        assert_eq!(store.get(FIREBASE_USER_KEY).unwrap(), None);
        assert_eq!(subscription.recv().await, Some(None));
    }

    #[tokio::test]
    async fn test_federated_without_prompt_is_blocked() {
        let provider = FirebaseProvider::new(config(), Arc::new(MemoryStore::new())).unwrap();
        let error = provider.sign_in_federated().await.unwrap_err();
        assert_eq!(error.code, ProviderErrorCode::PopupBlocked);
    }

    #[test]
    fn test_establish_persists_and_publishes() {
        let store = MemoryStore::new();
        let provider = FirebaseProvider::new(config(), Arc::new(store.clone())).unwrap();
        let subscription = provider.subscribe();

        let session = provider.establish(stored_user());

        assert_eq!(provider.current_session(), Some(session));
        let raw = store.get(FIREBASE_USER_KEY).unwrap().unwrap();
        assert_eq!(serde_json::from_str::<StoredUser>(&raw).unwrap(), stored_user());
        assert!(subscription.is_active());
    }

    // ==================== Identity Toolkit over HTTP ====================

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                if name.eq_ignore_ascii_case("content-length") {
                    value.trim().parse::<usize>().ok()
                } else {
                    None
                }
            })
            .unwrap_or(0);
        request.len() >= header_end + 4 + content_length
    }

    /// Answers a single request with `status` and `body`, returning the raw request.
    async fn stub_server(
        status: &'static str,
        body: &'static str,
    ) -> (SocketAddr, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request_complete(&request) {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            String::from_utf8_lossy(&request).into_owned()
        });

        (addr, handle)
    }

    fn stub_config(addr: SocketAddr) -> FirebaseConfig {
        FirebaseConfig {
            auth_url: Url::parse(&format!("http://{addr}/v1/")).unwrap(),
            ..config()
        }
    }

    #[tokio::test]
    async fn test_sign_in_maps_error_envelope() {
        let (addr, request) =
            stub_server("400 Bad Request", r#"{"error":{"message":"INVALID_PASSWORD"}}"#).await;
        let store = MemoryStore::new();
        let provider = FirebaseProvider::new(stub_config(addr), Arc::new(store.clone())).unwrap();

        let error = provider
            .sign_in_with_password("a@x.com", "wrong-pass")
            .await
            .unwrap_err();

        assert_eq!(error.code, ProviderErrorCode::WrongPassword);
        assert_eq!(error.detail.as_deref(), Some("INVALID_PASSWORD"));
        assert_eq!(provider.current_session(), None);
        assert_eq!(store.get(FIREBASE_USER_KEY).unwrap(), None);

        let request = request.await.unwrap();
        assert!(request.starts_with("POST /v1/accounts:signInWithPassword?key=test-key "));
        assert!(request.contains(r#""email":"a@x.com""#));
    }

    #[tokio::test]
    async fn test_sign_in_non_json_error_is_internal() {
        let (addr, _request) = stub_server("500 Internal Server Error", "upstream exploded").await;
        let provider = FirebaseProvider::new(stub_config(addr), Arc::new(MemoryStore::new())).unwrap();

        let error = provider
            .sign_in_with_password("a@x.com", "secret1")
            .await
            .unwrap_err();

        assert_eq!(error.code, ProviderErrorCode::Internal);
        assert!(error.detail.as_deref().is_some_and(|d| d.starts_with("HTTP 500")));
        assert_eq!(provider.current_session(), None);
    }

    #[tokio::test]
    async fn test_sign_in_unreachable_host_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let provider = FirebaseProvider::new(stub_config(addr), Arc::new(MemoryStore::new())).unwrap();
        let error = provider
            .sign_in_with_password("a@x.com", "secret1")
            .await
            .unwrap_err();

        assert_eq!(error.code, ProviderErrorCode::NetworkRequestFailed);
        assert_eq!(provider.current_session(), None);
    }

    #[tokio::test]
    async fn test_sign_in_success_establishes_session() {
        let (addr, _request) = stub_server(
            "200 OK",
            r#"{"localId":"fb-9","email":"a@x.com","idToken":"tok","refreshToken":"ref"}"#,
        )
        .await;
        let store = MemoryStore::new();
        let provider = FirebaseProvider::new(stub_config(addr), Arc::new(store.clone())).unwrap();

        let session = provider
            .sign_in_with_password("a@x.com", "secret1")
            .await
            .unwrap();

        assert_eq!(session.subject_id, "fb-9");
        assert_eq!(session.provider, IdentityProviderKind::Password);
        assert_eq!(provider.current_session(), Some(session));
        assert!(store.get(FIREBASE_USER_KEY).unwrap().is_some());
    }
}
