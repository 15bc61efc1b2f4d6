//! Federated sign-in for a terminal.
//!
//! A CLI cannot open a Google popup, so the ID token is supplied up front
//! (flag or `GOOGLE_ID_TOKEN`) and handed to the provider as the prompt's
//! answer.

use async_trait::async_trait;
use taxlab_auth::{FederatedCredential, FederatedPrompt};
use taxlab_core::auth::{ProviderError, ProviderErrorCode, ProviderResult};

/// Answers the federated prompt with a pre-obtained Google ID token.
#[derive(Debug, Clone, Default)]
pub struct IdTokenPrompt {
    id_token: Option<String>,
}

impl IdTokenPrompt {
    pub fn new(id_token: Option<String>) -> Self {
        Self {
            id_token: id_token.filter(|t| !t.trim().is_empty()),
        }
    }
}

#[async_trait]
impl FederatedPrompt for IdTokenPrompt {
    async fn google_credential(&self) -> ProviderResult<FederatedCredential> {
        match &self.id_token {
            Some(id_token) => Ok(FederatedCredential {
                id_token: id_token.clone(),
            }),
            // Same outcome as the user dismissing the popup.
            None => Err(ProviderError::with_detail(
                ProviderErrorCode::PopupClosedByUser,
                "no Google ID token supplied",
            )),
        }
    }
}
