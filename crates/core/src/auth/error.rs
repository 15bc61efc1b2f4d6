use thiserror::Error;

/// Reasons an SSO handoff token is rejected.
///
/// These never reach the end user. The token codec turns them into
/// diagnostics and resolves to "no SSO session".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed SSO token: {0}")]
    Malformed(String),

    #[error("SSO token is missing required claim: {0}")]
    MissingClaim(&'static str),

    #[error("SSO token expired at {exp} (now {now})")]
    Expired { exp: i64, now: i64 },
}

/// Stable, machine-readable identity provider error codes.
///
/// The string form matches the codes the web client has always surfaced, so
/// UI copy keyed on them keeps working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    UserNotFound,
    WrongPassword,
    InvalidEmail,
    UserDisabled,
    TooManyRequests,
    NetworkRequestFailed,
    InvalidCredential,
    PopupClosedByUser,
    PopupBlocked,
    CancelledPopupRequest,
    EmailAlreadyInUse,
    WeakPassword,
    Internal,
}

impl ProviderErrorCode {
    /// Every code, in declaration order.
    pub const ALL: [ProviderErrorCode; 13] = [
        Self::UserNotFound,
        Self::WrongPassword,
        Self::InvalidEmail,
        Self::UserDisabled,
        Self::TooManyRequests,
        Self::NetworkRequestFailed,
        Self::InvalidCredential,
        Self::PopupClosedByUser,
        Self::PopupBlocked,
        Self::CancelledPopupRequest,
        Self::EmailAlreadyInUse,
        Self::WeakPassword,
        Self::Internal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserNotFound => "auth/user-not-found",
            Self::WrongPassword => "auth/wrong-password",
            Self::InvalidEmail => "auth/invalid-email",
            Self::UserDisabled => "auth/user-disabled",
            Self::TooManyRequests => "auth/too-many-requests",
            Self::NetworkRequestFailed => "auth/network-request-failed",
            Self::InvalidCredential => "auth/invalid-credential",
            Self::PopupClosedByUser => "auth/popup-closed-by-user",
            Self::PopupBlocked => "auth/popup-blocked",
            Self::CancelledPopupRequest => "auth/cancelled-popup-request",
            Self::EmailAlreadyInUse => "auth/email-already-in-use",
            Self::WeakPassword => "auth/weak-password",
            Self::Internal => "auth/internal-error",
        }
    }

    /// Parses a code string. Unknown codes map to [`ProviderErrorCode::Internal`].
    pub fn from_code(code: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == code)
            .unwrap_or(Self::Internal)
    }

    /// Human-readable message suitable for showing next to a login form.
    pub fn message(&self) -> &'static str {
        match self {
            Self::UserNotFound => "No account found with this email address.",
            Self::WrongPassword => "Incorrect password. Please try again.",
            Self::InvalidEmail => "Please enter a valid email address.",
            Self::UserDisabled => "This account has been disabled.",
            Self::TooManyRequests => "Too many failed attempts. Please try again later.",
            Self::NetworkRequestFailed => "Network error. Please check your connection.",
            Self::InvalidCredential => "Invalid email or password.",
            Self::PopupClosedByUser => "Sign-in popup was closed. Please try again.",
            Self::PopupBlocked => "Sign-in popup was blocked. Please allow popups and try again.",
            Self::CancelledPopupRequest => "Sign-in was cancelled. Please try again.",
            Self::EmailAlreadyInUse => "An account already exists with this email address.",
            Self::WeakPassword => "Password should be at least 6 characters.",
            Self::Internal => "An error occurred during authentication. Please try again.",
        }
    }
}

impl std::fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Failure reported by an identity provider operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub code: ProviderErrorCode,
    /// Provider-specific detail, kept for diagnostics only.
    pub detail: Option<String>,
}

impl ProviderError {
    pub fn new(code: ProviderErrorCode) -> Self {
        Self { code, detail: None }
    }

    pub fn with_detail(code: ProviderErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: Some(detail.into()),
        }
    }

    /// The message to show the user, never the raw detail.
    pub fn user_message(&self) -> &'static str {
        self.code.message()
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let detail = self.detail.as_deref().unwrap_or(self.code.message());
        write!(f, "{}: {}", self.code, detail)
    }
}

impl std::error::Error for ProviderError {}

impl From<ProviderErrorCode> for ProviderError {
    fn from(code: ProviderErrorCode) -> Self {
        Self::new(code)
    }
}

/// Errors from a durable key/value backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(String),

    #[error("storage serialization failed: {0}")]
    Serialization(String),
}

/// Umbrella error for auth operations that can fail in front of a caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
