use serde::{Deserialize, Serialize};

/// Claims carried by the SSO handoff token.
///
/// Every field is optional at the wire level; [`super::session_from_claims`]
/// enforces which ones are required.
///
/// Shells do not agree on claim types, so each claim is read leniently:
/// numeric text claims are stringified, `isAdmin` follows JavaScript
/// truthiness and `exp` may be a number or a numeric string.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsoTokenClaims {
    #[serde(default, deserialize_with = "lenient::text")]
    pub uid: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub year_of_study: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub role: Option<String>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub is_admin: Option<bool>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub shell_domain: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub micro_app_domain: Option<String>,
    /// Expiry in epoch seconds. Shells have been seen sending fractional values.
    #[serde(default, deserialize_with = "lenient::seconds")]
    pub exp: Option<f64>,
}

mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn truthy(value: &Value) -> bool {
        match value {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }

    /// Strings pass through; truthy numbers and `true` are stringified.
    /// Anything else reads as absent.
    pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match &value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) if truthy(&value) => Some(n.to_string()),
            Value::Bool(true) => Some("true".to_string()),
            _ => None,
        })
    }

    pub fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
        Ok(Some(truthy(&Value::deserialize(deserializer)?)))
    }

    /// Numbers and numeric strings. Non-numeric values mean no expiry.
    pub fn seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        let exp = match Value::deserialize(deserializer)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        Ok(exp.filter(|exp| !exp.is_nan()))
    }
}

impl SsoTokenClaims {
    /// Expiry as whole epoch seconds, rounded up.
    ///
    /// A zero `exp` means "no expiry", matching how the shell has always
    /// issued tokens without one.
    pub fn expiry_seconds(&self) -> Option<i64> {
        self.exp.filter(|exp| *exp != 0.0).map(|exp| exp.ceil() as i64)
    }
}

/// Session established through the shell's SSO handoff.
///
/// Serialized with the field names the web client has always written to
/// local storage, so a blob left behind by an older client still loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsoSession {
    #[serde(rename = "uid")]
    pub subject_id: String,
    pub email: String,
    #[serde(rename = "name")]
    pub display_name: String,
    pub year_of_study: String,
    pub role: String,
    pub is_admin: bool,
    #[serde(rename = "shellDomain", default, skip_serializing_if = "Option::is_none")]
    pub shell_origin: Option<String>,
    #[serde(
        rename = "microAppDomain",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub micro_app_origin: Option<String>,
    /// Token expiry in epoch seconds, if the token carried one.
    #[serde(rename = "exp", default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl SsoSession {
    pub const DEFAULT_DISPLAY_NAME: &'static str = "User";
    pub const DEFAULT_YEAR_OF_STUDY: &'static str = "Unknown";
    pub const DEFAULT_ROLE: &'static str = "student";

    /// Whether the session outlived the token it was built from.
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

/// Which identity provider mechanism produced a direct session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityProviderKind {
    Password,
    Google,
}

impl std::fmt::Display for IdentityProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Password => write!(f, "password"),
            Self::Google => write!(f, "google"),
        }
    }
}

/// Session owned by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentitySession {
    pub subject_id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub provider: IdentityProviderKind,
}

/// How the current user authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthKind {
    Sso,
    Direct,
}

impl AuthKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sso => "sso",
            Self::Direct => "direct",
        }
    }
}

impl std::fmt::Display for AuthKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The signed-in user, whichever way they got here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "authKind", rename_all = "lowercase")]
pub enum UnifiedSession {
    Sso(SsoSession),
    Direct(IdentitySession),
}

impl UnifiedSession {
    pub fn subject_id(&self) -> &str {
        match self {
            Self::Sso(s) => &s.subject_id,
            Self::Direct(s) => &s.subject_id,
        }
    }

    pub fn email(&self) -> &str {
        match self {
            Self::Sso(s) => &s.email,
            Self::Direct(s) => &s.email,
        }
    }

    pub fn display_name(&self) -> Option<&str> {
        match self {
            Self::Sso(s) => Some(&s.display_name),
            Self::Direct(s) => s.display_name.as_deref(),
        }
    }

    pub fn auth_kind(&self) -> AuthKind {
        match self {
            Self::Sso(_) => AuthKind::Sso,
            Self::Direct(_) => AuthKind::Direct,
        }
    }
}

/// Read model handed to the presentation layer.
///
/// Replaced as a whole on every auth event; never patched in place.
/// Serializes with the derived `isAuthenticated` and `authKind` fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub current_user: Option<UnifiedSession>,
    pub is_loading: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthSnapshotView<'a> {
    current_user: Option<&'a UnifiedSession>,
    is_loading: bool,
    is_authenticated: bool,
    auth_kind: Option<AuthKind>,
}

impl Serialize for AuthSnapshot {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        AuthSnapshotView {
            current_user: self.current_user.as_ref(),
            is_loading: self.is_loading,
            is_authenticated: self.is_authenticated(),
            auth_kind: self.auth_kind(),
        }
        .serialize(serializer)
    }
}

impl AuthSnapshot {
    /// Snapshot before resolution has finished.
    pub fn loading() -> Self {
        Self {
            current_user: None,
            is_loading: true,
        }
    }

    pub fn resolved(current_user: Option<UnifiedSession>) -> Self {
        Self {
            current_user,
            is_loading: false,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user.is_some()
    }

    pub fn auth_kind(&self) -> Option<AuthKind> {
        self.current_user.as_ref().map(UnifiedSession::auth_kind)
    }

    pub fn is_sso(&self) -> bool {
        self.auth_kind() == Some(AuthKind::Sso)
    }

    pub fn is_direct(&self) -> bool {
        self.auth_kind() == Some(AuthKind::Direct)
    }
}

impl Default for AuthSnapshot {
    fn default() -> Self {
        Self::loading()
    }
}
