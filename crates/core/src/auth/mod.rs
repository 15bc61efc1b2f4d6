mod access;
mod error;
mod functions;
mod subscription;
mod traits;
mod types;
mod validation;

pub use access::{route_access, RouteAccess};
pub use error::{AuthError, ProviderError, ProviderErrorCode, StoreError, TokenError};
pub use functions::{
    decode_token, extract_sso_token, resolve_shell_origin, session_from_claims, shell_param,
    strip_handoff_params, SHELL_PARAM, SSO_FLAG_PARAM, TOKEN_PARAM,
};
pub use subscription::{IdentityEvent, IdentityEvents, Subscription};
pub use traits::{Clock, IdentityProvider, KeyValueStore, Location, ProviderResult, SystemClock};
pub use types::{
    AuthKind, AuthSnapshot, IdentityProviderKind, IdentitySession, SsoSession, SsoTokenClaims,
    UnifiedSession,
};
pub use validation::validate_shell_origin;
