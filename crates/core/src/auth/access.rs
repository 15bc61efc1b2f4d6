use serde::Serialize;
use url::Url;

use super::{AuthSnapshot, UnifiedSession};

/// What a protected page should render for the current snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "access", rename_all = "lowercase")]
pub enum RouteAccess {
    /// Resolution has not finished; show a loading indicator.
    Loading,
    /// Render the protected content for this user.
    Granted { user: UnifiedSession },
    /// Show the "authentication required" affordance with a way back to the
    /// parent application.
    Denied { shell_origin: Url },
}

/// Decides access for a protected page.
pub fn route_access(snapshot: &AuthSnapshot, shell_origin: &Url) -> RouteAccess {
    if snapshot.is_loading {
        return RouteAccess::Loading;
    }

    match &snapshot.current_user {
        Some(user) => RouteAccess::Granted { user: user.clone() },
        None => RouteAccess::Denied {
            shell_origin: shell_origin.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{IdentityProviderKind, IdentitySession};

    fn shell() -> Url {
        Url::parse("https://bcombuddy.netlify.app").unwrap()
    }

    #[test]
    fn loading_snapshot_is_loading() {
        assert_eq!(
            route_access(&AuthSnapshot::loading(), &shell()),
            RouteAccess::Loading
        );
    }

    #[test]
    fn unauthenticated_is_denied_with_shell_path() {
        assert_eq!(
            route_access(&AuthSnapshot::resolved(None), &shell()),
            RouteAccess::Denied {
                shell_origin: shell()
            }
        );
    }

    #[test]
    fn authenticated_is_granted() {
        let user = UnifiedSession::Direct(IdentitySession {
            subject_id: "fb-1".to_string(),
            email: "a@x.com".to_string(),
            display_name: Some("A".to_string()),
            provider: IdentityProviderKind::Google,
        });
        let snapshot = AuthSnapshot::resolved(Some(user.clone()));
        assert_eq!(
            route_access(&snapshot, &shell()),
            RouteAccess::Granted { user }
        );
    }
}
