//! Pretty output formatting.

use taxlab_auth::{LogoutOutcome, ResolverPhase};
use taxlab_core::auth::{AuthSnapshot, RouteAccess, UnifiedSession};

/// Format a signed-in user for display.
pub fn format_user(user: &UnifiedSession) -> String {
    let name = user.display_name().unwrap_or("(no name)");
    let mut output = format!(
        "{} [{}]\n  ID: {}\n  Email: {}",
        name,
        user.auth_kind(),
        user.subject_id(),
        user.email()
    );

    match user {
        UnifiedSession::Sso(session) => {
            output.push_str(&format!(
                "\n  Year of study: {}\n  Role: {}",
                session.year_of_study, session.role
            ));
            if session.is_admin {
                output.push_str("\n  Admin: yes");
            }
            if let Some(shell) = &session.shell_origin {
                output.push_str(&format!("\n  Shell: {}", shell));
            }
        }
        UnifiedSession::Direct(session) => {
            output.push_str(&format!("\n  Provider: {}", session.provider));
        }
    }
    output
}

/// Format the resolver's read model for display.
pub fn format_snapshot(snapshot: &AuthSnapshot, phase: ResolverPhase) -> String {
    if snapshot.is_loading {
        return "Resolving...".to_string();
    }
    match &snapshot.current_user {
        Some(user) => format!("SIGNED IN ({:?})\n{}", phase, format_user(user)),
        None => "Not signed in.".to_string(),
    }
}

/// Format an access decision for display.
pub fn format_access(access: &RouteAccess) -> String {
    match access {
        RouteAccess::Loading => "Loading...".to_string(),
        RouteAccess::Granted { user } => format!("Access granted\n{}", format_user(user)),
        RouteAccess::Denied { shell_origin } => format!(
            "Authentication required. Please access this app through {}",
            shell_origin
        ),
    }
}

/// Format a logout result for display.
pub fn format_logout(outcome: &LogoutOutcome) -> String {
    match outcome {
        LogoutOutcome::RedirectedToShell(target) => {
            format!("Signed out of SSO. Continue at {}", target)
        }
        LogoutOutcome::SignedOut => "Signed out.".to_string(),
        LogoutOutcome::NotAuthenticated => "Nobody is signed in.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use taxlab_core::auth::{IdentityProviderKind, IdentitySession, SsoSession};
    use url::Url;

    use super::*;

    fn sso_user() -> UnifiedSession {
        UnifiedSession::Sso(SsoSession {
            subject_id: "u1".to_string(),
            email: "a@x.com".to_string(),
            display_name: "A".to_string(),
            year_of_study: "Unknown".to_string(),
            role: "student".to_string(),
            is_admin: true,
            shell_origin: Some("https://shell.example".to_string()),
            micro_app_origin: None,
            expires_at: None,
        })
    }

    #[test]
    fn formats_sso_user() {
        let output = format_user(&sso_user());
        assert!(output.starts_with("A [sso]"));
        assert!(output.contains("Admin: yes"));
        assert!(output.contains("Shell: https://shell.example"));
    }

    #[test]
    fn formats_direct_user_without_name() {
        let user = UnifiedSession::Direct(IdentitySession {
            subject_id: "fb-1".to_string(),
            email: "b@x.com".to_string(),
            display_name: None,
            provider: IdentityProviderKind::Google,
        });
        let output = format_user(&user);
        assert!(output.starts_with("(no name) [direct]"));
        assert!(output.contains("Provider: google"));
    }

    #[test]
    fn formats_snapshot_states() {
        assert_eq!(
            format_snapshot(&AuthSnapshot::loading(), ResolverPhase::Resolving),
            "Resolving..."
        );
        assert_eq!(
            format_snapshot(&AuthSnapshot::resolved(None), ResolverPhase::Unauthenticated),
            "Not signed in."
        );
        assert!(format_snapshot(
            &AuthSnapshot::resolved(Some(sso_user())),
            ResolverPhase::SsoActive
        )
        .starts_with("SIGNED IN (SsoActive)"));
    }

    #[test]
    fn formats_denied_access() {
        let access = RouteAccess::Denied {
            shell_origin: Url::parse("https://bcombuddy.netlify.app").unwrap(),
        };
        assert_eq!(
            format_access(&access),
            "Authentication required. Please access this app through https://bcombuddy.netlify.app/"
        );
    }
}
