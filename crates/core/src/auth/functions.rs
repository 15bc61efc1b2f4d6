use url::Url;

use super::{validate_shell_origin, SsoSession, SsoTokenClaims, TokenError};

/// Query parameter carrying the URL-encoded JSON token.
pub const TOKEN_PARAM: &str = "token";

/// Query parameter flagging an SSO handoff. Must be exactly `"true"`.
pub const SSO_FLAG_PARAM: &str = "sso";

/// Query parameter with a fallback shell origin for the logout redirect.
pub const SHELL_PARAM: &str = "shell";

fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

/// Returns the raw token if the URL carries an SSO handoff.
///
/// Both `token` and `sso=true` must be present; anything else means the page
/// was not opened from the shell.
pub fn extract_sso_token(url: &Url) -> Option<String> {
    if query_param(url, SSO_FLAG_PARAM).as_deref() != Some("true") {
        return None;
    }
    query_param(url, TOKEN_PARAM)
}

/// Returns the `shell` query parameter, if any.
pub fn shell_param(url: &Url) -> Option<String> {
    query_param(url, SHELL_PARAM)
}

/// Decodes a token taken from the query string.
///
/// The shell encodes the JSON before putting it in the URL, so the value is
/// percent-decoded once more after the query string itself was decoded.
/// A `%` that does not start a `%XX` escape makes the token malformed.
pub fn decode_token(raw: &str) -> Result<SsoTokenClaims, TokenError> {
    if !has_valid_escapes(raw) {
        return Err(TokenError::Malformed("invalid percent-encoding".to_string()));
    }
    let json = urlencoding::decode(raw).map_err(|e| TokenError::Malformed(e.to_string()))?;
    serde_json::from_str(&json).map_err(|e| TokenError::Malformed(e.to_string()))
}

fn has_valid_escapes(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes
        .iter()
        .enumerate()
        .filter(|(_, b)| **b == b'%')
        .all(|(i, _)| {
            bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit))
        })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Builds a session from decoded claims, applying defaults.
///
/// `uid` and `email` are required and must be non-empty. A token whose `exp`
/// is at or before `now` (epoch seconds) is rejected.
pub fn session_from_claims(claims: SsoTokenClaims, now: i64) -> Result<SsoSession, TokenError> {
    let expires_at = claims.expiry_seconds();
    let subject_id = non_empty(claims.uid).ok_or(TokenError::MissingClaim("uid"))?;
    let email = non_empty(claims.email).ok_or(TokenError::MissingClaim("email"))?;

    if let Some(exp) = expires_at {
        if exp <= now {
            return Err(TokenError::Expired { exp, now });
        }
    }

    Ok(SsoSession {
        subject_id,
        email,
        display_name: non_empty(claims.name)
            .unwrap_or_else(|| SsoSession::DEFAULT_DISPLAY_NAME.to_string()),
        year_of_study: non_empty(claims.year_of_study)
            .unwrap_or_else(|| SsoSession::DEFAULT_YEAR_OF_STUDY.to_string()),
        role: non_empty(claims.role).unwrap_or_else(|| SsoSession::DEFAULT_ROLE.to_string()),
        is_admin: claims.is_admin.unwrap_or(false),
        shell_origin: non_empty(claims.shell_domain),
        micro_app_origin: non_empty(claims.micro_app_domain),
        expires_at,
    })
}

/// Returns `url` without the handoff parameters (`token`, `sso`, `shell`).
///
/// Other parameters and the fragment are kept in their original order.
pub fn strip_handoff_params(url: &Url) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != TOKEN_PARAM && k != SSO_FLAG_PARAM && k != SHELL_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut cleaned = url.clone();
    if kept.is_empty() {
        cleaned.set_query(None);
    } else {
        cleaned.query_pairs_mut().clear().extend_pairs(kept);
    }
    cleaned
}

/// Picks where to send the browser after an SSO logout.
///
/// Order: origin stored with the session, then the `shell` URL parameter,
/// then the configured default. Candidates that are not usable origins are
/// skipped.
pub fn resolve_shell_origin(
    stored: Option<&str>,
    url_param: Option<&str>,
    default_origin: &Url,
) -> Url {
    stored
        .and_then(validate_shell_origin)
        .or_else(|| url_param.and_then(validate_shell_origin))
        .unwrap_or_else(|| default_origin.clone())
}
