//! JSON output formatting.

/// Format a value as JSON.
pub fn format_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use taxlab_core::auth::AuthSnapshot;

    use super::*;

    #[test]
    fn formats_snapshot_in_camel_case() {
        assert_eq!(
            format_json(&AuthSnapshot::resolved(None)),
            r#"{"currentUser":null,"isLoading":false,"isAuthenticated":false,"authKind":null}"#
        );
    }
}
