//! Output formatting functions.

pub mod json;
pub mod pretty;

use serde::Serialize;
use taxlab_auth::LogoutOutcome;
use url::Url;

use crate::cli::OutputFormat;

/// Format a value for output.
pub fn format_output<T: serde::Serialize>(value: &T, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::format_json(value),
        OutputFormat::Pretty => serde_json::to_string_pretty(value).unwrap_or_default(),
    }
}

/// Serializable view of a [`LogoutOutcome`].
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum LogoutReport {
    RedirectedToShell { target: Url },
    SignedOut,
    NotAuthenticated,
}

impl From<&LogoutOutcome> for LogoutReport {
    fn from(outcome: &LogoutOutcome) -> Self {
        match outcome {
            LogoutOutcome::RedirectedToShell(target) => Self::RedirectedToShell {
                target: target.clone(),
            },
            LogoutOutcome::SignedOut => Self::SignedOut,
            LogoutOutcome::NotAuthenticated => Self::NotAuthenticated,
        }
    }
}
