//! CLI command definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Resolve and manage taxlab sign-in sessions.
#[derive(Debug, Parser)]
#[command(name = "taxlab")]
#[command(about = "Resolve and manage taxlab sign-in sessions", long_about = None)]
pub struct Cli {
    /// Identity provider to use.
    #[arg(long, env = "TAXLAB_PROVIDER", default_value = "memory")]
    pub provider: ProviderChoice,

    /// Path of the durable auth store (overrides AUTH_STORE_PATH).
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Page URL to resolve against, e.g. a shell handoff URL carrying `token` and `sso=true`.
    #[arg(long, default_value = "http://localhost/")]
    pub url: String,

    /// Seed the in-memory provider with an account, as `email:password`. Repeatable.
    #[arg(long = "account", value_name = "EMAIL:PASSWORD")]
    pub accounts: Vec<String>,

    /// Output format.
    #[arg(long, default_value = "pretty")]
    pub format: OutputFormat,

    /// Suppress non-essential output.
    #[arg(long)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Identity provider backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ProviderChoice {
    /// Accounts held in memory for the lifetime of the command.
    #[default]
    Memory,
    /// Firebase Identity Toolkit (requires FIREBASE_API_KEY).
    Firebase,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Raw JSON output.
    Json,
    /// Human-readable output.
    #[default]
    Pretty,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Resolve the current user and print the session.
    Status,
    /// Decide whether a protected page may be shown.
    Access,
    /// Sign in with email and password.
    SignIn {
        /// Account email.
        #[arg(long)]
        email: String,
        /// Account password.
        #[arg(long, env = "TAXLAB_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an email/password account and sign in.
    SignUp {
        /// Account email.
        #[arg(long)]
        email: String,
        /// Account password (at least 6 characters).
        #[arg(long, env = "TAXLAB_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign in with Google.
    Google {
        /// Google ID token obtained out of band.
        #[arg(long, env = "GOOGLE_ID_TOKEN", hide_env_values = true)]
        id_token: Option<String>,
    },
    /// End the current session.
    Logout {
        /// Resolve again after signing out.
        #[arg(long)]
        reinitialize: bool,
    },
}

/// Splits an `email:password` account seed.
pub fn parse_account(seed: &str) -> Option<(&str, &str)> {
    seed.split_once(':')
        .filter(|(email, password)| !email.is_empty() && !password.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_account_seed() {
        assert_eq!(parse_account("a@x.com:secret1"), Some(("a@x.com", "secret1")));
        assert_eq!(parse_account("a@x.com:pa:ss"), Some(("a@x.com", "pa:ss")));
        assert_eq!(parse_account("a@x.com"), None);
        assert_eq!(parse_account(":secret"), None);
    }

    #[test]
    fn parses_sign_in_command() {
        let cli = Cli::try_parse_from([
            "taxlab",
            "--format",
            "json",
            "sign-in",
            "--email",
            "a@x.com",
            "--password",
            "secret1",
        ])
        .unwrap();

        assert!(matches!(cli.format, OutputFormat::Json));
        assert_eq!(cli.provider, ProviderChoice::Memory);
        assert!(matches!(cli.command, Commands::SignIn { ref email, .. } if email == "a@x.com"));
    }

    #[test]
    fn verifies_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
