//! taxlab CLI entry point.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use taxlab_auth::{AuthConfig, AuthError, SessionObserver};
use taxlab_cli::app::App;
use taxlab_cli::cli::{Cli, Commands, OutputFormat};
use taxlab_cli::output::{format_output, pretty, LogoutReport};
use taxlab_core::auth::{route_access, AuthSnapshot};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON output stays parseable.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taxlab=info,taxlab_auth=info,taxlab_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = AuthConfig::from_env().context("Failed to load auth configuration")?;
    let app = App::build(&cli, config)?;

    let observer =
        SessionObserver::attach(app.resolver.clone()).context("Failed to attach session observer")?;

    let result = run(&cli, &app).await;

    observer.detach().await;
    result
}

async fn run(cli: &Cli, app: &App) -> Result<()> {
    let resolver = &app.resolver;
    resolver.init().await;

    match &cli.command {
        Commands::Status => print_snapshot(cli, app, &resolver.snapshot()),
        Commands::Access => {
            let access = route_access(&resolver.snapshot(), &resolver.shell_origin());
            match cli.format {
                OutputFormat::Json => println!("{}", format_output(&access, cli.format)),
                OutputFormat::Pretty => println!("{}", pretty::format_access(&access)),
            }
        }
        Commands::SignIn { email, password } => {
            let snapshot = resolver
                .sign_in_with_password(email, password)
                .await
                .map_err(describe)?;
            print_snapshot(cli, app, &snapshot);
        }
        Commands::SignUp { email, password } => {
            let snapshot = resolver
                .create_account(email, password)
                .await
                .map_err(describe)?;
            print_snapshot(cli, app, &snapshot);
        }
        Commands::Google { .. } => {
            let snapshot = resolver.sign_in_federated().await.map_err(describe)?;
            print_snapshot(cli, app, &snapshot);
        }
        Commands::Logout { reinitialize } => {
            let outcome = resolver.logout().await.map_err(describe)?;
            match cli.format {
                OutputFormat::Json => {
                    println!("{}", format_output(&LogoutReport::from(&outcome), cli.format))
                }
                OutputFormat::Pretty => {
                    if !cli.quiet {
                        println!("{}", pretty::format_logout(&outcome));
                    }
                }
            }

            if *reinitialize {
                let snapshot = resolver.reinitialize().await;
                print_snapshot(cli, app, &snapshot);
            }
        }
    }

    Ok(())
}

fn print_snapshot(cli: &Cli, app: &App, snapshot: &AuthSnapshot) {
    match cli.format {
        OutputFormat::Json => println!("{}", format_output(snapshot, cli.format)),
        OutputFormat::Pretty => println!(
            "{}",
            pretty::format_snapshot(snapshot, app.resolver.phase())
        ),
    }
}

/// Provider failures are shown with their user-facing message and code.
fn describe(error: AuthError) -> anyhow::Error {
    match error.provider_code() {
        Some(code) => anyhow!("{} ({})", error.user_message(), code),
        None => anyhow::Error::new(error),
    }
}
