//! Wiring: store, provider, location and resolver for one CLI invocation.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use taxlab_auth::{AuthConfig, AuthResolver, FileStore, MemoryLocation, MemoryProvider};
use taxlab_core::auth::{IdentityProvider, KeyValueStore};
use url::Url;

use crate::cli::{parse_account, Cli, Commands, ProviderChoice};

/// Everything a command needs.
pub struct App {
    pub resolver: Arc<AuthResolver>,
    pub location: Arc<MemoryLocation>,
}

impl App {
    pub fn build(cli: &Cli, config: AuthConfig) -> Result<Self> {
        let store_path = cli.store.clone().unwrap_or_else(|| config.store_path.clone());
        let store: Arc<dyn KeyValueStore> = Arc::new(
            FileStore::open(&store_path)
                .with_context(|| format!("Failed to open auth store {}", store_path.display()))?,
        );

        let url = Url::parse(&cli.url).with_context(|| format!("Invalid --url {}", cli.url))?;
        let location = Arc::new(MemoryLocation::new(url));

        let provider = build_provider(cli, &config, store.clone())?;

        let resolver = AuthResolver::builder(provider, store, location.clone())
            .config(&config)
            .build()
            .context("Failed to build auth resolver")?;

        Ok(Self {
            resolver: Arc::new(resolver),
            location,
        })
    }
}

fn build_provider(
    cli: &Cli,
    config: &AuthConfig,
    store: Arc<dyn KeyValueStore>,
) -> Result<Arc<dyn IdentityProvider>> {
    match cli.provider {
        ProviderChoice::Memory => {
            let provider = MemoryProvider::new();
            for seed in &cli.accounts {
                let Some((email, password)) = parse_account(seed) else {
                    bail!("Invalid --account {seed:?}, expected EMAIL:PASSWORD");
                };
                provider.add_account(email, password, None);
            }
            tracing::debug!(accounts = cli.accounts.len(), "Using in-memory provider");
            Ok(Arc::new(provider))
        }
        ProviderChoice::Firebase => firebase_provider(cli, config, store),
    }
}

#[cfg(feature = "firebase")]
fn firebase_provider(
    cli: &Cli,
    config: &AuthConfig,
    store: Arc<dyn KeyValueStore>,
) -> Result<Arc<dyn IdentityProvider>> {
    use taxlab_auth::FirebaseProvider;

    use crate::prompt::IdTokenPrompt;

    let firebase = config
        .firebase
        .clone()
        .context("FIREBASE_API_KEY must be set to use the firebase provider")?;

    let id_token = match &cli.command {
        Commands::Google { id_token } => id_token.clone(),
        _ => None,
    };

    let provider = FirebaseProvider::new(firebase, store)
        .context("Failed to create Firebase provider")?
        .with_prompt(Arc::new(IdTokenPrompt::new(id_token)));

    tracing::debug!(?provider, "Using Firebase provider");
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "firebase"))]
fn firebase_provider(
    _cli: &Cli,
    _config: &AuthConfig,
    _store: Arc<dyn KeyValueStore>,
) -> Result<Arc<dyn IdentityProvider>> {
    bail!("taxlab was built without the `firebase` feature")
}
