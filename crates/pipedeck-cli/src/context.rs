//! Wiring shared by every command: configuration, storage, transport,
//! session and router.

use std::sync::Arc;

use anyhow::{anyhow, bail, Context as _, Result};
use pipedeck_core::auth::{DurableStorage, FileStorage, KeyringStorage, MemoryStorage};
use pipedeck_core::config::StorageBackend;
use pipedeck_core::notify::{Notice, NoticeLevel, Notifier};
use pipedeck_core::{
    ApiClient, Config, Navigation, RouteDecision, Router, SessionContext, SessionStore,
};
use tracing::{debug, info, warn};

use crate::cli::Cli;

/// Prints transport notices to stderr.
struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, notice: Notice) {
        let label = match notice.level {
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        eprintln!("{}: {}", label, notice.message);
    }
}

pub struct Context {
    pub config: Config,
    pub api: ApiClient,
    pub session: SessionStore,
    pub router: Arc<Router>,
    ephemeral: bool,
}

impl Context {
    pub fn new(cli: &Cli) -> Result<Self> {
        let mut config = Config::load().context("Failed to load config")?;
        config.apply_env().context("Invalid PIPEDECK_* environment override")?;
        if let Some(ref url) = cli.api_url {
            config.api_base_url = url.clone();
        }

        let storage: Arc<dyn DurableStorage> = if cli.ephemeral {
            Arc::new(MemoryStorage::new())
        } else {
            match config.storage {
                StorageBackend::File => Arc::new(FileStorage::new(config.data_dir()?)),
                StorageBackend::Keyring => Arc::new(KeyringStorage::new(&config.api_base_url)),
            }
        };
        debug!(api = %config.api_base_url, storage = ?config.storage, ephemeral = cli.ephemeral, "Context ready");

        let router = Arc::new(Router::new());
        let session_context = Arc::new(SessionContext::new(storage));
        let api = ApiClient::new(&config, session_context)?
            .with_notifier(Arc::new(StderrNotifier))
            .with_navigator(router.clone());
        let session = SessionStore::new(api.clone());

        Ok(Self {
            config,
            api,
            session,
            router,
            ephemeral: cli.ephemeral,
        })
    }

    /// Remember the last username for the next login prompt.
    pub fn remember_username(&mut self, username: &str) {
        if self.ephemeral || self.config.last_username.as_deref() == Some(username) {
            return;
        }
        self.config.last_username = Some(username.to_string());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }

    /// Load the stored session and wait for the server to confirm it.
    pub async fn restore(&self) -> Result<()> {
        let Some(revalidation) = self.session.restore_session()? else {
            return Ok(());
        };
        match revalidation.await {
            Ok(Ok(profile)) => debug!(user = %profile.username, "Session confirmed"),
            Ok(Err(e)) if e.is_unauthorized() => info!("Stored session was rejected"),
            // The credential stands until the server says otherwise
            Ok(Err(e)) => warn!(error = %e, "Could not confirm session"),
            Err(e) => warn!(error = %e, "Session check did not complete"),
        }
        Ok(())
    }

    /// Restore the session, then pass the auth gate for `path`.
    pub async fn enter(&self, path: &str) -> Result<()> {
        self.restore().await?;
        match self.router.navigate(path, self.session.is_authenticated()) {
            RouteDecision::Proceed(route) => {
                debug!(route = route.name, "Route entered");
                Ok(())
            }
            RouteDecision::Redirect(navigation @ Navigation::Login { .. }) => bail!(
                "Not logged in. Run `pipedeck login` first (redirected to {})",
                navigation.path()
            ),
            RouteDecision::Redirect(Navigation::To(target)) => {
                Err(anyhow!("Page {} redirects to {}", path, target))
            }
            RouteDecision::NotFound => bail!("No page at {}", path),
        }
    }
}
