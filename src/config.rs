use anyhow::anyhow;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::store::PgRowStore;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub max_connections: u32,
}

impl AppConfig {
    pub fn new(database_url: Option<String>, max_connections: u32) -> Self {
        Self {
            database_url: database_url.filter(|url| !url.trim().is_empty()),
            max_connections: max_connections.max(1),
        }
    }

    /// Opens the store once for the whole process. A missing URL or a failed
    /// connection leaves the store unconfigured instead of aborting.
    pub async fn connect_store(&self) -> Option<PgRowStore> {
        let Some(url) = self.database_url.as_deref() else {
            warn!("DATABASE_URL is not set; running without a store");
            return None;
        };

        match PgRowStore::connect(url, self.max_connections).await {
            Ok(store) => {
                info!(max_connections = self.max_connections, "connected to Postgres");
                Some(store)
            }
            Err(err) => {
                warn!(error = %err, "failed to connect to Postgres; running without a store");
                None
            }
        }
    }
}

/// Logs go to stderr so report output on stdout stays machine-readable.
pub fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .map_err(|err| anyhow!(err))
}
