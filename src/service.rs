use anyhow::Context;
use async_trait::async_trait;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::database::Database;
use crate::shared::SharedDatabase;

/// Start/stop hooks a host application drives.
#[async_trait]
pub trait Lifecycle: Send + Sync {
    fn name(&self) -> &str;
    async fn start(&self) -> anyhow::Result<()>;
    async fn stop(&self) -> anyhow::Result<()>;
}

/// The application's single database handle, built once and injected.
///
/// `start` opens the connection described by the config. `stop` leaves it
/// open: the handle stays connected until it is dropped.
#[derive(Debug, Clone)]
pub struct DatabaseService {
    config: DatabaseConfig,
    database: SharedDatabase,
}

impl DatabaseService {
    pub fn new(config: DatabaseConfig) -> Self {
        Self::with_database(config, Database::new())
    }

    /// Use a pre-built handle, e.g. one carrying a diagnostic sink
    pub fn with_database(config: DatabaseConfig, database: Database) -> Self {
        Self {
            config,
            database: SharedDatabase::new(database),
        }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Handle to inject into callers; every clone shares the connection.
    pub fn database(&self) -> SharedDatabase {
        self.database.clone()
    }
}

#[async_trait]
impl Lifecycle for DatabaseService {
    fn name(&self) -> &str {
        "database"
    }

    async fn start(&self) -> anyhow::Result<()> {
        info!(database = %self.config.database, "starting database service");
        self.database
            .connect(&self.config)
            .await
            .with_context(|| format!("failed to open database {}", self.config.database))
    }

    async fn stop(&self) -> anyhow::Result<()> {
        info!(database = %self.config.database, "database service stopped");
        Ok(())
    }
}
