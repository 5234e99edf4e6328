use anyhow::Context;
use serde::{Deserialize, Serialize};

/// What the handle does after a failed statement has been reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Hand the error back to the caller.
    #[default]
    Return,
    /// Print the diagnostic to stderr and exit the process with status 1.
    Terminate,
}

/// Connection settings for the database handle
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file, `:memory:`, or a `file:` URI
    pub database: String,
    pub read_only: bool,
    /// Create the database file when it does not exist (ignored when read-only)
    pub create_if_missing: bool,
    /// How long to wait on a locked database before failing
    pub busy_timeout_ms: Option<u64>,
    /// Optional SQL batch executed right after the connection opens.
    pub init_sql: Option<String>,
    pub failure_policy: FailurePolicy,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database: ":memory:".to_string(),
            read_only: false,
            create_if_missing: true,
            busy_timeout_ms: None,
            init_sql: None,
            failure_policy: FailurePolicy::Return,
        }
    }
}

impl DatabaseConfig {
    pub const ENV_PREFIX: &'static str = "DBHELPER";

    /// Create a config for the given database path with defaults elsewhere
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Self::default()
        }
    }

    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn with_init_sql(mut self, sql: impl Into<String>) -> Self {
        self.init_sql = Some(sql.into());
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Load from `DBHELPER_*` environment variables over the defaults.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_with_prefix(Self::ENV_PREFIX)
    }

    pub fn load_with_prefix(prefix: &str) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let settings = config::Config::builder()
            .set_default("database", defaults.database)?
            .set_default("read_only", defaults.read_only)?
            .set_default("create_if_missing", defaults.create_if_missing)?
            .set_default("failure_policy", "return")?
            .add_source(config::Environment::with_prefix(prefix).try_parsing(true))
            .build()
            .with_context(|| "failed to load database configuration")?;
        let cfg: DatabaseConfig = settings
            .try_deserialize()
            .with_context(|| "failed to deserialize database configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.database.trim().is_empty() {
            anyhow::bail!("database path must not be empty");
        }
        Ok(())
    }
}
