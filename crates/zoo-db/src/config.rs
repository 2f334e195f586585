//! # Database Configuration
//!
//! Pool and connection settings, built in code or loaded from the environment.
//!
//! ## Environment Variables
//! ```text
//! ┌────────────────────────────┬──────────────────────┬───────────────────┐
//! │ Variable                   │ Default              │ Meaning           │
//! ├────────────────────────────┼──────────────────────┼───────────────────┤
//! │ ZOO_DATABASE_PATH          │ ./zoo_inventory.db   │ SQLite file       │
//! │ ZOO_DB_MAX_CONNECTIONS     │ 5                    │ pool ceiling      │
//! │ ZOO_DB_MIN_CONNECTIONS     │ 1                    │ kept warm         │
//! │ ZOO_DB_BUSY_TIMEOUT_SECS   │ 5                    │ write-lock wait   │
//! │ ZOO_DB_RUN_MIGRATIONS      │ true                 │ migrate on start  │
//! └────────────────────────────┴──────────────────────┴───────────────────┘
//! ```

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Default database file, relative to the working directory.
pub const DEFAULT_DATABASE_PATH: &str = "./zoo_inventory.db";

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: '{value}'")]
    InvalidValue { name: String, value: String },

    #[error("{0}")]
    Inconsistent(String),
}

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/zoo/inventory.db")
///     .max_connections(8)
///     .busy_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// How long to wait for a free pool connection.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection. `None` keeps connections
    /// forever, which an in-memory database needs.
    /// Default: 10 minutes
    pub idle_timeout: Option<Duration>,

    /// How long a writer waits for another writer's transaction to finish
    /// before failing with `DbError::Busy`.
    /// Default: 5 seconds
    pub busy_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// Creates a configuration for the given database file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// Single connection: every connection to `:memory:` would otherwise
    /// open its own empty database.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: None,
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// Loads the configuration from `ZOO_*` environment variables.
    ///
    /// Unset variables fall back to the defaults of [`DbConfig::new`]; set
    /// but unparsable ones are an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = env::var("ZOO_DATABASE_PATH").unwrap_or_else(|_| DEFAULT_DATABASE_PATH.into());
        let mut config = DbConfig::new(path);

        if let Some(max) = parse_var("ZOO_DB_MAX_CONNECTIONS")? {
            config.max_connections = max;
        }
        if let Some(min) = parse_var("ZOO_DB_MIN_CONNECTIONS")? {
            config.min_connections = min;
        }
        if let Some(secs) = parse_var::<u64>("ZOO_DB_BUSY_TIMEOUT_SECS")? {
            config.busy_timeout = Duration::from_secs(secs);
        }
        if let Some(run) = parse_var("ZOO_DB_RUN_MIGRATIONS")? {
            config.run_migrations = run;
        }

        config.validate()?;
        Ok(config)
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the pool acquire timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets how long a writer waits on the database write lock.
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Checks the settings against each other.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::Inconsistent(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(ConfigError::Inconsistent(format!(
                "min_connections ({}) exceeds max_connections ({})",
                self.min_connections, self.max_connections
            )));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                name: name.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
