//! # Database Pool Management
//!
//! Connection pool creation and write-transaction handling for SQLite.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  DbConfig::from_env() / DbConfig::new(path)                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            SqlitePool                    │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │                           │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  (max_connections)        │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       ├── readers: plain queries, see last committed state (WAL)       │
//! │       └── writers: begin_write() → BEGIN IMMEDIATE                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Write Locking
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Writer A: BEGIN IMMEDIATE ─── lock product ─ lots ─ write ─ COMMIT    │
//! │  Writer B:   BEGIN IMMEDIATE ··· waits (busy_timeout) ···· ─ lock ...  │
//! │  Reader C:     SELECT balance ─ sees A's state only after COMMIT       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! `BEGIN IMMEDIATE` takes SQLite's single RESERVED lock up front, so every
//! product and lot row a transaction reads stays exclusively its own until it
//! commits or rolls back. Two exits against the same product are therefore
//! strictly serialized: the second one reads the balance the first committed.

use std::str::FromStr;

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};

use crate::config::DbConfig;
use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::balance::BalanceRepository;
use crate::repository::catalog::CatalogRepository;
use crate::repository::entry::EntryRepository;
use crate::repository::exit::ExitRepository;
use crate::repository::task::TaskRepository;

/// A write transaction holding the database write lock.
pub type WriteTx = Transaction<'static, Sqlite>;

/// Opens a write transaction with `BEGIN IMMEDIATE`.
///
/// Blocks (inside SQLite's busy handler) while another writer holds the lock.
/// Dropping the returned transaction without committing rolls it back.
pub(crate) async fn begin_write(pool: &SqlitePool) -> DbResult<WriteTx> {
    let tx = pool.begin_with("BEGIN IMMEDIATE").await?;
    debug!("Write transaction started");
    Ok(tx)
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(DbConfig::from_env()?).await?;
///
/// let receipt = db.entries().create_entry(user_id, &request).await?;
/// let low = db.balances().low_stock().await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,
}

impl Database {
    /// Creates a new database connection pool.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite:
    ///    - WAL mode so readers never see uncommitted writes and never block
    ///    - NORMAL synchronous
    ///    - Foreign keys enabled
    ///    - Busy timeout so competing writers queue instead of failing
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        config.validate()?;

        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // SQLite has them disabled by default
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout)
            .create_if_missing(true);

        debug!(busy_timeout = ?config.busy_timeout, "Connection options configured");

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout);

        // An in-memory database lives exactly as long as its connection
        if config.idle_timeout.is_none() {
            pool_options = pool_options.max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database { pool };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Runs database migrations.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Opens a write transaction for callers composing their own unit of
    /// work around [`crate::repository::exit::process_exit_lines`].
    pub async fn begin_write(&self) -> DbResult<WriteTx> {
        begin_write(&self.pool).await
    }

    /// Reference data: products, suppliers, exit types, animals, habitats.
    pub fn catalog(&self) -> CatalogRepository {
        CatalogRepository::new(self.pool.clone())
    }

    /// Stock entries (receipts from suppliers).
    pub fn entries(&self) -> EntryRepository {
        EntryRepository::new(self.pool.clone())
    }

    /// Stock exits (FEFO depletion).
    pub fn exits(&self) -> ExitRepository {
        ExitRepository::new(self.pool.clone())
    }

    /// Read-only balance, history and reconciliation queries.
    pub fn balances(&self) -> BalanceRepository {
        BalanceRepository::new(self.pool.clone())
    }

    /// Keeper tasks and their stock-consuming completion workflows.
    pub fn tasks(&self) -> TaskRepository {
        TaskRepository::new(self.pool.clone())
    }

    /// Closes the database connection pool.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
