//! # zoo-db: Inventory Transaction Engine on SQLite
//!
//! This crate owns every write to stock: entries, FEFO exits and the task
//! workflows that consume stock. It also serves the read-only balance and
//! history queries.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Zoo Inventory Data Flow                            │
//! │                                                                         │
//! │  API handler (create exit, complete feeding task, ...)                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     zoo-db (THIS CRATE)                         │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ Catalog       │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ Entry / Exit  │    │ 001_initial  │  │   │
//! │  │   │ begin_write() │    │ Balance, Task │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   rules from zoo-core: validation, FEFO planning, errors        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError { code, message } ──► HTTP status                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - `DbConfig` builder and environment loading
//! - [`pool`] - Connection pool and write transactions
//! - [`migrations`] - Embedded database migrations
//! - [`repository`] - Repositories and the transaction engine
//! - [`error`] - Database error types
//! - [`api_error`] - Client-facing error codes
//!
//! ## Usage
//!
//! ```rust,ignore
//! use zoo_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::from_env()?).await?;
//!
//! let receipt = db.entries().create_entry(user_id, &entry_request).await?;
//! let outcome = db.exits().create_exit(user_id, &exit_request).await?;
//! let low = db.balances().low_stock().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod api_error;
pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use api_error::{ApiError, ErrorCode};
pub use config::{ConfigError, DbConfig};
pub use error::{DbError, DbResult};
pub use pool::{Database, WriteTx};

// Repository re-exports for convenience
pub use repository::{
    process_exit_lines, BalanceRepository, CatalogKind, CatalogRepository, EntryRepository,
    ExitRepository, TaskRepository,
};
