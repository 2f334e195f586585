//! # Repository Module
//!
//! Database repositories and the inventory transaction engine.
//!
//! ## Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  CatalogRepository   reference data, soft delete                       │
//! │                                                                         │
//! │  EntryRepository ─┐                                                    │
//! │  ExitRepository ──┼──► lot.rs (product lock, lot rows, FEFO scan)      │
//! │  TaskRepository ──┘         ▲                                          │
//! │       │                     │                                          │
//! │       └── process_exit_lines┘  (exit primitive, caller's transaction)  │
//! │                                                                         │
//! │  BalanceRepository   read-only: balances, history, reconcile           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CatalogRepository`] - Products, suppliers, exit types, animals, habitats
//! - [`EntryRepository`] - Supplier deliveries into lots
//! - [`ExitRepository`] - FEFO stock exits
//! - [`BalanceRepository`] - Balance and history queries
//! - [`TaskRepository`] - Task scheduling and completion workflows

pub mod balance;
pub mod catalog;
pub mod entry;
pub mod exit;
pub mod task;

mod lot;

#[cfg(test)]
pub(crate) mod fixtures;

pub use balance::BalanceRepository;
pub use catalog::{CatalogKind, CatalogRepository};
pub use entry::EntryRepository;
pub use exit::{process_exit_lines, ExitRepository};
pub use task::TaskRepository;
