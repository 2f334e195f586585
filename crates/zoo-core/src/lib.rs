//! # zoo-core: Pure Inventory Logic for the Zoo Warehouse
//!
//! This crate holds the inventory rules as pure functions and plain types.
//! Nothing here touches a database, a file or the network.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Zoo Inventory Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 API layer / task screens                        │   │
//! │  │    entries, exits, balances, task completion                    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ zoo-core (THIS CRATE) ★                         │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │ quantity  │  │   fefo    │  │ validation│  │   │
//! │  │   │  Product  │  │ Quantity  │  │  planner  │  │  request  │  │   │
//! │  │   │  StockLot │  │ 2 decimals│  │           │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    zoo-db (Transaction Engine)                  │   │
//! │  │        SQLite write transactions, repositories, migrations      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, StockLot, InventoryExit, Task, ...)
//! - [`quantity`] - Fixed-point quantity with two decimals
//! - [`fefo`] - First-Expired-First-Out depletion planning
//! - [`request`] - Inbound request payloads
//! - [`validation`] - Structural request validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use zoo_core::quantity::Quantity;
//!
//! let delivered: Quantity = "12.5".parse().unwrap();
//! let eaten = Quantity::from_hundredths(1075);
//!
//! assert_eq!((delivered - eaten).to_string(), "1.75");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod fefo;
pub mod quantity;
pub mod request;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use fefo::LotDepletion;
pub use quantity::Quantity;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Exit type used by completed feeding tasks. Seeded by migration.
pub const FEEDING_EXIT_TYPE_ID: &str = "00000000-0000-0000-0000-000000000101";

/// Exit type used by completed treatment tasks. Seeded by migration.
pub const TREATMENT_EXIT_TYPE_ID: &str = "00000000-0000-0000-0000-000000000102";

/// Exit type for stock removed by hand (spoilage, breakage, transfers).
pub const MANUAL_EXIT_TYPE_ID: &str = "00000000-0000-0000-0000-000000000103";

/// Maximum length of a supplier lot code.
pub const MAX_LOT_CODE_LEN: usize = 100;

/// Maximum lines in one entry or exit.
///
/// ## Business Reason
/// A delivery note or a feeding round never comes close; anything larger is
/// a client bug and would hold the write lock for too long.
pub const MAX_TRANSACTION_LINES: usize = 200;
