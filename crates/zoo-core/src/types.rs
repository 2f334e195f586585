//! # Domain Types
//!
//! Core domain types used throughout the inventory engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │ 1 │    StockLot     │   │   Destination   │       │
//! │  │  ─────────────  │──►│  ─────────────  │   │  ─────────────  │       │
//! │  │  stock_actual   │ * │  lot_code       │   │  Animal(id)     │       │
//! │  │  stock_minimo   │   │  expiry_date    │   │  Habitat(id)    │       │
//! │  └─────────────────┘   │  available      │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! │  ┌─────────────────┐   ┌─────────────────┐                              │
//! │  │ InventoryEntry  │   │  InventoryExit  │   headers own their lines   │
//! │  │  supplier_id    │   │  exit_type_id   │                              │
//! │  │  └─ EntryLine*  │   │  └─ ExitLine*   │                              │
//! │  └─────────────────┘   └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - `product.stock_actual == Σ lot.available` over the product's lots
//! - `lot.available >= 0`
//! - Lot identity is `(product_id, lot_code, expiry_date)`

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::fefo::LotDepletion;
use crate::quantity::Quantity;

// =============================================================================
// Reference Catalog
// =============================================================================

/// A stock-keeping unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name, unique across the catalog.
    pub name: String,

    pub description: Option<String>,

    /// Product type (food, medicine, bedding, ...).
    pub product_type_id: String,

    /// Unit of measure every quantity of this product is expressed in.
    pub unit_id: String,

    /// Denormalized running total. Written only by the transaction engine.
    pub stock_actual: Quantity,

    /// Reorder threshold.
    pub stock_minimo: Quantity,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// True when the balance has reached the reorder threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock_actual <= self.stock_minimo
    }

    /// True when `quantity` can be drawn without going below zero.
    #[inline]
    pub fn can_supply(&self, quantity: Quantity) -> bool {
        self.stock_actual >= quantity
    }
}

/// Product type (food, medicine, ...). Catalog data only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductType {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
}

/// Unit of measure (kilogram, litre, dose, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct UnitOfMeasure {
    pub id: String,
    pub name: String,
    pub abbreviation: String,
    pub is_active: bool,
}

/// A supplier stock is received from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_active: bool,
}

/// The reason stock leaves the warehouse.
///
/// Three rows are seeded by migration; see [`crate::FEEDING_EXIT_TYPE_ID`],
/// [`crate::TREATMENT_EXIT_TYPE_ID`] and [`crate::MANUAL_EXIT_TYPE_ID`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ExitType {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
}

/// An animal that can receive stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Animal {
    pub id: String,
    pub name: String,
    pub habitat_id: Option<String>,
    pub is_active: bool,
}

/// A habitat that can receive stock (bedding, enrichment, group feeding).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Habitat {
    pub id: String,
    pub name: String,
    pub is_active: bool,
}

// =============================================================================
// Lot Store
// =============================================================================

/// A dated batch of a product.
///
/// Lots are never deleted; a drained lot stays as a zero-quantity history row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockLot {
    pub id: String,
    pub product_id: String,
    pub lot_code: String,
    #[ts(as = "String")]
    pub expiry_date: NaiveDate,
    pub available: Quantity,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Destination
// =============================================================================

/// Where consumed stock went. Exactly one of animal or habitat.
///
/// ## Wire Format
/// ```json
/// { "kind": "animal", "id": "550e8400-..." }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
#[ts(export)]
pub enum Destination {
    Animal(String),
    Habitat(String),
}

impl Destination {
    pub fn animal_id(&self) -> Option<&str> {
        match self {
            Destination::Animal(id) => Some(id),
            Destination::Habitat(_) => None,
        }
    }

    pub fn habitat_id(&self) -> Option<&str> {
        match self {
            Destination::Habitat(id) => Some(id),
            Destination::Animal(_) => None,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Animal(id) => write!(f, "animal {}", id),
            Destination::Habitat(id) => write!(f, "habitat {}", id),
        }
    }
}

// =============================================================================
// Entry Transaction
// =============================================================================

/// Entry header: a delivery received from a supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryEntry {
    pub id: String,
    pub supplier_id: String,
    pub user_id: String,
    #[ts(as = "String")]
    pub entered_at: DateTime<Utc>,
}

/// One received line of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct EntryLine {
    pub id: String,
    pub entry_id: String,
    pub product_id: String,
    /// The lot row this line was added to.
    pub lot_id: String,
    pub quantity: Quantity,
    #[ts(as = "String")]
    pub expiry_date: NaiveDate,
    pub lot_code: String,
}

/// An entry with its lines, as returned by history queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EntryWithLines {
    pub entry: InventoryEntry,
    pub lines: Vec<EntryLine>,
}

/// What `create_entry` returns: the persisted entry plus the product and lot
/// rows it touched, as they stood at commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EntryReceipt {
    pub entry: InventoryEntry,
    pub lines: Vec<EntryLine>,
    pub products: Vec<Product>,
    pub lots: Vec<StockLot>,
}

// =============================================================================
// Exit Transaction
// =============================================================================

/// Exit header: stock consumed for a reason (feeding, treatment, manual).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryExit {
    pub id: String,
    pub exit_type_id: String,
    pub user_id: String,
    #[ts(as = "String")]
    pub exited_at: DateTime<Utc>,
}

/// One consumed line of an exit. Aggregate only; lot detail is not stored.
///
/// The two destination columns are mutually exclusive (schema `CHECK`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ExitLine {
    pub id: String,
    pub exit_id: String,
    pub product_id: String,
    pub animal_id: Option<String>,
    pub habitat_id: Option<String>,
    pub quantity: Quantity,
}

impl ExitLine {
    /// Rebuilds the typed destination from the stored columns.
    pub fn destination(&self) -> Option<Destination> {
        match (&self.animal_id, &self.habitat_id) {
            (Some(id), None) => Some(Destination::Animal(id.clone())),
            (None, Some(id)) => Some(Destination::Habitat(id.clone())),
            _ => None,
        }
    }
}

/// A validated exit line, ready for the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewExitLine {
    pub product_id: String,
    pub quantity: Quantity,
    pub destination: Destination,
}

/// An exit with its lines, as returned by history queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExitWithLines {
    pub exit: InventoryExit,
    pub lines: Vec<ExitLine>,
}

/// What the exit processor returns.
///
/// `depletions` lists every lot draw in the order it was applied. It is not
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExitOutcome {
    pub exit: InventoryExit,
    pub lines: Vec<ExitLine>,
    pub depletions: Vec<LotDepletion>,
}

// =============================================================================
// Balance Queries
// =============================================================================

/// A product whose balance disagrees with its lots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockDrift {
    pub product_id: String,
    pub product_name: String,
    pub recorded: Quantity,
    pub lots_total: Quantity,
}

// =============================================================================
// Tasks
// =============================================================================

/// What kind of task this is. Feeding and treatment consume stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum TaskKind {
    General,
    Feeding,
    Treatment,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskKind::General => "general",
            TaskKind::Feeding => "feeding",
            TaskKind::Treatment => "treatment",
        };
        f.write_str(s)
    }
}

/// A scheduled keeper task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub kind: TaskKind,
    pub animal_id: Option<String>,
    pub habitat_id: Option<String>,
    pub assigned_user_id: Option<String>,
    #[ts(as = "String")]
    pub scheduled_for: NaiveDate,
    pub is_completed: bool,
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
    pub completion_notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Where stock consumed by this task goes. The animal wins when a task
    /// names both.
    pub fn destination(&self) -> Option<Destination> {
        self.animal_id
            .clone()
            .map(Destination::Animal)
            .or_else(|| self.habitat_id.clone().map(Destination::Habitat))
    }
}

/// Feeding record written when a feeding task completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct FeedingLog {
    pub id: String,
    pub task_id: String,
    pub user_id: String,
    pub animal_id: Option<String>,
    pub habitat_id: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub fed_at: DateTime<Utc>,
}

/// One product line of a feeding record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct FeedingLogLine {
    pub id: String,
    pub feeding_log_id: String,
    pub product_id: String,
    pub quantity_delivered: Quantity,
    pub quantity_consumed: Option<Quantity>,
}

/// A completed feeding: the log, its lines, and the stock exit it caused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FeedingRecord {
    pub log: FeedingLog,
    pub lines: Vec<FeedingLogLine>,
    pub exit: ExitOutcome,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn task(animal: Option<&str>, habitat: Option<&str>) -> Task {
        let now = Utc::now();
        Task {
            id: "t-1".to_string(),
            title: "Morning feed".to_string(),
            description: None,
            kind: TaskKind::Feeding,
            animal_id: animal.map(str::to_string),
            habitat_id: habitat.map(str::to_string),
            assigned_user_id: None,
            scheduled_for: now.date_naive(),
            is_completed: false,
            completed_at: None,
            completion_notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_task_destination_prefers_animal() {
        assert_eq!(
            task(Some("a-1"), Some("h-1")).destination(),
            Some(Destination::Animal("a-1".to_string()))
        );
        assert_eq!(
            task(None, Some("h-1")).destination(),
            Some(Destination::Habitat("h-1".to_string()))
        );
        assert_eq!(task(None, None).destination(), None);
    }

    #[test]
    fn test_exit_line_destination() {
        let mut line = ExitLine {
            id: "l-1".to_string(),
            exit_id: "e-1".to_string(),
            product_id: "p-1".to_string(),
            animal_id: Some("a-1".to_string()),
            habitat_id: None,
            quantity: Quantity::from_units(1),
        };
        assert_eq!(line.destination(), Some(Destination::Animal("a-1".to_string())));

        line.habitat_id = Some("h-1".to_string());
        assert_eq!(line.destination(), None);
    }

    #[test]
    fn test_destination_wire_format() {
        let json = serde_json::to_string(&Destination::Habitat("h-1".to_string())).unwrap();
        assert_eq!(json, r#"{"kind":"habitat","id":"h-1"}"#);
    }

    #[test]
    fn test_task_kind_display() {
        assert_eq!(TaskKind::Treatment.to_string(), "treatment");
    }
}
