//! # Request Types
//!
//! Inbound payloads from the API layer and from task completion screens.
//! They mirror the wire shape; [`crate::validation`] turns them into the
//! typed inputs the engine accepts.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::quantity::Quantity;
use crate::types::TaskKind;

// =============================================================================
// Entries
// =============================================================================

/// One received line: product, amount, and the lot it arrived in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EntryLineRequest {
    pub product_id: String,
    pub quantity: Quantity,
    #[ts(as = "String")]
    pub expiry_date: NaiveDate,
    pub lot_code: String,
}

/// A delivery from a supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EntryRequest {
    pub supplier_id: String,
    pub lines: Vec<EntryLineRequest>,
}

// =============================================================================
// Exits
// =============================================================================

/// One consumed line as sent over the wire.
///
/// The destination arrives as two optional ids; exactly one must be set.
/// Validation converts this into a [`crate::types::NewExitLine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExitLineRequest {
    pub product_id: String,
    pub quantity: Quantity,
    #[serde(default)]
    pub animal_id: Option<String>,
    #[serde(default)]
    pub habitat_id: Option<String>,
}

/// A manual stock exit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExitRequest {
    pub exit_type_id: String,
    pub lines: Vec<ExitLineRequest>,
}

// =============================================================================
// Catalog and Scheduling
// =============================================================================

/// A product to add to the catalog. New products always start at zero stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub product_type_id: String,
    pub unit_id: String,
    #[serde(default)]
    pub stock_minimo: Quantity,
}

/// A keeper task to schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub kind: TaskKind,
    #[serde(default)]
    pub animal_id: Option<String>,
    #[serde(default)]
    pub habitat_id: Option<String>,
    #[serde(default)]
    pub assigned_user_id: Option<String>,
    #[ts(as = "String")]
    pub scheduled_for: NaiveDate,
}

// =============================================================================
// Task Completion
// =============================================================================

/// What a keeper delivered (and optionally saw eaten) during a feeding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FeedingLineRequest {
    pub product_id: String,
    pub quantity_delivered: Quantity,
    #[serde(default)]
    pub quantity_consumed: Option<Quantity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FeedingCompletion {
    #[serde(default)]
    pub notes: Option<String>,
    pub lines: Vec<FeedingLineRequest>,
}

/// A product used during a treatment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TreatmentLineRequest {
    pub product_id: String,
    pub quantity_consumed: Quantity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TreatmentCompletion {
    #[serde(default)]
    pub notes: Option<String>,
    pub lines: Vec<TreatmentLineRequest>,
}
