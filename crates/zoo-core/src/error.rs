//! # Error Types
//!
//! Domain-specific error types for zoo-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  zoo-core errors (this file)                                           │
//! │  ├── CoreError        - Inventory domain errors                        │
//! │  └── ValidationError  - Structural input failures                      │
//! │                                                                         │
//! │  zoo-db errors (separate crate)                                        │
//! │  ├── DbError          - Database operation failures (wraps CoreError)  │
//! │  └── ApiError         - What API clients see (serialized)              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Retry Policy
//! None of these errors is retried by the engine. `InsufficientStock` is the
//! only one a caller may reasonably retry (with a smaller quantity);
//! `StockInconsistency` is an integrity failure and must be investigated.

use thiserror::Error;

use crate::quantity::Quantity;
use crate::types::TaskKind;

// =============================================================================
// Core Error
// =============================================================================

/// Inventory domain errors.
///
/// Any of these aborts the enclosing database transaction; nothing from the
/// failed operation is ever committed.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced record does not exist or is inactive.
    ///
    /// ## When This Occurs
    /// - Supplier, product or exit type id is unknown
    /// - The record exists but was soft-deleted (`is_active = 0`)
    /// - An exit destination names an unknown or inactive animal/habitat
    /// - A task id is unknown
    #[error("{entity} not found or inactive: {id}")]
    ReferenceNotFound { entity: String, id: String },

    /// Requested exit quantity exceeds the product's current balance.
    ///
    /// ## User Workflow
    /// ```text
    /// Exit request (qty: 40)
    ///      │
    ///      ▼
    /// Lock product: stock_actual = 30
    ///      │
    ///      ▼
    /// InsufficientStock { available: 30.00, requested: 40.00 }
    ///      │
    ///      ▼
    /// UI shows: "Only 30.00 of Hay bales in stock"
    /// ```
    #[error(
        "Insufficient stock for {product_name} ({product_id}): available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: String,
        product_name: String,
        available: Quantity,
        requested: Quantity,
    },

    /// The product's running balance disagrees with the sum of its lots.
    ///
    /// ## When This Occurs
    /// - A bug wrote `stock_actual` outside the engine
    /// - Someone edited the database by hand
    ///
    /// Never a transient condition: logged at `error` level and reported
    /// generically to clients.
    #[error(
        "Stock inconsistency for product {product_id}: balance {recorded}, lots hold {lots_total}"
    )]
    StockInconsistency {
        product_id: String,
        recorded: Quantity,
        lots_total: Quantity,
    },

    /// The task was already completed.
    #[error("Task {0} has already been completed")]
    TaskAlreadyCompleted(String),

    /// The task is not of the kind the workflow expects.
    #[error("Task {task_id} is a {actual} task, expected {expected}")]
    WrongTaskKind {
        task_id: String,
        expected: TaskKind,
        actual: TaskKind,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a ReferenceNotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::ReferenceNotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Structural input errors.
///
/// Raised before any transaction is opened. Field names carry the line
/// position, e.g. `lines[2].quantity`.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, malformed quantity).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Both an animal and a habitat were given as destination.
    #[error("{field} must name either an animal or a habitat, not both")]
    ConflictingDestination { field: String },

    /// Neither an animal nor a habitat was given as destination.
    #[error("{field} must name an animal or a habitat")]
    MissingDestination { field: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product_id: "p-1".to_string(),
            product_name: "Hay bales".to_string(),
            available: Quantity::from_units(30),
            requested: Quantity::from_units(40),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Hay bales (p-1): available 30.00, requested 40.00"
        );

        let err = CoreError::not_found("Supplier", "s-9");
        assert_eq!(err.to_string(), "Supplier not found or inactive: s-9");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::MustBePositive {
            field: "lines[0].quantity".to_string(),
        };
        assert_eq!(err.to_string(), "lines[0].quantity must be positive");

        let err = ValidationError::ConflictingDestination {
            field: "lines[1]".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "lines[1] must name either an animal or a habitat, not both"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "lines".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }

    #[test]
    fn test_wrong_task_kind_message() {
        let err = CoreError::WrongTaskKind {
            task_id: "t-1".to_string(),
            expected: TaskKind::Feeding,
            actual: TaskKind::General,
        };
        assert_eq!(err.to_string(), "Task t-1 is a general task, expected feeding");
    }
}
