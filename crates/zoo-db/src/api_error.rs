//! # API Error Type
//!
//! What clients of the inventory engine see when an operation fails.
//!
//! ## Error Mapping
//! ```text
//! ┌──────────────────────────────┬──────────────────────┬────────┐
//! │ Error                        │ Code                 │ Status │
//! ├──────────────────────────────┼──────────────────────┼────────┤
//! │ ReferenceNotFound / NotFound │ NOT_FOUND            │ 404    │
//! │ ValidationError              │ VALIDATION_ERROR     │ 400    │
//! │ InsufficientStock            │ INSUFFICIENT_STOCK   │ 409    │
//! │ TaskAlreadyCompleted         │ CONFLICT             │ 409    │
//! │ UniqueViolation              │ CONFLICT             │ 409    │
//! │ WrongTaskKind                │ BUSINESS_LOGIC       │ 422    │
//! │ StockInconsistency           │ INTERNAL             │ 500    │
//! │ everything else              │ DATABASE_ERROR       │ 500    │
//! └──────────────────────────────┴──────────────────────┴────────┘
//! ```
//!
//! Internal details (SQL messages, drifted balances) are logged here and
//! replaced with a generic message.

use std::fmt;

use serde::Serialize;
use tracing::error;
use ts_rs::TS;
use zoo_core::CoreError;

use crate::error::DbError;

/// API error body.
///
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Insufficient stock for Hay (…): available 30.00, requested 40.00"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ErrorCode {
    /// Resource not found or inactive (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Requested more stock than available (409)
    InsufficientStock,

    /// State conflict: already completed, duplicate (409)
    Conflict,

    /// Business rule violated (422)
    BusinessLogic,

    /// Integrity failure (500)
    Internal,

    /// Database operation failed (500)
    DatabaseError,
}

impl ErrorCode {
    /// HTTP status the code maps to.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorCode::NotFound => 404,
            ErrorCode::ValidationError => 400,
            ErrorCode::InsufficientStock | ErrorCode::Conflict => 409,
            ErrorCode::BusinessLogic => 422,
            ErrorCode::Internal | ErrorCode::DatabaseError => 500,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// HTTP status for this error.
    pub fn http_status(&self) -> u16 {
        self.code.http_status()
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            e @ CoreError::ReferenceNotFound { .. } => ApiError::new(ErrorCode::NotFound, e.to_string()),
            e @ CoreError::InsufficientStock { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, e.to_string())
            }
            e @ CoreError::StockInconsistency { .. } => {
                error!(error = %e, "Stock inconsistency reported to client");
                ApiError::new(
                    ErrorCode::Internal,
                    "Stock records are inconsistent; the operation was cancelled",
                )
            }
            e @ CoreError::TaskAlreadyCompleted(_) => ApiError::new(ErrorCode::Conflict, e.to_string()),
            e @ CoreError::WrongTaskKind { .. } => {
                ApiError::new(ErrorCode::BusinessLogic, e.to_string())
            }
            CoreError::Validation(e) => ApiError::new(ErrorCode::ValidationError, e.to_string()),
        }
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Core(e) => e.into(),
            DbError::NotFound { entity, id } => {
                ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", entity, id))
            }
            DbError::UniqueViolation { field, .. } => {
                ApiError::new(ErrorCode::Conflict, format!("{} already exists", field))
            }
            DbError::ForeignKeyViolation { message } => {
                error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::Busy(e) => {
                error!("Database busy: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database is busy, try again")
            }
            other => {
                // Log the actual error but return a generic message
                error!(error = %other, "Database operation failed");
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use zoo_core::{Quantity, TaskKind, ValidationError};

    #[test]
    fn test_core_error_codes() {
        let cases: Vec<(CoreError, ErrorCode, u16)> = vec![
            (CoreError::not_found("Supplier", "s-1"), ErrorCode::NotFound, 404),
            (
                CoreError::Validation(ValidationError::Required {
                    field: "lines".to_string(),
                }),
                ErrorCode::ValidationError,
                400,
            ),
            (
                CoreError::InsufficientStock {
                    product_id: "p-1".to_string(),
                    product_name: "Hay".to_string(),
                    available: Quantity::from_units(30),
                    requested: Quantity::from_units(40),
                },
                ErrorCode::InsufficientStock,
                409,
            ),
            (
                CoreError::TaskAlreadyCompleted("t-1".to_string()),
                ErrorCode::Conflict,
                409,
            ),
            (
                CoreError::WrongTaskKind {
                    task_id: "t-1".to_string(),
                    expected: TaskKind::Feeding,
                    actual: TaskKind::General,
                },
                ErrorCode::BusinessLogic,
                422,
            ),
        ];

        for (err, code, status) in cases {
            let api: ApiError = err.into();
            assert_eq!(api.code, code);
            assert_eq!(api.http_status(), status);
        }
    }

    #[test]
    fn test_inconsistency_message_is_generic() {
        let api: ApiError = DbError::Core(CoreError::StockInconsistency {
            product_id: "p-1".to_string(),
            recorded: Quantity::from_units(50),
            lots_total: Quantity::from_units(10),
        })
        .into();

        assert_eq!(api.code, ErrorCode::Internal);
        assert_eq!(api.http_status(), 500);
        assert!(!api.message.contains("p-1"));
    }

    #[test]
    fn test_database_errors_hide_sql() {
        let api: ApiError = DbError::QueryFailed("near \"SELEC\": syntax error".to_string()).into();
        assert_eq!(api.code, ErrorCode::DatabaseError);
        assert_eq!(api.message, "Database operation failed");
    }

    #[test]
    fn test_serialized_shape() {
        let api = ApiError::new(ErrorCode::InsufficientStock, "short");
        let json = serde_json::to_string(&api).unwrap();
        assert_eq!(json, r#"{"code":"INSUFFICIENT_STOCK","message":"short"}"#);
    }
}
