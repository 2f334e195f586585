//! # Validation Module
//!
//! Structural validation of inbound requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: API layer                                                    │
//! │  └── Type validation (deserialization, well-formed dates)              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (no database access)                             │
//! │  ├── Positive quantities                                               │
//! │  ├── Exactly one destination per exit line                             │
//! │  └── Ids and lot codes well-formed                                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Transaction engine (inside the write transaction)            │
//! │  └── References exist and are active, stock is sufficient              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: Database (SQLite)                                            │
//! │  ├── CHECK (available >= 0), CHECK (stock_actual >= 0)                 │
//! │  ├── CHECK (animal XOR habitat)                                        │
//! │  └── UNIQUE (product_id, lot_code, expiry_date)                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A request rejected here never opens a transaction.

use crate::error::ValidationError;
use crate::quantity::Quantity;
use crate::request::{
    EntryRequest, ExitLineRequest, ExitRequest, FeedingCompletion, NewProduct, NewTask,
    TreatmentCompletion,
};
use crate::types::{Destination, NewExitLine, TaskKind};
use crate::{MAX_LOT_CODE_LEN, MAX_TRANSACTION_LINES};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates that a quantity is strictly positive.
///
/// ## Example
/// ```rust
/// use zoo_core::quantity::Quantity;
/// use zoo_core::validation::validate_quantity;
///
/// assert!(validate_quantity(Quantity::from_units(5), "quantity").is_ok());
/// assert!(validate_quantity(Quantity::zero(), "quantity").is_err());
/// ```
pub fn validate_quantity(quantity: Quantity, field: &str) -> ValidationResult<()> {
    if !quantity.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a lot code.
///
/// ## Rules
/// - Must not be blank
/// - At most [`MAX_LOT_CODE_LEN`] characters
pub fn validate_lot_code(code: &str, field: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if code.chars().count() > MAX_LOT_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_LOT_CODE_LEN,
        });
    }

    Ok(())
}

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use zoo_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000", "id").is_ok());
/// assert!(validate_uuid("not-a-uuid", "id").is_err());
/// ```
pub fn validate_uuid(id: &str, field: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

/// Validates the number of lines in one transaction.
fn validate_line_count(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::Required {
            field: "lines".to_string(),
        });
    }

    if count > MAX_TRANSACTION_LINES {
        return Err(ValidationError::InvalidFormat {
            field: "lines".to_string(),
            reason: format!("at most {} lines per transaction", MAX_TRANSACTION_LINES),
        });
    }

    Ok(())
}

/// Turns the two optional destination ids into a [`Destination`].
///
/// ## Rules
/// ```text
/// animal_id  habitat_id   result
/// ─────────  ──────────   ──────────────────────────────
/// Some       None         Destination::Animal
/// None       Some         Destination::Habitat
/// Some       Some         ValidationError::ConflictingDestination
/// None       None         ValidationError::MissingDestination
/// ```
pub fn resolve_destination(
    animal_id: Option<&str>,
    habitat_id: Option<&str>,
    field: &str,
) -> ValidationResult<Destination> {
    match (animal_id, habitat_id) {
        (Some(animal), None) => {
            validate_uuid(animal, &format!("{}.animal_id", field))?;
            Ok(Destination::Animal(animal.to_string()))
        }
        (None, Some(habitat)) => {
            validate_uuid(habitat, &format!("{}.habitat_id", field))?;
            Ok(Destination::Habitat(habitat.to_string()))
        }
        (Some(_), Some(_)) => Err(ValidationError::ConflictingDestination {
            field: field.to_string(),
        }),
        (None, None) => Err(ValidationError::MissingDestination {
            field: field.to_string(),
        }),
    }
}

// =============================================================================
// Request Validators
// =============================================================================

/// Validates an entry request.
pub fn validate_entry_request(request: &EntryRequest) -> ValidationResult<()> {
    validate_uuid(&request.supplier_id, "supplier_id")?;
    validate_line_count(request.lines.len())?;

    for (i, line) in request.lines.iter().enumerate() {
        validate_uuid(&line.product_id, &format!("lines[{}].product_id", i))?;
        validate_quantity(line.quantity, &format!("lines[{}].quantity", i))?;
        validate_lot_code(&line.lot_code, &format!("lines[{}].lot_code", i))?;
    }

    Ok(())
}

/// Validates one wire-format exit line and converts it.
pub fn validate_exit_line(line: &ExitLineRequest, index: usize) -> ValidationResult<NewExitLine> {
    let field = format!("lines[{}]", index);

    validate_uuid(&line.product_id, &format!("{}.product_id", field))?;
    validate_quantity(line.quantity, &format!("{}.quantity", field))?;
    let destination =
        resolve_destination(line.animal_id.as_deref(), line.habitat_id.as_deref(), &field)?;

    Ok(NewExitLine {
        product_id: line.product_id.clone(),
        quantity: line.quantity,
        destination,
    })
}

/// Validates an exit request and returns its typed lines.
pub fn validate_exit_request(request: &ExitRequest) -> ValidationResult<Vec<NewExitLine>> {
    validate_uuid(&request.exit_type_id, "exit_type_id")?;
    validate_line_count(request.lines.len())?;

    request
        .lines
        .iter()
        .enumerate()
        .map(|(i, line)| validate_exit_line(line, i))
        .collect()
}

/// Validates already-typed exit lines (the in-transaction primitive's input).
///
/// The destination is structurally sound by construction; only counts and
/// quantities need checking.
pub fn validate_exit_lines(lines: &[NewExitLine]) -> ValidationResult<()> {
    validate_line_count(lines.len())?;

    for (i, line) in lines.iter().enumerate() {
        validate_uuid(&line.product_id, &format!("lines[{}].product_id", i))?;
        validate_quantity(line.quantity, &format!("lines[{}].quantity", i))?;
    }

    Ok(())
}

// =============================================================================
// Task Completion
// =============================================================================

fn validate_not_negative(quantity: Quantity, field: &str) -> ValidationResult<()> {
    if quantity.is_negative() {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must not be negative".to_string(),
        });
    }

    Ok(())
}

/// Validates a feeding completion and derives its exit lines.
///
/// Every line is kept in the feeding log, but only lines with a positive
/// delivered quantity leave the warehouse. A feeding where nothing was
/// delivered is rejected.
///
/// ```text
/// line  delivered  consumed   exit line?
/// ────  ─────────  ────────   ──────────
///  0      2.50       2.00       yes (2.50)
///  1      0.00       -          no
/// ```
pub fn feeding_exit_lines(
    completion: &FeedingCompletion,
    destination: &Destination,
) -> ValidationResult<Vec<NewExitLine>> {
    validate_line_count(completion.lines.len())?;

    let mut exit_lines = Vec::new();

    for (i, line) in completion.lines.iter().enumerate() {
        validate_uuid(&line.product_id, &format!("lines[{}].product_id", i))?;
        validate_not_negative(
            line.quantity_delivered,
            &format!("lines[{}].quantity_delivered", i),
        )?;
        if let Some(consumed) = line.quantity_consumed {
            validate_not_negative(consumed, &format!("lines[{}].quantity_consumed", i))?;
        }

        if line.quantity_delivered.is_positive() {
            exit_lines.push(NewExitLine {
                product_id: line.product_id.clone(),
                quantity: line.quantity_delivered,
                destination: destination.clone(),
            });
        }
    }

    if exit_lines.is_empty() {
        return Err(ValidationError::MustBePositive {
            field: "lines[*].quantity_delivered".to_string(),
        });
    }

    Ok(exit_lines)
}

/// Validates a treatment completion and derives its exit lines.
///
/// Same shape as [`feeding_exit_lines`], driven by consumed quantities.
pub fn treatment_exit_lines(
    completion: &TreatmentCompletion,
    destination: &Destination,
) -> ValidationResult<Vec<NewExitLine>> {
    validate_line_count(completion.lines.len())?;

    let mut exit_lines = Vec::new();

    for (i, line) in completion.lines.iter().enumerate() {
        validate_uuid(&line.product_id, &format!("lines[{}].product_id", i))?;
        validate_not_negative(
            line.quantity_consumed,
            &format!("lines[{}].quantity_consumed", i),
        )?;

        if line.quantity_consumed.is_positive() {
            exit_lines.push(NewExitLine {
                product_id: line.product_id.clone(),
                quantity: line.quantity_consumed,
                destination: destination.clone(),
            });
        }
    }

    if exit_lines.is_empty() {
        return Err(ValidationError::MustBePositive {
            field: "lines[*].quantity_consumed".to_string(),
        });
    }

    Ok(exit_lines)
}

// =============================================================================
// Catalog and Scheduling
// =============================================================================

/// Validates a display name.
pub fn validate_name(name: &str, field: &str, max: usize) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

pub fn validate_new_product(product: &NewProduct) -> ValidationResult<()> {
    validate_name(&product.name, "name", 200)?;
    validate_uuid(&product.product_type_id, "product_type_id")?;
    validate_uuid(&product.unit_id, "unit_id")?;
    validate_stock_minimo(product.stock_minimo)?;
    Ok(())
}

/// Validates a reorder threshold. Zero is allowed.
pub fn validate_stock_minimo(minimum: Quantity) -> ValidationResult<()> {
    validate_not_negative(minimum, "stock_minimo")
}

/// Validates a task before scheduling.
///
/// Feeding and treatment tasks need somewhere to send stock, so they must
/// name an animal or a habitat.
pub fn validate_new_task(task: &NewTask) -> ValidationResult<()> {
    validate_name(&task.title, "title", 200)?;

    if let Some(animal) = &task.animal_id {
        validate_uuid(animal, "animal_id")?;
    }
    if let Some(habitat) = &task.habitat_id {
        validate_uuid(habitat, "habitat_id")?;
    }

    let consumes_stock = matches!(task.kind, TaskKind::Feeding | TaskKind::Treatment);
    if consumes_stock && task.animal_id.is_none() && task.habitat_id.is_none() {
        return Err(ValidationError::MissingDestination {
            field: "task".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::EntryLineRequest;
    use chrono::NaiveDate;

    const SUPPLIER: &str = "550e8400-e29b-41d4-a716-446655440000";
    const PRODUCT: &str = "6ba7b810-9dad-11d1-80b4-00c04fd430c8";
    const ANIMAL: &str = "6ba7b811-9dad-11d1-80b4-00c04fd430c8";
    const HABITAT: &str = "6ba7b812-9dad-11d1-80b4-00c04fd430c8";

    fn entry_line(quantity: Quantity, lot_code: &str) -> EntryLineRequest {
        EntryLineRequest {
            product_id: PRODUCT.to_string(),
            quantity,
            expiry_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            lot_code: lot_code.to_string(),
        }
    }

    fn exit_line(animal: Option<&str>, habitat: Option<&str>) -> ExitLineRequest {
        ExitLineRequest {
            product_id: PRODUCT.to_string(),
            quantity: Quantity::from_units(1),
            animal_id: animal.map(str::to_string),
            habitat_id: habitat.map(str::to_string),
        }
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(Quantity::from_hundredths(1), "q").is_ok());
        assert!(validate_quantity(Quantity::zero(), "q").is_err());
        assert!(validate_quantity(Quantity::from_units(-1), "q").is_err());
    }

    #[test]
    fn test_validate_lot_code() {
        assert!(validate_lot_code("L-2025-001", "lot").is_ok());
        assert!(validate_lot_code("   ", "lot").is_err());
        assert!(validate_lot_code(&"X".repeat(101), "lot").is_err());
        assert!(validate_lot_code(&"X".repeat(100), "lot").is_ok());
    }

    #[test]
    fn test_entry_request_rejects_non_positive_quantity() {
        let request = EntryRequest {
            supplier_id: SUPPLIER.to_string(),
            lines: vec![
                entry_line(Quantity::from_units(10), "L1"),
                entry_line(Quantity::zero(), "L2"),
            ],
        };

        let err = validate_entry_request(&request).unwrap_err();
        assert_eq!(err.to_string(), "lines[1].quantity must be positive");
    }

    #[test]
    fn test_entry_request_requires_lines() {
        let request = EntryRequest {
            supplier_id: SUPPLIER.to_string(),
            lines: vec![],
        };
        assert!(matches!(
            validate_entry_request(&request),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_resolve_destination() {
        assert_eq!(
            resolve_destination(Some(ANIMAL), None, "l").unwrap(),
            Destination::Animal(ANIMAL.to_string())
        );
        assert_eq!(
            resolve_destination(None, Some(HABITAT), "l").unwrap(),
            Destination::Habitat(HABITAT.to_string())
        );
        assert!(matches!(
            resolve_destination(Some(ANIMAL), Some(HABITAT), "l"),
            Err(ValidationError::ConflictingDestination { .. })
        ));
        assert!(matches!(
            resolve_destination(None, None, "l"),
            Err(ValidationError::MissingDestination { .. })
        ));
    }

    #[test]
    fn test_exit_request_converts_lines() {
        let request = ExitRequest {
            exit_type_id: SUPPLIER.to_string(),
            lines: vec![exit_line(Some(ANIMAL), None), exit_line(None, Some(HABITAT))],
        };

        let lines = validate_exit_request(&request).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].destination, Destination::Habitat(HABITAT.to_string()));
    }

    #[test]
    fn test_exit_request_rejects_both_destinations() {
        let request = ExitRequest {
            exit_type_id: SUPPLIER.to_string(),
            lines: vec![exit_line(Some(ANIMAL), None), exit_line(Some(ANIMAL), Some(HABITAT))],
        };

        let err = validate_exit_request(&request).unwrap_err();
        assert_eq!(
            err.to_string(),
            "lines[1] must name either an animal or a habitat, not both"
        );
    }

    #[test]
    fn test_feeding_only_positive_deliveries_leave_stock() {
        use crate::request::FeedingLineRequest;

        let completion = FeedingCompletion {
            notes: None,
            lines: vec![
                FeedingLineRequest {
                    product_id: PRODUCT.to_string(),
                    quantity_delivered: "2.5".parse().unwrap(),
                    quantity_consumed: Some(Quantity::from_units(2)),
                },
                FeedingLineRequest {
                    product_id: SUPPLIER.to_string(),
                    quantity_delivered: Quantity::zero(),
                    quantity_consumed: None,
                },
            ],
        };
        let destination = Destination::Animal(ANIMAL.to_string());

        let lines = feeding_exit_lines(&completion, &destination).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].product_id, PRODUCT);
        assert_eq!(lines[0].quantity, Quantity::from_hundredths(250));
        assert_eq!(lines[0].destination, destination);
    }

    #[test]
    fn test_feeding_with_nothing_delivered_is_rejected() {
        use crate::request::FeedingLineRequest;

        let completion = FeedingCompletion {
            notes: Some("refused".to_string()),
            lines: vec![FeedingLineRequest {
                product_id: PRODUCT.to_string(),
                quantity_delivered: Quantity::zero(),
                quantity_consumed: None,
            }],
        };

        let err = feeding_exit_lines(&completion, &Destination::Habitat(HABITAT.to_string()))
            .unwrap_err();
        assert!(matches!(err, ValidationError::MustBePositive { .. }));
    }

    #[test]
    fn test_treatment_rejects_negative_consumption() {
        use crate::request::TreatmentLineRequest;

        let completion = TreatmentCompletion {
            notes: None,
            lines: vec![TreatmentLineRequest {
                product_id: PRODUCT.to_string(),
                quantity_consumed: Quantity::from_units(-1),
            }],
        };

        let err = treatment_exit_lines(&completion, &Destination::Animal(ANIMAL.to_string()))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "lines[0].quantity_consumed has invalid format: must not be negative"
        );
    }

    #[test]
    fn test_feeding_task_needs_destination() {
        let task = NewTask {
            title: "Evening feed".to_string(),
            description: None,
            kind: TaskKind::Feeding,
            animal_id: None,
            habitat_id: None,
            assigned_user_id: None,
            scheduled_for: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        };
        assert!(matches!(
            validate_new_task(&task),
            Err(ValidationError::MissingDestination { .. })
        ));

        let general = NewTask {
            kind: TaskKind::General,
            ..task
        };
        assert!(validate_new_task(&general).is_ok());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid(SUPPLIER, "id").is_ok());
        assert!(validate_uuid("", "id").is_err());
        assert!(validate_uuid("123", "id").is_err());
    }
}
