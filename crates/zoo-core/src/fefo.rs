//! # FEFO Depletion Planning
//!
//! First-Expired-First-Out: stock leaves in ascending expiry order so that
//! physical rotation on the shelf matches the books.
//!
//! ## Algorithm
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Request: 120.00                                                        │
//! │                                                                         │
//! │  Lots (sorted by expiry):                                               │
//! │    L1  2025-01-01  100.00   ── take 100.00 → 0.00   remaining 20.00     │
//! │    L2  2025-02-01   50.00   ── take  20.00 → 30.00  remaining  0.00     │
//! │    L3  2025-03-01   80.00   ── untouched                                │
//! │                                                                         │
//! │  Σ lots < request?  → StockInconsistency (balance drifted from lots)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! This module only *plans*. `zoo-db` fetches the lots under the write lock,
//! calls [`plan_depletion`] and writes the resulting balances back.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::quantity::Quantity;
use crate::types::StockLot;

/// One planned (and, once applied, performed) draw from a lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LotDepletion {
    pub product_id: String,
    pub lot_id: String,
    pub lot_code: String,
    #[ts(as = "String")]
    pub expiry_date: NaiveDate,
    /// Amount drawn from the lot.
    pub taken: Quantity,
    /// Lot balance after the draw.
    pub remaining: Quantity,
}

/// Consumption order: expiry first; lot code and creation time break ties so
/// the order is total and two runs over the same rows agree.
fn fefo_order(a: &StockLot, b: &StockLot) -> Ordering {
    a.expiry_date
        .cmp(&b.expiry_date)
        .then_with(|| a.lot_code.cmp(&b.lot_code))
        .then_with(|| a.created_at.cmp(&b.created_at))
}

/// Plans how `requested` is drawn from `lots`.
///
/// ## Arguments
/// * `product_id` - Product the lots belong to
/// * `recorded` - The product's denormalized balance (for the error payload)
/// * `lots` - The product's lots, in any order; empty lots are skipped
/// * `requested` - Positive quantity to draw
///
/// ## Returns
/// * `Ok(plan)` - Draws in FEFO order; their `taken` values sum to `requested`
/// * `Err(CoreError::StockInconsistency)` - The lots cannot cover the request
///
/// ## Example
/// ```rust,ignore
/// let plan = plan_depletion(&product.id, product.stock_actual, &lots, qty)?;
/// for draw in &plan {
///     apply(draw.lot_id, draw.remaining);
/// }
/// ```
pub fn plan_depletion(
    product_id: &str,
    recorded: Quantity,
    lots: &[StockLot],
    requested: Quantity,
) -> CoreResult<Vec<LotDepletion>> {
    let mut ordered: Vec<&StockLot> = lots.iter().filter(|l| l.available.is_positive()).collect();
    ordered.sort_by(|a, b| fefo_order(a, b));

    let lots_total: Quantity = ordered.iter().map(|l| l.available).sum();
    if lots_total < requested {
        return Err(CoreError::StockInconsistency {
            product_id: product_id.to_string(),
            recorded,
            lots_total,
        });
    }

    let mut outstanding = requested;
    let mut plan = Vec::new();

    for lot in ordered {
        if !outstanding.is_positive() {
            break;
        }

        let taken = lot.available.min(outstanding);
        outstanding -= taken;

        plan.push(LotDepletion {
            product_id: product_id.to_string(),
            lot_id: lot.id.clone(),
            lot_code: lot.lot_code.clone(),
            expiry_date: lot.expiry_date,
            taken,
            remaining: lot.available - taken,
        });
    }

    Ok(plan)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn lot(id: &str, code: &str, expiry: (i32, u32, u32), units: i64) -> StockLot {
        let now = Utc::now();
        StockLot {
            id: id.to_string(),
            product_id: "p-1".to_string(),
            lot_code: code.to_string(),
            expiry_date: NaiveDate::from_ymd_opt(expiry.0, expiry.1, expiry.2).unwrap(),
            available: Quantity::from_units(units),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_earliest_expiry_drained_first() {
        // Deliberately out of order
        let lots = vec![
            lot("l3", "C", (2025, 3, 1), 80),
            lot("l1", "A", (2025, 1, 1), 100),
            lot("l2", "B", (2025, 2, 1), 50),
        ];

        let plan = plan_depletion(
            "p-1",
            Quantity::from_units(230),
            &lots,
            Quantity::from_units(120),
        )
        .unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].lot_id, "l1");
        assert_eq!(plan[0].taken, Quantity::from_units(100));
        assert_eq!(plan[0].remaining, Quantity::zero());
        assert_eq!(plan[1].lot_id, "l2");
        assert_eq!(plan[1].taken, Quantity::from_units(20));
        assert_eq!(plan[1].remaining, Quantity::from_units(30));
    }

    #[test]
    fn test_middle_lot_untouched_until_first_is_empty() {
        let lots = vec![
            lot("l1", "A", (2025, 1, 1), 10),
            lot("l2", "B", (2025, 2, 1), 10),
            lot("l3", "C", (2025, 3, 1), 10),
        ];

        let plan =
            plan_depletion("p-1", Quantity::from_units(30), &lots, Quantity::from_units(25)).unwrap();

        let taken: Vec<_> = plan.iter().map(|d| (d.lot_id.as_str(), d.taken)).collect();
        assert_eq!(
            taken,
            vec![
                ("l1", Quantity::from_units(10)),
                ("l2", Quantity::from_units(10)),
                ("l3", Quantity::from_units(5)),
            ]
        );
    }

    #[test]
    fn test_empty_lots_are_skipped() {
        let lots = vec![
            lot("l0", "Z", (2024, 12, 1), 0),
            lot("l1", "A", (2025, 1, 1), 10),
        ];

        let plan =
            plan_depletion("p-1", Quantity::from_units(10), &lots, Quantity::from_units(4)).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].lot_id, "l1");
    }

    #[test]
    fn test_same_expiry_ordered_by_lot_code() {
        let lots = vec![
            lot("lb", "B", (2025, 1, 1), 5),
            lot("la", "A", (2025, 1, 1), 5),
        ];

        let plan =
            plan_depletion("p-1", Quantity::from_units(10), &lots, Quantity::from_units(5)).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].lot_id, "la");
    }

    #[test]
    fn test_lots_short_of_request_is_inconsistency() {
        let lots = vec![lot("l1", "A", (2025, 1, 1), 10)];

        let err = plan_depletion("p-1", Quantity::from_units(50), &lots, Quantity::from_units(20))
            .unwrap_err();

        match err {
            CoreError::StockInconsistency {
                product_id,
                recorded,
                lots_total,
            } => {
                assert_eq!(product_id, "p-1");
                assert_eq!(recorded, Quantity::from_units(50));
                assert_eq!(lots_total, Quantity::from_units(10));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_same_code_and_expiry_ordered_by_creation() {
        let mut older = lot("old", "A", (2025, 1, 1), 5);
        older.created_at = older.created_at - chrono::Duration::hours(1);
        let lots = vec![lot("new", "A", (2025, 1, 1), 5), older];

        let plan =
            plan_depletion("p-1", Quantity::from_units(10), &lots, Quantity::from_units(7)).unwrap();

        let order: Vec<&str> = plan.iter().map(|d| d.lot_id.as_str()).collect();
        assert_eq!(order, vec!["old", "new"]);
    }
}
