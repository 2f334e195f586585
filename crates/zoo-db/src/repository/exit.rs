//! # Exit Repository
//!
//! Removes stock with First-Expired-First-Out lot depletion.
//!
//! ## Exit Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     process_exit_lines (primitive)                      │
//! │                                                                         │
//! │  exit type active?                     else ReferenceNotFound          │
//! │  INSERT inventory_exits                                                │
//! │       │                                                                 │
//! │       ├── for each line:                                               │
//! │       │     lock product (active?)     else ReferenceNotFound          │
//! │       │     destination active?        else ReferenceNotFound          │
//! │       │     stock_actual >= qty?       else InsufficientStock          │
//! │       │     lots with available > 0, FEFO order                        │
//! │       │     plan_depletion()           Σ lots < qty → StockInconsistency│
//! │       │     write each lot's remaining balance                         │
//! │       │     product.stock -= qty                                       │
//! │       │     INSERT inventory_exit_lines (aggregate, no lot detail)     │
//! │       ▼                                                                 │
//! │  ExitOutcome { exit, lines, depletions }                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The primitive never begins or commits. [`ExitRepository::create_exit`]
//! wraps it in its own write transaction; task workflows call it inside
//! theirs so the exit and the workflow records commit together.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use zoo_core::fefo::plan_depletion;
use zoo_core::request::ExitRequest;
use zoo_core::validation::{validate_exit_lines, validate_exit_request};
use zoo_core::{CoreError, ExitLine, ExitOutcome, InventoryExit, NewExitLine};

use crate::error::{DbError, DbResult};
use crate::pool::begin_write;
use crate::repository::lot;

/// Repository for stock exits.
#[derive(Debug, Clone)]
pub struct ExitRepository {
    pool: SqlitePool,
}

impl ExitRepository {
    /// Creates a new ExitRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ExitRepository { pool }
    }

    /// Records a stock exit in its own transaction.
    ///
    /// ## Returns
    /// * `Ok(ExitOutcome)` - Committed exit plus the lot draws performed
    /// * `Err(Core(..))` - Validation, reference, stock or consistency
    ///   failure; nothing written
    ///
    /// ## Example
    /// ```rust,ignore
    /// let outcome = db.exits().create_exit(user_id, &ExitRequest {
    ///     exit_type_id: MANUAL_EXIT_TYPE_ID.to_string(),
    ///     lines: vec![ExitLineRequest { product_id, quantity, animal_id: Some(lion), habitat_id: None }],
    /// }).await?;
    /// ```
    pub async fn create_exit(&self, user_id: &str, request: &ExitRequest) -> DbResult<ExitOutcome> {
        let lines = match validate_exit_request(request) {
            Ok(lines) => lines,
            Err(e) => {
                warn!(error = %e, "Exit rejected");
                return Err(e.into());
            }
        };

        let mut tx = begin_write(&self.pool).await?;
        let outcome = process_exit_lines(&mut tx, &request.exit_type_id, user_id, &lines).await?;
        tx.commit().await?;

        info!(
            exit_id = %outcome.exit.id,
            exit_type_id = %outcome.exit.exit_type_id,
            lines = outcome.lines.len(),
            lots_touched = outcome.depletions.len(),
            "Exit committed"
        );
        Ok(outcome)
    }
}

/// Records an exit inside a caller-owned write transaction.
///
/// The caller must have opened `conn` with [`crate::Database::begin_write`]
/// and decides whether to commit. Returning an error leaves partial writes
/// in the transaction; the caller must drop it (roll back), never commit.
///
/// ## Example
/// ```rust,ignore
/// let mut tx = db.begin_write().await?;
/// let outcome = process_exit_lines(&mut tx, FEEDING_EXIT_TYPE_ID, user_id, &lines).await?;
/// // ... write the records that belong with this exit ...
/// tx.commit().await?;
/// ```
pub async fn process_exit_lines(
    conn: &mut SqliteConnection,
    exit_type_id: &str,
    user_id: &str,
    lines: &[NewExitLine],
) -> DbResult<ExitOutcome> {
    validate_exit_lines(lines)?;

    let now = Utc::now();

    let exit_type_active: Option<bool> =
        sqlx::query_scalar("SELECT is_active FROM exit_types WHERE id = ?1")
            .bind(exit_type_id)
            .fetch_optional(&mut *conn)
            .await?;
    if exit_type_active != Some(true) {
        return Err(CoreError::not_found("Exit type", exit_type_id).into());
    }

    let exit = InventoryExit {
        id: Uuid::new_v4().to_string(),
        exit_type_id: exit_type_id.to_string(),
        user_id: user_id.to_string(),
        exited_at: now,
    };

    sqlx::query(
        "INSERT INTO inventory_exits (id, exit_type_id, user_id, exited_at) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(&exit.id)
    .bind(&exit.exit_type_id)
    .bind(&exit.user_id)
    .bind(exit.exited_at)
    .execute(&mut *conn)
    .await?;

    let mut exit_lines = Vec::with_capacity(lines.len());
    let mut depletions = Vec::new();

    for (line_no, line) in lines.iter().enumerate() {
        let product = lot::lock_product(conn, &line.product_id).await?;
        lot::ensure_destination_active(conn, &line.destination).await?;

        if !product.can_supply(line.quantity) {
            warn!(
                product_id = %product.id,
                available = %product.stock_actual,
                requested = %line.quantity,
                "Insufficient stock"
            );
            return Err(CoreError::InsufficientStock {
                product_id: product.id,
                product_name: product.name,
                available: product.stock_actual,
                requested: line.quantity,
            }
            .into());
        }

        let lots = lot::fefo_lots(conn, &product.id).await?;
        let plan = match plan_depletion(&product.id, product.stock_actual, &lots, line.quantity) {
            Ok(plan) => plan,
            Err(e) => {
                if let CoreError::StockInconsistency {
                    product_id,
                    recorded,
                    lots_total,
                } = &e
                {
                    error!(
                        product_id = %product_id,
                        recorded = %recorded,
                        lots_total = %lots_total,
                        requested = %line.quantity,
                        "Stock inconsistency: product balance exceeds lot total"
                    );
                }
                return Err(DbError::Core(e));
            }
        };

        for draw in &plan {
            lot::apply_depletion(conn, draw, now).await?;
        }
        lot::adjust_product_balance(conn, &product.id, -line.quantity, now).await?;

        let exit_line = ExitLine {
            id: Uuid::new_v4().to_string(),
            exit_id: exit.id.clone(),
            product_id: product.id.clone(),
            animal_id: line.destination.animal_id().map(str::to_string),
            habitat_id: line.destination.habitat_id().map(str::to_string),
            quantity: line.quantity,
        };

        sqlx::query(
            r#"
            INSERT INTO inventory_exit_lines (
                id, exit_id, product_id, animal_id, habitat_id, quantity, line_no
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&exit_line.id)
        .bind(&exit_line.exit_id)
        .bind(&exit_line.product_id)
        .bind(&exit_line.animal_id)
        .bind(&exit_line.habitat_id)
        .bind(exit_line.quantity)
        .bind(line_no as i64)
        .execute(&mut *conn)
        .await?;

        debug!(
            product_id = %product.id,
            quantity = %line.quantity,
            destination = %line.destination,
            lots = plan.len(),
            "Exit line recorded"
        );

        exit_lines.push(exit_line);
        depletions.extend(plan);
    }

    Ok(ExitOutcome {
        exit,
        lines: exit_lines,
        depletions,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures::*;
    use crate::{CatalogKind, DbConfig};
    use zoo_core::request::ExitLineRequest;
    use zoo_core::{Destination, ValidationError, MANUAL_EXIT_TYPE_ID};

    /// Receives the two lots the walkthrough starts from: L1 100, L2 50.
    async fn two_lots(zoo: &Zoo) {
        let entries = zoo.db.entries();
        entries
            .create_entry(USER, &zoo.entry(vec![lot_line(&zoo.hay, 100, "L1", date(2025, 1, 1))]))
            .await
            .unwrap();
        entries
            .create_entry(USER, &zoo.entry(vec![lot_line(&zoo.hay, 50, "L2", date(2025, 2, 1))]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_exit_drains_oldest_lot_first() {
        let zoo = zoo().await;
        two_lots(&zoo).await;

        let outcome = zoo
            .db
            .exits()
            .create_exit(USER, &zoo.manual_exit(vec![zoo.to_lion(&zoo.hay, 120)]))
            .await
            .unwrap();

        assert_eq!(zoo.balance(&zoo.hay).await, units(30));
        assert_eq!(
            zoo.lots(&zoo.hay).await,
            vec![("L1".to_string(), units(0)), ("L2".to_string(), units(30))]
        );

        assert_eq!(outcome.lines.len(), 1);
        assert_eq!(outcome.lines[0].animal_id.as_deref(), Some(zoo.lion.id.as_str()));
        assert_eq!(outcome.lines[0].habitat_id, None);

        let draws: Vec<_> = outcome
            .depletions
            .iter()
            .map(|d| (d.lot_code.as_str(), d.taken, d.remaining))
            .collect();
        assert_eq!(draws, vec![("L1", units(100), units(0)), ("L2", units(20), units(30))]);

        zoo.assert_ledger_consistent().await;
    }

    #[tokio::test]
    async fn test_insufficient_stock_changes_nothing() {
        let zoo = zoo().await;
        two_lots(&zoo).await;
        zoo.db
            .exits()
            .create_exit(USER, &zoo.manual_exit(vec![zoo.to_lion(&zoo.hay, 120)]))
            .await
            .unwrap();

        let err = zoo
            .db
            .exits()
            .create_exit(USER, &zoo.manual_exit(vec![zoo.to_lion(&zoo.hay, 40)]))
            .await
            .unwrap_err();

        match err {
            DbError::Core(CoreError::InsufficientStock {
                available,
                requested,
                ..
            }) => {
                assert_eq!(available, units(30));
                assert_eq!(requested, units(40));
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        assert_eq!(zoo.balance(&zoo.hay).await, units(30));
        assert_eq!(
            zoo.lots(&zoo.hay).await,
            vec![("L1".to_string(), units(0)), ("L2".to_string(), units(30))]
        );
        assert_eq!(zoo.db.balances().exit_history(10, 0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_exact_balance_empties_every_lot() {
        let zoo = zoo().await;
        zoo.stock_hay_three_lots().await;

        zoo.db
            .exits()
            .create_exit(USER, &zoo.manual_exit(vec![zoo.to_lion(&zoo.hay, 230)]))
            .await
            .unwrap();

        assert_eq!(zoo.balance(&zoo.hay).await, units(0));
        assert!(zoo.lots(&zoo.hay).await.iter().all(|(_, q)| q.is_zero()));
        zoo.assert_ledger_consistent().await;
    }

    #[tokio::test]
    async fn test_fefo_ignores_delivery_order() {
        let zoo = zoo().await;
        // Later expiry received first
        zoo.db
            .entries()
            .create_entry(
                USER,
                &zoo.entry(vec![
                    lot_line(&zoo.meat, 10, "M-LATE", date(2025, 3, 1)),
                    lot_line(&zoo.meat, 10, "M-EARLY", date(2025, 1, 1)),
                ]),
            )
            .await
            .unwrap();

        let outcome = zoo
            .db
            .exits()
            .create_exit(USER, &zoo.manual_exit(vec![zoo.to_lion(&zoo.meat, 4)]))
            .await
            .unwrap();

        assert_eq!(outcome.depletions.len(), 1);
        assert_eq!(outcome.depletions[0].lot_code, "M-EARLY");
        assert_eq!(
            zoo.lots(&zoo.meat).await,
            vec![("M-EARLY".to_string(), units(6)), ("M-LATE".to_string(), units(10))]
        );
    }

    #[tokio::test]
    async fn test_failing_line_rolls_back_earlier_lines() {
        let zoo = zoo().await;
        zoo.stock_hay_three_lots().await;
        zoo.db
            .entries()
            .create_entry(USER, &zoo.entry(vec![lot_line(&zoo.meat, 10, "M1", date(2025, 1, 1))]))
            .await
            .unwrap();

        let err = zoo
            .db
            .exits()
            .create_exit(
                USER,
                &zoo.manual_exit(vec![
                    zoo.to_lion(&zoo.hay, 120),
                    zoo.to_lion(&zoo.meat, 11),
                    zoo.to_lion(&zoo.hay, 10),
                ]),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Core(CoreError::InsufficientStock { .. })));
        assert_eq!(zoo.balance(&zoo.hay).await, units(230));
        assert_eq!(zoo.balance(&zoo.meat).await, units(10));
        assert_eq!(zoo.lots(&zoo.hay).await[0], ("L1".to_string(), units(100)));
        assert!(zoo.db.balances().exit_history(10, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_destination_rolls_back_earlier_lines() {
        let zoo = zoo().await;
        zoo.stock_hay_three_lots().await;

        let mut stray = zoo.to_lion(&zoo.hay, 10);
        stray.animal_id = Some(Uuid::new_v4().to_string());

        let err = zoo
            .db
            .exits()
            .create_exit(
                USER,
                &zoo.manual_exit(vec![zoo.to_lion(&zoo.hay, 120), stray, zoo.to_lion(&zoo.hay, 5)]),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Core(CoreError::ReferenceNotFound { ref entity, .. }) if entity == "Animal"
        ));
        assert_eq!(zoo.balance(&zoo.hay).await, units(230));
        assert_eq!(zoo.lots(&zoo.hay).await[0], ("L1".to_string(), units(100)));
        assert!(zoo.db.balances().exit_history(10, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_same_product_twice_in_one_exit() {
        let zoo = zoo().await;
        zoo.stock_hay_three_lots().await;

        let outcome = zoo
            .db
            .exits()
            .create_exit(
                USER,
                &zoo.manual_exit(vec![zoo.to_lion(&zoo.hay, 90), zoo.to_lion(&zoo.hay, 30)]),
            )
            .await
            .unwrap();

        // Second line sees the first line's draws
        assert_eq!(outcome.depletions.len(), 3);
        assert_eq!(zoo.balance(&zoo.hay).await, units(110));
        assert_eq!(
            zoo.lots(&zoo.hay).await,
            vec![
                ("L1".to_string(), units(0)),
                ("L2".to_string(), units(30)),
                ("L3".to_string(), units(80)),
            ]
        );
    }

    #[tokio::test]
    async fn test_habitat_destination() {
        let zoo = zoo().await;
        zoo.stock_hay_three_lots().await;

        let request = zoo.manual_exit(vec![ExitLineRequest {
            product_id: zoo.hay.id.clone(),
            quantity: units(5),
            animal_id: None,
            habitat_id: Some(zoo.savanna.id.clone()),
        }]);
        let outcome = zoo.db.exits().create_exit(USER, &request).await.unwrap();

        let stored = zoo
            .db
            .balances()
            .get_exit(&outcome.exit.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.lines[0].habitat_id.as_deref(), Some(zoo.savanna.id.as_str()));
        assert_eq!(stored.lines[0].animal_id, None);
    }

    #[tokio::test]
    async fn test_both_destinations_rejected() {
        let zoo = zoo().await;
        zoo.stock_hay_three_lots().await;

        let mut line = zoo.to_lion(&zoo.hay, 5);
        line.habitat_id = Some(zoo.savanna.id.clone());

        let err = zoo
            .db
            .exits()
            .create_exit(USER, &zoo.manual_exit(vec![line]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Core(CoreError::Validation(ValidationError::ConflictingDestination { .. }))
        ));
    }

    #[tokio::test]
    async fn test_inactive_animal_rejected() {
        let zoo = zoo().await;
        zoo.stock_hay_three_lots().await;
        zoo.db
            .catalog()
            .deactivate(CatalogKind::Animal, &zoo.lion.id)
            .await
            .unwrap();

        let err = zoo
            .db
            .exits()
            .create_exit(USER, &zoo.manual_exit(vec![zoo.to_lion(&zoo.hay, 5)]))
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            format!("Animal not found or inactive: {}", zoo.lion.id)
        );
        assert_eq!(zoo.balance(&zoo.hay).await, units(230));
    }

    #[tokio::test]
    async fn test_unknown_and_inactive_exit_type() {
        let zoo = zoo().await;
        zoo.stock_hay_three_lots().await;

        let mut request = zoo.manual_exit(vec![zoo.to_lion(&zoo.hay, 5)]);
        request.exit_type_id = uuid::Uuid::new_v4().to_string();
        let err = zoo.db.exits().create_exit(USER, &request).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::ReferenceNotFound { .. })));

        zoo.db
            .catalog()
            .deactivate(CatalogKind::ExitType, MANUAL_EXIT_TYPE_ID)
            .await
            .unwrap();
        let err = zoo
            .db
            .exits()
            .create_exit(USER, &zoo.manual_exit(vec![zoo.to_lion(&zoo.hay, 5)]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::ReferenceNotFound { .. })));
        assert_eq!(zoo.balance(&zoo.hay).await, units(230));
    }

    #[tokio::test]
    async fn test_drifted_balance_is_inconsistency() {
        let zoo = zoo().await;
        zoo.stock_hay_three_lots().await;

        sqlx::query("UPDATE products SET stock_actual = ?2 WHERE id = ?1")
            .bind(&zoo.hay.id)
            .bind(units(500))
            .execute(zoo.db.pool())
            .await
            .unwrap();

        let err = zoo
            .db
            .exits()
            .create_exit(USER, &zoo.manual_exit(vec![zoo.to_lion(&zoo.hay, 300)]))
            .await
            .unwrap_err();

        match err {
            DbError::Core(CoreError::StockInconsistency {
                recorded,
                lots_total,
                ..
            }) => {
                assert_eq!(recorded, units(500));
                assert_eq!(lots_total, units(230));
            }
            other => panic!("expected StockInconsistency, got {other:?}"),
        }

        // Lots untouched
        assert_eq!(zoo.lots(&zoo.hay).await[0], ("L1".to_string(), units(100)));
        assert_eq!(zoo.db.balances().reconcile().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_primitive_leaves_commit_to_caller() {
        let zoo = zoo().await;
        zoo.stock_hay_three_lots().await;

        let lines = vec![NewExitLine {
            product_id: zoo.hay.id.clone(),
            quantity: units(120),
            destination: Destination::Animal(zoo.lion.id.clone()),
        }];

        let mut tx = zoo.db.begin_write().await.unwrap();
        let outcome = process_exit_lines(&mut tx, MANUAL_EXIT_TYPE_ID, USER, &lines)
            .await
            .unwrap();
        assert_eq!(outcome.depletions.len(), 2);
        drop(tx);

        assert_eq!(zoo.balance(&zoo.hay).await, units(230));
        assert!(zoo.db.balances().exit_history(10, 0).await.unwrap().is_empty());

        let mut tx = zoo.db.begin_write().await.unwrap();
        process_exit_lines(&mut tx, MANUAL_EXIT_TYPE_ID, USER, &lines)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(zoo.balance(&zoo.hay).await, units(110));
        zoo.assert_ledger_consistent().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_exits_never_oversell() {
        let dir = tempfile::tempdir().unwrap();
        let zoo = zoo_with(DbConfig::new(dir.path().join("zoo.db")).max_connections(4)).await;
        zoo.db
            .entries()
            .create_entry(USER, &zoo.entry(vec![lot_line(&zoo.hay, 100, "L1", date(2025, 1, 1))]))
            .await
            .unwrap();

        let request = zoo.manual_exit(vec![zoo.to_lion(&zoo.hay, 70)]);
        let exits = zoo.db.exits();

        let (first, second) = tokio::join!(
            exits.create_exit(USER, &request),
            exits.create_exit("keeper-2", &request),
        );

        let results = [first, second];
        let committed = results.iter().filter(|r| r.is_ok()).count();
        let rejected = results
            .iter()
            .filter(|r| matches!(r, Err(DbError::Core(CoreError::InsufficientStock { .. }))))
            .count();

        assert_eq!(committed, 1);
        assert_eq!(rejected, 1);
        assert_eq!(zoo.balance(&zoo.hay).await, units(30));
        zoo.assert_ledger_consistent().await;
    }
}
