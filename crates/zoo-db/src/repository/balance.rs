//! # Balance Repository
//!
//! Read-only queries over committed stock state.
//!
//! Nothing here opens a write transaction. Under WAL every query sees the
//! last committed state, never a half-applied entry or exit.
//!
//! ## Queries
//! - [`BalanceRepository::balance`] - Current balance of one product
//! - [`BalanceRepository::low_stock`] - Active products at or below threshold
//! - [`BalanceRepository::entry_history`] / [`BalanceRepository::exit_history`]
//! - [`BalanceRepository::lots_for_product`] - Lots in FEFO order
//! - [`BalanceRepository::reconcile`] - Products whose balance drifted from
//!   their lots

use sqlx::SqlitePool;
use tracing::{debug, warn};
use zoo_core::{
    EntryLine, EntryWithLines, ExitLine, ExitWithLines, InventoryEntry, InventoryExit, Product,
    Quantity, StockDrift, StockLot,
};

use crate::error::DbResult;
use crate::repository::lot;

/// Repository for balance and history queries.
#[derive(Debug, Clone)]
pub struct BalanceRepository {
    pool: SqlitePool,
}

impl BalanceRepository {
    /// Creates a new BalanceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BalanceRepository { pool }
    }

    /// Current balance of a product.
    ///
    /// ## Returns
    /// * `Ok(Some(qty))` - Product exists (active or not)
    /// * `Ok(None)` - Unknown product
    pub async fn balance(&self, product_id: &str) -> DbResult<Option<Quantity>> {
        let balance = sqlx::query_scalar("SELECT stock_actual FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(balance)
    }

    /// Active products whose balance has reached their reorder threshold.
    pub async fn low_stock(&self) -> DbResult<Vec<Product>> {
        let products: Vec<Product> = sqlx::query_as(
            r#"
            SELECT id, name, description, product_type_id, unit_id,
                   stock_actual, stock_minimo, is_active, created_at, updated_at
            FROM products
            WHERE is_active = 1 AND stock_actual <= stock_minimo
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Low stock products");
        Ok(products)
    }

    /// Lots of a product in FEFO order, drained lots included.
    pub async fn lots_for_product(&self, product_id: &str) -> DbResult<Vec<StockLot>> {
        let mut conn = self.pool.acquire().await?;
        lot::all_lots(&mut conn, product_id).await
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Entries, newest first, with their lines.
    pub async fn entry_history(&self, limit: u32, offset: u32) -> DbResult<Vec<EntryWithLines>> {
        let entries: Vec<InventoryEntry> = sqlx::query_as(
            r#"
            SELECT id, supplier_id, user_id, entered_at
            FROM inventory_entries
            ORDER BY entered_at DESC, id DESC
            LIMIT ?1 OFFSET ?2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let mut result = Vec::with_capacity(entries.len());
        for entry in entries {
            let lines = self.entry_lines(&entry.id).await?;
            result.push(EntryWithLines { entry, lines });
        }

        Ok(result)
    }

    /// One entry with its lines.
    pub async fn get_entry(&self, entry_id: &str) -> DbResult<Option<EntryWithLines>> {
        let entry: Option<InventoryEntry> = sqlx::query_as(
            "SELECT id, supplier_id, user_id, entered_at FROM inventory_entries WHERE id = ?1",
        )
        .bind(entry_id)
        .fetch_optional(&self.pool)
        .await?;

        match entry {
            Some(entry) => {
                let lines = self.entry_lines(&entry.id).await?;
                Ok(Some(EntryWithLines { entry, lines }))
            }
            None => Ok(None),
        }
    }

    async fn entry_lines(&self, entry_id: &str) -> DbResult<Vec<EntryLine>> {
        let lines = sqlx::query_as(
            r#"
            SELECT id, entry_id, product_id, lot_id, quantity, expiry_date, lot_code
            FROM inventory_entry_lines
            WHERE entry_id = ?1
            ORDER BY line_no
            "#,
        )
        .bind(entry_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Exits, newest first, with their lines.
    pub async fn exit_history(&self, limit: u32, offset: u32) -> DbResult<Vec<ExitWithLines>> {
        let exits: Vec<InventoryExit> = sqlx::query_as(
            r#"
            SELECT id, exit_type_id, user_id, exited_at
            FROM inventory_exits
            ORDER BY exited_at DESC, id DESC
            LIMIT ?1 OFFSET ?2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let mut result = Vec::with_capacity(exits.len());
        for exit in exits {
            let lines = self.exit_lines(&exit.id).await?;
            result.push(ExitWithLines { exit, lines });
        }

        Ok(result)
    }

    /// One exit with its lines.
    pub async fn get_exit(&self, exit_id: &str) -> DbResult<Option<ExitWithLines>> {
        let exit: Option<InventoryExit> = sqlx::query_as(
            "SELECT id, exit_type_id, user_id, exited_at FROM inventory_exits WHERE id = ?1",
        )
        .bind(exit_id)
        .fetch_optional(&self.pool)
        .await?;

        match exit {
            Some(exit) => {
                let lines = self.exit_lines(&exit.id).await?;
                Ok(Some(ExitWithLines { exit, lines }))
            }
            None => Ok(None),
        }
    }

    async fn exit_lines(&self, exit_id: &str) -> DbResult<Vec<ExitLine>> {
        let lines = sqlx::query_as(
            r#"
            SELECT id, exit_id, product_id, animal_id, habitat_id, quantity
            FROM inventory_exit_lines
            WHERE exit_id = ?1
            ORDER BY line_no
            "#,
        )
        .bind(exit_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    /// Products whose recorded balance differs from the sum of their lots.
    ///
    /// Empty when the ledger is healthy. Intended for a periodic job; any
    /// row returned is logged at `warn` level.
    pub async fn reconcile(&self) -> DbResult<Vec<StockDrift>> {
        let drift: Vec<StockDrift> = sqlx::query_as(
            r#"
            SELECT p.id AS product_id,
                   p.name AS product_name,
                   p.stock_actual AS recorded,
                   COALESCE(SUM(l.available), 0) AS lots_total
            FROM products p
            LEFT JOIN stock_lots l ON l.product_id = p.id
            GROUP BY p.id, p.name, p.stock_actual
            HAVING p.stock_actual <> COALESCE(SUM(l.available), 0)
            ORDER BY p.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        for d in &drift {
            warn!(
                product_id = %d.product_id,
                recorded = %d.recorded,
                lots_total = %d.lots_total,
                "Stock drift detected"
            );
        }

        Ok(drift)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::repository::fixtures::*;

    #[tokio::test]
    async fn test_balance_of_unknown_product() {
        let zoo = zoo().await;

        assert_eq!(zoo.db.balances().balance("nope").await.unwrap(), None);
        assert_eq!(zoo.balance(&zoo.hay).await, units(0));
    }

    #[tokio::test]
    async fn test_low_stock_at_or_below_threshold() {
        let zoo = zoo().await;
        // Hay threshold 20, meat threshold 5
        zoo.db
            .entries()
            .create_entry(
                USER,
                &zoo.entry(vec![
                    lot_line(&zoo.hay, 20, "H1", date(2025, 1, 1)),
                    lot_line(&zoo.meat, 6, "M1", date(2025, 1, 1)),
                ]),
            )
            .await
            .unwrap();

        let low: Vec<String> = zoo
            .db
            .balances()
            .low_stock()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(low, vec!["Hay".to_string()]);

        zoo.db
            .exits()
            .create_exit(USER, &zoo.manual_exit(vec![zoo.to_lion(&zoo.meat, 1)]))
            .await
            .unwrap();

        let low = zoo.db.balances().low_stock().await.unwrap();
        assert_eq!(low.len(), 2);
        assert_eq!(low[0].name, "Hay");
        assert_eq!(low[1].name, "Meat");
    }

    #[tokio::test]
    async fn test_history_newest_first_with_paging() {
        let zoo = zoo().await;
        zoo.stock_hay_three_lots().await;

        let exits = zoo.db.exits();
        let first = exits
            .create_exit(USER, &zoo.manual_exit(vec![zoo.to_lion(&zoo.hay, 10)]))
            .await
            .unwrap();
        let second = exits
            .create_exit(
                USER,
                &zoo.manual_exit(vec![zoo.to_lion(&zoo.hay, 5), zoo.to_lion(&zoo.hay, 7)]),
            )
            .await
            .unwrap();

        let balances = zoo.db.balances();
        let page = balances.exit_history(1, 0).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].exit.id, second.exit.id);
        assert_eq!(page[0].lines.len(), 2);
        assert_eq!(page[0].lines[0].quantity, units(5));
        assert_eq!(page[0].lines[1].quantity, units(7));

        let page = balances.exit_history(1, 1).await.unwrap();
        assert_eq!(page[0].exit.id, first.exit.id);

        let entries = balances.entry_history(10, 0).await.unwrap();
        assert_eq!(entries.len(), 1);
        let codes: Vec<&str> = entries[0].lines.iter().map(|l| l.lot_code.as_str()).collect();
        assert_eq!(codes, vec!["L1", "L2", "L3"]);
    }

    #[tokio::test]
    async fn test_get_entry_and_exit() {
        let zoo = zoo().await;
        let receipt = zoo
            .db
            .entries()
            .create_entry(USER, &zoo.entry(vec![lot_line(&zoo.hay, 10, "L1", date(2025, 1, 1))]))
            .await
            .unwrap();

        let balances = zoo.db.balances();
        let stored = balances.get_entry(&receipt.entry.id).await.unwrap().unwrap();
        assert_eq!(stored.entry.supplier_id, zoo.supplier.id);
        assert_eq!(stored.lines[0].lot_id, receipt.lots[0].id);

        assert!(balances.get_entry("missing").await.unwrap().is_none());
        assert!(balances.get_exit("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lots_for_product_in_fefo_order() {
        let zoo = zoo().await;
        zoo.db
            .entries()
            .create_entry(
                USER,
                &zoo.entry(vec![
                    lot_line(&zoo.hay, 5, "B", date(2025, 2, 1)),
                    lot_line(&zoo.hay, 5, "Z", date(2025, 1, 1)),
                    lot_line(&zoo.hay, 5, "A", date(2025, 2, 1)),
                ]),
            )
            .await
            .unwrap();

        let codes: Vec<String> = zoo.lots(&zoo.hay).await.into_iter().map(|(c, _)| c).collect();
        assert_eq!(codes, vec!["Z", "A", "B"]);
    }

    #[tokio::test]
    async fn test_reconcile_reports_drift() {
        let zoo = zoo().await;
        zoo.stock_hay_three_lots().await;
        zoo.assert_ledger_consistent().await;

        sqlx::query("UPDATE stock_lots SET available = available - ?2 WHERE product_id = ?1 AND lot_code = 'L3'")
            .bind(&zoo.hay.id)
            .bind(units(8))
            .execute(zoo.db.pool())
            .await
            .unwrap();

        let drift = zoo.db.balances().reconcile().await.unwrap();
        assert_eq!(drift.len(), 1);
        assert_eq!(drift[0].product_id, zoo.hay.id);
        assert_eq!(drift[0].recorded, units(230));
        assert_eq!(drift[0].lots_total, units(222));
    }
}
