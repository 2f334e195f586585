//! # Entry Repository
//!
//! Receives stock from suppliers into dated lots.
//!
//! ## Entry Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          create_entry                                   │
//! │                                                                         │
//! │  validate_entry_request()     ← quantities > 0, lot codes, ids         │
//! │       │                         (no transaction opened on failure)     │
//! │       ▼                                                                 │
//! │  BEGIN IMMEDIATE                                                       │
//! │       │                                                                 │
//! │       ├── supplier active?          else ReferenceNotFound             │
//! │       ├── INSERT inventory_entries                                     │
//! │       │                                                                 │
//! │       ├── for each line:                                               │
//! │       │     lock product (active?)   else ReferenceNotFound            │
//! │       │     get-or-create lot (product, lot_code, expiry)              │
//! │       │     lot.available   += qty                                     │
//! │       │     product.stock   += qty                                     │
//! │       │     INSERT inventory_entry_lines                               │
//! │       │                                                                 │
//! │       ├── snapshot touched products and lots                           │
//! │       ▼                                                                 │
//! │  COMMIT  (any error above: dropped tx → ROLLBACK)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;
use zoo_core::request::EntryRequest;
use zoo_core::validation::validate_entry_request;
use zoo_core::{CoreError, EntryLine, EntryReceipt, InventoryEntry};

use crate::error::DbResult;
use crate::pool::begin_write;
use crate::repository::lot;

/// Repository for stock entries.
#[derive(Debug, Clone)]
pub struct EntryRepository {
    pool: SqlitePool,
}

impl EntryRepository {
    /// Creates a new EntryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        EntryRepository { pool }
    }

    /// Records a supplier delivery.
    ///
    /// ## Arguments
    /// * `user_id` - Who received the goods
    /// * `request` - Supplier and received lines
    ///
    /// ## Returns
    /// * `Ok(EntryReceipt)` - The entry, its lines, and the product and lot
    ///   rows it touched as they stood at commit
    /// * `Err(Core(Validation))` - Malformed request, nothing written
    /// * `Err(Core(ReferenceNotFound))` - Supplier or a product missing or
    ///   inactive, nothing written
    pub async fn create_entry(&self, user_id: &str, request: &EntryRequest) -> DbResult<EntryReceipt> {
        if let Err(e) = validate_entry_request(request) {
            warn!(error = %e, "Entry rejected");
            return Err(e.into());
        }

        let mut tx = begin_write(&self.pool).await?;
        let receipt = record_entry(&mut tx, user_id, request).await?;
        tx.commit().await?;

        info!(
            entry_id = %receipt.entry.id,
            supplier_id = %receipt.entry.supplier_id,
            lines = receipt.lines.len(),
            "Entry committed"
        );
        Ok(receipt)
    }
}

async fn record_entry(
    conn: &mut SqliteConnection,
    user_id: &str,
    request: &EntryRequest,
) -> DbResult<EntryReceipt> {
    let now = Utc::now();

    let supplier_active: Option<bool> =
        sqlx::query_scalar("SELECT is_active FROM suppliers WHERE id = ?1")
            .bind(&request.supplier_id)
            .fetch_optional(&mut *conn)
            .await?;
    if supplier_active != Some(true) {
        return Err(CoreError::not_found("Supplier", &request.supplier_id).into());
    }

    let entry = InventoryEntry {
        id: Uuid::new_v4().to_string(),
        supplier_id: request.supplier_id.clone(),
        user_id: user_id.to_string(),
        entered_at: now,
    };

    sqlx::query(
        "INSERT INTO inventory_entries (id, supplier_id, user_id, entered_at) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(&entry.id)
    .bind(&entry.supplier_id)
    .bind(&entry.user_id)
    .bind(entry.entered_at)
    .execute(&mut *conn)
    .await?;

    let mut lines = Vec::with_capacity(request.lines.len());
    let mut product_ids: Vec<String> = Vec::new();
    let mut lot_ids: Vec<String> = Vec::new();

    for (line_no, line) in request.lines.iter().enumerate() {
        let product = lot::lock_product(conn, &line.product_id).await?;
        let lot_code = line.lot_code.trim();

        let stock_lot =
            lot::get_or_create_lot(conn, &product.id, lot_code, line.expiry_date, now).await?;
        lot::add_to_lot(conn, &stock_lot.id, line.quantity, now).await?;
        lot::adjust_product_balance(conn, &product.id, line.quantity, now).await?;

        let entry_line = EntryLine {
            id: Uuid::new_v4().to_string(),
            entry_id: entry.id.clone(),
            product_id: product.id.clone(),
            lot_id: stock_lot.id.clone(),
            quantity: line.quantity,
            expiry_date: line.expiry_date,
            lot_code: lot_code.to_string(),
        };

        sqlx::query(
            r#"
            INSERT INTO inventory_entry_lines (
                id, entry_id, product_id, lot_id, quantity, expiry_date, lot_code, line_no
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&entry_line.id)
        .bind(&entry_line.entry_id)
        .bind(&entry_line.product_id)
        .bind(&entry_line.lot_id)
        .bind(entry_line.quantity)
        .bind(entry_line.expiry_date)
        .bind(&entry_line.lot_code)
        .bind(line_no as i64)
        .execute(&mut *conn)
        .await?;

        debug!(
            product_id = %product.id,
            lot_id = %stock_lot.id,
            quantity = %line.quantity,
            "Entry line recorded"
        );

        if !product_ids.contains(&product.id) {
            product_ids.push(product.id.clone());
        }
        if !lot_ids.contains(&stock_lot.id) {
            lot_ids.push(stock_lot.id.clone());
        }
        lines.push(entry_line);
    }

    let mut products = Vec::with_capacity(product_ids.len());
    for id in &product_ids {
        products.push(lot::fetch_product(conn, id).await?);
    }

    let mut lots = Vec::with_capacity(lot_ids.len());
    for id in &lot_ids {
        lots.push(lot::fetch_lot(conn, id).await?);
    }

    Ok(EntryReceipt {
        entry,
        lines,
        products,
        lots,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
