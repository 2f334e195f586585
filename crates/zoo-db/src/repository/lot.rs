//! # Lot Store Access
//!
//! Row-level helpers shared by the entry and exit processors. Every function
//! here takes the connection of an open write transaction; none of them
//! begins or commits anything.
//!
//! ## Lock Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  per line:   lock_product(product_id)                                   │
//! │                   │                                                     │
//! │                   ▼                                                     │
//! │              lots of that product (FEFO order, or the one lot keyed     │
//! │              by lot code + expiry for entries)                          │
//! │                   │                                                     │
//! │                   ▼                                                     │
//! │              write lots, then the product balance                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Product first, lots second, at every call site.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;
use zoo_core::{CoreError, Destination, LotDepletion, Product, Quantity, StockLot};

use crate::error::DbResult;

const PRODUCT_COLUMNS: &str = "id, name, description, product_type_id, unit_id, \
     stock_actual, stock_minimo, is_active, created_at, updated_at";

const LOT_COLUMNS: &str = "id, product_id, lot_code, expiry_date, available, created_at, updated_at";

/// Reads a product for update.
///
/// The caller's `BEGIN IMMEDIATE` already holds the write lock, so the row
/// cannot change under us until commit.
///
/// ## Returns
/// * `Ok(Product)` - Product exists and is active
/// * `Err(ReferenceNotFound)` - Unknown or soft-deleted product
pub(crate) async fn lock_product(conn: &mut SqliteConnection, product_id: &str) -> DbResult<Product> {
    let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);

    let product: Option<Product> = sqlx::query_as(&sql)
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;

    match product {
        Some(p) if p.is_active => {
            debug!(product_id = %p.id, stock = %p.stock_actual, "Product locked");
            Ok(p)
        }
        _ => Err(CoreError::not_found("Product", product_id).into()),
    }
}

/// Checks that an animal or habitat exists and is active.
///
/// ## Returns
/// * `Err(ReferenceNotFound("Animal" | "Habitat"))` - Unknown or soft-deleted
pub(crate) async fn ensure_destination_active(
    conn: &mut SqliteConnection,
    destination: &Destination,
) -> DbResult<()> {
    let (entity, sql, id) = match destination {
        Destination::Animal(id) => ("Animal", "SELECT is_active FROM animals WHERE id = ?1", id),
        Destination::Habitat(id) => ("Habitat", "SELECT is_active FROM habitats WHERE id = ?1", id),
    };

    let active: Option<bool> = sqlx::query_scalar(sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    if active != Some(true) {
        return Err(CoreError::not_found(entity, id).into());
    }
    Ok(())
}

/// Re-reads a product without the active check (for receipts).
pub(crate) async fn fetch_product(conn: &mut SqliteConnection, product_id: &str) -> DbResult<Product> {
    let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);

    let product = sqlx::query_as(&sql)
        .bind(product_id)
        .fetch_one(&mut *conn)
        .await?;

    Ok(product)
}

/// Adds `delta` (positive or negative) to a product's running balance.
pub(crate) async fn adjust_product_balance(
    conn: &mut SqliteConnection,
    product_id: &str,
    delta: Quantity,
    now: DateTime<Utc>,
) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE products
        SET stock_actual = stock_actual + ?2,
            updated_at = ?3
        WHERE id = ?1
        "#,
    )
    .bind(product_id)
    .bind(delta)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Finds the lot keyed by `(product, lot_code, expiry)` or creates it empty.
///
/// A repeated delivery of the same lot merges into the existing row instead
/// of creating a duplicate.
pub(crate) async fn get_or_create_lot(
    conn: &mut SqliteConnection,
    product_id: &str,
    lot_code: &str,
    expiry_date: NaiveDate,
    now: DateTime<Utc>,
) -> DbResult<StockLot> {
    let sql = format!(
        "SELECT {} FROM stock_lots WHERE product_id = ?1 AND lot_code = ?2 AND expiry_date = ?3",
        LOT_COLUMNS
    );

    let existing: Option<StockLot> = sqlx::query_as(&sql)
        .bind(product_id)
        .bind(lot_code)
        .bind(expiry_date)
        .fetch_optional(&mut *conn)
        .await?;

    if let Some(lot) = existing {
        debug!(lot_id = %lot.id, lot_code = %lot_code, "Merging into existing lot");
        return Ok(lot);
    }

    let lot = StockLot {
        id: Uuid::new_v4().to_string(),
        product_id: product_id.to_string(),
        lot_code: lot_code.to_string(),
        expiry_date,
        available: Quantity::zero(),
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO stock_lots (
            id, product_id, lot_code, expiry_date, available, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&lot.id)
    .bind(&lot.product_id)
    .bind(&lot.lot_code)
    .bind(lot.expiry_date)
    .bind(lot.available)
    .bind(lot.created_at)
    .bind(lot.updated_at)
    .execute(&mut *conn)
    .await?;

    debug!(lot_id = %lot.id, lot_code = %lot_code, expiry = %expiry_date, "Lot created");
    Ok(lot)
}

/// Adds a received quantity to a lot.
pub(crate) async fn add_to_lot(
    conn: &mut SqliteConnection,
    lot_id: &str,
    quantity: Quantity,
    now: DateTime<Utc>,
) -> DbResult<()> {
    sqlx::query("UPDATE stock_lots SET available = available + ?2, updated_at = ?3 WHERE id = ?1")
        .bind(lot_id)
        .bind(quantity)
        .bind(now)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Re-reads a lot (for receipts).
pub(crate) async fn fetch_lot(conn: &mut SqliteConnection, lot_id: &str) -> DbResult<StockLot> {
    let sql = format!("SELECT {} FROM stock_lots WHERE id = ?1", LOT_COLUMNS);

    let lot = sqlx::query_as(&sql)
        .bind(lot_id)
        .fetch_one(&mut *conn)
        .await?;

    Ok(lot)
}

/// Lots of a product that still hold stock, in FEFO order.
pub(crate) async fn fefo_lots(conn: &mut SqliteConnection, product_id: &str) -> DbResult<Vec<StockLot>> {
    let sql = format!(
        "SELECT {} FROM stock_lots \
         WHERE product_id = ?1 AND available > 0 \
         ORDER BY expiry_date ASC, lot_code ASC, created_at ASC",
        LOT_COLUMNS
    );

    let lots = sqlx::query_as(&sql)
        .bind(product_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(lots)
}

/// All lots of a product (including drained ones), in FEFO order.
pub(crate) async fn all_lots(conn: &mut SqliteConnection, product_id: &str) -> DbResult<Vec<StockLot>> {
    let sql = format!(
        "SELECT {} FROM stock_lots \
         WHERE product_id = ?1 \
         ORDER BY expiry_date ASC, lot_code ASC, created_at ASC",
        LOT_COLUMNS
    );

    let lots = sqlx::query_as(&sql)
        .bind(product_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(lots)
}

/// Writes one planned draw back to its lot.
pub(crate) async fn apply_depletion(
    conn: &mut SqliteConnection,
    draw: &LotDepletion,
    now: DateTime<Utc>,
) -> DbResult<()> {
    sqlx::query("UPDATE stock_lots SET available = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(&draw.lot_id)
        .bind(draw.remaining)
        .bind(now)
        .execute(&mut *conn)
        .await?;

    debug!(
        lot_id = %draw.lot_id,
        taken = %draw.taken,
        remaining = %draw.remaining,
        "Lot depleted"
    );
    Ok(())
}
