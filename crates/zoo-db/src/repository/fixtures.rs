//! Test fixtures: a seeded catalog and short-hand request builders.

use chrono::NaiveDate;
use zoo_core::request::{EntryLineRequest, EntryRequest, ExitLineRequest, ExitRequest, NewProduct};
use zoo_core::{Animal, Habitat, Product, Quantity, Supplier, MANUAL_EXIT_TYPE_ID};

use crate::{Database, DbConfig};

pub const USER: &str = "keeper-1";

pub struct Zoo {
    pub db: Database,
    pub supplier: Supplier,
    pub hay: Product,
    pub meat: Product,
    pub lion: Animal,
    pub savanna: Habitat,
}

pub async fn zoo() -> Zoo {
    zoo_with(DbConfig::in_memory()).await
}

pub async fn zoo_with(config: DbConfig) -> Zoo {
    let db = Database::new(config).await.unwrap();
    let catalog = db.catalog();

    let food = catalog.create_product_type("Food", None).await.unwrap();
    let kg = catalog.create_unit("Kilogram", "kg").await.unwrap();
    let supplier = catalog
        .create_supplier("Acme Feed", Some("555-0100"), None)
        .await
        .unwrap();

    let hay = catalog
        .create_product(&NewProduct {
            name: "Hay".to_string(),
            description: None,
            product_type_id: food.id.clone(),
            unit_id: kg.id.clone(),
            stock_minimo: Quantity::from_units(20),
        })
        .await
        .unwrap();
    let meat = catalog
        .create_product(&NewProduct {
            name: "Meat".to_string(),
            description: None,
            product_type_id: food.id,
            unit_id: kg.id,
            stock_minimo: Quantity::from_units(5),
        })
        .await
        .unwrap();

    let savanna = catalog.create_habitat("Savanna").await.unwrap();
    let lion = catalog.create_animal("Leo", Some(&savanna.id)).await.unwrap();

    Zoo {
        db,
        supplier,
        hay,
        meat,
        lion,
        savanna,
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn units(n: i64) -> Quantity {
    Quantity::from_units(n)
}

pub fn lot_line(product: &Product, qty: i64, lot_code: &str, expiry: NaiveDate) -> EntryLineRequest {
    EntryLineRequest {
        product_id: product.id.clone(),
        quantity: units(qty),
        expiry_date: expiry,
        lot_code: lot_code.to_string(),
    }
}

impl Zoo {
    pub fn entry(&self, lines: Vec<EntryLineRequest>) -> EntryRequest {
        EntryRequest {
            supplier_id: self.supplier.id.clone(),
            lines,
        }
    }

    /// A manual exit line toward the lion.
    pub fn to_lion(&self, product: &Product, qty: i64) -> ExitLineRequest {
        ExitLineRequest {
            product_id: product.id.clone(),
            quantity: units(qty),
            animal_id: Some(self.lion.id.clone()),
            habitat_id: None,
        }
    }

    pub fn manual_exit(&self, lines: Vec<ExitLineRequest>) -> ExitRequest {
        ExitRequest {
            exit_type_id: MANUAL_EXIT_TYPE_ID.to_string(),
            lines,
        }
    }

    /// Receives hay in three lots: L1 100 (Jan), L2 50 (Feb), L3 80 (Mar).
    pub async fn stock_hay_three_lots(&self) {
        let request = self.entry(vec![
            lot_line(&self.hay, 100, "L1", date(2025, 1, 1)),
            lot_line(&self.hay, 50, "L2", date(2025, 2, 1)),
            lot_line(&self.hay, 80, "L3", date(2025, 3, 1)),
        ]);
        self.db.entries().create_entry(USER, &request).await.unwrap();
    }

    pub async fn balance(&self, product: &Product) -> Quantity {
        self.db.balances().balance(&product.id).await.unwrap().unwrap()
    }

    /// Lot balances by lot code, FEFO order.
    pub async fn lots(&self, product: &Product) -> Vec<(String, Quantity)> {
        self.db
            .balances()
            .lots_for_product(&product.id)
            .await
            .unwrap()
            .into_iter()
            .map(|l| (l.lot_code, l.available))
            .collect()
    }

    /// Asserts balance == Σ lots for every product.
    pub async fn assert_ledger_consistent(&self) {
        let drift = self.db.balances().reconcile().await.unwrap();
        assert!(drift.is_empty(), "ledger drifted: {drift:?}");
    }
}
