//! # Seed Data Generator
//!
//! Populates a database with a small zoo for development: catalog records,
//! a few deliveries spread over several lots, and today's keeper tasks.
//!
//! ## Usage
//! ```bash
//! # Seed ./zoo_inventory.db (or $ZOO_DATABASE_PATH)
//! cargo run -p zoo-db --bin seed
//!
//! # Specify database path
//! cargo run -p zoo-db --bin seed -- --db ./data/zoo.db
//!
//! # With engine logs
//! RUST_LOG=zoo_db=debug cargo run -p zoo-db --bin seed
//! ```
//!
//! Seeding is skipped when the database already holds products.

use std::env;

use chrono::{Days, NaiveDate, Utc};
use tracing_subscriber::EnvFilter;
use zoo_core::request::{
    EntryLineRequest, EntryRequest, ExitLineRequest, ExitRequest, NewProduct, NewTask,
};
use zoo_core::{Quantity, TaskKind, MANUAL_EXIT_TYPE_ID};
use zoo_db::{Database, DbConfig};

const SEED_USER: &str = "seed";

/// (name, unit abbreviation, reorder threshold)
const FEEDS: &[(&str, &str, i64)] = &[
    ("Alfalfa hay", "kg", 200),
    ("Beef (raw)", "kg", 40),
    ("Whole fish", "kg", 30),
    ("Fruit mix", "kg", 25),
    ("Insect larvae", "kg", 5),
];

/// (name, unit abbreviation, reorder threshold)
const MEDICINES: &[(&str, &str, i64)] = &[
    ("Ivermectin 1%", "ml", 100),
    ("Vitamin E supplement", "ml", 50),
];

/// (habitat, animals)
const HABITATS: &[(&str, &[&str])] = &[
    ("Savanna", &["Leo", "Nala", "Kibo"]),
    ("Aquarium", &["Pingu", "Marina"]),
    ("Rainforest", &["Coco", "Zazu"]),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,zoo_db=info,sqlx=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut config = DbConfig::from_env()?;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = args[i + 1].clone().into();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Zoo Inventory Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: $ZOO_DATABASE_PATH or ./zoo_inventory.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Zoo Inventory Seed Data Generator");
    println!("====================================");
    println!("Database: {}", config.database_path.display());
    println!();

    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.catalog().list_active_products().await?;
    if !existing.is_empty() {
        println!("⚠ Database already has {} products", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let catalog = db.catalog();

    // Catalog
    println!();
    println!("Creating catalog...");

    let food = catalog.create_product_type("Food", Some("Animal feed")).await?;
    let medicine = catalog
        .create_product_type("Medicine", Some("Veterinary supplies"))
        .await?;
    let kg = catalog.create_unit("Kilogram", "kg").await?;
    let ml = catalog.create_unit("Millilitre", "ml").await?;

    let supplier = catalog
        .create_supplier("Green Pastures Feed Co.", Some("555-0100"), None)
        .await?;
    let vet_supplier = catalog
        .create_supplier("VetSupply Ltd.", None, Some("orders@vetsupply.example"))
        .await?;

    let mut feed_ids = Vec::new();
    for (name, unit, minimum) in FEEDS {
        let unit_id = if *unit == "kg" { &kg.id } else { &ml.id };
        let product = catalog
            .create_product(&NewProduct {
                name: name.to_string(),
                description: None,
                product_type_id: food.id.clone(),
                unit_id: unit_id.clone(),
                stock_minimo: Quantity::from_units(*minimum),
            })
            .await?;
        feed_ids.push(product.id);
    }

    let mut medicine_ids = Vec::new();
    for (name, unit, minimum) in MEDICINES {
        let unit_id = if *unit == "kg" { &kg.id } else { &ml.id };
        let product = catalog
            .create_product(&NewProduct {
                name: name.to_string(),
                description: None,
                product_type_id: medicine.id.clone(),
                unit_id: unit_id.clone(),
                stock_minimo: Quantity::from_units(*minimum),
            })
            .await?;
        medicine_ids.push(product.id);
    }

    let mut animals = Vec::new();
    let mut habitats = Vec::new();
    for (habitat_name, names) in HABITATS {
        let habitat = catalog.create_habitat(habitat_name).await?;
        for name in names.iter() {
            animals.push(catalog.create_animal(name, Some(&habitat.id)).await?);
        }
        habitats.push(habitat);
    }

    println!(
        "✓ {} products, {} habitats, {} animals",
        feed_ids.len() + medicine_ids.len(),
        habitats.len(),
        animals.len()
    );

    // Deliveries: three lots per feed, one month of expiry apart
    println!();
    println!("Receiving deliveries...");

    let today = Utc::now().date_naive();
    let start = std::time::Instant::now();

    for (month, batch) in ["A", "B", "C"].iter().enumerate() {
        let lines = feed_ids
            .iter()
            .enumerate()
            .map(|(idx, product_id)| EntryLineRequest {
                product_id: product_id.clone(),
                quantity: Quantity::from_units(60 + (idx as i64 * 37 + month as i64 * 13) % 150),
                expiry_date: expiry(today, 30 * (month as u64 + 1)),
                lot_code: format!("F{}-{:02}", batch, idx + 1),
            })
            .collect();

        db.entries()
            .create_entry(
                SEED_USER,
                &EntryRequest {
                    supplier_id: supplier.id.clone(),
                    lines,
                },
            )
            .await?;
    }

    let lines = medicine_ids
        .iter()
        .enumerate()
        .map(|(idx, product_id)| EntryLineRequest {
            product_id: product_id.clone(),
            quantity: Quantity::from_units(120),
            expiry_date: expiry(today, 365),
            lot_code: format!("VET-{:03}", idx + 1),
        })
        .collect();
    db.entries()
        .create_entry(
            SEED_USER,
            &EntryRequest {
                supplier_id: vet_supplier.id.clone(),
                lines,
            },
        )
        .await?;

    // One manual exit so the history isn't empty
    db.exits()
        .create_exit(
            SEED_USER,
            &ExitRequest {
                exit_type_id: MANUAL_EXIT_TYPE_ID.to_string(),
                lines: vec![ExitLineRequest {
                    product_id: feed_ids[0].clone(),
                    quantity: Quantity::from_units(75),
                    animal_id: None,
                    habitat_id: Some(habitats[0].id.clone()),
                }],
            },
        )
        .await?;

    println!("✓ Deliveries recorded in {:?}", start.elapsed());

    // Today's tasks
    println!();
    println!("Scheduling tasks...");

    let tasks = db.tasks();
    for animal in &animals {
        tasks
            .create(&NewTask {
                title: format!("Feed {}", animal.name),
                description: None,
                kind: TaskKind::Feeding,
                animal_id: Some(animal.id.clone()),
                habitat_id: None,
                assigned_user_id: None,
                scheduled_for: today,
            })
            .await?;
    }
    tasks
        .create(&NewTask {
            title: "Deworm savanna group".to_string(),
            description: Some("Ivermectin, weight-based dose".to_string()),
            kind: TaskKind::Treatment,
            animal_id: None,
            habitat_id: Some(habitats[0].id.clone()),
            assigned_user_id: None,
            scheduled_for: today,
        })
        .await?;
    tasks
        .create(&NewTask {
            title: "Clean aquarium filters".to_string(),
            description: None,
            kind: TaskKind::General,
            animal_id: None,
            habitat_id: Some(habitats[1].id.clone()),
            assigned_user_id: None,
            scheduled_for: today,
        })
        .await?;

    let pending = tasks.list_pending(today).await?;
    println!("✓ {} tasks pending today", pending.len());

    // Summary
    println!();
    println!("Balances:");
    for product in db.catalog().list_active_products().await? {
        println!("  {:<24} {:>10}", product.name, product.stock_actual);
    }

    let low = db.balances().low_stock().await?;
    if !low.is_empty() {
        println!();
        println!("Low stock:");
        for product in &low {
            println!(
                "  {:<24} {:>10} (minimum {})",
                product.name, product.stock_actual, product.stock_minimo
            );
        }
    }

    let drift = db.balances().reconcile().await?;
    if !drift.is_empty() {
        eprintln!("✗ {} products drifted from their lots", drift.len());
    }

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

fn expiry(today: NaiveDate, days: u64) -> NaiveDate {
    today.checked_add_days(Days::new(days)).unwrap_or(today)
}
