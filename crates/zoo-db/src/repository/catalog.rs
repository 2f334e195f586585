//! # Catalog Repository
//!
//! Reference data the transaction engine validates against: product types,
//! units, suppliers, products, exit types, habitats and animals.
//!
//! Records are soft-deleted with [`CatalogRepository::deactivate`]; the
//! engine treats an inactive record exactly like a missing one. Lookups
//! return `Ok(None)` for unknown ids.
//!
//! Product balances are never written here. A product starts at zero and
//! only the entry and exit processors change it.

use std::fmt;

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;
use zoo_core::request::NewProduct;
use zoo_core::validation::{validate_name, validate_new_product, validate_stock_minimo};
use zoo_core::{Animal, ExitType, Habitat, Product, ProductType, Quantity, Supplier, UnitOfMeasure};

use crate::error::{DbError, DbResult};

/// The soft-deletable catalog tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    ProductType,
    Unit,
    Supplier,
    Product,
    ExitType,
    Habitat,
    Animal,
}

impl CatalogKind {
    fn table(self) -> &'static str {
        match self {
            CatalogKind::ProductType => "product_types",
            CatalogKind::Unit => "units_of_measure",
            CatalogKind::Supplier => "suppliers",
            CatalogKind::Product => "products",
            CatalogKind::ExitType => "exit_types",
            CatalogKind::Habitat => "habitats",
            CatalogKind::Animal => "animals",
        }
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CatalogKind::ProductType => "Product type",
            CatalogKind::Unit => "Unit of measure",
            CatalogKind::Supplier => "Supplier",
            CatalogKind::Product => "Product",
            CatalogKind::ExitType => "Exit type",
            CatalogKind::Habitat => "Habitat",
            CatalogKind::Animal => "Animal",
        };
        f.write_str(s)
    }
}

/// Repository for reference catalog records.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    // =========================================================================
    // Product Types and Units
    // =========================================================================

    pub async fn create_product_type(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> DbResult<ProductType> {
        validate_name(name, "name", 100)?;

        let product_type = ProductType {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            description: description.map(str::to_string),
            is_active: true,
        };

        sqlx::query(
            "INSERT INTO product_types (id, name, description, is_active, created_at) VALUES (?1, ?2, ?3, 1, ?4)",
        )
        .bind(&product_type.id)
        .bind(&product_type.name)
        .bind(&product_type.description)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(product_type)
    }

    pub async fn get_product_type(&self, id: &str) -> DbResult<Option<ProductType>> {
        let row = sqlx::query_as(
            "SELECT id, name, description, is_active FROM product_types WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn create_unit(&self, name: &str, abbreviation: &str) -> DbResult<UnitOfMeasure> {
        validate_name(name, "name", 50)?;
        validate_name(abbreviation, "abbreviation", 10)?;

        let unit = UnitOfMeasure {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            abbreviation: abbreviation.trim().to_string(),
            is_active: true,
        };

        sqlx::query(
            "INSERT INTO units_of_measure (id, name, abbreviation, is_active, created_at) VALUES (?1, ?2, ?3, 1, ?4)",
        )
        .bind(&unit.id)
        .bind(&unit.name)
        .bind(&unit.abbreviation)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(unit)
    }

    pub async fn get_unit(&self, id: &str) -> DbResult<Option<UnitOfMeasure>> {
        let row = sqlx::query_as(
            "SELECT id, name, abbreviation, is_active FROM units_of_measure WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    // =========================================================================
    // Suppliers
    // =========================================================================

    pub async fn create_supplier(
        &self,
        name: &str,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> DbResult<Supplier> {
        validate_name(name, "name", 200)?;

        let supplier = Supplier {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            phone: phone.map(str::to_string),
            email: email.map(str::to_string),
            is_active: true,
        };

        debug!(name = %supplier.name, "Creating supplier");

        sqlx::query(
            "INSERT INTO suppliers (id, name, phone, email, is_active, created_at) VALUES (?1, ?2, ?3, ?4, 1, ?5)",
        )
        .bind(&supplier.id)
        .bind(&supplier.name)
        .bind(&supplier.phone)
        .bind(&supplier.email)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(supplier)
    }

    pub async fn get_supplier(&self, id: &str) -> DbResult<Option<Supplier>> {
        let row = sqlx::query_as(
            "SELECT id, name, phone, email, is_active FROM suppliers WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn list_active_suppliers(&self) -> DbResult<Vec<Supplier>> {
        let rows = sqlx::query_as(
            "SELECT id, name, phone, email, is_active FROM suppliers WHERE is_active = 1 ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Adds a product at zero stock.
    ///
    /// ## Returns
    /// * `Err(UniqueViolation)` - Name already used
    /// * `Err(ForeignKeyViolation)` - Unknown product type or unit
    pub async fn create_product(&self, request: &NewProduct) -> DbResult<Product> {
        validate_new_product(request)?;

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: request.name.trim().to_string(),
            description: request.description.clone(),
            product_type_id: request.product_type_id.clone(),
            unit_id: request.unit_id.clone(),
            stock_actual: Quantity::zero(),
            stock_minimo: request.stock_minimo,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(name = %product.name, "Creating product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, description, product_type_id, unit_id,
                stock_actual, stock_minimo, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.product_type_id)
        .bind(&product.unit_id)
        .bind(product.stock_actual)
        .bind(product.stock_minimo)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    pub async fn get_product(&self, id: &str) -> DbResult<Option<Product>> {
        let row = sqlx::query_as(
            r#"
            SELECT id, name, description, product_type_id, unit_id,
                   stock_actual, stock_minimo, is_active, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn list_active_products(&self) -> DbResult<Vec<Product>> {
        let rows = sqlx::query_as(
            r#"
            SELECT id, name, description, product_type_id, unit_id,
                   stock_actual, stock_minimo, is_active, created_at, updated_at
            FROM products
            WHERE is_active = 1
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Changes a product's reorder threshold.
    pub async fn set_stock_minimo(&self, id: &str, minimum: Quantity) -> DbResult<()> {
        validate_stock_minimo(minimum)?;

        let result = sqlx::query(
            "UPDATE products SET stock_minimo = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(minimum)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    // =========================================================================
    // Exit Types
    // =========================================================================

    pub async fn create_exit_type(&self, name: &str, description: Option<&str>) -> DbResult<ExitType> {
        validate_name(name, "name", 100)?;

        let exit_type = ExitType {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            description: description.map(str::to_string),
            is_active: true,
        };

        sqlx::query(
            "INSERT INTO exit_types (id, name, description, is_active, created_at) VALUES (?1, ?2, ?3, 1, ?4)",
        )
        .bind(&exit_type.id)
        .bind(&exit_type.name)
        .bind(&exit_type.description)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(exit_type)
    }

    pub async fn get_exit_type(&self, id: &str) -> DbResult<Option<ExitType>> {
        let row = sqlx::query_as(
            "SELECT id, name, description, is_active FROM exit_types WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn list_active_exit_types(&self) -> DbResult<Vec<ExitType>> {
        let rows = sqlx::query_as(
            "SELECT id, name, description, is_active FROM exit_types WHERE is_active = 1 ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // =========================================================================
    // Habitats and Animals
    // =========================================================================

    pub async fn create_habitat(&self, name: &str) -> DbResult<Habitat> {
        validate_name(name, "name", 100)?;

        let habitat = Habitat {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            is_active: true,
        };

        sqlx::query("INSERT INTO habitats (id, name, is_active, created_at) VALUES (?1, ?2, 1, ?3)")
            .bind(&habitat.id)
            .bind(&habitat.name)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(habitat)
    }

    pub async fn get_habitat(&self, id: &str) -> DbResult<Option<Habitat>> {
        let row = sqlx::query_as("SELECT id, name, is_active FROM habitats WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    pub async fn list_active_habitats(&self) -> DbResult<Vec<Habitat>> {
        let rows = sqlx::query_as(
            "SELECT id, name, is_active FROM habitats WHERE is_active = 1 ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn create_animal(&self, name: &str, habitat_id: Option<&str>) -> DbResult<Animal> {
        validate_name(name, "name", 100)?;

        let animal = Animal {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            habitat_id: habitat_id.map(str::to_string),
            is_active: true,
        };

        sqlx::query(
            "INSERT INTO animals (id, name, habitat_id, is_active, created_at) VALUES (?1, ?2, ?3, 1, ?4)",
        )
        .bind(&animal.id)
        .bind(&animal.name)
        .bind(&animal.habitat_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(animal)
    }

    pub async fn get_animal(&self, id: &str) -> DbResult<Option<Animal>> {
        let row = sqlx::query_as("SELECT id, name, habitat_id, is_active FROM animals WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    pub async fn list_active_animals(&self) -> DbResult<Vec<Animal>> {
        let rows = sqlx::query_as(
            "SELECT id, name, habitat_id, is_active FROM animals WHERE is_active = 1 ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // =========================================================================
    // Soft Delete
    // =========================================================================

    /// Soft-deletes a catalog record.
    ///
    /// History rows keep pointing at it; new entries, exits and tasks
    /// reject it with `ReferenceNotFound`.
    pub async fn deactivate(&self, kind: CatalogKind, id: &str) -> DbResult<()> {
        debug!(kind = %kind, id = %id, "Deactivating");

        let sql = format!("UPDATE {} SET is_active = 0 WHERE id = ?1", kind.table());
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(kind.to_string(), id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
