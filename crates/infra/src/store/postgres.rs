//! Postgres-backed inventory store.
//!
//! Talks to the schema in `migrations/` directly through an SQLx pool.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `DuplicateSku` |
//! | Database (foreign key violation) | `23503` | `UnknownProduct` |
//! | Database (undefined table) | `42P01` | `ViewUnavailable` |
//! | Database (other) | Any other | `Rejected` |
//! | Decode / ColumnDecode / ColumnNotFound | N/A | `MalformedRow` |
//! | Io / Tls / PoolTimedOut / PoolClosed | N/A | `Connectivity` |
//! | Configuration (unparsable URL) | N/A | `Configuration` |
//!
//! Balances come back from the view as `NUMERIC(14, 2)` and are normalized,
//! so `6.00` is reported as `6` like the other backends.

use std::time::Duration;

use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use stockledger_core::{MovementId, ProductId};
use stockledger_inventory::{
    BalanceRow, MoveType, Movement, NewMovement, NewProduct, Product, Quantity, Sku,
    ensure_can_record,
};

use super::{InventoryStore, StoreError};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Postgres-backed store.
///
/// Movements are recorded inside a transaction that first locks the product
/// row (`SELECT ... FOR UPDATE`), so balance checks for the same product are
/// serialised.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build a pool without opening a connection; the first query connects.
    pub fn connect_lazy(
        database_url: &str,
        acquire_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(acquire_timeout)
            .connect_lazy(database_url)
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Apply the bundled schema migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Connectivity(format!("migration failed: {e}")))
    }
}

#[async_trait::async_trait]
impl InventoryStore for PostgresStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    #[instrument(skip(self), err)]
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("ping", e))?;
        Ok(())
    }

    #[instrument(skip(self, product), fields(sku = %product.sku), err)]
    async fn insert_product(&self, product: &NewProduct) -> Result<Product, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO products (sku, name, unit)
            VALUES ($1, $2, $3)
            RETURNING id, sku, name, unit, created_at
            "#,
        )
        .bind(product.sku.as_str())
        .bind(&product.name)
        .bind(&product.unit)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e).for_sku(&product.sku))?;

        product_from_row(&row)
    }

    #[instrument(skip(self), err)]
    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, sku, name, unit, created_at
            FROM products
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;

        rows.iter().map(product_from_row).collect()
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn product_balance(&self, product_id: ProductId) -> Result<Decimal, StoreError> {
        let row = sqlx::query("SELECT balance FROM stock_balance WHERE product_id = $1")
            .bind(product_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("product_balance", e))?;

        match row {
            Some(row) => row
                .try_get::<Decimal, _>("balance")
                .map(|b| b.normalize())
                .map_err(|e| map_sqlx_error("product_balance", e)),
            None => Err(StoreError::UnknownProduct(product_id)),
        }
    }

    #[instrument(
        skip(self, movement),
        fields(
            product_id = %movement.product_id,
            move_type = %movement.move_type,
            qty = %movement.qty
        ),
        err
    )]
    async fn record_move(&self, movement: &NewMovement) -> Result<Movement, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let locked = sqlx::query("SELECT id FROM products WHERE id = $1 FOR UPDATE")
            .bind(movement.product_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_product", e))?;

        if locked.is_none() {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::UnknownProduct(movement.product_id));
        }

        if movement.move_type.draws_down() {
            let available: Decimal =
                sqlx::query("SELECT balance FROM stock_balance WHERE product_id = $1")
                    .bind(movement.product_id.as_uuid())
                    .fetch_one(&mut *tx)
                    .await
                    .and_then(|row| row.try_get("balance"))
                    .map_err(|e| map_sqlx_error("read_balance", e))?;

            if let Err(shortfall) = ensure_can_record(movement.move_type, movement.qty, available) {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(StoreError::InsufficientStock {
                    available: shortfall.available,
                });
            }
        }

        let row = sqlx::query(
            r#"
            INSERT INTO stock_moves (product_id, move_type, qty, note)
            VALUES ($1, $2, $3, $4)
            RETURNING id, product_id, move_type, qty, note, created_at
            "#,
        )
        .bind(movement.product_id.as_uuid())
        .bind(movement.move_type.as_str())
        .bind(movement.qty.value())
        .bind(movement.note.as_deref())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_move", e).for_product(movement.product_id))?;

        let stored = movement_from_row(&row)?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;

        Ok(stored)
    }

    #[instrument(skip(self), err)]
    async fn recent_moves(&self, limit: usize) -> Result<Vec<Movement>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, move_type, qty, note, created_at
            FROM stock_moves
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("recent_moves", e))?;

        rows.iter().map(movement_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn list_balances(&self) -> Result<Vec<BalanceRow>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, sku, name, unit, balance
            FROM stock_balance
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_balances", e))?;

        rows.iter()
            .map(|row| {
                Ok(BalanceRow {
                    product_id: ProductId::from_uuid(get(row, "product_id")?),
                    sku: get(row, "sku")?,
                    name: get(row, "name")?,
                    unit: get(row, "unit")?,
                    balance: get::<Decimal>(row, "balance")?.normalize(),
                })
            })
            .collect()
    }
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column)
        .map_err(|e| StoreError::MalformedRow(format!("column {column}: {e}")))
}

fn product_from_row(row: &PgRow) -> Result<Product, StoreError> {
    let sku: String = get(row, "sku")?;
    Ok(Product {
        id: ProductId::from_uuid(get::<Uuid>(row, "id")?),
        sku: Sku::parse(&sku).map_err(|e| StoreError::MalformedRow(format!("column sku: {e}")))?,
        name: get(row, "name")?,
        unit: get(row, "unit")?,
        created_at: get(row, "created_at")?,
    })
}

fn movement_from_row(row: &PgRow) -> Result<Movement, StoreError> {
    let move_type: String = get(row, "move_type")?;
    let qty: Decimal = get(row, "qty")?;
    Ok(Movement {
        id: MovementId::from_uuid(get::<Uuid>(row, "id")?),
        product_id: ProductId::from_uuid(get::<Uuid>(row, "product_id")?),
        move_type: move_type
            .parse::<MoveType>()
            .map_err(|e| StoreError::MalformedRow(format!("column move_type: {e}")))?,
        qty: Quantity::new(qty).map_err(|e| StoreError::MalformedRow(format!("column qty: {e}")))?,
        note: get(row, "note")?,
        created_at: get(row, "created_at")?,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::DuplicateSku(String::new()),
                // Callers attach the SKU / product via `for_sku` / `for_product`.
                Some("23503") => StoreError::UnknownProduct(ProductId::from_uuid(Uuid::nil())),
                Some("42P01") => StoreError::ViewUnavailable(msg),
                _ => StoreError::Rejected(msg),
            }
        }
        sqlx::Error::Decode(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::ColumnNotFound(_) => StoreError::MalformedRow(format!("{operation}: {err}")),
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed => StoreError::Connectivity(format!("{operation}: {err}")),
        sqlx::Error::Configuration(_) => StoreError::Configuration(format!("{operation}: {err}")),
        _ => StoreError::Rejected(format!("sqlx error in {}: {}", operation, err)),
    }
}
