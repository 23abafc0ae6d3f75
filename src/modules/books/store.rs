//! Book inventory persistence.
//!
//! `PgInventoryStore::purchase` is the only code path that changes stock. It
//! reads the target row with `SELECT ... FOR UPDATE` inside a transaction, so
//! concurrent purchases of the same book are serialized by PostgreSQL while
//! purchases of different books never wait on each other. The lock is held
//! by the database, not the process, so it also covers multiple replicas.

use async_trait::async_trait;
use sqlx::PgPool;

use super::error::InventoryError;
use super::models::{Book, BookId, CatalogEntry, PurchaseReceipt, Quantity};

/// Storage seam for the books module.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// All books ordered by id.
    async fn list_books(&self) -> Result<Vec<Book>, InventoryError>;

    /// Insert catalog entries whose name is not present yet; returns how many
    /// rows were inserted. Existing rows keep their current stock.
    async fn seed(&self, catalog: &[CatalogEntry]) -> Result<u64, InventoryError>;

    /// Decrement the stock of `book_id` by `quantity`, or fail without
    /// changing anything.
    async fn purchase(
        &self,
        book_id: BookId,
        quantity: Quantity,
    ) -> Result<PurchaseReceipt, InventoryError>;
}

/// PostgreSQL implementation over the `libros` table.
#[derive(Clone)]
pub struct PgInventoryStore {
    pool: PgPool,
}

impl PgInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InventoryStore for PgInventoryStore {
    async fn list_books(&self) -> Result<Vec<Book>, InventoryError> {
        let books = sqlx::query_as::<_, Book>(
            "SELECT id, nombre, cantidad_disponible FROM libros ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    async fn seed(&self, catalog: &[CatalogEntry]) -> Result<u64, InventoryError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for entry in catalog {
            inserted += sqlx::query(
                r#"
                INSERT INTO libros (nombre, cantidad_disponible)
                VALUES ($1, $2)
                ON CONFLICT (nombre) DO NOTHING
                "#,
            )
            .bind(entry.name)
            .bind(entry.quantity)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        tx.commit().await?;

        tracing::info!(
            inserted,
            catalog_size = catalog.len(),
            "inventory catalog seeded"
        );

        Ok(inserted)
    }

    #[tracing::instrument(skip_all, fields(book_id = %book_id, quantity = %quantity))]
    async fn purchase(
        &self,
        book_id: BookId,
        quantity: Quantity,
    ) -> Result<PurchaseReceipt, InventoryError> {
        // Dropping `tx` on an early `?` return rolls back and hands the
        // connection back to the pool.
        let mut tx = self.pool.begin().await?;

        let row: Option<(String, i32)> = sqlx::query_as(
            "SELECT nombre, cantidad_disponible FROM libros WHERE id = $1 FOR UPDATE",
        )
        .bind(book_id.get())
        .fetch_optional(&mut *tx)
        .await?;

        let Some((name, available)) = row else {
            tx.rollback().await?;
            tracing::warn!("purchase rejected: unknown book");
            return Err(InventoryError::book_not_found(book_id));
        };

        if available < quantity.get() {
            tx.rollback().await?;
            tracing::warn!(available, "purchase rejected: insufficient stock");
            return Err(InventoryError::InsufficientStock {
                book_id,
                name,
                requested: quantity.get(),
                available,
            });
        }

        let remaining = available - quantity.get();

        sqlx::query("UPDATE libros SET cantidad_disponible = $1 WHERE id = $2")
            .bind(remaining)
            .bind(book_id.get())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(remaining, "purchase committed");

        Ok(PurchaseReceipt {
            book_id,
            name,
            quantity,
            remaining,
        })
    }
}
