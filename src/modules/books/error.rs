use thiserror::Error;

use super::models::BookId;

/// Failures of inventory reads, seeding and purchases.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("quantity must be a positive integer")]
    InvalidQuantity,

    /// Holds the identifier as the caller sent it, which may not be a valid `BookId`.
    #[error("book {0} does not exist")]
    BookNotFound(String),

    #[error("insufficient stock for \"{name}\": requested {requested}, available {available}")]
    InsufficientStock {
        book_id: BookId,
        name: String,
        requested: i32,
        available: i32,
    },

    #[error("inventory storage failed")]
    Storage(#[from] sqlx::Error),
}

impl InventoryError {
    pub fn book_not_found(book_id: BookId) -> Self {
        Self::BookNotFound(book_id.to_string())
    }
}
