use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use bookstore_http::AppError;
use serde::{Deserialize, Serialize};

use super::error::InventoryError;
use super::models::{Book, BookId, PurchaseReceipt, Quantity};
use super::store::InventoryStore;

type SharedStore = Arc<dyn InventoryStore>;

/// HTTP routes of the books module, relative to `/api`.
pub fn router(store: SharedStore) -> Router {
    Router::new()
        .route("/books", get(list_books))
        .route("/purchase", post(purchase))
        .with_state(store)
}

/// Body of `POST /api/purchase`. Fields stay untyped so that wrong types
/// surface as validation errors rather than extractor rejections.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    #[serde(default)]
    pub book_id: serde_json::Value,
    #[serde(default)]
    pub quantity: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseResponse {
    pub success: bool,
    pub message: String,
    pub book_id: i32,
    pub quantity: i32,
    pub remaining: i32,
}

impl From<PurchaseReceipt> for PurchaseResponse {
    fn from(receipt: PurchaseReceipt) -> Self {
        Self {
            success: true,
            message: format!(
                "purchased {} unit(s) of \"{}\"; {} left",
                receipt.quantity, receipt.name, receipt.remaining
            ),
            book_id: receipt.book_id.get(),
            quantity: receipt.quantity.get(),
            remaining: receipt.remaining,
        }
    }
}

impl From<InventoryError> for AppError {
    fn from(error: InventoryError) -> Self {
        match error {
            InventoryError::InvalidQuantity => AppError::validation(error.to_string()),
            InventoryError::BookNotFound(_) => {
                AppError::not_found(error.to_string()).with_code("book_not_found")
            }
            InventoryError::InsufficientStock { .. } => {
                AppError::bad_request(error.to_string()).with_code("insufficient_stock")
            }
            InventoryError::Storage(_) => AppError::Internal(anyhow::Error::new(error)),
        }
    }
}

async fn list_books(State(store): State<SharedStore>) -> Result<Json<Vec<Book>>, AppError> {
    let books = store.list_books().await?;
    Ok(Json(books))
}

async fn purchase(
    State(store): State<SharedStore>,
    payload: Result<Json<PurchaseRequest>, JsonRejection>,
) -> Result<Json<PurchaseResponse>, AppError> {
    let Json(request) = payload
        .map_err(|rejection| AppError::bad_request(rejection.body_text()).with_code("invalid_body"))?;

    // Both checks run before any storage access; an impossible bookId is
    // already a 404 here.
    let quantity = Quantity::from_json(&request.quantity)?;
    let book_id = BookId::from_json(&request.book_id)?;

    let receipt = store.purchase(book_id, quantity).await?;

    Ok(Json(PurchaseResponse::from(receipt)))
}
