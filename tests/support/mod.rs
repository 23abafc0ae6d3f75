//! Shared helpers for the HTTP-level tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use bookstore_app::modules::books::{
    error::InventoryError,
    models::{Book, BookId, CatalogEntry, PurchaseReceipt, Quantity},
    store::InventoryStore,
    BooksModule,
};
use bookstore_kernel::{settings::Settings, ModuleRegistry};
use tokio::sync::Mutex;
use tower::ServiceExt;

/// In-memory `InventoryStore` with call accounting, an outage switch and an
/// optional delay before each purchase.
#[derive(Default)]
pub struct MemoryInventory {
    books: Mutex<Vec<Book>>,
    calls: AtomicUsize,
    unavailable: bool,
    purchase_delay: Option<Duration>,
}

impl MemoryInventory {
    pub fn with_books(books: &[(&str, i32)]) -> Self {
        let books = books
            .iter()
            .enumerate()
            .map(|(index, (name, available))| Book {
                id: index as i32 + 1,
                name: name.to_string(),
                available: *available,
            })
            .collect();

        Self {
            books: Mutex::new(books),
            ..Self::default()
        }
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn with_purchase_delay(mut self, delay: Duration) -> Self {
        self.purchase_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn available(&self, id: i32) -> Option<i32> {
        self.books
            .lock()
            .await
            .iter()
            .find(|book| book.id == id)
            .map(|book| book.available)
    }

    fn enter(&self) -> Result<(), InventoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(InventoryError::Storage(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl InventoryStore for MemoryInventory {
    async fn list_books(&self) -> Result<Vec<Book>, InventoryError> {
        self.enter()?;
        let mut books = self.books.lock().await.clone();
        books.sort_by_key(|book| book.id);
        Ok(books)
    }

    async fn seed(&self, catalog: &[CatalogEntry]) -> Result<u64, InventoryError> {
        self.enter()?;
        let mut books = self.books.lock().await;
        let mut inserted = 0;
        for entry in catalog {
            if books.iter().any(|book| book.name == entry.name) {
                continue;
            }
            let id = books.iter().map(|book| book.id).max().unwrap_or(0) + 1;
            books.push(Book {
                id,
                name: entry.name.to_string(),
                available: entry.quantity,
            });
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn purchase(
        &self,
        book_id: BookId,
        quantity: Quantity,
    ) -> Result<PurchaseReceipt, InventoryError> {
        self.enter()?;
        if let Some(delay) = self.purchase_delay {
            tokio::time::sleep(delay).await;
        }
        let mut books = self.books.lock().await;
        let book = books
            .iter_mut()
            .find(|book| book.id == book_id.get())
            .ok_or_else(|| InventoryError::book_not_found(book_id))?;

        if book.available < quantity.get() {
            return Err(InventoryError::InsufficientStock {
                book_id,
                name: book.name.clone(),
                requested: quantity.get(),
                available: book.available,
            });
        }

        book.available -= quantity.get();
        Ok(PurchaseReceipt {
            book_id,
            name: book.name.clone(),
            quantity,
            remaining: book.available,
        })
    }
}

/// The full application router with the books module over `store`.
pub fn app_router(store: Arc<MemoryInventory>) -> Router {
    let mut registry = ModuleRegistry::new();
    registry.register(Arc::new(BooksModule::new(store)));
    bookstore_http::build_router(&registry, &Settings::default())
}

pub async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if body.is_some() {
        request = request.header(header::CONTENT_TYPE, "application/json");
    }
    let request = request
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

pub async fn purchase(router: &Router, body: &str) -> (StatusCode, serde_json::Value) {
    send(router, Method::POST, "/api/purchase", Some(body)).await
}
