use std::fmt;

use serde::Serialize;
use serde_json::Value;

use super::error::InventoryError;

/// A row of the `libros` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Book {
    pub id: i32,
    #[serde(rename = "nombre")]
    #[sqlx(rename = "nombre")]
    pub name: String,
    #[serde(rename = "cantidad_disponible")]
    #[sqlx(rename = "cantidad_disponible")]
    pub available: i32,
}

/// A title and the stock it is seeded with when absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: &'static str,
    pub quantity: i32,
}

/// Titles inserted at start-up unless a row with the same name exists.
pub const STARTER_CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        name: "Cien Años de Soledad",
        quantity: 15,
    },
    CatalogEntry {
        name: "1984",
        quantity: 8,
    },
    CatalogEntry {
        name: "El Principito",
        quantity: 25,
    },
    CatalogEntry {
        name: "Don Quijote de la Mancha",
        quantity: 5,
    },
    CatalogEntry {
        name: "Un Mundo Feliz",
        quantity: 12,
    },
];

/// Identifier of a book; always positive.
///
/// `libros.id` is a `SERIAL`, so an identifier that is not a positive `i32`
/// cannot name a row. Such values fail with `BookNotFound` without a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BookId(i32);

impl BookId {
    pub fn new(value: i64) -> Result<Self, InventoryError> {
        positive_i32(value)
            .map(Self)
            .ok_or_else(|| InventoryError::BookNotFound(value.to_string()))
    }

    pub fn from_json(value: &Value) -> Result<Self, InventoryError> {
        json_integer(value)
            .and_then(positive_i32)
            .map(Self)
            .ok_or_else(|| {
                let requested = match value {
                    Value::String(text) => text.trim().to_string(),
                    other => other.to_string(),
                };
                InventoryError::BookNotFound(requested)
            })
    }

    pub fn get(self) -> i32 {
        self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Number of units requested in a purchase; always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantity(i32);

impl Quantity {
    pub fn new(value: i64) -> Result<Self, InventoryError> {
        positive_i32(value)
            .map(Self)
            .ok_or(InventoryError::InvalidQuantity)
    }

    /// Accepts integers, integral floats (`3.0`) and decimal strings (`" 3 "`).
    pub fn from_json(value: &Value) -> Result<Self, InventoryError> {
        json_integer(value)
            .and_then(positive_i32)
            .map(Self)
            .ok_or(InventoryError::InvalidQuantity)
    }

    pub fn get(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Outcome of a committed purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseReceipt {
    pub book_id: BookId,
    pub name: String,
    pub quantity: Quantity,
    pub remaining: i32,
}

fn positive_i32(value: i64) -> Option<i32> {
    i32::try_from(value).ok().filter(|value| *value > 0)
}

fn json_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => match number.as_i64() {
            Some(integer) => Some(integer),
            None => {
                let float = number.as_f64()?;
                if !float.is_finite() || float.fract() != 0.0 {
                    return None;
                }
                // Saturating cast; out-of-range values fail the i32 check later.
                Some(float as i64)
            }
        },
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}
