//! # Inventory Guard
//!
//! Validates and applies stock decrements for a set of line items
//! within the caller's unit of work.
//!
//! The guard never commits: a later failure in the same operation makes
//! the caller roll the whole unit of work back, so no partial decrement
//! can survive a failed sale creation.

use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use cafe_core::{validation, CoreError, CoreResult, SaleLine};

use crate::store::UnitOfWork;

/// One requested line of a new sale: which product, how many.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineRequest {
    /// Product reference (UUID).
    pub product_id: String,

    /// Requested quantity. Must be 1..=999.
    pub quantity: i64,
}

/// Reserves stock for every requested line inside `uow`.
///
/// Per line: `ProductNotFound` if the product is missing,
/// `InsufficientStock` if fewer units remain than requested. On success
/// the product's stock is decremented in the unit of work and a frozen
/// [`SaleLine`] snapshot (unit price, name, computed line total) is
/// returned in request order.
///
/// Lines are applied as they validate, so a product repeated across
/// two lines is checked against its already-decremented staged stock.
pub async fn reserve_stock(
    uow: &mut dyn UnitOfWork,
    items: &[LineRequest],
) -> CoreResult<Vec<SaleLine>> {
    let mut lines = Vec::with_capacity(items.len());

    for item in items {
        validation::validate_quantity(item.quantity)?;

        let mut product = uow
            .product(&item.product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(item.product_id.clone()))?;

        if !product.has_stock(item.quantity) {
            return Err(CoreError::InsufficientStock {
                name: product.name,
                available: product.stock,
                requested: item.quantity,
            });
        }

        let line_total = product.price().multiply_quantity(item.quantity);
        lines.push(SaleLine {
            product_id: product.id.clone(),
            quantity: item.quantity,
            unit_price_cents: product.price_cents,
            line_total_cents: line_total.cents(),
            name_snapshot: product.name.clone(),
        });

        product.stock -= item.quantity;
        product.updated_at = chrono::Utc::now();
        debug!(
            product_id = %product.id,
            quantity = item.quantity,
            remaining = product.stock,
            "stock reserved"
        );
        uow.update_product(&product).await?;
    }

    Ok(lines)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use cafe_core::Product;

    use super::*;
    use crate::memory::MemoryLedger;
    use crate::store::LedgerStore;

    fn product(id: &str, name: &str, price_cents: i64, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            name: name.to_string(),
            price_cents,
            stock,
            category_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn line(product_id: &str, quantity: i64) -> LineRequest {
        LineRequest {
            product_id: product_id.to_string(),
            quantity,
        }
    }

    #[tokio::test]
    async fn test_reserve_snapshots_and_decrements() {
        let store = MemoryLedger::new();
        store.seed_product(product("p-1", "Latte", 1000, 5)).await;
        store.seed_product(product("p-2", "Mocha", 2000, 3)).await;

        let mut uow = store.begin().await.unwrap();
        let lines = reserve_stock(&mut *uow, &[line("p-1", 2), line("p-2", 1)])
            .await
            .unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].name_snapshot, "Latte");
        assert_eq!(lines[0].line_total_cents, 2000);
        assert_eq!(lines[1].line_total_cents, 2000);

        assert_eq!(uow.product("p-1").await.unwrap().unwrap().stock, 3);
        assert_eq!(uow.product("p-2").await.unwrap().unwrap().stock, 2);
        uow.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_product_fails() {
        let store = MemoryLedger::new();
        let mut uow = store.begin().await.unwrap();

        let err = reserve_stock(&mut *uow, &[line("ghost", 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ProductNotFound(_)));
        uow.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_insufficient_stock_fails_with_numbers() {
        let store = MemoryLedger::new();
        store.seed_product(product("p-1", "Latte", 1000, 3)).await;

        let mut uow = store.begin().await.unwrap();
        let err = reserve_stock(&mut *uow, &[line("p-1", 5)])
            .await
            .unwrap_err();
        match err {
            CoreError::InsufficientStock {
                name,
                available,
                requested,
            } => {
                assert_eq!(name, "Latte");
                assert_eq!(available, 3);
                assert_eq!(requested, 5);
            }
            other => panic!("unexpected error: {other}"),
        }
        uow.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_repeated_product_checked_against_staged_stock() {
        let store = MemoryLedger::new();
        store.seed_product(product("p-1", "Latte", 1000, 3)).await;

        // 2 + 2 exceeds the 3 in stock even though each line alone fits.
        let mut uow = store.begin().await.unwrap();
        let err = reserve_stock(&mut *uow, &[line("p-1", 2), line("p-1", 2)])
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InsufficientStock { .. }));
        uow.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_quantity_rejected() {
        let store = MemoryLedger::new();
        store.seed_product(product("p-1", "Latte", 1000, 5)).await;

        let mut uow = store.begin().await.unwrap();
        let err = reserve_stock(&mut *uow, &[line("p-1", 0)])
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        uow.rollback().await.unwrap();
    }
}
