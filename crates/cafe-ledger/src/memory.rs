//! # In-Memory Ledger Store
//!
//! The shipped `LedgerStore` implementation: a table set behind a
//! `tokio::sync::Mutex`.
//!
//! ## Transaction Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   MemoryLedger Transactions                             │
//! │                                                                         │
//! │  begin()                                                               │
//! │    ├── takes the OWNED mutex guard (held for the whole transaction)    │
//! │    └── clones the committed tables into a staged working copy          │
//! │                                                                         │
//! │  reads/writes ──► staged copy only                                     │
//! │                                                                         │
//! │  commit()   ──► staged copy replaces the committed tables              │
//! │  rollback() ──► staged copy is dropped                                 │
//! │                                                                         │
//! │  Holding the lock serializes transactions completely: the second of    │
//! │  two concurrent card debits always observes the first one's committed  │
//! │  balance, so a balance can never be spent twice.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Whole-table cloning is obviously not how a SQL store would do this;
//! it is the simplest implementation that gives the engine the exact
//! isolation contract it needs, and it doubles as the test harness.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use cafe_core::{Customer, Product, RechargeTransaction, Sale};

use crate::error::{StoreError, StoreResult};
use crate::store::{LedgerStore, UnitOfWork};

// =============================================================================
// Tables
// =============================================================================

/// The committed state: one map per entity, keyed by id.
#[derive(Debug, Default, Clone)]
struct Tables {
    products: HashMap<String, Product>,
    customers: HashMap<String, Customer>,
    sales: HashMap<String, Sale>,
    recharges: HashMap<String, RechargeTransaction>,
}

// =============================================================================
// MemoryLedger
// =============================================================================

/// In-memory transactional ledger store.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a product directly into committed state (fixture setup).
    ///
    /// Bypasses the unit of work; do not call while a transaction is
    /// open on the same store.
    pub async fn seed_product(&self, product: Product) {
        self.tables
            .lock()
            .await
            .products
            .insert(product.id.clone(), product);
    }

    /// Inserts a customer directly into committed state (fixture setup).
    pub async fn seed_customer(&self, customer: Customer) {
        self.tables
            .lock()
            .await
            .customers
            .insert(customer.id.clone(), customer);
    }

    /// Reads a product from committed state (assertions).
    pub async fn committed_product(&self, id: &str) -> Option<Product> {
        self.tables.lock().await.products.get(id).cloned()
    }

    /// Reads a customer from committed state (assertions).
    pub async fn committed_customer(&self, id: &str) -> Option<Customer> {
        self.tables.lock().await.customers.get(id).cloned()
    }

    /// Reads a sale from committed state (assertions).
    pub async fn committed_sale(&self, id: &str) -> Option<Sale> {
        self.tables.lock().await.sales.get(id).cloned()
    }

    /// Reads a recharge transaction from committed state (assertions).
    pub async fn committed_recharge(&self, id: &str) -> Option<RechargeTransaction> {
        self.tables.lock().await.recharges.get(id).cloned()
    }

    /// Number of committed sales.
    pub async fn sale_count(&self) -> usize {
        self.tables.lock().await.sales.len()
    }

    /// Number of committed recharge transactions.
    pub async fn recharge_count(&self) -> usize {
        self.tables.lock().await.recharges.len()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let guard = self.tables.clone().lock_owned().await;
        let staged = guard.clone();
        debug!("ledger transaction opened");
        Ok(Box::new(MemoryUnitOfWork { guard, staged }))
    }
}

// =============================================================================
// MemoryUnitOfWork
// =============================================================================

/// One open transaction against a [`MemoryLedger`].
///
/// Owns the store lock for its whole lifetime; dropping without commit
/// is a rollback.
struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<Tables>,
    staged: Tables,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn product(&mut self, id: &str) -> StoreResult<Option<Product>> {
        Ok(self.staged.products.get(id).cloned())
    }

    async fn customer(&mut self, id: &str) -> StoreResult<Option<Customer>> {
        Ok(self.staged.customers.get(id).cloned())
    }

    async fn sale(&mut self, id: &str) -> StoreResult<Option<Sale>> {
        Ok(self.staged.sales.get(id).cloned())
    }

    async fn recharge(&mut self, id: &str) -> StoreResult<Option<RechargeTransaction>> {
        Ok(self.staged.recharges.get(id).cloned())
    }

    async fn insert_sale(&mut self, sale: &Sale) -> StoreResult<()> {
        if self.staged.sales.contains_key(&sale.id) {
            return Err(StoreError::duplicate("Sale", &sale.id));
        }
        debug!(sale_id = %sale.id, total = sale.total_cents, "staging sale insert");
        self.staged.sales.insert(sale.id.clone(), sale.clone());
        Ok(())
    }

    async fn insert_recharge(&mut self, tx: &RechargeTransaction) -> StoreResult<()> {
        if self.staged.recharges.contains_key(&tx.id) {
            return Err(StoreError::duplicate("RechargeTransaction", &tx.id));
        }
        debug!(recharge_id = %tx.id, amount = tx.amount_cents, "staging recharge insert");
        self.staged.recharges.insert(tx.id.clone(), tx.clone());
        Ok(())
    }

    async fn update_product(&mut self, product: &Product) -> StoreResult<()> {
        if !self.staged.products.contains_key(&product.id) {
            return Err(StoreError::not_found("Product", &product.id));
        }
        debug!(product_id = %product.id, stock = product.stock, "staging product update");
        self.staged
            .products
            .insert(product.id.clone(), product.clone());
        Ok(())
    }

    async fn update_customer(&mut self, customer: &Customer) -> StoreResult<()> {
        if !self.staged.customers.contains_key(&customer.id) {
            return Err(StoreError::not_found("Customer", &customer.id));
        }
        debug!(customer_id = %customer.id, balance = customer.balance_cents, "staging customer update");
        self.staged
            .customers
            .insert(customer.id.clone(), customer.clone());
        Ok(())
    }

    async fn update_sale(&mut self, sale: &Sale) -> StoreResult<()> {
        if !self.staged.sales.contains_key(&sale.id) {
            return Err(StoreError::not_found("Sale", &sale.id));
        }
        self.staged.sales.insert(sale.id.clone(), sale.clone());
        Ok(())
    }

    async fn delete_sale(&mut self, id: &str) -> StoreResult<()> {
        if self.staged.sales.remove(id).is_none() {
            return Err(StoreError::not_found("Sale", id));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryUnitOfWork { mut guard, staged } = *self;
        *guard = staged;
        debug!("ledger transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        debug!("ledger transaction rolled back");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
