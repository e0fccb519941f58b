//! # Ledger Store Ports
//!
//! Traits describing the transactional data source the engine runs on.
//!
//! ## Unit of Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Unit of Work                                     │
//! │                                                                         │
//! │  engine.begin()                                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Box<dyn UnitOfWork> ── reads see committed state + own staged writes  │
//! │       │                                                                 │
//! │       ├── product / customer / sale / recharge lookups                 │
//! │       ├── insert_sale / insert_recharge                                │
//! │       ├── update_product / update_customer / update_sale               │
//! │       │                                                                 │
//! │       ├── commit()   ── publishes ALL staged writes atomically         │
//! │       └── rollback() ── discards ALL staged writes (drop does too)     │
//! │                                                                         │
//! │  Stock decrements and balance debits ALWAYS share the unit of work    │
//! │  with the Sale/Recharge row that depends on them.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Implementations must serialize conflicting transactions (row-level
//! locking or equivalent) so two concurrent debits against one customer
//! cannot both pass the same balance check.

use async_trait::async_trait;

use cafe_core::{Customer, Product, RechargeTransaction, Sale};

use crate::error::StoreResult;

/// Transactional persistence for the ledger entities.
///
/// `begin` opens a unit of work; everything done through it commits or
/// rolls back together.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Opens a new unit of work.
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>>;
}

/// One atomic set of reads and writes against the ledger.
///
/// Typed accessors take the place of a generic `find_by(entity,
/// predicate)` API; each method participates in the same transaction.
/// Dropping the unit of work without committing discards its writes.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Looks up a product by id.
    async fn product(&mut self, id: &str) -> StoreResult<Option<Product>>;

    /// Looks up a customer by id.
    async fn customer(&mut self, id: &str) -> StoreResult<Option<Customer>>;

    /// Looks up a sale by id.
    async fn sale(&mut self, id: &str) -> StoreResult<Option<Sale>>;

    /// Looks up a recharge transaction by id.
    async fn recharge(&mut self, id: &str) -> StoreResult<Option<RechargeTransaction>>;

    /// Stages a new sale. Fails on duplicate id.
    async fn insert_sale(&mut self, sale: &Sale) -> StoreResult<()>;

    /// Stages a new recharge transaction. Fails on duplicate id.
    async fn insert_recharge(&mut self, tx: &RechargeTransaction) -> StoreResult<()>;

    /// Stages an update to an existing product.
    async fn update_product(&mut self, product: &Product) -> StoreResult<()>;

    /// Stages an update to an existing customer.
    async fn update_customer(&mut self, customer: &Customer) -> StoreResult<()>;

    /// Stages an update to an existing sale.
    async fn update_sale(&mut self, sale: &Sale) -> StoreResult<()>;

    /// Stages the removal of a sale (admin correction path).
    async fn delete_sale(&mut self, id: &str) -> StoreResult<()>;

    /// Atomically publishes every staged write.
    async fn commit(self: Box<Self>) -> StoreResult<()>;

    /// Discards every staged write.
    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}
