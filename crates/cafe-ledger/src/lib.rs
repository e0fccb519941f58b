//! # Cafe Ledger
//!
//! Transactional sale and prepaid-balance engine for the cafe backend.
//! Pure domain types live in `cafe-core`; this crate adds the storage
//! seam, the guards that are the only writers of stock and balances,
//! and the lifecycle engine that composes them.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        cafe-ledger                              │
//! │                                                                 │
//! │   ┌───────────┐      ┌──────────────────────────────────────┐   │
//! │   │ auth      │─────►│ engine::SaleEngine                   │   │
//! │   │ Authorizer│      │   create / settle / batch / recharge │   │
//! │   └───────────┘      └───────┬──────────────────┬───────────┘   │
//! │                              │                  │ post-commit   │
//! │              ┌───────────────┼────────┐   ┌─────▼────────────┐  │
//! │              │ inventory     │ balance│   │ notify           │  │
//! │              │ (stock guard) │ (debit/│   │ Dispatcher +     │  │
//! │              │               │ credit)│   │ Notifier trait   │  │
//! │              └───────┬───────┴───┬────┘   └──────────────────┘  │
//! │                      ▼           ▼                              │
//! │              ┌──────────────────────────┐                       │
//! │              │ store::LedgerStore       │                       │
//! │              │   UnitOfWork (txn seam)  │                       │
//! │              └────────────┬─────────────┘                       │
//! │                           ▼                                     │
//! │              ┌──────────────────────────┐                       │
//! │              │ memory::MemoryLedger     │                       │
//! │              │   (in-process store)     │                       │
//! │              └──────────────────────────┘                       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod balance;
pub mod engine;
pub mod error;
pub mod inventory;
pub mod memory;
pub mod notify;
pub mod store;

pub use auth::{AllowAll, Authorizer, RoleTable};
pub use engine::{BatchSettleOutcome, FailedSettlement, NewSale, SaleEngine};
pub use error::{StoreError, StoreResult};
pub use inventory::LineRequest;
pub use memory::MemoryLedger;
pub use notify::{NotificationDispatcher, NotificationIntent, Notifier, NoopNotifier};
pub use store::{LedgerStore, UnitOfWork};
