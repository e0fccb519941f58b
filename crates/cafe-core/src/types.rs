//! # Domain Types
//!
//! Core domain types for the cafe credit-account ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────────┐   │
//! │  │    Product      │   │    Customer     │   │        Sale         │   │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────────  │   │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)          │   │
//! │  │  name           │   │  card_number    │   │  total_cents        │   │
//! │  │  price_cents    │   │  rfid_no        │   │  payment_method     │   │
//! │  │  stock          │   │  balance_cents  │   │  is_settled         │   │
//! │  └─────────────────┘   │  discount_bps   │   │  items[SaleLine]    │   │
//! │                        └─────────────────┘   │  settlements[..]    │   │
//! │  ┌─────────────────┐   ┌─────────────────┐   └─────────────────────┘   │
//! │  │ PaymentMethod   │   │ RechargeTxn     │                             │
//! │  │  ─────────────  │   │  ─────────────  │   Sale state machine:       │
//! │  │  Cash           │   │  customer_id    │                             │
//! │  │  Card           │   │  amount_cents   │   pending ──settle──► done  │
//! │  │  MobileWallet   │   │  recharge_date  │   (terminal, exactly once)  │
//! │  │  Pending        │   └─────────────────┘                             │
//! │  └─────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where one exists: (card_number, rfid_no) - human-facing

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreError;
use crate::money::Money;

// =============================================================================
// Payment Method
// =============================================================================

/// How a sale was (or will be) paid.
///
/// `Pending` is a creation-time state, not a settlement method: a sale
/// created as `Pending` sits on the customer's tab until it is settled
/// with one of the other three methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Prepaid customer card (debits the customer's balance).
    Card,
    /// Mobile wallet transfer.
    MobileWallet,
    /// Deferred payment; sale stays open until settled.
    Pending,
}

impl PaymentMethod {
    /// Canonical wire string, matching the serde representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::MobileWallet => "mobile_wallet",
            PaymentMethod::Pending => "pending",
        }
    }

    /// Whether this method may settle a pending sale.
    ///
    /// Settling with `Pending` would be a no-op transition and is
    /// rejected as `InvalidPaymentMethod`.
    pub const fn is_settlement_method(&self) -> bool {
        !matches!(self, PaymentMethod::Pending)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = CoreError;

    /// Accepts canonical names plus the legacy wallet alias used by the
    /// deployed frontend ("easypaisa").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "mobile_wallet" | "mobile-wallet" | "easypaisa" => Ok(PaymentMethod::MobileWallet),
            "pending" => Ok(PaymentMethod::Pending),
            other => Err(CoreError::InvalidPaymentMethod(other.to_string())),
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown on receipts and in notifications.
    pub name: String,

    /// Price in cents (smallest currency unit). Never negative.
    pub price_cents: i64,

    /// Current stock level. Never negative after a committed transaction.
    pub stock: i64,

    /// Category this product is listed under (catalog concern).
    pub category_id: Option<String>,

    /// When the product was created.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks whether `quantity` units can be taken from stock.
    #[inline]
    pub fn has_stock(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer with a prepaid credit account.
///
/// The balance is mutated only by the Balance Guard: debited by card
/// sales and settlements, credited by recharges. Any other edit path
/// must route through the guard to preserve the non-negativity intent.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Customer {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Customer display name.
    pub name: String,

    /// Contact address for notifications (phone number).
    pub phone: String,

    /// Unique prepaid card identifier.
    pub card_number: String,

    /// Unique RFID tag identifier (second physical credential).
    pub rfid_no: String,

    /// Prepaid balance in cents.
    pub balance_cents: i64,

    /// Card discount in basis points (1000 = 10%). Range 0..=10000.
    pub discount_bps: u32,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Returns the balance as a Money type.
    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }

    /// Checks the balance against a required amount.
    #[inline]
    pub fn can_afford(&self, amount: Money) -> bool {
        self.balance() >= amount
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A line item in a sale.
///
/// Uses the snapshot pattern: unit price and product name are frozen at
/// creation time so the sale record survives later catalog edits.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleLine {
    /// Product reference (UUID).
    pub product_id: String,

    /// Quantity sold.
    pub quantity: i64,

    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,

    /// Line total (unit_price × quantity, frozen).
    pub line_total_cents: i64,

    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
}

impl SaleLine {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the line total as Money.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

/// One settlement applied to a sale.
///
/// Persisted shape: `{method, amount_cents, settled_by, settled_at, batch}`.
/// Records are append-only; they are never removed or rewritten.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SettlementRecord {
    /// Method the sale was settled with.
    pub method: PaymentMethod,

    /// Settled amount in cents (the sale total).
    pub amount_cents: i64,

    /// Opaque actor identifier of whoever settled the sale.
    pub settled_by: String,

    /// Settlement time as epoch seconds.
    pub settled_at: i64,

    /// Whether this settlement was part of a batch.
    pub batch: bool,
}

/// A point-of-sale transaction, pending or settled.
///
/// ## Lifecycle
/// A sale is born settled (`payment_method != Pending`) or pending
/// (`payment_method == Pending`, `is_settled == false`). A pending sale
/// transitions to settled exactly once via [`Sale::settle`]; settled is
/// terminal. Items are immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Sale {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Total price in cents, computed as the exact sum of line totals.
    pub total_cents: i64,

    /// Current payment method. `Pending` until settled.
    pub payment_method: PaymentMethod,

    /// Whether the sale has been paid for.
    pub is_settled: bool,

    /// Server-assigned creation time. Immutable.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// Free-text room/location tag ("Room 12", "Counter").
    pub room_no: String,

    /// Owning customer, if any. Required for card payment.
    pub customer_id: Option<String>,

    /// Ordered line items, snapshotted at creation.
    pub items: Vec<SaleLine>,

    /// Ordered, append-only settlement records.
    pub settlements: Vec<SettlementRecord>,
}

impl Sale {
    /// Returns the total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// A sale is pending when it has not been settled yet.
    #[inline]
    pub fn is_pending(&self) -> bool {
        !self.is_settled
    }

    /// Applies the pending → settled transition.
    ///
    /// Pure state-machine rule; the engine owns the surrounding
    /// transaction and balance debit. Fails with `InvalidPaymentMethod`
    /// for `Pending` and with `AlreadySettled` (naming the existing
    /// method) on a second settlement. On success the method and flag
    /// are updated and one record is appended.
    pub fn settle(
        &mut self,
        method: PaymentMethod,
        actor: &str,
        settled_at: i64,
        batch: bool,
    ) -> Result<(), CoreError> {
        if !method.is_settlement_method() {
            return Err(CoreError::InvalidPaymentMethod(method.as_str().to_string()));
        }
        if self.is_settled {
            return Err(CoreError::AlreadySettled {
                sale_id: self.id.clone(),
                method: self.payment_method.as_str().to_string(),
            });
        }

        self.payment_method = method;
        self.is_settled = true;
        self.settlements.push(SettlementRecord {
            method,
            amount_cents: self.total_cents,
            settled_by: actor.to_string(),
            settled_at,
            batch,
        });

        Ok(())
    }

    /// One-line item summary for notification bodies:
    /// `"Latte x2, Mocha x1"`.
    pub fn item_summary(&self) -> String {
        self.items
            .iter()
            .map(|line| format!("{} x{}", line.name_snapshot, line.quantity))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// =============================================================================
// Recharge Transaction
// =============================================================================

/// A credit top-up applied to a customer's prepaid balance.
///
/// Created only by the recharge operation; never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RechargeTransaction {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Customer whose balance was credited.
    pub customer_id: String,

    /// Credited amount in cents. Always positive.
    pub amount_cents: i64,

    /// When the recharge happened.
    #[ts(as = "String")]
    pub recharge_date: DateTime<Utc>,
}

impl RechargeTransaction {
    /// Returns the credited amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_sale() -> Sale {
        Sale {
            id: "s-1".to_string(),
            total_cents: 4000,
            payment_method: PaymentMethod::Pending,
            is_settled: false,
            created_at: Utc::now(),
            room_no: "Room 12".to_string(),
            customer_id: Some("c-1".to_string()),
            items: vec![SaleLine {
                product_id: "p-1".to_string(),
                quantity: 2,
                unit_price_cents: 2000,
                line_total_cents: 4000,
                name_snapshot: "Latte".to_string(),
            }],
            settlements: Vec::new(),
        }
    }

    #[test]
    fn test_payment_method_round_trip() {
        for s in ["cash", "card", "mobile_wallet", "pending"] {
            let method: PaymentMethod = s.parse().unwrap();
            assert_eq!(method.as_str(), s);
        }
    }

    #[test]
    fn test_payment_method_wallet_alias() {
        let method: PaymentMethod = "easypaisa".parse().unwrap();
        assert_eq!(method, PaymentMethod::MobileWallet);
    }

    #[test]
    fn test_payment_method_rejects_unknown() {
        let err = "bitcoin".parse::<PaymentMethod>().unwrap_err();
        assert!(matches!(err, CoreError::InvalidPaymentMethod(_)));
    }

    #[test]
    fn test_settle_transitions_once() {
        let mut sale = pending_sale();
        sale.settle(PaymentMethod::Cash, "till-1", 1_700_000_000, false)
            .unwrap();

        assert!(sale.is_settled);
        assert_eq!(sale.payment_method, PaymentMethod::Cash);
        assert_eq!(sale.settlements.len(), 1);
        assert_eq!(sale.settlements[0].amount_cents, 4000);
        assert!(!sale.settlements[0].batch);

        // Second settlement must fail and leave the sale unchanged.
        let err = sale
            .settle(PaymentMethod::Card, "till-1", 1_700_000_001, false)
            .unwrap_err();
        assert!(matches!(err, CoreError::AlreadySettled { .. }));
        assert_eq!(sale.payment_method, PaymentMethod::Cash);
        assert_eq!(sale.settlements.len(), 1);
    }

    #[test]
    fn test_settle_rejects_pending_method() {
        let mut sale = pending_sale();
        let err = sale
            .settle(PaymentMethod::Pending, "till-1", 0, false)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidPaymentMethod(_)));
        assert!(sale.is_pending());
    }

    #[test]
    fn test_item_summary() {
        let mut sale = pending_sale();
        sale.items.push(SaleLine {
            product_id: "p-2".to_string(),
            quantity: 1,
            unit_price_cents: 2000,
            line_total_cents: 2000,
            name_snapshot: "Mocha".to_string(),
        });
        assert_eq!(sale.item_summary(), "Latte x2, Mocha x1");
    }

    #[test]
    fn test_settlement_record_wire_shape() {
        let record = SettlementRecord {
            method: PaymentMethod::MobileWallet,
            amount_cents: 4000,
            settled_by: "admin".to_string(),
            settled_at: 1_700_000_000,
            batch: true,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "method": "mobile_wallet",
                "amount_cents": 4000,
                "settled_by": "admin",
                "settled_at": 1_700_000_000,
                "batch": true,
            })
        );
    }

    #[test]
    fn test_customer_can_afford() {
        let customer = Customer {
            id: "c-1".to_string(),
            name: "Asim".to_string(),
            phone: "0300-0000000".to_string(),
            card_number: "CARD-001".to_string(),
            rfid_no: "RFID-001".to_string(),
            balance_cents: 10_000,
            discount_bps: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(customer.can_afford(Money::from_cents(10_000)));
        assert!(!customer.can_afford(Money::from_cents(10_001)));
    }
}
