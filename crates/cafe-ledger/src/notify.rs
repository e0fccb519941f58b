//! # Notifications
//!
//! Post-commit, best-effort outbound messages (SMS in production).
//!
//! ## Design
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Notification Flow                                      │
//! │                                                                         │
//! │  engine operation                                                      │
//! │    ├── unit of work ... commit()          ← financial correctness ends │
//! │    │                                        here                       │
//! │    └── collected Vec<NotificationIntent>                               │
//! │               │                                                         │
//! │               ▼                                                         │
//! │  NotificationDispatcher::dispatch()                                    │
//! │    ├── per intent: Notifier::send() under a bounded timeout            │
//! │    ├── timeout / false / transport error → warn! and move on           │
//! │    └── NEVER returns an error, NEVER rolls anything back               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine never talks to the notifier while a transaction is open;
//! intents are built from already-committed state.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use cafe_core::{Customer, Money, Sale};

/// Statement header line used in message bodies.
const STATEMENT_HEADER: &str = "Cafe D Revenue";

/// Upper bound on a single notifier send. A slow SMS gateway must not
/// delay the response past this.
pub const NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Notifier Port
// =============================================================================

/// Best-effort outbound message delivery.
///
/// The return value is advisory only; callers log `false` and move on.
/// Implementations live outside this workspace (SMS gateway client).
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends `body` to `address`. Returns whether delivery was accepted.
    async fn send(&self, address: &str, body: &str) -> bool;
}

/// Notifier used when no gateway is configured; drops every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send(&self, address: &str, _body: &str) -> bool {
        debug!(%address, "notifier not configured, dropping message");
        false
    }
}

// =============================================================================
// Intents
// =============================================================================

/// One message waiting to be sent after commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationIntent {
    /// Recipient address (customer phone number).
    pub address: String,

    /// Message body.
    pub body: String,
}

/// Bank-style debit message for a card sale created and charged in one
/// step.
pub fn debit_intent(customer: &Customer, sale: &Sale) -> NotificationIntent {
    NotificationIntent {
        address: customer.phone.clone(),
        body: format!(
            "DEBIT\n{STATEMENT_HEADER}\n{}\nBal: {}\n{}",
            sale.total(),
            customer.balance(),
            sale.item_summary()
        ),
    }
}

/// Bank-style debit message for a pending sale settled by card.
pub fn settlement_intent(customer: &Customer, sale: &Sale) -> NotificationIntent {
    NotificationIntent {
        address: customer.phone.clone(),
        body: format!(
            "DEBIT\n{STATEMENT_HEADER}\nBill #{} Settled\n{}\nBal: {}\n{}",
            sale.id,
            sale.total(),
            customer.balance(),
            sale.item_summary()
        ),
    }
}

/// Credit message for a successful recharge.
pub fn credit_intent(customer: &Customer, amount: Money) -> NotificationIntent {
    NotificationIntent {
        address: customer.phone.clone(),
        body: format!(
            "CREDIT\n{STATEMENT_HEADER}\n{}\nBal: {}\nRecharge successful!",
            amount,
            customer.balance()
        ),
    }
}

/// Warning sent when a balance is still low after a recharge.
pub fn low_balance_intent(customer: &Customer) -> NotificationIntent {
    NotificationIntent {
        address: customer.phone.clone(),
        body: format!(
            "LOW BALANCE ALERT\n{STATEMENT_HEADER}\nCurrent Bal: {}\nPlease recharge your card soon.",
            customer.balance()
        ),
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Sends committed notification intents through the [`Notifier`] port.
///
/// Failures are logged and discarded, per intent; dispatch itself is
/// infallible by construction.
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    timeout: Duration,
}

impl NotificationDispatcher {
    /// Creates a dispatcher with the default send timeout.
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        NotificationDispatcher {
            notifier,
            timeout: NOTIFY_TIMEOUT,
        }
    }

    /// Overrides the per-send timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sends every intent, swallowing all failures.
    pub async fn dispatch(&self, intents: Vec<NotificationIntent>) {
        for intent in intents {
            match tokio::time::timeout(
                self.timeout,
                self.notifier.send(&intent.address, &intent.body),
            )
            .await
            {
                Ok(true) => {
                    debug!(address = %intent.address, "notification sent");
                }
                Ok(false) => {
                    warn!(address = %intent.address, "notifier rejected message");
                }
                Err(_) => {
                    warn!(
                        address = %intent.address,
                        timeout_ms = self.timeout.as_millis() as u64,
                        "notifier timed out"
                    );
                }
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tokio::sync::Mutex;

    use cafe_core::{PaymentMethod, SaleLine};

    use super::*;

    struct RecordingNotifier {
        sent: Mutex<Vec<(String, String)>>,
        accept: bool,
    }

    impl RecordingNotifier {
        fn new(accept: bool) -> Arc<Self> {
            Arc::new(RecordingNotifier {
                sent: Mutex::new(Vec::new()),
                accept,
            })
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, address: &str, body: &str) -> bool {
            self.sent
                .lock()
                .await
                .push((address.to_string(), body.to_string()));
            self.accept
        }
    }

    struct StuckNotifier;

    #[async_trait]
    impl Notifier for StuckNotifier {
        async fn send(&self, _address: &str, _body: &str) -> bool {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            true
        }
    }

    fn fixture_customer() -> Customer {
        Customer {
            id: "c-1".to_string(),
            name: "Asim".to_string(),
            phone: "0300-1112223".to_string(),
            card_number: "CARD-001".to_string(),
            rfid_no: "RFID-001".to_string(),
            balance_cents: 6_000,
            discount_bps: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn fixture_sale() -> Sale {
        Sale {
            id: "s-1".to_string(),
            total_cents: 4_000,
            payment_method: PaymentMethod::Card,
            is_settled: true,
            created_at: Utc::now(),
            room_no: "Room 12".to_string(),
            customer_id: Some("c-1".to_string()),
            items: vec![SaleLine {
                product_id: "p-1".to_string(),
                quantity: 2,
                unit_price_cents: 2_000,
                line_total_cents: 4_000,
                name_snapshot: "Latte".to_string(),
            }],
            settlements: Vec::new(),
        }
    }

    #[test]
    fn test_debit_intent_body() {
        let intent = debit_intent(&fixture_customer(), &fixture_sale());
        assert_eq!(intent.address, "0300-1112223");
        assert_eq!(
            intent.body,
            "DEBIT\nCafe D Revenue\nPKR 40.00\nBal: PKR 60.00\nLatte x2"
        );
    }

    #[test]
    fn test_settlement_intent_names_bill() {
        let intent = settlement_intent(&fixture_customer(), &fixture_sale());
        assert!(intent.body.contains("Bill #s-1 Settled"));
    }

    #[test]
    fn test_credit_and_low_balance_bodies() {
        let customer = fixture_customer();
        let credit = credit_intent(&customer, Money::from_cents(5_000));
        assert_eq!(
            credit.body,
            "CREDIT\nCafe D Revenue\nPKR 50.00\nBal: PKR 60.00\nRecharge successful!"
        );

        let warnable = low_balance_intent(&customer);
        assert!(warnable.body.starts_with("LOW BALANCE ALERT"));
        assert!(warnable.body.contains("PKR 60.00"));
    }

    #[tokio::test]
    async fn test_dispatch_sends_every_intent() {
        let notifier = RecordingNotifier::new(true);
        let dispatcher = NotificationDispatcher::new(notifier.clone());

        dispatcher
            .dispatch(vec![
                NotificationIntent {
                    address: "a".to_string(),
                    body: "one".to_string(),
                },
                NotificationIntent {
                    address: "b".to_string(),
                    body: "two".to_string(),
                },
            ])
            .await;

        let sent = notifier.sent.lock().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, "a");
        assert_eq!(sent[1].1, "two");
    }

    #[tokio::test]
    async fn test_dispatch_swallows_rejections() {
        let notifier = RecordingNotifier::new(false);
        let dispatcher = NotificationDispatcher::new(notifier.clone());

        // Must not panic or error; rejection is logged and discarded.
        dispatcher
            .dispatch(vec![NotificationIntent {
                address: "a".to_string(),
                body: "one".to_string(),
            }])
            .await;

        assert_eq!(notifier.sent.lock().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_bounds_a_stuck_notifier() {
        let dispatcher = NotificationDispatcher::new(Arc::new(StuckNotifier))
            .with_timeout(Duration::from_millis(100));

        // Completes despite the notifier never returning.
        dispatcher
            .dispatch(vec![NotificationIntent {
                address: "a".to_string(),
                body: "one".to_string(),
            }])
            .await;
    }
}
