//! # Balance Guard
//!
//! Validates and applies customer balance debits and credits within the
//! caller's unit of work.
//!
//! This module is the ONLY mutation path for `Customer.balance_cents`.
//! Card sales and settlements debit through [`debit`]; recharges credit
//! through [`credit`]. Neither commits; the caller owns the transaction
//! boundary.

use tracing::debug;

use cafe_core::{validation, CoreError, CoreResult, Customer, Money};

use crate::store::UnitOfWork;

/// Debits `amount` from the customer's balance.
///
/// Fails with `CustomerNotFound` if the customer is missing and with
/// `InsufficientFunds` (carrying balance, required and shortfall) if
/// the balance is too low. Returns the updated customer so the caller
/// can quote the new balance in notifications.
pub async fn debit(
    uow: &mut dyn UnitOfWork,
    customer_id: &str,
    amount: Money,
) -> CoreResult<Customer> {
    let mut customer = uow
        .customer(customer_id)
        .await?
        .ok_or_else(|| CoreError::CustomerNotFound(customer_id.to_string()))?;

    if !customer.can_afford(amount) {
        return Err(CoreError::InsufficientFunds {
            balance_cents: customer.balance_cents,
            required_cents: amount.cents(),
        });
    }

    customer.balance_cents -= amount.cents();
    customer.updated_at = chrono::Utc::now();
    debug!(
        customer_id = %customer.id,
        debited = amount.cents(),
        balance = customer.balance_cents,
        "balance debited"
    );
    uow.update_customer(&customer).await?;

    Ok(customer)
}

/// Credits `amount` to the customer's balance.
///
/// Fails with `CustomerNotFound` if the customer is missing and with a
/// validation error for non-positive amounts. Returns the updated
/// customer.
pub async fn credit(
    uow: &mut dyn UnitOfWork,
    customer_id: &str,
    amount: Money,
) -> CoreResult<Customer> {
    let mut customer = uow
        .customer(customer_id)
        .await?
        .ok_or_else(|| CoreError::CustomerNotFound(customer_id.to_string()))?;

    validation::validate_amount_cents(amount.cents())?;

    customer.balance_cents += amount.cents();
    customer.updated_at = chrono::Utc::now();
    debug!(
        customer_id = %customer.id,
        credited = amount.cents(),
        balance = customer.balance_cents,
        "balance credited"
    );
    uow.update_customer(&customer).await?;

    Ok(customer)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::memory::MemoryLedger;
    use crate::store::LedgerStore;

    fn customer(id: &str, balance_cents: i64) -> Customer {
        Customer {
            id: id.to_string(),
            name: "Asim".to_string(),
            phone: "0300-0000000".to_string(),
            card_number: format!("CARD-{id}"),
            rfid_no: format!("RFID-{id}"),
            balance_cents,
            discount_bps: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_debit_decrements_exactly() {
        let store = MemoryLedger::new();
        store.seed_customer(customer("c-1", 10_000)).await;

        let mut uow = store.begin().await.unwrap();
        let updated = debit(&mut *uow, "c-1", Money::from_cents(4_000))
            .await
            .unwrap();
        assert_eq!(updated.balance_cents, 6_000);
        uow.commit().await.unwrap();

        assert_eq!(
            store.committed_customer("c-1").await.unwrap().balance_cents,
            6_000
        );
    }

    #[tokio::test]
    async fn test_debit_insufficient_funds_mutates_nothing() {
        let store = MemoryLedger::new();
        store.seed_customer(customer("c-1", 3_000)).await;

        let mut uow = store.begin().await.unwrap();
        let err = debit(&mut *uow, "c-1", Money::from_cents(4_000))
            .await
            .unwrap_err();
        match err {
            CoreError::InsufficientFunds {
                balance_cents,
                required_cents,
            } => {
                assert_eq!(balance_cents, 3_000);
                assert_eq!(required_cents, 4_000);
            }
            other => panic!("unexpected error: {other}"),
        }
        uow.rollback().await.unwrap();

        assert_eq!(
            store.committed_customer("c-1").await.unwrap().balance_cents,
            3_000
        );
    }

    #[tokio::test]
    async fn test_debit_exact_balance_allowed() {
        let store = MemoryLedger::new();
        store.seed_customer(customer("c-1", 4_000)).await;

        let mut uow = store.begin().await.unwrap();
        let updated = debit(&mut *uow, "c-1", Money::from_cents(4_000))
            .await
            .unwrap();
        assert_eq!(updated.balance_cents, 0);
        uow.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_debit_unknown_customer() {
        let store = MemoryLedger::new();
        let mut uow = store.begin().await.unwrap();
        let err = debit(&mut *uow, "ghost", Money::from_cents(100))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::CustomerNotFound(_)));
        uow.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_credit_increments() {
        let store = MemoryLedger::new();
        store.seed_customer(customer("c-1", 4_000)).await;

        let mut uow = store.begin().await.unwrap();
        let updated = credit(&mut *uow, "c-1", Money::from_cents(5_000))
            .await
            .unwrap();
        assert_eq!(updated.balance_cents, 9_000);
        uow.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_credit_rejects_non_positive() {
        let store = MemoryLedger::new();
        store.seed_customer(customer("c-1", 4_000)).await;

        let mut uow = store.begin().await.unwrap();
        for bad in [0, -500] {
            let err = credit(&mut *uow, "c-1", Money::from_cents(bad))
                .await
                .unwrap_err();
            assert!(matches!(err, CoreError::Validation(_)));
        }
        uow.rollback().await.unwrap();
    }
}
