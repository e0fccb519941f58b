//! # Error Types
//!
//! Domain-specific error types for cafe-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  cafe-core errors (this file)                                          │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  cafe-ledger errors (separate crate)                                   │
//! │  └── StoreError       - Unit-of-work / persistence failures            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → API layer → caller                │
//! │                                                                         │
//! │  Notifier failures are NOT errors: they are logged and discarded       │
//! │  at the call site, never propagated into this taxonomy.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (ids, amounts, shortfalls)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic
/// failures. Guard errors propagate through the engine unchanged so the
/// caller can render a precise message.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Customer cannot be found.
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Sale cannot be found.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Insufficient stock to complete a sale.
    ///
    /// ## When This Occurs
    /// - Reserving more units than the product has in stock
    ///
    /// Carries the numbers the UI needs: "Only 3 Latte in stock".
    #[error("Insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// Customer balance is too low for a card debit.
    ///
    /// The message includes the exact shortfall so the cashier can tell
    /// the customer how much to recharge.
    #[error(
        "Insufficient balance: balance {}, required {}, shortfall {}",
        Money::from_cents(*balance_cents),
        Money::from_cents(*required_cents),
        Money::from_cents(*required_cents - *balance_cents)
    )]
    InsufficientFunds {
        balance_cents: i64,
        required_cents: i64,
    },

    /// The sale has already been settled; settled is terminal.
    ///
    /// Names the method the sale was settled with, per the original
    /// behaviour ("already settled with cash").
    #[error("Sale {sale_id} is already settled with {method}")]
    AlreadySettled { sale_id: String, method: String },

    /// Card payment attempted without a resolvable customer.
    #[error("Customer is required for card payments")]
    CustomerRequiredForCard,

    /// The sale belongs to a different customer than the one supplied.
    #[error(
        "Sale {sale_id} belongs to customer {}, not {provided}",
        owner.as_deref().unwrap_or("<none>")
    )]
    CustomerMismatch {
        sale_id: String,
        owner: Option<String>,
        provided: String,
    },

    /// Payment method is not valid for the attempted operation.
    #[error("Invalid payment method: {0}")]
    InvalidPaymentMethod(String),

    /// Batch settlement called with no sale ids.
    #[error("No sale ids provided")]
    EmptyBatch,

    /// Batch settlement called with more sales than allowed.
    #[error("Cannot settle more than {max} sales at once (got {len})")]
    BatchTooLarge { len: usize, max: usize },

    /// The store failed to commit the unit of work.
    ///
    /// For a batch this is fatal for the whole batch: everything was
    /// rolled back, nothing reported as settled actually happened.
    #[error("Commit failed: {0}")]
    CommitFailed(String),

    /// Store-level failure during reads or staged writes.
    #[error("Store error: {0}")]
    Store(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message() {
        let err = CoreError::InsufficientStock {
            name: "Latte".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Latte: available 3, requested 5"
        );
    }

    #[test]
    fn test_insufficient_funds_message_includes_shortfall() {
        let err = CoreError::InsufficientFunds {
            balance_cents: 4000,
            required_cents: 5500,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient balance: balance PKR 40.00, required PKR 55.00, shortfall PKR 15.00"
        );
    }

    #[test]
    fn test_already_settled_names_existing_method() {
        let err = CoreError::AlreadySettled {
            sale_id: "s-9".to_string(),
            method: "cash".to_string(),
        };
        assert_eq!(err.to_string(), "Sale s-9 is already settled with cash");
    }

    #[test]
    fn test_customer_mismatch_with_unowned_sale() {
        let err = CoreError::CustomerMismatch {
            sale_id: "s-9".to_string(),
            owner: None,
            provided: "c-2".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Sale s-9 belongs to customer <none>, not c-2"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "amount".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
