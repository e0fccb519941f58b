//! # Sale Lifecycle Engine
//!
//! Orchestrates sale creation, settlement, batch settlement and
//! recharges, composing the Inventory and Balance guards under one
//! transaction boundary.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  create_sale(cash/card/wallet) ──────────────► SETTLED (terminal)      │
//! │                                                    ▲                    │
//! │  create_sale(pending) ──► PENDING ── settle_sale ──┤                    │
//! │                              │                     │                    │
//! │                              └──── settle_batch ───┘                    │
//! │                                                                         │
//! │  Every operation:                                                       │
//! │    1. validates inputs before any I/O                                  │
//! │    2. opens ONE unit of work                                           │
//! │    3. applies guard mutations (stock, balance) in that unit of work    │
//! │    4. commits all-or-nothing                                           │
//! │    5. only THEN dispatches notifications (failures swallowed)          │
//! │                                                                         │
//! │  Any failure before commit rolls the whole unit of work back:          │
//! │  no stock decrement or balance debit ever survives a failed sale.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use ts_rs::TS;
use uuid::Uuid;

use cafe_core::{
    validation, CoreError, CoreResult, Customer, Money, PaymentMethod, RechargeTransaction, Sale,
    ValidationError, LOW_BALANCE_THRESHOLD, MAX_BATCH_SETTLE,
};

use crate::balance;
use crate::error::StoreError;
use crate::inventory::{self, LineRequest};
use crate::notify::{self, NotificationDispatcher, NotificationIntent};
use crate::store::{LedgerStore, UnitOfWork};

// =============================================================================
// Request / Response Types
// =============================================================================

/// Input for [`SaleEngine::create_sale`].
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSale {
    /// Owning customer. Required when `payment_method` is card.
    pub customer_id: Option<String>,

    /// Free-text room/location tag.
    pub room_no: String,

    /// How the sale is paid. `Pending` defers payment to settlement.
    pub payment_method: PaymentMethod,

    /// Requested line items. Must not be empty.
    pub items: Vec<LineRequest>,
}

/// One sale that could not be settled in a batch, with the reason.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FailedSettlement {
    pub sale_id: String,
    pub reason: String,
}

/// Result of a batch settlement.
///
/// Always returned for per-sale problems; only structural errors
/// (empty/oversized batch, invalid method, commit failure) surface as
/// `Err`. Every input id lands in exactly one of the two lists.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BatchSettleOutcome {
    pub settled_count: usize,
    pub failed_count: usize,
    pub settled: Vec<String>,
    pub failed: Vec<FailedSettlement>,
}

impl BatchSettleOutcome {
    fn new(settled: Vec<String>, failed: Vec<FailedSettlement>) -> Self {
        BatchSettleOutcome {
            settled_count: settled.len(),
            failed_count: failed.len(),
            settled,
            failed,
        }
    }
}

// =============================================================================
// Sale Engine
// =============================================================================

/// The transactional core of the cafe ledger.
///
/// Holds the store and the post-commit notification dispatcher. The
/// `actor` arguments are opaque identifiers stamped onto settlement
/// records; write-capability checks happen in the API layer (see
/// [`crate::auth`]) before these methods are called.
pub struct SaleEngine {
    store: Arc<dyn LedgerStore>,
    dispatcher: NotificationDispatcher,
}

impl SaleEngine {
    /// Creates an engine over `store`, dispatching notifications
    /// through `dispatcher` after each successful commit.
    pub fn new(store: Arc<dyn LedgerStore>, dispatcher: NotificationDispatcher) -> Self {
        SaleEngine { store, dispatcher }
    }

    // -------------------------------------------------------------------------
    // create
    // -------------------------------------------------------------------------

    /// Creates a sale, reserving stock and (for card payment) debiting
    /// the customer's balance, atomically.
    ///
    /// The sale is born settled unless `payment_method` is `Pending`.
    /// On any failure the unit of work is rolled back and the specific
    /// guard error is returned; no partial effect survives.
    pub async fn create_sale(&self, req: NewSale) -> CoreResult<Sale> {
        let room_no = validation::validate_room_tag(&req.room_no)?;
        if req.items.is_empty() {
            return Err(ValidationError::Required {
                field: "items".to_string(),
            }
            .into());
        }
        debug!(method = %req.payment_method, lines = req.items.len(), "creating sale");

        let mut uow = self.store.begin().await?;
        match Self::create_sale_in(&mut *uow, &req, room_no).await {
            Ok((sale, intents)) => {
                uow.commit().await.map_err(commit_error)?;
                info!(
                    sale_id = %sale.id,
                    total = %sale.total(),
                    settled = sale.is_settled,
                    "sale created"
                );
                self.dispatcher.dispatch(intents).await;
                Ok(sale)
            }
            Err(err) => {
                abort(uow).await;
                Err(err)
            }
        }
    }

    async fn create_sale_in(
        uow: &mut dyn UnitOfWork,
        req: &NewSale,
        room_no: String,
    ) -> CoreResult<(Sale, Vec<NotificationIntent>)> {
        let customer = match &req.customer_id {
            Some(id) => Some(
                uow.customer(id)
                    .await?
                    .ok_or_else(|| CoreError::CustomerNotFound(id.clone()))?,
            ),
            None => None,
        };

        let items = inventory::reserve_stock(uow, &req.items).await?;
        let total: Money = items.iter().map(|line| line.line_total()).sum();

        let mut charged: Option<Customer> = None;
        if req.payment_method == PaymentMethod::Card {
            let customer = customer.as_ref().ok_or(CoreError::CustomerRequiredForCard)?;
            charged = Some(balance::debit(uow, &customer.id, total).await?);
        }

        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            total_cents: total.cents(),
            payment_method: req.payment_method,
            is_settled: req.payment_method != PaymentMethod::Pending,
            created_at: Utc::now(),
            room_no,
            customer_id: req.customer_id.clone(),
            items,
            settlements: Vec::new(),
        };
        uow.insert_sale(&sale).await?;

        let mut intents = Vec::new();
        if let Some(customer) = &charged {
            intents.push(notify::debit_intent(customer, &sale));
        }

        Ok((sale, intents))
    }

    // -------------------------------------------------------------------------
    // settle
    // -------------------------------------------------------------------------

    /// Settles one pending sale with `method`, debiting the customer's
    /// balance when paying by card.
    ///
    /// `customer_id`, when given, must match the sale's owner; for card
    /// payment the sale's own customer is used when the argument is
    /// omitted. Settled sales always fail with `AlreadySettled`.
    pub async fn settle_sale(
        &self,
        sale_id: &str,
        method: PaymentMethod,
        customer_id: Option<&str>,
        actor: &str,
    ) -> CoreResult<Sale> {
        if !method.is_settlement_method() {
            return Err(CoreError::InvalidPaymentMethod(method.as_str().to_string()));
        }
        debug!(%sale_id, %method, "settling sale");

        let mut uow = self.store.begin().await?;
        match Self::settle_sale_in(&mut *uow, sale_id, method, customer_id, actor).await {
            Ok((sale, intents)) => {
                uow.commit().await.map_err(commit_error)?;
                info!(sale_id = %sale.id, %method, total = %sale.total(), "sale settled");
                self.dispatcher.dispatch(intents).await;
                Ok(sale)
            }
            Err(err) => {
                abort(uow).await;
                Err(err)
            }
        }
    }

    async fn settle_sale_in(
        uow: &mut dyn UnitOfWork,
        sale_id: &str,
        method: PaymentMethod,
        customer_id: Option<&str>,
        actor: &str,
    ) -> CoreResult<(Sale, Vec<NotificationIntent>)> {
        let mut sale = uow
            .sale(sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;
        if sale.is_settled {
            return Err(CoreError::AlreadySettled {
                sale_id: sale.id.clone(),
                method: sale.payment_method.as_str().to_string(),
            });
        }

        if let Some(provided) = customer_id {
            uow.customer(provided)
                .await?
                .ok_or_else(|| CoreError::CustomerNotFound(provided.to_string()))?;
            if sale.customer_id.as_deref() != Some(provided) {
                return Err(CoreError::CustomerMismatch {
                    sale_id: sale.id.clone(),
                    owner: sale.customer_id.clone(),
                    provided: provided.to_string(),
                });
            }
        }

        let mut charged: Option<Customer> = None;
        if method == PaymentMethod::Card {
            let target = customer_id
                .map(str::to_string)
                .or_else(|| sale.customer_id.clone())
                .ok_or(CoreError::CustomerRequiredForCard)?;
            charged = Some(balance::debit(uow, &target, sale.total()).await?);
        }

        sale.settle(method, actor, Utc::now().timestamp(), false)?;
        uow.update_sale(&sale).await?;

        let mut intents = Vec::new();
        if let Some(customer) = &charged {
            intents.push(notify::settlement_intent(customer, &sale));
        }

        Ok((sale, intents))
    }

    // -------------------------------------------------------------------------
    // settle batch
    // -------------------------------------------------------------------------

    /// Settles up to [`MAX_BATCH_SETTLE`] pending sales in one unit of
    /// work.
    ///
    /// ## Commit Policy
    /// ```text
    /// at least one sale settled ──► commit them all as one unit
    /// no sale settled           ──► rollback, report all failed
    /// commit itself fails       ──► rollback everything, Err(CommitFailed)
    /// ```
    ///
    /// For card batches an aggregate pre-validation pass fails every
    /// still-pending sale of any customer whose balance cannot cover
    /// their combined total, before a single debit happens — a customer
    /// is charged for all of their batch sales or none of them. The
    /// per-sale pass re-checks each balance anyway; the pre-check runs
    /// against a snapshot and concurrent drift is caught here.
    pub async fn settle_batch(
        &self,
        sale_ids: &[String],
        method: PaymentMethod,
        customer_id: Option<&str>,
        actor: &str,
    ) -> CoreResult<BatchSettleOutcome> {
        if sale_ids.is_empty() {
            return Err(CoreError::EmptyBatch);
        }
        if sale_ids.len() > MAX_BATCH_SETTLE {
            return Err(CoreError::BatchTooLarge {
                len: sale_ids.len(),
                max: MAX_BATCH_SETTLE,
            });
        }
        if !method.is_settlement_method() {
            return Err(CoreError::InvalidPaymentMethod(method.as_str().to_string()));
        }
        debug!(count = sale_ids.len(), %method, "batch settlement requested");

        let mut uow = self.store.begin().await?;
        match Self::settle_batch_in(&mut *uow, sale_ids, method, customer_id, actor).await {
            Ok((outcome, intents)) => {
                if outcome.settled.is_empty() {
                    abort(uow).await;
                    info!(failed = outcome.failed_count, "batch settlement: nothing settled");
                    return Ok(outcome);
                }
                uow.commit().await.map_err(commit_error)?;
                info!(
                    settled = outcome.settled_count,
                    failed = outcome.failed_count,
                    %method,
                    "batch settlement committed"
                );
                self.dispatcher.dispatch(intents).await;
                Ok(outcome)
            }
            Err(err) => {
                abort(uow).await;
                Err(err)
            }
        }
    }

    async fn settle_batch_in(
        uow: &mut dyn UnitOfWork,
        sale_ids: &[String],
        method: PaymentMethod,
        customer_id: Option<&str>,
        actor: &str,
    ) -> CoreResult<(BatchSettleOutcome, Vec<NotificationIntent>)> {
        // A provided customer must at least exist; ownership is checked
        // per sale through each sale's own customer reference.
        if let Some(provided) = customer_id {
            uow.customer(provided)
                .await?
                .ok_or_else(|| CoreError::CustomerNotFound(provided.to_string()))?;
        }

        let mut failed: Vec<FailedSettlement> = Vec::new();

        if method == PaymentMethod::Card {
            Self::prevalidate_card_batch(uow, sale_ids, &mut failed).await?;
        }

        let mut settled: Vec<String> = Vec::new();
        let mut intents: Vec<NotificationIntent> = Vec::new();
        let settled_at = Utc::now().timestamp();

        for sale_id in sale_ids {
            if failed.iter().any(|f| &f.sale_id == sale_id) {
                continue;
            }
            match Self::settle_one_in_batch(uow, sale_id, method, actor, settled_at).await {
                Ok((sale, charged)) => {
                    settled.push(sale_id.clone());
                    if let Some(customer) = &charged {
                        intents.push(notify::settlement_intent(customer, &sale));
                    }
                }
                Err(err) => {
                    warn!(%sale_id, %err, "batch settlement: sale failed");
                    failed.push(FailedSettlement {
                        sale_id: sale_id.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        Ok((BatchSettleOutcome::new(settled, failed), intents))
    }

    /// Aggregate balance pre-validation for card batches.
    ///
    /// Groups the batch's still-pending sales by owning customer, sums
    /// each customer's required total and up-front fails every sale of
    /// any customer who cannot cover their aggregate. Sales that will
    /// fail anyway in the per-sale pass (missing, already settled, no
    /// customer) are skipped here and attributed there.
    async fn prevalidate_card_batch(
        uow: &mut dyn UnitOfWork,
        sale_ids: &[String],
        failed: &mut Vec<FailedSettlement>,
    ) -> CoreResult<()> {
        let mut balances: HashMap<String, Money> = HashMap::new();
        let mut required: HashMap<String, Money> = HashMap::new();
        let mut pending: Vec<(String, String)> = Vec::new(); // (sale_id, customer_id)

        for sale_id in sale_ids {
            let Some(sale) = uow.sale(sale_id).await? else {
                continue;
            };
            if sale.is_settled {
                continue;
            }
            let Some(cid) = sale.customer_id.clone() else {
                continue;
            };
            if !balances.contains_key(&cid) {
                let Some(customer) = uow.customer(&cid).await? else {
                    continue;
                };
                balances.insert(cid.clone(), customer.balance());
            }
            *required.entry(cid.clone()).or_insert_with(Money::zero) += sale.total();
            pending.push((sale_id.clone(), cid));
        }

        for (cid, needed) in &required {
            let balance = balances.get(cid).copied().unwrap_or_else(Money::zero);
            if balance < *needed {
                let reason = CoreError::InsufficientFunds {
                    balance_cents: balance.cents(),
                    required_cents: needed.cents(),
                }
                .to_string();
                debug!(customer_id = %cid, %reason, "pre-validation failed customer group");
                for (sale_id, owner) in &pending {
                    if owner == cid && !failed.iter().any(|f| &f.sale_id == sale_id) {
                        failed.push(FailedSettlement {
                            sale_id: sale_id.clone(),
                            reason: reason.clone(),
                        });
                    }
                }
            }
        }

        Ok(())
    }

    async fn settle_one_in_batch(
        uow: &mut dyn UnitOfWork,
        sale_id: &str,
        method: PaymentMethod,
        actor: &str,
        settled_at: i64,
    ) -> CoreResult<(Sale, Option<Customer>)> {
        let mut sale = uow
            .sale(sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;
        if sale.is_settled {
            return Err(CoreError::AlreadySettled {
                sale_id: sale.id.clone(),
                method: sale.payment_method.as_str().to_string(),
            });
        }

        let mut charged: Option<Customer> = None;
        if method == PaymentMethod::Card {
            let cid = sale
                .customer_id
                .clone()
                .ok_or(CoreError::CustomerRequiredForCard)?;
            charged = Some(balance::debit(uow, &cid, sale.total()).await?);
        }

        sale.settle(method, actor, settled_at, true)?;
        uow.update_sale(&sale).await?;
        Ok((sale, charged))
    }

    // -------------------------------------------------------------------------
    // recharge
    // -------------------------------------------------------------------------

    /// Credits a customer's prepaid balance and records the recharge.
    ///
    /// Post-commit the customer gets a credit confirmation; if the new
    /// balance is still below [`LOW_BALANCE_THRESHOLD`] a second
    /// warning message follows. Both are best-effort.
    pub async fn recharge(
        &self,
        customer_id: &str,
        amount: Money,
    ) -> CoreResult<RechargeTransaction> {
        debug!(%customer_id, amount = amount.cents(), "recharge requested");

        let mut uow = self.store.begin().await?;
        match Self::recharge_in(&mut *uow, customer_id, amount).await {
            Ok((tx, intents)) => {
                uow.commit().await.map_err(commit_error)?;
                info!(%customer_id, amount = %amount, "recharge committed");
                self.dispatcher.dispatch(intents).await;
                Ok(tx)
            }
            Err(err) => {
                abort(uow).await;
                Err(err)
            }
        }
    }

    async fn recharge_in(
        uow: &mut dyn UnitOfWork,
        customer_id: &str,
        amount: Money,
    ) -> CoreResult<(RechargeTransaction, Vec<NotificationIntent>)> {
        let customer = balance::credit(uow, customer_id, amount).await?;

        let tx = RechargeTransaction {
            id: Uuid::new_v4().to_string(),
            customer_id: customer_id.to_string(),
            amount_cents: amount.cents(),
            recharge_date: Utc::now(),
        };
        uow.insert_recharge(&tx).await?;

        let mut intents = vec![notify::credit_intent(&customer, amount)];
        if customer.balance() < LOW_BALANCE_THRESHOLD {
            intents.push(notify::low_balance_intent(&customer));
        }

        Ok((tx, intents))
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Rolls a unit of work back, logging (not propagating) rollback
/// failures so the original error stays visible to the caller.
async fn abort(uow: Box<dyn UnitOfWork>) {
    if let Err(err) = uow.rollback().await {
        warn!(%err, "rollback failed");
    }
}

/// Any failure while committing is a `CommitFailed`, whatever the store
/// classified it as.
fn commit_error(err: StoreError) -> CoreError {
    match err {
        StoreError::CommitFailed(msg) => CoreError::CommitFailed(msg),
        other => CoreError::CommitFailed(other.to_string()),
    }
}
