use crate::domain::order::{CompletionRecord, OrderRecord, OrderStatus, Transition};
use crate::error::CheckoutError;
use crate::store::{OrderEvents, OrderStore};
use std::sync::Arc;

pub const FREE_PAYMENT_METHOD: &str = "free";

/// Outcome of completing an order after the provider approved the payment.
#[derive(Debug, Clone)]
pub enum CompletionReport {
    Completed(OrderRecord),
    /// A duplicate callback or confirm; nothing was written and no event fired.
    AlreadyCompleted,
    /// The payment went through but the order row could not be updated. Needs manual
    /// reconciliation; the buyer is still told the payment succeeded.
    PersistenceWarning(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettleReport {
    Settled(OrderStatus),
    /// The order had already left `pending`, e.g. a late decline after completion.
    Ignored(OrderStatus),
    Missing,
    WriteFailed,
}

/// The only place order status changes. Every write is conditional on the current
/// status, so racing callbacks for one order cannot both apply.
#[derive(Clone)]
pub struct OrderStateMutator {
    pub orders: Arc<dyn OrderStore>,
    pub events: Arc<dyn OrderEvents>,
}

impl OrderStateMutator {
    pub async fn complete(&self, order_id: &str, record: &CompletionRecord) -> CompletionReport {
        match self.orders.complete_unless_completed(order_id, record).await {
            Ok(Transition::Applied(order)) => {
                tracing::info!(
                    order_id,
                    payment_method = %record.payment_method,
                    transaction_id = ?record.transaction_id,
                    "order completed"
                );
                self.fire_completed(&order).await;
                CompletionReport::Completed(order)
            }
            Ok(Transition::Unchanged(_)) => {
                tracing::info!(order_id, "order already completed, skipping");
                CompletionReport::AlreadyCompleted
            }
            Ok(Transition::Missing) => {
                tracing::error!(
                    order_id,
                    transaction_id = ?record.transaction_id,
                    "approved payment for unknown order, reconcile manually"
                );
                CompletionReport::PersistenceWarning(format!("order {order_id} not found"))
            }
            Err(e) => {
                tracing::error!(
                    order_id,
                    transaction_id = ?record.transaction_id,
                    error = %e,
                    "order completion write failed after approval, reconcile manually"
                );
                CompletionReport::PersistenceWarning(e.to_string())
            }
        }
    }

    /// Zero-total orders never see a provider, so a failed write is a plain error here.
    pub async fn complete_free(
        &self,
        order_id: &str,
        discount_breakdown: serde_json::Value,
    ) -> Result<CompletionReport, CheckoutError> {
        let record = CompletionRecord {
            payment_method: FREE_PAYMENT_METHOD.to_string(),
            transaction_id: None,
            discount_breakdown: Some(discount_breakdown),
        };
        match self.orders.complete_unless_completed(order_id, &record).await? {
            Transition::Applied(order) => {
                tracing::info!(order_id, "free order completed");
                self.fire_completed(&order).await;
                Ok(CompletionReport::Completed(order))
            }
            Transition::Unchanged(_) => Ok(CompletionReport::AlreadyCompleted),
            Transition::Missing => Err(CheckoutError::validation(format!("order {order_id} not found"))),
        }
    }

    pub async fn decline(&self, order_id: &str, reason: &str) -> SettleReport {
        self.settle(order_id, OrderStatus::Declined, reason).await
    }

    pub async fn fail(&self, order_id: &str, reason: &str) -> SettleReport {
        self.settle(order_id, OrderStatus::Failed, reason).await
    }

    async fn settle(&self, order_id: &str, status: OrderStatus, reason: &str) -> SettleReport {
        match self.orders.settle_pending(order_id, status, reason).await {
            Ok(Transition::Applied(_)) => {
                tracing::info!(order_id, status = status.as_str(), reason, "order settled");
                SettleReport::Settled(status)
            }
            Ok(Transition::Unchanged(current)) => {
                tracing::info!(order_id, current = current.as_str(), "order not pending, leaving as is");
                SettleReport::Ignored(current)
            }
            Ok(Transition::Missing) => SettleReport::Missing,
            Err(e) => {
                tracing::error!(order_id, status = status.as_str(), error = %e, "order status write failed");
                SettleReport::WriteFailed
            }
        }
    }

    async fn fire_completed(&self, order: &OrderRecord) {
        if let Err(e) = self.events.order_completed(order).await {
            tracing::warn!(order_id = %order.order_id, error = %e, "order.completed fan-out failed");
        }
    }
}
