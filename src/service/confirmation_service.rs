use crate::domain::checkout::{
    ConfirmRequest, ConfirmResponse, PowertranzConfirm, PowertranzMethod, Verdict, VerifyOutcome,
};
use crate::domain::gateway::Provider;
use crate::domain::order::{CompletionRecord, OrderStatus};
use crate::error::CheckoutError;
use crate::gateways::AdapterFactory;
use crate::service::gateway_registry::GatewayRegistry;
use crate::service::order_state::{CompletionReport, OrderStateMutator, SettleReport};
use crate::service::three_ds_bridge::CallbackResult;
use std::sync::Arc;

#[derive(Clone)]
pub struct ConfirmationService {
    pub registry: GatewayRegistry,
    pub adapters: Arc<dyn AdapterFactory>,
    pub mutator: OrderStateMutator,
}

fn settled_response(status: OrderStatus, order_id: &str, message: String) -> ConfirmResponse {
    ConfirmResponse {
        success: status == OrderStatus::Completed,
        status: Some(status),
        transaction_id: None,
        order_id: Some(order_id.to_string()),
        message: Some(message),
    }
}

/// `success: false` with the order left exactly as it was.
fn unsettled_response(order_id: Option<String>, message: String) -> ConfirmResponse {
    ConfirmResponse {
        success: false,
        status: None,
        transaction_id: None,
        order_id,
        message: Some(message),
    }
}

impl ConfirmationService {
    /// Verifies a client-reported payment with the provider and moves the order.
    /// A decline is a normal `success: false` answer, not an error.
    pub async fn confirm(&self, request: ConfirmRequest) -> Result<ConfirmResponse, CheckoutError> {
        let outcome = self.verify(&request).await?;
        self.apply(&request, outcome).await
    }

    async fn verify(&self, request: &ConfirmRequest) -> Result<VerifyOutcome, CheckoutError> {
        let gateway = self.registry.find_enabled_by_provider(request.provider()).await?;
        self.adapters.adapter_for(&gateway).verify(request).await
    }

    async fn apply(&self, request: &ConfirmRequest, outcome: VerifyOutcome) -> Result<ConfirmResponse, CheckoutError> {
        let provider = request.provider();
        let client_order_id = request.client_order_id().map(str::trim).filter(|s| !s.is_empty());
        if let (Some(from_provider), Some(from_client)) = (outcome.order_id.as_deref(), client_order_id) {
            if from_provider != from_client {
                tracing::warn!(%provider, from_provider, from_client, "order id mismatch, using provider value");
            }
        }
        let named_by_provider = outcome.order_id.is_some();
        let order_id = outcome
            .order_id
            .clone()
            .or_else(|| client_order_id.map(str::to_string));

        let Some(order_id) = order_id else {
            if let Verdict::Approved = outcome.verdict {
                tracing::error!(%provider, transaction_id = ?outcome.transaction_id, "approved payment carries no order id");
            }
            return Err(CheckoutError::validation("orderId is required"));
        };

        tracing::info!(%provider, order_id = %order_id, verdict = ?outcome.verdict, "payment verified");

        let response = match outcome.verdict {
            Verdict::Approved => {
                let record = CompletionRecord {
                    payment_method: request.payment_method_label().to_string(),
                    transaction_id: outcome.transaction_id.clone(),
                    discount_breakdown: None,
                };
                let message = match self.mutator.complete(&order_id, &record).await {
                    CompletionReport::Completed(_) => None,
                    CompletionReport::AlreadyCompleted => Some("order was already completed".to_string()),
                    CompletionReport::PersistenceWarning(_) => {
                        Some("payment received, order update is pending".to_string())
                    }
                };
                ConfirmResponse {
                    success: true,
                    status: Some(OrderStatus::Completed),
                    transaction_id: outcome.transaction_id,
                    order_id: Some(order_id),
                    message,
                }
            }
            // a decline only moves the order the provider itself tied to the payment
            Verdict::Declined(reason) | Verdict::Failed(reason) if !named_by_provider => {
                tracing::warn!(%provider, order_id = %order_id, "unsuccessful payment not tied to an order by the provider, order left as is");
                unsettled_response(Some(order_id), reason)
            }
            Verdict::Declined(reason) => {
                let status = settled_status(self.mutator.decline(&order_id, &reason).await, OrderStatus::Declined);
                settled_response(status, &order_id, reason)
            }
            Verdict::Failed(reason) => {
                let status = settled_status(self.mutator.fail(&order_id, &reason).await, OrderStatus::Failed);
                settled_response(status, &order_id, reason)
            }
            Verdict::Unconfirmed(reason) => unsettled_response(Some(order_id), reason),
        };
        Ok(response)
    }

    /// Hosted-page callbacks and server notifications. These bodies are unauthenticated,
    /// so the order only moves on an approval read back from PowerTranz with the SPI
    /// token. Anything else is logged and leaves the order untouched.
    pub async fn settle_hosted_page(&self, result: &CallbackResult) -> Result<ConfirmResponse, CheckoutError> {
        let Some(spi_token) = result.spi_token.as_deref() else {
            tracing::warn!(
                order_id = ?result.order_identifier,
                message = %result.message,
                "hosted page result without spi token, order left as is"
            );
            return Ok(unsettled_response(result.order_identifier.clone(), result.message.clone()));
        };

        let request = ConfirmRequest::Powertranz(PowertranzConfirm {
            spi_token: spi_token.to_string(),
            order_id: result.order_identifier.clone(),
            method: PowertranzMethod::Hpp,
        });
        let outcome = self.verify(&request).await?;
        match outcome.verdict {
            Verdict::Approved => self.apply(&request, outcome).await,
            Verdict::Declined(reason) | Verdict::Failed(reason) | Verdict::Unconfirmed(reason) => {
                tracing::info!(
                    provider = %Provider::Powertranz,
                    order_id = ?result.order_identifier,
                    %reason,
                    "hosted page payment not approved, order left pending"
                );
                Ok(unsettled_response(
                    outcome.order_id.or_else(|| result.order_identifier.clone()),
                    reason,
                ))
            }
        }
    }
}

// A late decline for an order that already completed reports the real status.
fn settled_status(report: SettleReport, attempted: OrderStatus) -> OrderStatus {
    match report {
        SettleReport::Ignored(current) => current,
        _ => attempted,
    }
}
