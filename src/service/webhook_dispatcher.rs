use crate::domain::order::OrderRecord;
use crate::repo::webhook_repo::{DeliveryAttempt, WebhookRepo};
use crate::store::OrderEvents;
use anyhow::Result;
use ring::hmac;
use std::time::Duration;

pub const ORDER_COMPLETED: &str = "order.completed";

/// Fans order events out to the subscribed services (eSIM provisioning, receipts).
#[derive(Clone)]
pub struct WebhookDispatcher {
    pub webhook_repo: WebhookRepo,
    pub client: reqwest::Client,
    pub timeout_ms: u64,
}

pub fn order_completed_payload(order: &OrderRecord) -> serde_json::Value {
    serde_json::json!({
        "event": ORDER_COMPLETED,
        "orderId": order.order_id,
        "userId": order.user_id,
        "guestEmail": order.guest_email,
        "paymentMethod": order.payment_method,
        "transactionId": order.transaction_id,
        "discountBreakdown": order.discount_breakdown,
        "completedAt": order.updated_at.to_rfc3339(),
    })
}

/// Hex HMAC-SHA256 of the exact body bytes, sent as `X-Webhook-Signature`.
pub fn sign_body(secret: &str, body: &[u8]) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    hex::encode(hmac::sign(&key, body).as_ref())
}

impl WebhookDispatcher {
    /// Best effort: every subscriber gets one attempt and the outcome is logged. A
    /// subscriber that is down never affects the order.
    pub async fn emit(&self, event_type: &str, order_id: &str, payload: &serde_json::Value) -> Result<()> {
        let body = serde_json::to_vec(payload)?;
        for sub in self.webhook_repo.subscribers(event_type).await? {
            let mut req = self
                .client
                .post(&sub.target_url)
                .header("Content-Type", "application/json")
                .header("X-Event-Type", event_type)
                .timeout(Duration::from_millis(self.timeout_ms))
                .body(body.clone());
            if let Some(secret) = sub.signing_secret.as_deref() {
                req = req.header("X-Webhook-Signature", sign_body(secret, &body));
            }

            let (status_code, error) = match req.send().await {
                Ok(r) if r.status().is_success() => (Some(r.status().as_u16()), None),
                Ok(r) => {
                    let code = r.status().as_u16();
                    tracing::warn!(target_url = %sub.target_url, status = code, event_type, order_id, "webhook rejected");
                    (Some(code), Some(format!("subscriber answered {code}")))
                }
                Err(e) => {
                    tracing::warn!(target_url = %sub.target_url, error = %e, event_type, order_id, "webhook delivery failed");
                    (None, Some(e.to_string()))
                }
            };

            let attempt = DeliveryAttempt {
                subscription_id: sub.subscription_id,
                event_type,
                order_id,
                status_code,
                error,
            };
            if let Err(e) = self.webhook_repo.record_delivery(attempt).await {
                tracing::warn!(error = %e, order_id, "could not record webhook delivery");
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl OrderEvents for WebhookDispatcher {
    async fn order_completed(&self, order: &OrderRecord) -> Result<()> {
        self.emit(ORDER_COMPLETED, &order.order_id, &order_completed_payload(order))
            .await
    }
}
