use crate::domain::checkout::{ConfirmRequest, InitRequest, InitResult, PaypalInit, Verdict, VerifyOutcome};
use crate::domain::gateway::Provider;
use crate::domain::metadata::{PaypalCustomId, PAYPAL_CUSTOM_ID_MAX};
use crate::error::CheckoutError;
use crate::gateways::{
    major_units, path_safe, required_str, send_json, wrong_provider, PaymentAdapter, ProviderHttp,
};
use serde_json::{json, Value};

pub struct PaypalAdapter {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub http: ProviderHttp,
}

impl PaypalAdapter {
    fn secrets(&self) -> [&str; 2] {
        [self.client_secret.as_str(), self.client_id.as_str()]
    }

    async fn access_token(&self) -> Result<String, CheckoutError> {
        let req = self
            .http
            .client
            .post(format!("{}/v1/oauth2/token", self.base_url))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")]);
        let token = send_json(Provider::Paypal, req, &self.http, &self.secrets()).await?;
        required_str(Provider::Paypal, &token, "/access_token")
    }

    async fn get_order(&self, token: &str, paypal_order_id: &str) -> Result<Value, CheckoutError> {
        let req = self
            .http
            .client
            .get(format!("{}/v2/checkout/orders/{}", self.base_url, paypal_order_id))
            .bearer_auth(token);
        send_json(Provider::Paypal, req, &self.http, &self.secrets()).await
    }

    async fn capture(&self, token: &str, paypal_order_id: &str) -> Result<Value, CheckoutError> {
        let req = self
            .http
            .client
            .post(format!("{}/v2/checkout/orders/{}/capture", self.base_url, paypal_order_id))
            .bearer_auth(token)
            .header("PayPal-Request-Id", format!("capture-{paypal_order_id}"))
            .json(&json!({}));
        send_json(Provider::Paypal, req, &self.http, &self.secrets()).await
    }
}

#[async_trait::async_trait]
impl PaymentAdapter for PaypalAdapter {
    fn provider(&self) -> Provider {
        Provider::Paypal
    }

    async fn init(&self, request: &InitRequest) -> Result<InitResult, CheckoutError> {
        let custom_id = request.metadata.serialize_for(Provider::Paypal);
        if custom_id.as_str().map_or(0, |s| s.chars().count()) > PAYPAL_CUSTOM_ID_MAX {
            return Err(CheckoutError::validation(format!(
                "order {} cannot be described within PayPal's custom_id limit",
                request.order_id
            )));
        }

        let token = self.access_token().await?;
        let body = json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "reference_id": request.order_id,
                "custom_id": custom_id,
                "description": format!("Order {}", request.order_id),
                "amount": {
                    "currency_code": request.currency,
                    "value": major_units(request.amount_minor),
                }
            }]
        });

        let req = self
            .http
            .client
            .post(format!("{}/v2/checkout/orders", self.base_url))
            .bearer_auth(&token)
            .header("PayPal-Request-Id", format!("{}-{}", request.order_id, request.amount_minor))
            .json(&body);
        let order = send_json(Provider::Paypal, req, &self.http, &self.secrets()).await?;

        Ok(InitResult::Paypal(PaypalInit {
            order_id: required_str(Provider::Paypal, &order, "/id")?,
        }))
    }

    async fn verify(&self, request: &ConfirmRequest) -> Result<VerifyOutcome, CheckoutError> {
        let ConfirmRequest::Paypal(confirm) = request else {
            return Err(wrong_provider(Provider::Paypal, request));
        };
        let paypal_order_id = path_safe(&confirm.paypal_order_id)?;
        let token = self.access_token().await?;
        let order = self.get_order(&token, paypal_order_id).await?;

        let status = order.get("status").and_then(Value::as_str).unwrap_or_default();
        let settled = match status {
            "APPROVED" => self.capture(&token, paypal_order_id).await?,
            "COMPLETED" => order.clone(),
            "VOIDED" => {
                return Ok(VerifyOutcome {
                    verdict: Verdict::Failed("order was voided".to_string()),
                    order_id: order_id_from(&order),
                    transaction_id: None,
                })
            }
            other => {
                return Ok(VerifyOutcome {
                    verdict: Verdict::Unconfirmed(format!("paypal order is {other}")),
                    order_id: order_id_from(&order),
                    transaction_id: None,
                })
            }
        };

        let mut outcome = classify_capture(&settled);
        if outcome.order_id.is_none() {
            outcome.order_id = order_id_from(&order);
        }
        Ok(outcome)
    }
}

fn order_id_from(order: &Value) -> Option<String> {
    let unit = order.pointer("/purchase_units/0")?;
    unit.get("custom_id")
        .and_then(Value::as_str)
        .and_then(PaypalCustomId::parse)
        .map(|c| c.order_id)
        .or_else(|| unit.get("reference_id").and_then(Value::as_str).map(str::to_string))
}

/// Maps a captured (or already completed) order onto a verdict.
pub fn classify_capture(order: &Value) -> VerifyOutcome {
    let capture = order.pointer("/purchase_units/0/payments/captures/0");
    let capture_status = capture
        .and_then(|c| c.get("status"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    let verdict = match capture_status {
        "COMPLETED" => Verdict::Approved,
        "DECLINED" | "FAILED" => Verdict::Declined(format!("capture {}", capture_status.to_ascii_lowercase())),
        "" => Verdict::Unconfirmed("no capture on the order".to_string()),
        other => Verdict::Unconfirmed(format!("capture is {other}")),
    };
    VerifyOutcome {
        verdict,
        order_id: order_id_from(order),
        transaction_id: capture
            .and_then(|c| c.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_capture_is_approved_and_reads_custom_id() {
        let order = json!({
            "id": "5O190127TN364715T",
            "status": "COMPLETED",
            "purchase_units": [{
                "reference_id": "ord-fallback",
                "custom_id": "{\"o\":\"ord-42\",\"t\":\"esim_purchase\"}",
                "payments": {"captures": [{"id": "CAP-1", "status": "COMPLETED"}]}
            }]
        });
        let out = classify_capture(&order);
        assert_eq!(out.verdict, Verdict::Approved);
        assert_eq!(out.order_id.as_deref(), Some("ord-42"));
        assert_eq!(out.transaction_id.as_deref(), Some("CAP-1"));
    }

    #[test]
    fn declined_capture_is_a_decline() {
        let order = json!({
            "purchase_units": [{
                "reference_id": "ord-7",
                "payments": {"captures": [{"id": "CAP-2", "status": "DECLINED"}]}
            }]
        });
        let out = classify_capture(&order);
        assert!(matches!(out.verdict, Verdict::Declined(_)));
        assert_eq!(out.order_id.as_deref(), Some("ord-7"));
    }

    #[test]
    fn pending_capture_stays_unconfirmed() {
        let order = json!({
            "purchase_units": [{"payments": {"captures": [{"id": "CAP-3", "status": "PENDING"}]}}]
        });
        assert!(matches!(classify_capture(&order).verdict, Verdict::Unconfirmed(_)));
    }
}
