use crate::domain::checkout::{ConfirmRequest, InitRequest, InitResult, PaystackInit, Verdict, VerifyOutcome};
use crate::domain::gateway::Provider;
use crate::error::CheckoutError;
use crate::gateways::{path_safe, required_str, send_json, wrong_provider, PaymentAdapter, ProviderHttp};
use serde_json::{json, Value};

pub struct PaystackAdapter {
    pub base_url: String,
    pub secret_key: String,
    pub callback_url: String,
    pub http: ProviderHttp,
}

/// References must be unique per attempt, so a short random suffix follows the order id.
pub fn new_reference(order_id: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", order_id, &suffix[..8])
}

#[async_trait::async_trait]
impl PaymentAdapter for PaystackAdapter {
    fn provider(&self) -> Provider {
        Provider::Paystack
    }

    async fn init(&self, request: &InitRequest) -> Result<InitResult, CheckoutError> {
        let body = json!({
            "email": request.buyer.email(),
            "amount": request.amount_minor,
            "currency": request.currency,
            "reference": new_reference(&request.order_id),
            "callback_url": self.callback_url,
            "metadata": request.metadata.serialize_for(Provider::Paystack),
        });

        let req = self
            .http
            .client
            .post(format!("{}/transaction/initialize", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&body);
        let resp = send_json(Provider::Paystack, req, &self.http, &[self.secret_key.as_str()]).await?;

        if resp.get("status").and_then(Value::as_bool) == Some(false) {
            let message = resp.get("message").and_then(Value::as_str).unwrap_or("initialization rejected");
            return Err(CheckoutError::Gateway {
                provider: Provider::Paystack,
                message: message.to_string(),
            });
        }

        Ok(InitResult::Paystack(PaystackInit {
            reference: required_str(Provider::Paystack, &resp, "/data/reference")?,
            authorization_url: required_str(Provider::Paystack, &resp, "/data/authorization_url")?,
        }))
    }

    async fn verify(&self, request: &ConfirmRequest) -> Result<VerifyOutcome, CheckoutError> {
        let ConfirmRequest::Paystack(confirm) = request else {
            return Err(wrong_provider(Provider::Paystack, request));
        };
        let reference = path_safe(&confirm.reference)?;
        let req = self
            .http
            .client
            .get(format!("{}/transaction/verify/{}", self.base_url, reference))
            .bearer_auth(&self.secret_key);
        let resp = send_json(Provider::Paystack, req, &self.http, &[self.secret_key.as_str()]).await?;
        Ok(classify_transaction(&resp))
    }
}

pub fn classify_transaction(resp: &Value) -> VerifyOutcome {
    let data = resp.get("data").cloned().unwrap_or(Value::Null);
    let status = data.get("status").and_then(Value::as_str).unwrap_or_default();
    let gateway_response = data
        .get("gateway_response")
        .and_then(Value::as_str)
        .unwrap_or(status)
        .to_string();

    let verdict = match status {
        "success" => Verdict::Approved,
        "failed" => Verdict::Declined(gateway_response),
        "reversed" => Verdict::Failed(gateway_response),
        other => Verdict::Unconfirmed(format!("transaction is {other}")),
    };

    let transaction_id = match data.get("id") {
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    };

    VerifyOutcome {
        verdict,
        order_id: data
            .pointer("/metadata/order_id")
            .and_then(Value::as_str)
            .map(str::to_string),
        transaction_id,
    }
}
