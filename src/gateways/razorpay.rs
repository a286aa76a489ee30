use crate::domain::checkout::{
    ConfirmRequest, InitRequest, InitResult, RazorpayInit, Verdict, VerifyOutcome,
};
use crate::domain::gateway::Provider;
use crate::error::CheckoutError;
use crate::gateways::{path_safe, required_str, send_json, wrong_provider, PaymentAdapter, ProviderHttp};
use ring::hmac;
use serde_json::{json, Value};

pub struct RazorpayAdapter {
    pub base_url: String,
    pub key_id: String,
    pub key_secret: String,
    pub http: ProviderHttp,
}

/// Checkout signature: hex HMAC-SHA256 of `"{order_id}|{payment_id}"` keyed with the
/// account secret. Compared in constant time.
pub fn signature_matches(key_secret: &str, razorpay_order_id: &str, payment_id: &str, signature_hex: &str) -> bool {
    let Ok(signature) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let key = hmac::Key::new(hmac::HMAC_SHA256, key_secret.as_bytes());
    let message = format!("{razorpay_order_id}|{payment_id}");
    hmac::verify(&key, message.as_bytes(), &signature).is_ok()
}

impl RazorpayAdapter {
    /// Reads back the notes attached at init. The signature does not cover our order id,
    /// so this is the only trusted source for it.
    async fn order_id_from_notes(&self, razorpay_order_id: &str) -> Option<String> {
        let id = path_safe(razorpay_order_id).ok()?;
        let req = self
            .http
            .client
            .get(format!("{}/v1/orders/{}", self.base_url, id))
            .basic_auth(&self.key_id, Some(&self.key_secret));
        match send_json(Provider::Razorpay, req, &self.http, &[self.key_secret.as_str()]).await {
            Ok(order) => order
                .pointer("/notes/order_id")
                .and_then(Value::as_str)
                .map(str::to_string),
            Err(e) => {
                tracing::warn!(error = %e, "razorpay order lookup failed");
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl PaymentAdapter for RazorpayAdapter {
    fn provider(&self) -> Provider {
        Provider::Razorpay
    }

    async fn init(&self, request: &InitRequest) -> Result<InitResult, CheckoutError> {
        let body = json!({
            "amount": request.amount_minor,
            "currency": request.currency,
            "receipt": request.order_id,
            "notes": request.metadata.serialize_for(Provider::Razorpay),
        });

        let req = self
            .http
            .client
            .post(format!("{}/v1/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body);
        let order = send_json(Provider::Razorpay, req, &self.http, &[self.key_secret.as_str()]).await?;

        Ok(InitResult::Razorpay(RazorpayInit {
            order_id: required_str(Provider::Razorpay, &order, "/id")?,
            key_id: self.key_id.clone(),
        }))
    }

    async fn verify(&self, request: &ConfirmRequest) -> Result<VerifyOutcome, CheckoutError> {
        let ConfirmRequest::Razorpay(confirm) = request else {
            return Err(wrong_provider(Provider::Razorpay, request));
        };

        if !signature_matches(
            &self.key_secret,
            &confirm.razorpay_order_id,
            &confirm.razorpay_payment_id,
            &confirm.razorpay_signature,
        ) {
            tracing::warn!(razorpay_order_id = %confirm.razorpay_order_id, "razorpay signature mismatch");
            return Ok(VerifyOutcome {
                verdict: Verdict::Unconfirmed("signature verification failed".to_string()),
                order_id: None,
                transaction_id: None,
            });
        }

        let Some(order_id) = self.order_id_from_notes(&confirm.razorpay_order_id).await else {
            return Ok(VerifyOutcome {
                verdict: Verdict::Unconfirmed("could not resolve the order for this payment".to_string()),
                order_id: None,
                transaction_id: Some(confirm.razorpay_payment_id.clone()),
            });
        };

        Ok(VerifyOutcome {
            verdict: Verdict::Approved,
            order_id: Some(order_id),
            transaction_id: Some(confirm.razorpay_payment_id.clone()),
        })
    }
}
