use crate::domain::checkout::{
    Buyer, ConfirmRequest, InitRequest, InitResult, StripeInit, Verdict, VerifyOutcome,
};
use crate::domain::gateway::Provider;
use crate::error::CheckoutError;
use crate::gateways::{path_safe, required_str, send_json, wrong_provider, PaymentAdapter, ProviderHttp};
use serde_json::Value;

pub struct StripeAdapter {
    pub base_url: String,
    pub secret_key: String,
    pub http: ProviderHttp,
}

type Form = Vec<(String, String)>;

fn push(form: &mut Form, key: &str, value: impl Into<String>) {
    form.push((key.to_string(), value.into()));
}

fn push_opt(form: &mut Form, key: &str, value: Option<&str>) {
    if let Some(v) = value.filter(|v| !v.is_empty()) {
        push(form, key, v);
    }
}

impl StripeAdapter {
    async fn post_form(&self, path: &str, form: &Form, idempotency_key: Option<&str>) -> Result<Value, CheckoutError> {
        let mut req = self
            .http
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.secret_key)
            .form(form);
        if let Some(key) = idempotency_key {
            req = req.header("Idempotency-Key", key);
        }
        send_json(Provider::Stripe, req, &self.http, &[self.secret_key.as_str()]).await
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, CheckoutError> {
        let req = self
            .http
            .client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.secret_key)
            .query(query);
        send_json(Provider::Stripe, req, &self.http, &[self.secret_key.as_str()]).await
    }

    /// Members reuse the customer registered under their e-mail; guests always get a
    /// fresh customer that carries their access token.
    async fn customer_for(&self, buyer: &Buyer) -> Result<String, CheckoutError> {
        let mut form = Form::new();
        match buyer {
            Buyer::Authenticated(profile) => {
                let found = self
                    .get("/v1/customers", &[("email", profile.email.as_str()), ("limit", "1")])
                    .await?;
                if let Some(id) = found.pointer("/data/0/id").and_then(Value::as_str) {
                    return Ok(id.to_string());
                }

                push(&mut form, "email", profile.email.as_str());
                push_opt(&mut form, "name", profile.name.as_deref());
                push_opt(&mut form, "phone", profile.phone.as_deref());
                push(&mut form, "metadata[user_id]", profile.user_id.as_str());
                if let Some(address) = &profile.address {
                    push(&mut form, "address[line1]", address.line1.as_str());
                    push_opt(&mut form, "address[city]", address.city.as_deref());
                    push_opt(&mut form, "address[postal_code]", address.postal_code.as_deref());
                    push_opt(&mut form, "address[country]", address.country.as_deref());
                }
            }
            Buyer::Guest(guest) => {
                push(&mut form, "email", guest.email.as_str());
                push_opt(&mut form, "name", guest.name.as_deref());
                push_opt(&mut form, "phone", guest.phone.as_deref());
                push(&mut form, "metadata[is_guest]", "true");
                push(&mut form, "metadata[guest_access_token]", guest.access_token.as_str());
            }
        }

        let created = self.post_form("/v1/customers", &form, None).await?;
        required_str(Provider::Stripe, &created, "/id")
    }
}

#[async_trait::async_trait]
impl PaymentAdapter for StripeAdapter {
    fn provider(&self) -> Provider {
        Provider::Stripe
    }

    async fn init(&self, request: &InitRequest) -> Result<InitResult, CheckoutError> {
        let customer_id = self.customer_for(&request.buyer).await?;

        let mut form = Form::new();
        push(&mut form, "amount", request.amount_minor.to_string());
        push(&mut form, "currency", request.currency.to_ascii_lowercase());
        push(&mut form, "customer", customer_id);
        push(&mut form, "automatic_payment_methods[enabled]", "true");
        push(&mut form, "receipt_email", request.buyer.email());
        push(&mut form, "description", format!("Order {}", request.order_id));
        if let Value::Object(metadata) = request.metadata.serialize_for(Provider::Stripe) {
            for (key, value) in metadata {
                if let Value::String(v) = value {
                    form.push((key, v));
                }
            }
        }

        // a retried init for the same order and amount returns the same intent
        let idempotency_key = format!(
            "esim-{}-{}-{}",
            request.order_id, request.amount_minor, request.currency
        );
        let intent = self
            .post_form("/v1/payment_intents", &form, Some(&idempotency_key))
            .await?;

        tracing::info!(order_id = %request.order_id, "stripe payment intent created");
        Ok(InitResult::Stripe(StripeInit {
            client_secret: required_str(Provider::Stripe, &intent, "/client_secret")?,
            payment_intent_id: required_str(Provider::Stripe, &intent, "/id")?,
        }))
    }

    async fn verify(&self, request: &ConfirmRequest) -> Result<VerifyOutcome, CheckoutError> {
        let ConfirmRequest::Stripe(confirm) = request else {
            return Err(wrong_provider(Provider::Stripe, request));
        };
        let intent_id = path_safe(&confirm.payment_intent_id)?;
        let intent = self.get(&format!("/v1/payment_intents/{intent_id}"), &[]).await?;
        Ok(classify_intent(&intent))
    }
}

pub fn classify_intent(intent: &Value) -> VerifyOutcome {
    let status = intent.get("status").and_then(Value::as_str).unwrap_or_default();
    let verdict = match status {
        "succeeded" => Verdict::Approved,
        "canceled" => Verdict::Failed(
            intent
                .get("cancellation_reason")
                .and_then(Value::as_str)
                .unwrap_or("payment was canceled")
                .to_string(),
        ),
        "requires_payment_method" => match intent.pointer("/last_payment_error/message").and_then(Value::as_str) {
            Some(message) => Verdict::Declined(message.to_string()),
            None => Verdict::Unconfirmed("payment method not provided yet".to_string()),
        },
        other => Verdict::Unconfirmed(format!("payment intent is {other}")),
    };

    let transaction_id = intent
        .get("latest_charge")
        .and_then(Value::as_str)
        .or_else(|| intent.get("id").and_then(Value::as_str))
        .map(str::to_string);

    VerifyOutcome {
        verdict,
        order_id: intent
            .pointer("/metadata/order_id")
            .and_then(Value::as_str)
            .map(str::to_string),
        transaction_id,
    }
}
