use crate::config::{CallbackUrls, ProviderEndpoints};
use crate::domain::checkout::{ConfirmRequest, InitRequest, InitResult, VerifyOutcome};
use crate::domain::gateway::{Gateway, Provider};
use crate::error::CheckoutError;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

pub mod paypal;
pub mod paystack;
pub mod powertranz;
pub mod razorpay;
pub mod stripe;

use paypal::PaypalAdapter;
use paystack::PaystackAdapter;
use powertranz::{HostedPage, PowertranzAdapter};
use razorpay::RazorpayAdapter;
use stripe::StripeAdapter;

/// One implementation per provider. `init` opens a payment session, `verify` checks the
/// outcome the client reports back.
#[async_trait::async_trait]
pub trait PaymentAdapter: Send + Sync {
    fn provider(&self) -> Provider;

    async fn init(&self, request: &InitRequest) -> Result<InitResult, CheckoutError>;

    async fn verify(&self, request: &ConfirmRequest) -> Result<VerifyOutcome, CheckoutError>;
}

pub trait AdapterFactory: Send + Sync {
    fn adapter_for(&self, gateway: &Gateway) -> Box<dyn PaymentAdapter>;
}

#[derive(Clone)]
pub struct ProviderHttp {
    pub client: reqwest::Client,
    pub timeout: Duration,
}

#[derive(Clone)]
pub struct HttpAdapterFactory {
    pub client: reqwest::Client,
    pub endpoints: ProviderEndpoints,
    pub callbacks: CallbackUrls,
    pub timeout_ms: u64,
}

impl AdapterFactory for HttpAdapterFactory {
    fn adapter_for(&self, gateway: &Gateway) -> Box<dyn PaymentAdapter> {
        let http = ProviderHttp {
            client: self.client.clone(),
            timeout: Duration::from_millis(self.timeout_ms),
        };
        match gateway.provider {
            Provider::Stripe => Box::new(StripeAdapter {
                base_url: self.endpoints.stripe_base_url.clone(),
                secret_key: gateway.secret_key.clone(),
                http,
            }),
            Provider::Razorpay => Box::new(RazorpayAdapter {
                base_url: self.endpoints.razorpay_base_url.clone(),
                key_id: gateway.public_key.clone(),
                key_secret: gateway.secret_key.clone(),
                http,
            }),
            Provider::Paypal => Box::new(PaypalAdapter {
                base_url: self.endpoints.paypal_base_url.clone(),
                client_id: gateway.public_key.clone(),
                client_secret: gateway.secret_key.clone(),
                http,
            }),
            Provider::Paystack => Box::new(PaystackAdapter {
                base_url: self.endpoints.paystack_base_url.clone(),
                secret_key: gateway.secret_key.clone(),
                callback_url: self.callbacks.paystack_return(),
                http,
            }),
            Provider::Powertranz => Box::new(PowertranzAdapter {
                base_url: self.endpoints.powertranz_base_url.clone(),
                powertranz_id: gateway.public_key.clone(),
                password: gateway.secret_key.clone(),
                three_ds_response_url: self.callbacks.three_ds_response(),
                hosted_page: HostedPage {
                    url: self.endpoints.powertranz_hpp_url.clone(),
                    page_set: self.endpoints.powertranz_hpp_page_set.clone(),
                    page_name: self.endpoints.powertranz_hpp_page_name.clone(),
                    callback_url: self.callbacks.hpp_callback(),
                },
                http,
            }),
        }
    }
}

/// Sends a request and returns the JSON body of a 2xx response. Everything else becomes
/// a `GatewayError` (or `GatewayTimeout`) with credentials scrubbed from the message.
pub(crate) async fn send_json(
    provider: Provider,
    request: reqwest::RequestBuilder,
    http: &ProviderHttp,
    secrets: &[&str],
) -> Result<Value, CheckoutError> {
    let resp = request.timeout(http.timeout).send().await;

    match resp {
        Ok(r) if r.status().is_success() => r
            .json::<Value>()
            .await
            .map_err(|e| upstream(provider, &format!("unreadable response: {e}"), secrets)),
        Ok(r) => {
            let status = r.status();
            if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::GATEWAY_TIMEOUT {
                return Err(CheckoutError::GatewayTimeout { provider });
            }
            let body = r.text().await.unwrap_or_default();
            let body: String = body.chars().take(200).collect();
            Err(upstream(provider, &format!("HTTP {}: {}", status.as_u16(), body), secrets))
        }
        Err(e) if e.is_timeout() => Err(CheckoutError::GatewayTimeout { provider }),
        Err(e) => Err(upstream(provider, &e.to_string(), secrets)),
    }
}

pub(crate) fn upstream(provider: Provider, message: &str, secrets: &[&str]) -> CheckoutError {
    CheckoutError::Gateway {
        provider,
        message: redact(message, secrets),
    }
}

pub fn redact(message: &str, secrets: &[&str]) -> String {
    secrets
        .iter()
        .filter(|s| s.len() >= 4)
        .fold(message.to_string(), |acc, secret| acc.replace(*secret, "[redacted]"))
}

pub(crate) fn required_str(provider: Provider, v: &Value, pointer: &str) -> Result<String, CheckoutError> {
    v.pointer(pointer)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| CheckoutError::Gateway {
            provider,
            message: format!("response is missing {pointer}"),
        })
}

pub(crate) fn wrong_provider(expected: Provider, request: &ConfirmRequest) -> CheckoutError {
    CheckoutError::validation(format!(
        "{} confirmation sent to the {} gateway",
        request.provider(),
        expected
    ))
}

/// Provider references end up in URL paths, so only plain identifier characters pass.
pub(crate) fn path_safe(id: &str) -> Result<&str, CheckoutError> {
    let ok = !id.is_empty()
        && id.len() <= 128
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(id)
    } else {
        Err(CheckoutError::validation("malformed payment reference"))
    }
}

/// `2050` -> `"20.50"`, for providers that take decimal strings.
pub fn major_units(amount_minor: i64) -> String {
    format!("{}.{:02}", amount_minor / 100, (amount_minor % 100).abs())
}
