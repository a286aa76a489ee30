use crate::domain::checkout::{
    CardDetails, ConfirmRequest, InitRequest, InitResult, PowertranzFlow, PowertranzInit, Verdict,
    VerifyOutcome,
};
use crate::domain::gateway::Provider;
use crate::error::CheckoutError;
use crate::gateways::{path_safe, send_json, wrong_provider, PaymentAdapter, ProviderHttp};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub struct HostedPage {
    pub url: String,
    pub page_set: String,
    pub page_name: String,
    pub callback_url: String,
}

pub struct PowertranzAdapter {
    pub base_url: String,
    pub powertranz_id: String,
    pub password: String,
    pub three_ds_response_url: String,
    pub hosted_page: HostedPage,
    pub http: ProviderHttp,
}

/// ISO 4217 numeric codes for the currencies the merchant accounts settle in.
pub fn numeric_currency(code: &str) -> Option<&'static str> {
    match code.to_ascii_uppercase().as_str() {
        "USD" => Some("840"),
        "JMD" => Some("388"),
        "TTD" => Some("780"),
        "BBD" => Some("052"),
        "EUR" => Some("978"),
        "GBP" => Some("826"),
        "XCD" => Some("951"),
        "KYD" => Some("136"),
        _ => None,
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SaleRequest {
    transaction_identifier: String,
    total_amount: f64,
    currency_code: &'static str,
    three_d_secure: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<CardSource>,
    order_identifier: String,
    address_match: bool,
    extended_data: ExtendedData,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CardSource {
    card_pan: String,
    card_cvv: String,
    card_expiration: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    cardholder_name: Option<String>,
}

impl From<&CardDetails> for CardSource {
    fn from(card: &CardDetails) -> Self {
        Self {
            card_pan: card.pan.clone(),
            card_cvv: card.cvv.clone(),
            card_expiration: card.expiry_yymm.clone(),
            cardholder_name: card.holder_name.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ExtendedData {
    #[serde(skip_serializing_if = "Option::is_none")]
    three_d_secure: Option<ThreeDSecure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hosted_page: Option<HostedPageRef>,
    merchant_response_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ThreeDSecure {
    challenge_window_size: u8,
    challenge_indicator: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct HostedPageRef {
    page_set: String,
    page_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SpiResponse {
    pub approved: bool,
    pub transaction_identifier: Option<String>,
    pub iso_response_code: Option<String>,
    pub response_message: Option<String>,
    pub order_identifier: Option<String>,
    pub spi_token: Option<String>,
    pub redirect_data: Option<String>,
    pub errors: Vec<SpiError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SpiError {
    pub code: Option<String>,
    pub message: Option<String>,
}

impl SpiResponse {
    pub fn failure_reason(&self) -> String {
        let joined = self
            .errors
            .iter()
            .filter_map(|e| e.message.as_deref())
            .collect::<Vec<_>>()
            .join("; ");
        if !joined.is_empty() {
            return joined;
        }
        self.response_message
            .clone()
            .unwrap_or_else(|| "transaction was not approved".to_string())
    }
}

impl PowertranzAdapter {
    fn sale_request(&self, request: &InitRequest, flow: &PowertranzFlow) -> Result<SaleRequest, CheckoutError> {
        let currency_code = numeric_currency(&request.currency).ok_or_else(|| {
            CheckoutError::validation(format!("{} is not accepted by powertranz", request.currency))
        })?;

        let (source, extended_data) = match flow {
            PowertranzFlow::Spi(card) => (
                Some(CardSource::from(card)),
                ExtendedData {
                    three_d_secure: Some(ThreeDSecure {
                        challenge_window_size: 4,
                        challenge_indicator: "01",
                    }),
                    hosted_page: None,
                    merchant_response_url: self.three_ds_response_url.clone(),
                },
            ),
            PowertranzFlow::Hpp => (
                None,
                ExtendedData {
                    three_d_secure: None,
                    hosted_page: Some(HostedPageRef {
                        page_set: self.hosted_page.page_set.clone(),
                        page_name: self.hosted_page.page_name.clone(),
                    }),
                    merchant_response_url: self.hosted_page.callback_url.clone(),
                },
            ),
        };

        Ok(SaleRequest {
            transaction_identifier: uuid::Uuid::new_v4().to_string(),
            total_amount: request.amount_minor as f64 / 100.0,
            currency_code,
            three_d_secure: true,
            source,
            order_identifier: request.order_id.clone(),
            address_match: false,
            extended_data,
        })
    }

    async fn post(&self, path: &str, body: &impl Serialize) -> Result<SpiResponse, CheckoutError> {
        let req = self
            .http
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("PowerTranz-PowerTranzId", &self.powertranz_id)
            .header("PowerTranz-PowerTranzPassword", &self.password)
            .json(body);
        let secrets = [self.password.as_str()];
        let value = send_json(Provider::Powertranz, req, &self.http, &secrets).await?;
        serde_json::from_value(value).map_err(|e| CheckoutError::Gateway {
            provider: Provider::Powertranz,
            message: format!("unexpected response shape: {e}"),
        })
    }
}

#[async_trait::async_trait]
impl PaymentAdapter for PowertranzAdapter {
    fn provider(&self) -> Provider {
        Provider::Powertranz
    }

    async fn init(&self, request: &InitRequest) -> Result<InitResult, CheckoutError> {
        // card fields are checked before anything leaves the process
        let flow = PowertranzFlow::resolve(request.powertranz_method, request.card.as_ref())?;
        let sale = self.sale_request(request, &flow)?;
        let resp = self.post("/spi/sale", &sale).await?;

        let rejected = |resp: &SpiResponse| CheckoutError::Gateway {
            provider: Provider::Powertranz,
            message: format!(
                "{}: {}",
                resp.iso_response_code.as_deref().unwrap_or("no code"),
                resp.failure_reason()
            ),
        };
        let spi_token = match resp.spi_token.as_deref().filter(|t| !t.is_empty()) {
            Some(t) => t.to_string(),
            None => return Err(rejected(&resp)),
        };

        let init = match flow {
            PowertranzFlow::Spi(_) => {
                let redirect_data = match resp.redirect_data.as_deref().filter(|d| !d.is_empty()) {
                    Some(d) => d.to_string(),
                    None => return Err(rejected(&resp)),
                };
                PowertranzInit::Spi {
                    redirect_data,
                    spi_token,
                }
            }
            PowertranzFlow::Hpp => PowertranzInit::Hpp {
                redirect_url: format!("{}/{}", self.hosted_page.url.trim_end_matches('/'), spi_token),
                hpp_token: spi_token,
            },
        };

        tracing::info!(order_id = %request.order_id, method = ?flow.method(), "powertranz sale staged");
        Ok(InitResult::Powertranz(init))
    }

    async fn verify(&self, request: &ConfirmRequest) -> Result<VerifyOutcome, CheckoutError> {
        let ConfirmRequest::Powertranz(confirm) = request else {
            return Err(wrong_provider(Provider::Powertranz, request));
        };
        let token = path_safe(confirm.spi_token.trim())?;
        let resp = self.post("/spi/payment", &Value::String(token.to_string())).await?;
        Ok(classify_payment(&resp))
    }
}

pub fn classify_payment(resp: &SpiResponse) -> VerifyOutcome {
    let verdict = if resp.approved {
        Verdict::Approved
    } else {
        Verdict::Declined(resp.failure_reason())
    };
    VerifyOutcome {
        verdict,
        order_id: resp.order_identifier.clone(),
        transaction_id: resp.transaction_identifier.clone(),
    }
}
