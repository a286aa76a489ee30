use crate::domain::gateway::Provider;
use crate::domain::guest_token::GuestAccessToken;
use crate::domain::metadata::DiscountMetadata;
use crate::domain::order::OrderStatus;
use crate::domain::pricing::{DiscountInputs, PricingResult, PromoType};
use crate::error::CheckoutError;
use serde::{Deserialize, Serialize};

fn default_quantity() -> u32 {
    1
}

/// Body of `POST /payments/init`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitPaymentRequest {
    pub gateway_id: Option<String>,
    pub package_id: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    pub currency: Option<String>,
    pub order_id: Option<String>,
    pub promo_code: Option<String>,
    pub promo_type: Option<PromoType>,
    pub voucher_id: Option<String>,
    pub gift_card_id: Option<String>,
    /// Minor units of referral credit the buyer wants to spend.
    #[serde(default)]
    pub referral_credits: i64,
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    /// Set when topping up an already provisioned eSIM.
    pub iccid: Option<String>,
    pub card: Option<CardInput>,
    #[serde(default)]
    pub payment_method: PowertranzMethod,
    #[serde(default)]
    pub terms_accepted: bool,
}

impl InitPaymentRequest {
    pub fn discount_inputs(&self) -> DiscountInputs {
        DiscountInputs {
            promo_code: self.promo_code.clone(),
            promo_type: self.promo_type.unwrap_or_default(),
            voucher_id: self.voucher_id.clone(),
            gift_card_id: self.gift_card_id.clone(),
            referral_credits_minor: self.referral_credits,
        }
    }
}

#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardInput {
    pub pan: Option<String>,
    pub cvv: Option<String>,
    pub expiry: Option<String>,
    pub holder_name: Option<String>,
}

impl std::fmt::Debug for CardInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let last4 = self
            .pan
            .as_deref()
            .filter(|p| p.len() >= 4)
            .map(|p| &p[p.len() - 4..]);
        f.debug_struct("CardInput")
            .field("last4", &last4)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowertranzMethod {
    #[default]
    Spi,
    Hpp,
}

impl PowertranzMethod {
    pub fn payment_method_label(&self) -> &'static str {
        match self {
            PowertranzMethod::Spi => "powertranz-spi",
            PowertranzMethod::Hpp => "powertranz-hpp",
        }
    }
}

pub struct CardDetails {
    pub pan: String,
    pub cvv: String,
    /// PowerTranz wants `YYMM`.
    pub expiry_yymm: String,
    pub holder_name: Option<String>,
}

/// The two PowerTranz sub-flows: inline card capture with a 3DS iframe, or a hosted page.
pub enum PowertranzFlow {
    Spi(CardDetails),
    Hpp,
}

impl PowertranzFlow {
    pub fn resolve(method: PowertranzMethod, card: Option<&CardInput>) -> Result<Self, CheckoutError> {
        match method {
            PowertranzMethod::Hpp => Ok(PowertranzFlow::Hpp),
            PowertranzMethod::Spi => {
                let card = card.ok_or(CheckoutError::MissingCardDetails)?;
                let pan = present(&card.pan).ok_or(CheckoutError::MissingCardDetails)?;
                let cvv = present(&card.cvv).ok_or(CheckoutError::MissingCardDetails)?;
                let expiry = present(&card.expiry).ok_or(CheckoutError::MissingCardDetails)?;
                Ok(PowertranzFlow::Spi(CardDetails {
                    pan: pan.replace([' ', '-'], ""),
                    cvv,
                    expiry_yymm: expiry_to_yymm(&expiry)?,
                    holder_name: present(&card.holder_name),
                }))
            }
        }
    }

    pub fn method(&self) -> PowertranzMethod {
        match self {
            PowertranzFlow::Spi(_) => PowertranzMethod::Spi,
            PowertranzFlow::Hpp => PowertranzMethod::Hpp,
        }
    }
}

fn present(v: &Option<String>) -> Option<String> {
    v.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Accepts `MM/YY`, `MM/YYYY` or `MMYY`.
pub fn expiry_to_yymm(raw: &str) -> Result<String, CheckoutError> {
    let invalid = || CheckoutError::validation("card expiry must be MM/YY");
    let (month, year) = match raw.split_once('/') {
        Some((m, y)) => (m.trim().to_string(), y.trim().to_string()),
        None if raw.len() == 4 && raw.is_ascii() => (raw[..2].to_string(), raw[2..].to_string()),
        None => return Err(invalid()),
    };
    if !month.chars().all(|c| c.is_ascii_digit()) || !year.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let month_num: u32 = month.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month_num) {
        return Err(invalid());
    }
    let year = match year.len() {
        2 => year,
        4 => year[2..].to_string(),
        _ => return Err(invalid()),
    };
    Ok(format!("{year}{month_num:02}"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostalAddress {
    pub line1: String,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuyerProfile {
    pub user_id: String,
    pub email: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<PostalAddress>,
}

#[derive(Debug, Clone)]
pub struct GuestBuyer {
    pub email: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub access_token: GuestAccessToken,
}

#[derive(Debug, Clone)]
pub enum Buyer {
    Authenticated(BuyerProfile),
    Guest(GuestBuyer),
}

impl Buyer {
    pub fn email(&self) -> &str {
        match self {
            Buyer::Authenticated(p) => &p.email,
            Buyer::Guest(g) => &g.email,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Buyer::Authenticated(p) => p.name.as_deref(),
            Buyer::Guest(g) => g.name.as_deref(),
        }
    }

    pub fn phone(&self) -> Option<&str> {
        match self {
            Buyer::Authenticated(p) => p.phone.as_deref(),
            Buyer::Guest(g) => g.phone.as_deref(),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Buyer::Authenticated(p) => Some(&p.user_id),
            Buyer::Guest(_) => None,
        }
    }
}

/// Normalized adapter input. Pricing is already final when this is built.
#[derive(Debug, Clone)]
pub struct InitRequest {
    pub order_id: String,
    pub package_id: String,
    pub quantity: u32,
    pub amount_minor: i64,
    pub currency: String,
    pub buyer: Buyer,
    pub metadata: DiscountMetadata,
    pub powertranz_method: PowertranzMethod,
    pub card: Option<CardInput>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StripeInit {
    pub client_secret: String,
    pub payment_intent_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RazorpayInit {
    pub order_id: String,
    pub key_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaypalInit {
    pub order_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaystackInit {
    pub reference: String,
    pub authorization_url: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum PowertranzInit {
    Spi {
        #[serde(rename = "redirectData")]
        redirect_data: String,
        #[serde(rename = "spiToken")]
        spi_token: String,
    },
    Hpp {
        #[serde(rename = "redirectUrl")]
        redirect_url: String,
        #[serde(rename = "hppToken")]
        hpp_token: String,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum InitResult {
    Stripe(StripeInit),
    Razorpay(RazorpayInit),
    Paypal(PaypalInit),
    Paystack(PaystackInit),
    Powertranz(PowertranzInit),
}

impl InitResult {
    pub fn provider(&self) -> Provider {
        match self {
            InitResult::Stripe(_) => Provider::Stripe,
            InitResult::Razorpay(_) => Provider::Razorpay,
            InitResult::Paypal(_) => Provider::Paypal,
            InitResult::Paystack(_) => Provider::Paystack,
            InitResult::Powertranz(_) => Provider::Powertranz,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PowertranzPayment {
    pub provider: Provider,
    pub method: PowertranzMethod,
    pub order_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreePayment {
    pub provider: &'static str,
    pub order_id: String,
    pub status: OrderStatus,
}

/// Response of `POST /payments/init`. PowerTranz keeps its own shape so the client
/// can tell iframe injection from a full-page redirect.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum InitEnvelope {
    Flat {
        pricing: PricingResult,
        payment: InitResult,
        #[serde(rename = "guestAccessToken", skip_serializing_if = "Option::is_none")]
        guest_access_token: Option<String>,
    },
    Powertranz {
        pricing: PricingResult,
        powertranz: PowertranzInit,
        payment: PowertranzPayment,
        #[serde(rename = "guestAccessToken", skip_serializing_if = "Option::is_none")]
        guest_access_token: Option<String>,
    },
    Free {
        pricing: PricingResult,
        payment: FreePayment,
        #[serde(rename = "guestAccessToken", skip_serializing_if = "Option::is_none")]
        guest_access_token: Option<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StripeConfirm {
    pub payment_intent_id: String,
    pub order_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RazorpayConfirm {
    #[serde(alias = "razorpay_order_id")]
    pub razorpay_order_id: String,
    #[serde(alias = "razorpay_payment_id")]
    pub razorpay_payment_id: String,
    #[serde(alias = "razorpay_signature")]
    pub razorpay_signature: String,
    pub order_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaypalConfirm {
    #[serde(alias = "orderID")]
    pub paypal_order_id: String,
    pub order_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaystackConfirm {
    pub reference: String,
    pub order_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowertranzConfirm {
    pub spi_token: String,
    pub order_id: Option<String>,
    #[serde(default)]
    pub method: PowertranzMethod,
}

/// Body of `POST /payments/confirm`, tagged by provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum ConfirmRequest {
    Stripe(StripeConfirm),
    Razorpay(RazorpayConfirm),
    Paypal(PaypalConfirm),
    Paystack(PaystackConfirm),
    Powertranz(PowertranzConfirm),
}

impl ConfirmRequest {
    pub fn provider(&self) -> Provider {
        match self {
            ConfirmRequest::Stripe(_) => Provider::Stripe,
            ConfirmRequest::Razorpay(_) => Provider::Razorpay,
            ConfirmRequest::Paypal(_) => Provider::Paypal,
            ConfirmRequest::Paystack(_) => Provider::Paystack,
            ConfirmRequest::Powertranz(_) => Provider::Powertranz,
        }
    }

    pub fn client_order_id(&self) -> Option<&str> {
        match self {
            ConfirmRequest::Stripe(c) => c.order_id.as_deref(),
            ConfirmRequest::Razorpay(c) => c.order_id.as_deref(),
            ConfirmRequest::Paypal(c) => c.order_id.as_deref(),
            ConfirmRequest::Paystack(c) => c.order_id.as_deref(),
            ConfirmRequest::Powertranz(c) => c.order_id.as_deref(),
        }
    }

    pub fn payment_method_label(&self) -> &'static str {
        match self {
            ConfirmRequest::Powertranz(c) => c.method.payment_method_label(),
            other => other.provider().as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Approved,
    Declined(String),
    Failed(String),
    /// Not final yet, or not provably from the provider. Order is left alone.
    Unconfirmed(String),
}

#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    pub verdict: Verdict,
    pub order_id: Option<String>,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
