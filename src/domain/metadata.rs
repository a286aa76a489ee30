use crate::domain::gateway::Provider;
use crate::domain::pricing::{DiscountRef, PricingResult};
use crate::error::CheckoutError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// PayPal rejects a `custom_id` longer than this.
pub const PAYPAL_CUSTOM_ID_MAX: usize = 127;
const RAZORPAY_NOTE_MAX: usize = 256;
/// Longest order id accepted at init. With the longest kind tag the bare PayPal
/// `custom_id` (order id and kind only) stays under `PAYPAL_CUSTOM_ID_MAX`.
pub const ORDER_ID_MAX: usize = 64;

/// Order ids travel in provider metadata and URLs, so only short plain identifiers pass.
pub fn validate_order_id(order_id: &str) -> Result<&str, CheckoutError> {
    if order_id.len() > ORDER_ID_MAX {
        return Err(CheckoutError::validation(format!(
            "orderId must be at most {ORDER_ID_MAX} characters"
        )));
    }
    if !order_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(CheckoutError::validation(
            "orderId may only contain letters, digits, '-' and '_'",
        ));
    }
    Ok(order_id)
}

/// Who is buying and what: the four shapes differ in which identity fields they carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderShape {
    Package { user_id: String },
    GuestPackage { email: String },
    TopUp { user_id: String, iccid: String },
    GuestTopUp { email: String, iccid: String },
}

impl OrderShape {
    pub fn classify(
        user_id: Option<&str>,
        guest_email: Option<&str>,
        iccid: Option<&str>,
    ) -> Result<Self, CheckoutError> {
        let iccid = iccid.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        match (user_id, guest_email, iccid) {
            (Some(user_id), _, None) => Ok(OrderShape::Package {
                user_id: user_id.to_string(),
            }),
            (Some(user_id), _, Some(iccid)) => Ok(OrderShape::TopUp {
                user_id: user_id.to_string(),
                iccid,
            }),
            (None, Some(email), None) => Ok(OrderShape::GuestPackage {
                email: email.to_string(),
            }),
            (None, Some(email), Some(iccid)) => Ok(OrderShape::GuestTopUp {
                email: email.to_string(),
                iccid,
            }),
            (None, None, _) => Err(CheckoutError::validation("email is required for guest checkout")),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            OrderShape::Package { .. } => "esim_purchase",
            OrderShape::GuestPackage { .. } => "guest_esim_purchase",
            OrderShape::TopUp { .. } => "topup",
            OrderShape::GuestTopUp { .. } => "guest_topup",
        }
    }

    pub fn is_topup(&self) -> bool {
        matches!(self, OrderShape::TopUp { .. } | OrderShape::GuestTopUp { .. })
    }
}

/// Immutable description of the order and the discounts that priced it, attached to
/// whichever provider is chosen. Adapters never re-validate any of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscountMetadata {
    pub order_id: String,
    pub package_id: String,
    pub quantity: u32,
    pub shape: OrderShape,
    pub discount: Option<DiscountRef>,
    pub discount_minor: i64,
    pub referral_credits_minor: i64,
}

impl DiscountMetadata {
    pub fn new(order_id: &str, package_id: &str, shape: OrderShape, pricing: &PricingResult) -> Self {
        Self {
            order_id: order_id.to_string(),
            package_id: package_id.to_string(),
            quantity: pricing.quantity,
            shape,
            discount: pricing.primary_discount.as_ref().map(|d| d.source.clone()),
            discount_minor: pricing.primary_discount_minor(),
            referral_credits_minor: pricing.referral_credits_minor,
        }
    }

    /// Flat key/value view shared by every provider encoding.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let mut out = vec![("type", self.shape.kind().to_string()), ("order_id", self.order_id.clone())];
        match &self.shape {
            OrderShape::Package { user_id } => {
                out.push(("user_id", user_id.clone()));
                out.push(("package_id", self.package_id.clone()));
                out.push(("quantity", self.quantity.to_string()));
            }
            OrderShape::GuestPackage { email } => {
                out.push(("guest_email", email.clone()));
                out.push(("package_id", self.package_id.clone()));
                out.push(("quantity", self.quantity.to_string()));
            }
            OrderShape::TopUp { user_id, iccid } => {
                out.push(("user_id", user_id.clone()));
                out.push(("iccid", iccid.clone()));
                out.push(("topup_package_id", self.package_id.clone()));
            }
            OrderShape::GuestTopUp { email, iccid } => {
                out.push(("guest_email", email.clone()));
                out.push(("iccid", iccid.clone()));
                out.push(("topup_package_id", self.package_id.clone()));
            }
        }
        match &self.discount {
            Some(DiscountRef::PromoCode(code)) => {
                out.push(("promo_code", code.clone()));
                out.push(("promo_type", "promo".to_string()));
            }
            Some(DiscountRef::VoucherCode(code)) => {
                out.push(("promo_code", code.clone()));
                out.push(("promo_type", "voucher".to_string()));
            }
            Some(DiscountRef::Voucher(id)) => out.push(("voucher_id", id.clone())),
            Some(DiscountRef::GiftCard(id)) => out.push(("gift_card_id", id.clone())),
            None => {}
        }
        if self.discount_minor > 0 {
            out.push(("discount_amount", self.discount_minor.to_string()));
        }
        if self.referral_credits_minor > 0 {
            out.push(("referral_credits", self.referral_credits_minor.to_string()));
        }
        out
    }

    /// Encodes the metadata the way `provider` accepts it:
    /// Stripe gets form keys (`metadata[..]`), Razorpay gets string notes, PayPal gets a
    /// compact JSON string for `custom_id`, Paystack gets a typed object and PowerTranz
    /// only carries the order identifier.
    pub fn serialize_for(&self, provider: Provider) -> Value {
        match provider {
            Provider::Stripe => {
                let map: Map<String, Value> = self
                    .fields()
                    .into_iter()
                    .map(|(k, v)| (format!("metadata[{k}]"), Value::String(v)))
                    .collect();
                Value::Object(map)
            }
            Provider::Razorpay => {
                let map: Map<String, Value> = self
                    .fields()
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), Value::String(v.chars().take(RAZORPAY_NOTE_MAX).collect())))
                    .collect();
                Value::Object(map)
            }
            Provider::Paypal => Value::String(self.paypal_custom_id()),
            Provider::Paystack => {
                let mut map: Map<String, Value> = self
                    .fields()
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), Value::String(v)))
                    .collect();
                map.insert("quantity".to_string(), json!(self.quantity));
                map.insert("discount_amount".to_string(), json!(self.discount_minor));
                map.insert("referral_credits".to_string(), json!(self.referral_credits_minor));
                Value::Object(map)
            }
            Provider::Powertranz => Value::String(self.order_id.clone()),
        }
    }

    fn paypal_custom_id(&self) -> String {
        let mut compact = PaypalCustomId {
            order_id: self.order_id.clone(),
            kind: self.shape.kind().to_string(),
            package_id: Some(self.package_id.clone()),
            quantity: Some(self.quantity),
            user_id: None,
            guest_email: None,
            iccid: None,
            discount: self.discount.as_ref().map(|d| match d {
                DiscountRef::PromoCode(c) => format!("p:{c}"),
                DiscountRef::VoucherCode(c) => format!("vc:{c}"),
                DiscountRef::Voucher(id) => format!("v:{id}"),
                DiscountRef::GiftCard(id) => format!("g:{id}"),
            }),
            discount_minor: (self.discount_minor > 0).then_some(self.discount_minor),
            referral_credits_minor: (self.referral_credits_minor > 0).then_some(self.referral_credits_minor),
        };
        match &self.shape {
            OrderShape::Package { user_id } => compact.user_id = Some(user_id.clone()),
            OrderShape::GuestPackage { email } => compact.guest_email = Some(email.clone()),
            OrderShape::TopUp { user_id, iccid } => {
                compact.user_id = Some(user_id.clone());
                compact.iccid = Some(iccid.clone());
            }
            OrderShape::GuestTopUp { email, iccid } => {
                compact.guest_email = Some(email.clone());
                compact.iccid = Some(iccid.clone());
            }
        }
        compact.fit(PAYPAL_CUSTOM_ID_MAX)
    }
}

/// The JSON carried in a PayPal order's `custom_id`, read back by the verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaypalCustomId {
    #[serde(rename = "o")]
    pub order_id: String,
    #[serde(rename = "t")]
    pub kind: String,
    #[serde(rename = "p", default, skip_serializing_if = "Option::is_none")]
    pub package_id: Option<String>,
    #[serde(rename = "q", default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(rename = "u", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(rename = "e", default, skip_serializing_if = "Option::is_none")]
    pub guest_email: Option<String>,
    #[serde(rename = "i", default, skip_serializing_if = "Option::is_none")]
    pub iccid: Option<String>,
    #[serde(rename = "d", default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<String>,
    #[serde(rename = "a", default, skip_serializing_if = "Option::is_none")]
    pub discount_minor: Option<i64>,
    #[serde(rename = "r", default, skip_serializing_if = "Option::is_none")]
    pub referral_credits_minor: Option<i64>,
}

impl PaypalCustomId {
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }

    fn encoded(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Drops the least useful fields until the encoding fits `max` characters.
    fn fit(mut self, max: usize) -> String {
        let mut encoded = self.encoded();
        let mut step = 0;
        while encoded.chars().count() > max && step < 8 {
            match step {
                0 => self.guest_email = None,
                1 => self.discount = None,
                2 => self.discount_minor = None,
                3 => self.referral_credits_minor = None,
                4 => self.quantity = None,
                5 => self.package_id = None,
                6 => self.user_id = None,
                _ => self.iccid = None,
            }
            encoded = self.encoded();
            step += 1;
        }
        encoded
    }
}
