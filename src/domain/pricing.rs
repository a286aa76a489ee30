use crate::error::CheckoutError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromoType {
    #[default]
    Promo,
    Voucher,
}

/// Identifies the single primary discount a checkout asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "ref", rename_all = "snake_case")]
pub enum DiscountRef {
    PromoCode(String),
    VoucherCode(String),
    Voucher(String),
    GiftCard(String),
}

impl DiscountRef {
    pub fn label(&self) -> &'static str {
        match self {
            DiscountRef::PromoCode(_) => "promo",
            DiscountRef::VoucherCode(_) | DiscountRef::Voucher(_) => "voucher",
            DiscountRef::GiftCard(_) => "gift_card",
        }
    }
}

/// A discount as validated by the storefront, before it is sized against a subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscountRule {
    PercentOff { basis_points: i64 },
    AmountOff { amount_minor: i64 },
    GiftCardBalance { balance_minor: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscountLookup {
    Valid(DiscountRule),
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedDiscount {
    pub source: DiscountRef,
    pub amount_minor: i64,
}

/// Discount identifiers exactly as the buyer submitted them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscountInputs {
    pub promo_code: Option<String>,
    pub promo_type: PromoType,
    pub voucher_id: Option<String>,
    pub gift_card_id: Option<String>,
    pub referral_credits_minor: i64,
}

impl DiscountInputs {
    pub fn primary(&self) -> Result<Option<DiscountRef>, CheckoutError> {
        let mut found = Vec::new();
        if let Some(code) = non_blank(&self.promo_code) {
            found.push(match self.promo_type {
                PromoType::Promo => DiscountRef::PromoCode(code),
                PromoType::Voucher => DiscountRef::VoucherCode(code),
            });
        }
        if let Some(id) = non_blank(&self.voucher_id) {
            found.push(DiscountRef::Voucher(id));
        }
        if let Some(id) = non_blank(&self.gift_card_id) {
            found.push(DiscountRef::GiftCard(id));
        }

        if found.len() > 1 {
            return Err(CheckoutError::invalid_pricing(
                "only one of promo code, voucher or gift card can be applied",
            ));
        }
        Ok(found.pop())
    }
}

fn non_blank(v: &Option<String>) -> Option<String> {
    v.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingResult {
    pub unit_price_minor: i64,
    pub quantity: u32,
    pub subtotal_minor: i64,
    pub primary_discount: Option<AppliedDiscount>,
    pub referral_credits_minor: i64,
    pub total_minor: i64,
    pub currency: String,
    pub is_free: bool,
}

impl PricingResult {
    pub fn primary_discount_minor(&self) -> i64 {
        self.primary_discount.as_ref().map(|d| d.amount_minor).unwrap_or(0)
    }

    pub fn discount_total_minor(&self) -> i64 {
        self.subtotal_minor - self.total_minor
    }

    /// Breakdown stored on orders that complete without a gateway.
    pub fn breakdown(&self) -> serde_json::Value {
        serde_json::json!({
            "subtotal_minor": self.subtotal_minor,
            "primary_discount": self.primary_discount,
            "referral_credits_minor": self.referral_credits_minor,
            "total_minor": self.total_minor,
            "currency": self.currency,
        })
    }
}
