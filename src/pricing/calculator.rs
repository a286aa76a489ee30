use crate::domain::pricing::{AppliedDiscount, DiscountRef, DiscountRule, PricingResult};
use crate::error::CheckoutError;

const BPS: i128 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingInputs {
    pub unit_price_minor: i64,
    pub quantity: u32,
    pub currency: String,
    pub primary: Option<(DiscountRef, DiscountRule)>,
    pub referral_credits_requested: i64,
    pub referral_balance: i64,
}

/// Pure: the same inputs always produce the same result.
pub fn calculate(inputs: &PricingInputs) -> Result<PricingResult, CheckoutError> {
    let mut draft = PricingDraft::new(inputs.unit_price_minor, inputs.quantity, &inputs.currency)?;
    if let Some((source, rule)) = &inputs.primary {
        draft = draft.apply_primary(source.clone(), *rule)?;
    }
    draft
        .apply_referral_credits(inputs.referral_credits_requested, inputs.referral_balance)?
        .finish()
}

#[derive(Debug, Clone)]
pub struct PricingDraft {
    unit_price_minor: i64,
    quantity: u32,
    subtotal_minor: i64,
    currency: String,
    primary: Option<AppliedDiscount>,
    referral_minor: i64,
}

impl PricingDraft {
    pub fn new(unit_price_minor: i64, quantity: u32, currency: &str) -> Result<Self, CheckoutError> {
        if quantity == 0 {
            return Err(CheckoutError::validation("quantity must be at least 1"));
        }
        if unit_price_minor < 0 {
            return Err(CheckoutError::invalid_pricing("package price is negative"));
        }
        let subtotal_minor = unit_price_minor
            .checked_mul(i64::from(quantity))
            .ok_or_else(|| CheckoutError::invalid_pricing("subtotal overflow"))?;

        Ok(Self {
            unit_price_minor,
            quantity,
            subtotal_minor,
            currency: currency.trim().to_ascii_uppercase(),
            primary: None,
            referral_minor: 0,
        })
    }

    pub fn apply_primary(mut self, source: DiscountRef, rule: DiscountRule) -> Result<Self, CheckoutError> {
        if self.primary.is_some() {
            return Err(CheckoutError::invalid_pricing("a primary discount is already applied"));
        }
        // never record more than the order can absorb; the rest of a gift card stays on the card
        let amount_minor = size_discount(rule, self.subtotal_minor)?.min(self.subtotal_minor);
        self.primary = Some(AppliedDiscount { source, amount_minor });
        Ok(self)
    }

    /// Credits are capped at what the primary discount leaves; asking for more is rejected.
    pub fn apply_referral_credits(mut self, requested: i64, balance: i64) -> Result<Self, CheckoutError> {
        if requested < 0 {
            return Err(CheckoutError::invalid_pricing("referral credits cannot be negative"));
        }
        if requested == 0 {
            return Ok(self);
        }
        if self.referral_minor > 0 {
            return Err(CheckoutError::invalid_pricing("referral credits are already applied"));
        }
        if requested > balance {
            return Err(CheckoutError::invalid_pricing(
                "referral credits exceed the available balance",
            ));
        }
        if requested > self.remaining_after_primary() {
            return Err(CheckoutError::invalid_pricing(
                "referral credits exceed the amount left after discounts",
            ));
        }
        self.referral_minor = requested;
        Ok(self)
    }

    pub fn finish(self) -> Result<PricingResult, CheckoutError> {
        // a primary discount added after the credits can push the credits past the cap
        if self.referral_minor > self.remaining_after_primary() {
            return Err(CheckoutError::invalid_pricing(
                "referral credits exceed the amount left after discounts",
            ));
        }
        let primary_minor = self.primary.as_ref().map(|d| d.amount_minor).unwrap_or(0);
        let total_minor = (self.subtotal_minor - primary_minor - self.referral_minor).max(0);

        Ok(PricingResult {
            unit_price_minor: self.unit_price_minor,
            quantity: self.quantity,
            subtotal_minor: self.subtotal_minor,
            primary_discount: self.primary,
            referral_credits_minor: self.referral_minor,
            total_minor,
            currency: self.currency,
            is_free: total_minor == 0,
        })
    }

    fn remaining_after_primary(&self) -> i64 {
        let primary_minor = self.primary.as_ref().map(|d| d.amount_minor).unwrap_or(0);
        (self.subtotal_minor - primary_minor).max(0)
    }
}

fn size_discount(rule: DiscountRule, subtotal_minor: i64) -> Result<i64, CheckoutError> {
    match rule {
        DiscountRule::PercentOff { basis_points } => {
            if !(0..=10_000).contains(&basis_points) {
                return Err(CheckoutError::invalid_pricing("percentage discount out of range"));
            }
            Ok(round_bps(subtotal_minor, basis_points))
        }
        DiscountRule::AmountOff { amount_minor } if amount_minor >= 0 => Ok(amount_minor),
        DiscountRule::GiftCardBalance { balance_minor } if balance_minor >= 0 => Ok(balance_minor),
        _ => Err(CheckoutError::invalid_pricing("discount amount cannot be negative")),
    }
}

/// `amount * bps / 10000`, half-up on minor units.
fn round_bps(amount_minor: i64, basis_points: i64) -> i64 {
    let scaled = i128::from(amount_minor) * i128::from(basis_points);
    ((scaled + BPS / 2) / BPS) as i64
}

/// Unit price for topping up an existing eSIM: retail plus the configured margin.
pub fn topup_unit_price(retail_minor: i64, margin_bps: i64) -> Result<i64, CheckoutError> {
    if margin_bps < 0 {
        return Err(CheckoutError::invalid_pricing("top-up margin cannot be negative"));
    }
    retail_minor
        .checked_add(round_bps(retail_minor, margin_bps))
        .ok_or_else(|| CheckoutError::invalid_pricing("top-up price overflow"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(unit: i64, qty: u32) -> PricingInputs {
        PricingInputs {
            unit_price_minor: unit,
            quantity: qty,
            currency: "usd".to_string(),
            primary: None,
            referral_credits_requested: 0,
            referral_balance: 0,
        }
    }

    #[test]
    fn two_packages_without_discount() {
        let out = calculate(&inputs(1000, 2)).unwrap();
        assert_eq!(out.subtotal_minor, 2000);
        assert_eq!(out.total_minor, 2000);
        assert_eq!(out.currency, "USD");
        assert!(!out.is_free);
    }

    #[test]
    fn gift_card_larger_than_subtotal_clamps_to_zero() {
        let mut i = inputs(1000, 2);
        i.primary = Some((
            DiscountRef::GiftCard("gc_1".to_string()),
            DiscountRule::GiftCardBalance { balance_minor: 2500 },
        ));
        let out = calculate(&i).unwrap();
        assert_eq!(out.total_minor, 0);
        assert_eq!(out.primary_discount_minor(), 2000);
        assert_eq!(out.discount_total_minor(), out.subtotal_minor);
        assert!(out.is_free);
    }

    #[test]
    fn second_primary_discount_fails() {
        let draft = PricingDraft::new(1000, 1, "USD")
            .unwrap()
            .apply_primary(
                DiscountRef::PromoCode("TEN".to_string()),
                DiscountRule::PercentOff { basis_points: 1000 },
            )
            .unwrap();
        let err = draft
            .apply_primary(
                DiscountRef::GiftCard("gc".to_string()),
                DiscountRule::GiftCardBalance { balance_minor: 100 },
            )
            .unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidPricing(_)));
    }

    #[test]
    fn referral_credits_stack_with_primary() {
        let mut i = inputs(1000, 2);
        i.primary = Some((
            DiscountRef::PromoCode("TEN".to_string()),
            DiscountRule::PercentOff { basis_points: 1000 },
        ));
        i.referral_credits_requested = 500;
        i.referral_balance = 900;
        let out = calculate(&i).unwrap();
        assert_eq!(out.primary_discount_minor(), 200);
        assert_eq!(out.referral_credits_minor, 500);
        assert_eq!(out.total_minor, 1300);
    }

    #[test]
    fn referral_credits_beyond_cap_are_rejected_not_truncated() {
        let mut i = inputs(1000, 1);
        i.primary = Some((
            DiscountRef::Voucher("v1".to_string()),
            DiscountRule::AmountOff { amount_minor: 800 },
        ));
        i.referral_credits_requested = 300;
        i.referral_balance = 5000;
        assert!(matches!(calculate(&i), Err(CheckoutError::InvalidPricing(_))));

        i.referral_credits_requested = 200;
        let out = calculate(&i).unwrap();
        assert_eq!(out.total_minor, 0);
        assert!(out.is_free);
    }

    #[test]
    fn referral_credits_beyond_balance_are_rejected() {
        let mut i = inputs(1000, 1);
        i.referral_credits_requested = 600;
        i.referral_balance = 500;
        assert!(matches!(calculate(&i), Err(CheckoutError::InvalidPricing(_))));
    }

    #[test]
    fn credits_then_late_primary_is_caught_on_finish() {
        let err = PricingDraft::new(1000, 1, "USD")
            .unwrap()
            .apply_referral_credits(900, 900)
            .unwrap()
            .apply_primary(
                DiscountRef::PromoCode("HALF".to_string()),
                DiscountRule::PercentOff { basis_points: 5000 },
            )
            .unwrap()
            .finish()
            .unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidPricing(_)));
    }

    #[test]
    fn total_is_floor_of_zero_over_accepted_inputs() {
        for subtotal_unit in [0_i64, 1, 999, 1000, 4550] {
            for primary in [0_i64, 1, 500, 1000, 9000] {
                for referral in [0_i64, 1, 250, 1000] {
                    let mut i = inputs(subtotal_unit, 1);
                    i.primary = Some((
                        DiscountRef::Voucher("v".to_string()),
                        DiscountRule::AmountOff { amount_minor: primary },
                    ));
                    i.referral_credits_requested = referral;
                    i.referral_balance = referral;
                    if let Ok(out) = calculate(&i) {
                        assert_eq!(out.total_minor, (subtotal_unit - primary - referral).max(0));
                        assert_eq!(out.is_free, out.total_minor == 0);
                    } else {
                        assert!(referral > (subtotal_unit - primary).max(0));
                    }
                }
            }
        }
    }

    #[test]
    fn identical_inputs_give_identical_results() {
        let mut i = inputs(1299, 3);
        i.primary = Some((
            DiscountRef::PromoCode("SPRING".to_string()),
            DiscountRule::PercentOff { basis_points: 1250 },
        ));
        assert_eq!(calculate(&i).unwrap(), calculate(&i.clone()).unwrap());
    }

    #[test]
    fn percent_rounds_half_up() {
        // 3897 * 12.5% = 487.125
        let mut i = inputs(1299, 3);
        i.primary = Some((
            DiscountRef::PromoCode("SPRING".to_string()),
            DiscountRule::PercentOff { basis_points: 1250 },
        ));
        assert_eq!(calculate(&i).unwrap().primary_discount_minor(), 487);
        assert_eq!(round_bps(5, 1000), 1);
    }

    #[test]
    fn negative_inputs_are_invalid() {
        assert!(matches!(calculate(&inputs(-1, 1)), Err(CheckoutError::InvalidPricing(_))));
        assert!(matches!(calculate(&inputs(100, 0)), Err(CheckoutError::Validation(_))));
        let mut i = inputs(100, 1);
        i.referral_credits_requested = -5;
        assert!(matches!(calculate(&i), Err(CheckoutError::InvalidPricing(_))));
    }

    #[test]
    fn topup_margin_is_added_to_retail() {
        assert_eq!(topup_unit_price(1000, 1500).unwrap(), 1150);
        assert_eq!(topup_unit_price(1000, 0).unwrap(), 1000);
        assert!(topup_unit_price(1000, -1).is_err());
    }
}
