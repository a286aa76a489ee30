use crate::domain::gateway::CheckoutSettings;
use crate::domain::pricing::{DiscountInputs, DiscountLookup, PricingResult};
use crate::error::CheckoutError;
use crate::pricing::calculator::{calculate, topup_unit_price, PricingInputs};
use crate::store::{DiscountContext, StorefrontStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct PricingService {
    pub store: Arc<dyn StorefrontStore>,
}

pub struct PriceQuery<'a> {
    pub package_id: &'a str,
    pub quantity: u32,
    pub currency: &'a str,
    pub discounts: &'a DiscountInputs,
    pub user_id: Option<&'a str>,
    pub iccid: Option<&'a str>,
}

impl PricingService {
    /// Resolves price and discounts, then hands everything to the pure calculator.
    /// Reads only; nothing here is persisted.
    pub async fn calculate_final_price(
        &self,
        query: PriceQuery<'_>,
        settings: &CheckoutSettings,
    ) -> Result<PricingResult, CheckoutError> {
        let primary_ref = query.discounts.primary()?;
        let requested_credits = query.discounts.referral_credits_minor;
        if requested_credits != 0 && query.user_id.is_none() {
            return Err(CheckoutError::invalid_pricing(
                "referral credits require a signed-in account",
            ));
        }

        let currency = query.currency.trim().to_ascii_uppercase();
        let retail_minor = self
            .store
            .package_price(query.package_id, &currency)
            .await?
            .ok_or_else(|| {
                CheckoutError::validation(format!(
                    "package {} is not sold in {}",
                    query.package_id, currency
                ))
            })?;

        let unit_price_minor = if query.iccid.is_some_and(|i| !i.trim().is_empty()) {
            topup_unit_price(retail_minor, settings.topup_margin_bps)?
        } else {
            retail_minor
        };

        let primary = match primary_ref {
            Some(discount) => {
                let ctx = DiscountContext {
                    user_id: query.user_id,
                    currency: &currency,
                    subtotal_minor: unit_price_minor.saturating_mul(i64::from(query.quantity)),
                };
                match self.store.validate_discount(&discount, &ctx).await? {
                    DiscountLookup::Valid(rule) => Some((discount, rule)),
                    DiscountLookup::Rejected(reason) => {
                        tracing::info!(discount = discount.label(), %reason, "discount rejected");
                        return Err(CheckoutError::InvalidPricing(reason));
                    }
                }
            }
            None => None,
        };

        let referral_balance = match (query.user_id, requested_credits > 0) {
            (Some(user_id), true) => self.store.referral_balance(user_id).await?,
            _ => 0,
        };

        calculate(&PricingInputs {
            unit_price_minor,
            quantity: query.quantity,
            currency,
            primary,
            referral_credits_requested: requested_credits,
            referral_balance,
        })
    }
}
