use crate::domain::checkout::{BuyerProfile, PostalAddress};
use crate::domain::gateway::CheckoutSettings;
use crate::domain::pricing::{DiscountLookup, DiscountRef, DiscountRule, PromoType};
use crate::store::{DiscountContext, StorefrontStore};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

#[derive(Clone)]
pub struct StorefrontRepo {
    pub pool: PgPool,
}

fn expired(expires_at: Option<DateTime<Utc>>) -> bool {
    expires_at.is_some_and(|t| t <= Utc::now())
}

impl StorefrontRepo {
    async fn promo_code(&self, code: &str, expected: PromoType, ctx: &DiscountContext<'_>) -> anyhow::Result<DiscountLookup> {
        let row = sqlx::query(
            "SELECT promo_type, percent_off_bps, amount_off_minor, currency, min_subtotal_minor, max_redemptions, redemption_count, is_active, expires_at \
             FROM promo_codes WHERE upper(code) = upper($1)",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        let Some(r) = row else {
            return Ok(DiscountLookup::Rejected(format!("code {code} does not exist")));
        };
        let promo_type: String = r.get("promo_type");
        let expected_type = match expected {
            PromoType::Promo => "promo",
            PromoType::Voucher => "voucher",
        };
        if promo_type != expected_type {
            return Ok(DiscountLookup::Rejected(format!("code {code} is not a {expected_type} code")));
        }
        let is_active: bool = r.get("is_active");
        if !is_active || expired(r.get("expires_at")) {
            return Ok(DiscountLookup::Rejected(format!("code {code} has expired")));
        }
        let max_redemptions: Option<i32> = r.get("max_redemptions");
        let redemption_count: i32 = r.get("redemption_count");
        if max_redemptions.is_some_and(|max| redemption_count >= max) {
            return Ok(DiscountLookup::Rejected(format!("code {code} has been fully redeemed")));
        }
        let min_subtotal: i64 = r.get("min_subtotal_minor");
        if ctx.subtotal_minor < min_subtotal {
            return Ok(DiscountLookup::Rejected(format!("code {code} needs a larger order")));
        }

        let percent: Option<i64> = r.get("percent_off_bps");
        let amount: Option<i64> = r.get("amount_off_minor");
        let currency: Option<String> = r.get("currency");
        match (percent, amount) {
            (Some(basis_points), _) => Ok(DiscountLookup::Valid(DiscountRule::PercentOff { basis_points })),
            (None, Some(amount_minor)) => {
                if currency.as_deref().is_some_and(|c| !c.eq_ignore_ascii_case(ctx.currency)) {
                    return Ok(DiscountLookup::Rejected(format!("code {code} is not valid in {}", ctx.currency)));
                }
                Ok(DiscountLookup::Valid(DiscountRule::AmountOff { amount_minor }))
            }
            (None, None) => Ok(DiscountLookup::Rejected(format!("code {code} has no value"))),
        }
    }

    async fn voucher(&self, voucher_id: &str, ctx: &DiscountContext<'_>) -> anyhow::Result<DiscountLookup> {
        let row = sqlx::query(
            "SELECT user_id, amount_off_minor, currency, is_redeemed, expires_at FROM vouchers WHERE voucher_id = $1",
        )
        .bind(voucher_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(r) = row else {
            return Ok(DiscountLookup::Rejected("voucher does not exist".to_string()));
        };
        let owner: Option<String> = r.get("user_id");
        if owner.is_some() && owner.as_deref() != ctx.user_id {
            return Ok(DiscountLookup::Rejected("voucher belongs to another account".to_string()));
        }
        let is_redeemed: bool = r.get("is_redeemed");
        if is_redeemed || expired(r.get("expires_at")) {
            return Ok(DiscountLookup::Rejected("voucher is no longer valid".to_string()));
        }
        let currency: String = r.get("currency");
        if !currency.eq_ignore_ascii_case(ctx.currency) {
            return Ok(DiscountLookup::Rejected(format!("voucher is not valid in {}", ctx.currency)));
        }
        Ok(DiscountLookup::Valid(DiscountRule::AmountOff {
            amount_minor: r.get("amount_off_minor"),
        }))
    }

    async fn gift_card(&self, gift_card_id: &str, ctx: &DiscountContext<'_>) -> anyhow::Result<DiscountLookup> {
        let row = sqlx::query(
            "SELECT balance_minor, currency, is_active, expires_at FROM gift_cards WHERE gift_card_id = $1",
        )
        .bind(gift_card_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(r) = row else {
            return Ok(DiscountLookup::Rejected("gift card does not exist".to_string()));
        };
        let is_active: bool = r.get("is_active");
        let balance_minor: i64 = r.get("balance_minor");
        if !is_active || expired(r.get("expires_at")) || balance_minor <= 0 {
            return Ok(DiscountLookup::Rejected("gift card is no longer valid".to_string()));
        }
        let currency: String = r.get("currency");
        if !currency.eq_ignore_ascii_case(ctx.currency) {
            return Ok(DiscountLookup::Rejected(format!("gift card is not valid in {}", ctx.currency)));
        }
        Ok(DiscountLookup::Valid(DiscountRule::GiftCardBalance { balance_minor }))
    }
}

#[async_trait::async_trait]
impl StorefrontStore for StorefrontRepo {
    async fn checkout_settings(&self) -> anyhow::Result<CheckoutSettings> {
        let row = sqlx::query("SELECT in_app_purchase_enabled, topup_margin_bps FROM checkout_settings WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(row
            .map(|r| CheckoutSettings {
                in_app_purchase_enabled: r.get("in_app_purchase_enabled"),
                topup_margin_bps: r.get("topup_margin_bps"),
            })
            .unwrap_or_default())
    }

    async fn package_price(&self, package_id: &str, currency: &str) -> anyhow::Result<Option<i64>> {
        let row = sqlx::query(
            "SELECT retail_price_minor FROM package_prices WHERE package_id = $1 AND upper(currency) = upper($2)",
        )
        .bind(package_id)
        .bind(currency)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.get("retail_price_minor")))
    }

    async fn validate_discount(&self, discount: &DiscountRef, ctx: &DiscountContext<'_>) -> anyhow::Result<DiscountLookup> {
        match discount {
            DiscountRef::PromoCode(code) => self.promo_code(code, PromoType::Promo, ctx).await,
            DiscountRef::VoucherCode(code) => self.promo_code(code, PromoType::Voucher, ctx).await,
            DiscountRef::Voucher(id) => self.voucher(id, ctx).await,
            DiscountRef::GiftCard(id) => self.gift_card(id, ctx).await,
        }
    }

    async fn referral_balance(&self, user_id: &str) -> anyhow::Result<i64> {
        let row = sqlx::query("SELECT referral_balance_minor FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("referral_balance_minor")).unwrap_or(0))
    }

    async fn buyer_profile(&self, user_id: &str) -> anyhow::Result<Option<BuyerProfile>> {
        let row = sqlx::query(
            "SELECT user_id, email, name, phone, address_line1, address_city, address_postal_code, address_country \
             FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| {
            let line1: Option<String> = r.get("address_line1");
            BuyerProfile {
                user_id: r.get("user_id"),
                email: r.get("email"),
                name: r.get("name"),
                phone: r.get("phone"),
                address: line1.map(|line1| PostalAddress {
                    line1,
                    city: r.get("address_city"),
                    postal_code: r.get("address_postal_code"),
                    country: r.get("address_country"),
                }),
            }
        }))
    }
}
