use crate::domain::checkout::BuyerProfile;
use crate::domain::gateway::{CheckoutSettings, Gateway, Provider};
use crate::domain::order::{CompletionRecord, OrderRecord, OrderStatus, Transition};
use crate::domain::pricing::{DiscountLookup, DiscountRef};
use anyhow::Result;

#[async_trait::async_trait]
pub trait GatewayStore: Send + Sync {
    async fn currency_id(&self, code: &str) -> Result<Option<i64>>;

    /// Enabled gateways ordered by provider, then display name.
    async fn list_enabled(&self, currency_id: Option<i64>) -> Result<Vec<Gateway>>;

    async fn find_enabled(&self, gateway_id: &str) -> Result<Option<Gateway>>;

    async fn find_enabled_by_provider(&self, provider: Provider) -> Result<Option<Gateway>>;
}

#[derive(Debug, Clone)]
pub struct DiscountContext<'a> {
    pub user_id: Option<&'a str>,
    pub currency: &'a str,
    pub subtotal_minor: i64,
}

/// Catalog, discount and account lookups owned by the rest of the storefront.
#[async_trait::async_trait]
pub trait StorefrontStore: Send + Sync {
    async fn checkout_settings(&self) -> Result<CheckoutSettings>;

    async fn package_price(&self, package_id: &str, currency: &str) -> Result<Option<i64>>;

    async fn validate_discount(&self, discount: &DiscountRef, ctx: &DiscountContext<'_>) -> Result<DiscountLookup>;

    async fn referral_balance(&self, user_id: &str) -> Result<i64>;

    async fn buyer_profile(&self, user_id: &str) -> Result<Option<BuyerProfile>>;
}

#[async_trait::async_trait]
pub trait OrderStore: Send + Sync {
    /// Cheap round trip used by the readiness probe.
    async fn ping(&self) -> Result<()>;

    async fn find(&self, order_id: &str) -> Result<Option<OrderRecord>>;

    /// Binds a guest e-mail and token digest to an unowned, unpaid order. Only applies
    /// when no e-mail is bound yet or the same e-mail is re-initialising; returns
    /// whether the order was updated.
    async fn attach_guest(&self, order_id: &str, email: &str, token_hash: &str) -> Result<bool>;

    /// Conditional write: only applies when the order is not already completed.
    async fn complete_unless_completed(&self, order_id: &str, record: &CompletionRecord) -> Result<Transition>;

    /// Moves a pending order to `declined` or `failed`; anything else is left untouched.
    async fn settle_pending(&self, order_id: &str, status: OrderStatus, reason: &str) -> Result<Transition>;
}

/// Downstream effects of a completed order (eSIM provisioning, receipts).
#[async_trait::async_trait]
pub trait OrderEvents: Send + Sync {
    async fn order_completed(&self, order: &OrderRecord) -> Result<()>;
}
