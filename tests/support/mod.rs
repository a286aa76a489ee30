#![allow(dead_code)]

use esim_payments::config::CallbackUrls;
use esim_payments::domain::checkout::{
    BuyerProfile, ConfirmRequest, InitRequest, InitResult, PowertranzInit, RazorpayInit,
    StripeInit, Verdict, VerifyOutcome,
};
use esim_payments::domain::gateway::{CheckoutSettings, Gateway, Provider};
use esim_payments::domain::order::{CompletionRecord, OrderRecord, OrderStatus, Transition};
use esim_payments::domain::pricing::{DiscountLookup, DiscountRef};
use esim_payments::error::CheckoutError;
use esim_payments::gateways::{AdapterFactory, PaymentAdapter};
use esim_payments::store::{DiscountContext, GatewayStore, OrderEvents, OrderStore, StorefrontStore};
use esim_payments::{AppState, Collaborators};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub fn gateway(id: &str, provider: Provider, name: &str, currencies: &[&str]) -> Gateway {
    Gateway {
        gateway_id: id.to_string(),
        provider,
        display_name: name.to_string(),
        public_key: format!("pk_{id}"),
        secret_key: format!("sk_{id}"),
        is_enabled: true,
        currencies: currencies.iter().map(|c| c.to_string()).collect(),
    }
}

#[derive(Default)]
pub struct MemoryGateways {
    pub gateways: Vec<Gateway>,
    pub currencies: Vec<(i64, String)>,
}

impl MemoryGateways {
    fn code_for(&self, id: i64) -> Option<&str> {
        self.currencies.iter().find(|(i, _)| *i == id).map(|(_, c)| c.as_str())
    }
}

#[async_trait::async_trait]
impl GatewayStore for MemoryGateways {
    async fn currency_id(&self, code: &str) -> anyhow::Result<Option<i64>> {
        Ok(self
            .currencies
            .iter()
            .find(|(_, c)| c.eq_ignore_ascii_case(code))
            .map(|(id, _)| *id))
    }

    async fn list_enabled(&self, currency_id: Option<i64>) -> anyhow::Result<Vec<Gateway>> {
        let code = currency_id.and_then(|id| self.code_for(id));
        let mut out: Vec<Gateway> = self
            .gateways
            .iter()
            .filter(|g| g.is_enabled)
            .filter(|g| code.map_or(true, |c| g.supports_currency(c)))
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            a.provider
                .cmp(&b.provider)
                .then_with(|| a.display_name.cmp(&b.display_name))
        });
        Ok(out)
    }

    async fn find_enabled(&self, gateway_id: &str) -> anyhow::Result<Option<Gateway>> {
        Ok(self
            .gateways
            .iter()
            .find(|g| g.gateway_id == gateway_id && g.is_enabled)
            .cloned())
    }

    async fn find_enabled_by_provider(&self, provider: Provider) -> anyhow::Result<Option<Gateway>> {
        Ok(self
            .gateways
            .iter()
            .find(|g| g.provider == provider && g.is_enabled)
            .cloned())
    }
}

#[derive(Default)]
pub struct MemoryStorefront {
    pub settings: CheckoutSettings,
    pub prices: HashMap<(String, String), i64>,
    pub discounts: Vec<(DiscountRef, DiscountLookup)>,
    pub referral_balances: HashMap<String, i64>,
    pub profiles: HashMap<String, BuyerProfile>,
    pub price_lookups: Mutex<Vec<String>>,
}

impl MemoryStorefront {
    pub fn with_price(mut self, package_id: &str, currency: &str, minor: i64) -> Self {
        self.prices.insert((package_id.to_string(), currency.to_string()), minor);
        self
    }
}

#[async_trait::async_trait]
impl StorefrontStore for MemoryStorefront {
    async fn checkout_settings(&self) -> anyhow::Result<CheckoutSettings> {
        Ok(self.settings.clone())
    }

    async fn package_price(&self, package_id: &str, currency: &str) -> anyhow::Result<Option<i64>> {
        self.price_lookups.lock().unwrap().push(package_id.to_string());
        Ok(self
            .prices
            .get(&(package_id.to_string(), currency.to_string()))
            .copied())
    }

    async fn validate_discount(&self, discount: &DiscountRef, _ctx: &DiscountContext<'_>) -> anyhow::Result<DiscountLookup> {
        Ok(self
            .discounts
            .iter()
            .find(|(d, _)| d == discount)
            .map(|(_, lookup)| lookup.clone())
            .unwrap_or_else(|| DiscountLookup::Rejected("unknown discount".to_string())))
    }

    async fn referral_balance(&self, user_id: &str) -> anyhow::Result<i64> {
        Ok(self.referral_balances.get(user_id).copied().unwrap_or(0))
    }

    async fn buyer_profile(&self, user_id: &str) -> anyhow::Result<Option<BuyerProfile>> {
        Ok(self.profiles.get(user_id).cloned())
    }
}

#[derive(Default)]
pub struct MemoryOrders {
    pub orders: Mutex<HashMap<String, OrderRecord>>,
    pub fail_writes: AtomicBool,
}

pub fn pending_order(order_id: &str, user_id: Option<&str>) -> OrderRecord {
    OrderRecord {
        order_id: order_id.to_string(),
        user_id: user_id.map(str::to_string),
        guest_email: None,
        guest_token_hash: None,
        status: OrderStatus::Pending,
        payment_method: None,
        transaction_id: None,
        discount_breakdown: None,
        updated_at: chrono::Utc::now(),
    }
}

impl MemoryOrders {
    pub fn with(orders: Vec<OrderRecord>) -> Self {
        let map = orders.into_iter().map(|o| (o.order_id.clone(), o)).collect();
        Self {
            orders: Mutex::new(map),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn get(&self, order_id: &str) -> Option<OrderRecord> {
        self.orders.lock().unwrap().get(order_id).cloned()
    }

    fn check_writable(&self) -> anyhow::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("connection reset by peer");
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl OrderStore for MemoryOrders {
    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn find(&self, order_id: &str) -> anyhow::Result<Option<OrderRecord>> {
        Ok(self.get(order_id))
    }

    async fn attach_guest(&self, order_id: &str, email: &str, token_hash: &str) -> anyhow::Result<bool> {
        self.check_writable()?;
        let mut orders = self.orders.lock().unwrap();
        let Some(order) = orders.get_mut(order_id) else {
            return Ok(false);
        };
        let email_free = order
            .guest_email
            .as_deref()
            .map_or(true, |bound| bound.eq_ignore_ascii_case(email));
        if order.user_id.is_some() || order.status == OrderStatus::Completed || !email_free {
            return Ok(false);
        }
        order.guest_email = Some(email.to_string());
        order.guest_token_hash = Some(token_hash.to_string());
        Ok(true)
    }

    async fn complete_unless_completed(&self, order_id: &str, record: &CompletionRecord) -> anyhow::Result<Transition> {
        self.check_writable()?;
        let mut orders = self.orders.lock().unwrap();
        let Some(order) = orders.get_mut(order_id) else {
            return Ok(Transition::Missing);
        };
        if order.status == OrderStatus::Completed {
            return Ok(Transition::Unchanged(OrderStatus::Completed));
        }
        order.status = OrderStatus::Completed;
        order.payment_method = Some(record.payment_method.clone());
        order.transaction_id = record.transaction_id.clone();
        if record.discount_breakdown.is_some() {
            order.discount_breakdown = record.discount_breakdown.clone();
        }
        order.updated_at = chrono::Utc::now();
        Ok(Transition::Applied(order.clone()))
    }

    async fn settle_pending(&self, order_id: &str, status: OrderStatus, _reason: &str) -> anyhow::Result<Transition> {
        self.check_writable()?;
        let mut orders = self.orders.lock().unwrap();
        let Some(order) = orders.get_mut(order_id) else {
            return Ok(Transition::Missing);
        };
        if order.status != OrderStatus::Pending {
            return Ok(Transition::Unchanged(order.status));
        }
        order.status = status;
        Ok(Transition::Applied(order.clone()))
    }
}

#[derive(Default)]
pub struct RecordingEvents {
    pub completed: Mutex<Vec<String>>,
}

impl RecordingEvents {
    pub fn count(&self) -> usize {
        self.completed.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl OrderEvents for RecordingEvents {
    async fn order_completed(&self, order: &OrderRecord) -> anyhow::Result<()> {
        self.completed.lock().unwrap().push(order.order_id.clone());
        Ok(())
    }
}

/// Stands in for the real provider adapters and records what reached them.
pub struct RecordingAdapters {
    pub init_calls: Arc<Mutex<Vec<InitRequest>>>,
    pub verify_outcome: Arc<Mutex<VerifyOutcome>>,
}

impl Default for RecordingAdapters {
    fn default() -> Self {
        Self {
            init_calls: Arc::new(Mutex::new(Vec::new())),
            verify_outcome: Arc::new(Mutex::new(VerifyOutcome {
                verdict: Verdict::Approved,
                order_id: None,
                transaction_id: Some("txn-1".to_string()),
            })),
        }
    }
}

impl RecordingAdapters {
    pub fn init_count(&self) -> usize {
        self.init_calls.lock().unwrap().len()
    }

    pub fn set_outcome(&self, outcome: VerifyOutcome) {
        *self.verify_outcome.lock().unwrap() = outcome;
    }
}

struct RecordingAdapter {
    provider: Provider,
    init_calls: Arc<Mutex<Vec<InitRequest>>>,
    verify_outcome: Arc<Mutex<VerifyOutcome>>,
}

#[async_trait::async_trait]
impl PaymentAdapter for RecordingAdapter {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn init(&self, request: &InitRequest) -> Result<InitResult, CheckoutError> {
        self.init_calls.lock().unwrap().push(request.clone());
        Ok(match self.provider {
            Provider::Razorpay => InitResult::Razorpay(RazorpayInit {
                order_id: "order_rzp_1".to_string(),
                key_id: "rzp_key".to_string(),
            }),
            Provider::Powertranz => InitResult::Powertranz(PowertranzInit::Hpp {
                redirect_url: "https://hpp.example.com/pay/tok-1".to_string(),
                hpp_token: "tok-1".to_string(),
            }),
            _ => InitResult::Stripe(StripeInit {
                client_secret: "pi_1_secret".to_string(),
                payment_intent_id: "pi_1".to_string(),
            }),
        })
    }

    async fn verify(&self, _request: &ConfirmRequest) -> Result<VerifyOutcome, CheckoutError> {
        Ok(self.verify_outcome.lock().unwrap().clone())
    }
}

impl AdapterFactory for RecordingAdapters {
    fn adapter_for(&self, gateway: &Gateway) -> Box<dyn PaymentAdapter> {
        Box::new(RecordingAdapter {
            provider: gateway.provider,
            init_calls: self.init_calls.clone(),
            verify_outcome: self.verify_outcome.clone(),
        })
    }
}

pub struct Harness {
    pub state: AppState,
    pub orders: Arc<MemoryOrders>,
    pub events: Arc<RecordingEvents>,
    pub adapters: Arc<RecordingAdapters>,
    pub storefront: Arc<MemoryStorefront>,
}

pub fn callbacks() -> CallbackUrls {
    CallbackUrls {
        public_base_url: "https://api.example.com".to_string(),
        storefront_url: "https://shop.example.com".to_string(),
    }
}

pub fn default_gateways() -> MemoryGateways {
    MemoryGateways {
        gateways: vec![
            gateway("gw_stripe", Provider::Stripe, "Card", &["USD", "EUR"]),
            gateway("gw_rzp", Provider::Razorpay, "UPI", &["INR", "USD"]),
            gateway("gw_pt", Provider::Powertranz, "Card (Caribbean)", &["USD", "JMD"]),
        ],
        currencies: vec![(1, "USD".to_string()), (2, "EUR".to_string()), (3, "INR".to_string()), (4, "JMD".to_string())],
    }
}

pub fn harness(gateways: MemoryGateways, storefront: MemoryStorefront, orders: MemoryOrders) -> Harness {
    let orders = Arc::new(orders);
    let events = Arc::new(RecordingEvents::default());
    let adapters = Arc::new(RecordingAdapters::default());
    let storefront = Arc::new(storefront);
    let state = AppState::assemble(Collaborators {
        gateways: Arc::new(gateways),
        storefront: storefront.clone(),
        orders: orders.clone(),
        events: events.clone(),
        adapters: adapters.clone(),
        callbacks: callbacks(),
    });
    Harness {
        state,
        orders,
        events,
        adapters,
        storefront,
    }
}
