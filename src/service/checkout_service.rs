use crate::domain::checkout::{
    Buyer, BuyerProfile, FreePayment, GuestBuyer, InitEnvelope, InitPaymentRequest, InitRequest,
    InitResult, PowertranzInit, PowertranzMethod, PowertranzPayment,
};
use crate::domain::gateway::Provider;
use crate::domain::guest_token::GuestAccessToken;
use crate::domain::metadata::{validate_order_id, DiscountMetadata, OrderShape};
use crate::domain::order::OrderStatus;
use crate::error::CheckoutError;
use crate::gateways::AdapterFactory;
use crate::pricing::service::{PriceQuery, PricingService};
use crate::service::gateway_registry::GatewayRegistry;
use crate::service::order_state::{OrderStateMutator, FREE_PAYMENT_METHOD};
use crate::store::{OrderStore, StorefrontStore};
use std::sync::Arc;

/// Runs `POST /payments/init`: validate, price, then hand off to the provider adapter.
#[derive(Clone)]
pub struct CheckoutService {
    pub registry: GatewayRegistry,
    pub pricing: PricingService,
    pub storefront: Arc<dyn StorefrontStore>,
    pub orders: Arc<dyn OrderStore>,
    pub mutator: OrderStateMutator,
    pub adapters: Arc<dyn AdapterFactory>,
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, CheckoutError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CheckoutError::validation(format!("{field} is required")))
}

fn optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl CheckoutService {
    pub async fn init_payment(
        &self,
        user_id: Option<&str>,
        req: InitPaymentRequest,
    ) -> Result<InitEnvelope, CheckoutError> {
        let gateway_id = required(&req.gateway_id, "gatewayId")?;
        let package_id = required(&req.package_id, "packageId")?;
        let order_id = validate_order_id(required(&req.order_id, "orderId")?)?;
        let currency = required(&req.currency, "currency")?.to_ascii_uppercase();
        if req.quantity == 0 {
            return Err(CheckoutError::validation("quantity must be at least 1"));
        }
        let guest_email = match user_id {
            Some(_) => None,
            None => Some(required(&req.email, "email")?.to_string()),
        };

        let gateway = self.registry.find_enabled(gateway_id).await?;
        if !gateway.supports_currency(&currency) {
            return Err(CheckoutError::UnsupportedCurrency(currency));
        }

        let order = self
            .orders
            .find(order_id)
            .await?
            .ok_or_else(|| CheckoutError::validation(format!("order {order_id} not found")))?;
        if order.status == OrderStatus::Completed {
            return Err(CheckoutError::validation(format!("order {order_id} is already paid")));
        }
        // orders owned by someone else are reported as missing
        let not_found = || CheckoutError::validation(format!("order {order_id} not found"));
        match (order.user_id.as_deref(), user_id) {
            (Some(owner), Some(caller)) if owner != caller => return Err(not_found()),
            (Some(_), None) => return Err(not_found()),
            _ => {}
        }
        if let (Some(bound), Some(email)) = (order.guest_email.as_deref(), guest_email.as_deref()) {
            if !bound.eq_ignore_ascii_case(email) {
                return Err(not_found());
            }
        }

        // pricing runs before any provider is contacted
        let settings = self.storefront.checkout_settings().await?;
        let discounts = req.discount_inputs();
        let pricing = self
            .pricing
            .calculate_final_price(
                PriceQuery {
                    package_id,
                    quantity: req.quantity,
                    currency: &currency,
                    discounts: &discounts,
                    user_id,
                    iccid: req.iccid.as_deref(),
                },
                &settings,
            )
            .await?;

        let shape = OrderShape::classify(user_id, guest_email.as_deref(), req.iccid.as_deref())?;

        if pricing.is_free && !req.terms_accepted {
            return Err(CheckoutError::validation("terms must be accepted to place a free order"));
        }

        let buyer = match (user_id, guest_email) {
            (Some(user_id), _) => Buyer::Authenticated(self.member_profile(user_id, &req).await?),
            (None, Some(email)) => {
                let access_token = GuestAccessToken::mint();
                let attached = self
                    .orders
                    .attach_guest(order_id, &email, &access_token.digest())
                    .await?;
                if !attached {
                    return Err(not_found());
                }
                Buyer::Guest(GuestBuyer {
                    email,
                    name: optional(&req.name),
                    phone: optional(&req.phone),
                    access_token,
                })
            }
            (None, None) => return Err(CheckoutError::validation("email is required")),
        };
        let guest_access_token = match &buyer {
            Buyer::Guest(g) => Some(g.access_token.as_str().to_string()),
            Buyer::Authenticated(_) => None,
        };

        if pricing.is_free {
            self.mutator.complete_free(order_id, pricing.breakdown()).await?;
            return Ok(InitEnvelope::Free {
                pricing,
                payment: FreePayment {
                    provider: FREE_PAYMENT_METHOD,
                    order_id: order_id.to_string(),
                    status: OrderStatus::Completed,
                },
                guest_access_token,
            });
        }

        tracing::info!(
            order_id,
            provider = %gateway.provider,
            total_minor = pricing.total_minor,
            currency = %pricing.currency,
            kind = shape.kind(),
            "initiating payment"
        );

        let request = InitRequest {
            order_id: order_id.to_string(),
            package_id: package_id.to_string(),
            quantity: req.quantity,
            amount_minor: pricing.total_minor,
            currency: pricing.currency.clone(),
            metadata: DiscountMetadata::new(order_id, package_id, shape, &pricing),
            buyer,
            powertranz_method: req.payment_method,
            card: req.card.clone(),
        };
        let adapter = self.adapters.adapter_for(&gateway);
        let payment = adapter.init(&request).await?;

        Ok(match payment {
            InitResult::Powertranz(powertranz) => {
                let method = match &powertranz {
                    PowertranzInit::Spi { .. } => PowertranzMethod::Spi,
                    PowertranzInit::Hpp { .. } => PowertranzMethod::Hpp,
                };
                InitEnvelope::Powertranz {
                    pricing,
                    powertranz,
                    payment: PowertranzPayment {
                        provider: Provider::Powertranz,
                        method,
                        order_id: order_id.to_string(),
                    },
                    guest_access_token,
                }
            }
            payment => InitEnvelope::Flat {
                pricing,
                payment,
                guest_access_token,
            },
        })
    }

    /// Stored account details win; request fields only fill the gaps.
    async fn member_profile(&self, user_id: &str, req: &InitPaymentRequest) -> Result<BuyerProfile, CheckoutError> {
        match self.storefront.buyer_profile(user_id).await? {
            Some(mut profile) => {
                if profile.name.is_none() {
                    profile.name = optional(&req.name);
                }
                if profile.phone.is_none() {
                    profile.phone = optional(&req.phone);
                }
                Ok(profile)
            }
            None => Ok(BuyerProfile {
                user_id: user_id.to_string(),
                email: required(&req.email, "email")?.to_string(),
                name: optional(&req.name),
                phone: optional(&req.phone),
                address: None,
            }),
        }
    }
}
