pub mod config;
pub mod domain {
    pub mod checkout;
    pub mod gateway;
    pub mod guest_token;
    pub mod metadata;
    pub mod order;
    pub mod pricing;
}
pub mod error;
pub mod gateways;
pub mod http {
    pub mod handlers {
        pub mod gateways;
        pub mod ops;
        pub mod payments;
        pub mod powertranz;
    }
    pub mod identity;
    pub mod routes;
}
pub mod pricing;
pub mod repo {
    pub mod gateways_repo;
    pub mod orders_repo;
    pub mod storefront_repo;
    pub mod webhook_repo;
}
pub mod service {
    pub mod checkout_service;
    pub mod confirmation_service;
    pub mod gateway_registry;
    pub mod order_state;
    pub mod three_ds_bridge;
    pub mod webhook_dispatcher;
}
pub mod store;

use config::CallbackUrls;
use gateways::AdapterFactory;
use pricing::service::PricingService;
use service::checkout_service::CheckoutService;
use service::confirmation_service::ConfirmationService;
use service::gateway_registry::GatewayRegistry;
use service::order_state::OrderStateMutator;
use std::sync::Arc;
use store::{GatewayStore, OrderEvents, OrderStore, StorefrontStore};

#[derive(Clone)]
pub struct AppState {
    pub checkout: CheckoutService,
    pub confirmation: ConfirmationService,
    pub registry: GatewayRegistry,
    pub storefront: Arc<dyn StorefrontStore>,
    pub orders: Arc<dyn OrderStore>,
    pub callbacks: CallbackUrls,
}

/// Storage and provider seams the services are wired from.
pub struct Collaborators {
    pub gateways: Arc<dyn GatewayStore>,
    pub storefront: Arc<dyn StorefrontStore>,
    pub orders: Arc<dyn OrderStore>,
    pub events: Arc<dyn OrderEvents>,
    pub adapters: Arc<dyn AdapterFactory>,
    pub callbacks: CallbackUrls,
}

impl AppState {
    pub fn assemble(c: Collaborators) -> Self {
        let registry = GatewayRegistry { store: c.gateways };
        let mutator = OrderStateMutator {
            orders: c.orders.clone(),
            events: c.events,
        };
        let checkout = CheckoutService {
            registry: registry.clone(),
            pricing: PricingService {
                store: c.storefront.clone(),
            },
            storefront: c.storefront.clone(),
            orders: c.orders.clone(),
            mutator: mutator.clone(),
            adapters: c.adapters.clone(),
        };
        let confirmation = ConfirmationService {
            registry: registry.clone(),
            adapters: c.adapters,
            mutator,
        };
        Self {
            checkout,
            confirmation,
            registry,
            storefront: c.storefront,
            orders: c.orders,
            callbacks: c.callbacks,
        }
    }
}
