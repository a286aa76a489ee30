use crate::domain::gateway::{Gateway, Provider};
use crate::error::CheckoutError;
use crate::store::GatewayStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct GatewayRegistry {
    pub store: Arc<dyn GatewayStore>,
}

impl GatewayRegistry {
    /// Without a currency every enabled gateway is returned. With one, the code must be
    /// known to the storefront and only gateways accepting it are returned.
    pub async fn list_gateways(&self, currency: Option<&str>) -> Result<Vec<Gateway>, CheckoutError> {
        let code = currency.map(str::trim).filter(|c| !c.is_empty());
        let Some(code) = code else {
            return Ok(self.store.list_enabled(None).await?);
        };

        let code = code.to_ascii_uppercase();
        let currency_id = self
            .store
            .currency_id(&code)
            .await?
            .ok_or(CheckoutError::UnsupportedCurrency(code))?;
        Ok(self.store.list_enabled(Some(currency_id)).await?)
    }

    pub async fn find_enabled(&self, gateway_id: &str) -> Result<Gateway, CheckoutError> {
        self.store
            .find_enabled(gateway_id)
            .await?
            .ok_or_else(|| CheckoutError::GatewayDisabled(gateway_id.to_string()))
    }

    pub async fn find_enabled_by_provider(&self, provider: Provider) -> Result<Gateway, CheckoutError> {
        self.store
            .find_enabled_by_provider(provider)
            .await?
            .ok_or_else(|| CheckoutError::GatewayDisabled(provider.to_string()))
    }
}
