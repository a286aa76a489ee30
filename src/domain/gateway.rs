use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Paypal,
    Paystack,
    Powertranz,
    Razorpay,
    Stripe,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Paypal => "paypal",
            Provider::Paystack => "paystack",
            Provider::Powertranz => "powertranz",
            Provider::Razorpay => "razorpay",
            Provider::Stripe => "stripe",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "paypal" => Ok(Provider::Paypal),
            "paystack" => Ok(Provider::Paystack),
            "powertranz" => Ok(Provider::Powertranz),
            "razorpay" => Ok(Provider::Razorpay),
            "stripe" => Ok(Provider::Stripe),
            other => Err(anyhow::anyhow!("unknown payment provider {other}")),
        }
    }
}

#[derive(Clone)]
pub struct Gateway {
    pub gateway_id: String,
    pub provider: Provider,
    pub display_name: String,
    pub public_key: String,
    pub secret_key: String,
    pub is_enabled: bool,
    pub currencies: Vec<String>,
}

impl Gateway {
    pub fn supports_currency(&self, code: &str) -> bool {
        self.currencies.iter().any(|c| c.eq_ignore_ascii_case(code))
    }
}

// Hand-written so the secret key never reaches a log line.
impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("gateway_id", &self.gateway_id)
            .field("provider", &self.provider)
            .field("display_name", &self.display_name)
            .field("is_enabled", &self.is_enabled)
            .field("currencies", &self.currencies)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayView {
    pub id: String,
    pub provider: Provider,
    pub display_name: String,
    pub public_key: String,
    pub currencies: Vec<String>,
}

impl From<&Gateway> for GatewayView {
    fn from(g: &Gateway) -> Self {
        Self {
            id: g.gateway_id.clone(),
            provider: g.provider,
            display_name: g.display_name.clone(),
            public_key: g.public_key.clone(),
            currencies: g.currencies.clone(),
        }
    }
}

/// Global storefront settings the engine reads but never writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutSettings {
    pub in_app_purchase_enabled: bool,
    pub topup_margin_bps: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_parses_case_insensitively() {
        assert_eq!("PowerTranz".parse::<Provider>().unwrap(), Provider::Powertranz);
        assert!("square".parse::<Provider>().is_err());
    }

    #[test]
    fn debug_output_omits_secret() {
        let g = Gateway {
            gateway_id: "gw_1".to_string(),
            provider: Provider::Stripe,
            display_name: "Card".to_string(),
            public_key: "pk_test".to_string(),
            secret_key: "sk_live_very_secret".to_string(),
            is_enabled: true,
            currencies: vec!["USD".to_string()],
        };
        assert!(!format!("{g:?}").contains("sk_live_very_secret"));
        assert!(g.supports_currency("usd"));
    }
}
