use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Completed,
    Declined,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
            OrderStatus::Declined => "declined",
            OrderStatus::Failed => "failed",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "completed" => Ok(OrderStatus::Completed),
            "declined" => Ok(OrderStatus::Declined),
            "failed" => Ok(OrderStatus::Failed),
            other => Err(anyhow::anyhow!("unknown order status {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub order_id: String,
    pub user_id: Option<String>,
    pub guest_email: Option<String>,
    #[serde(skip)]
    pub guest_token_hash: Option<String>,
    pub status: OrderStatus,
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
    pub discount_breakdown: Option<serde_json::Value>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Fields written when an order moves to `completed`.
#[derive(Debug, Clone)]
pub struct CompletionRecord {
    pub payment_method: String,
    pub transaction_id: Option<String>,
    pub discount_breakdown: Option<serde_json::Value>,
}

/// Result of a conditional status write keyed on the order id.
#[derive(Debug, Clone)]
pub enum Transition {
    Applied(OrderRecord),
    Unchanged(OrderStatus),
    Missing,
}
