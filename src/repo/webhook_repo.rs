use anyhow::Result;
use sqlx::{PgPool, Row};

/// Downstream services subscribed to order events, plus the per-attempt delivery log.
#[derive(Clone)]
pub struct WebhookRepo {
    pub pool: PgPool,
}

#[derive(Debug, Clone)]
pub struct OrderSubscriber {
    pub subscription_id: i64,
    pub target_url: String,
    pub signing_secret: Option<String>,
}

pub struct DeliveryAttempt<'a> {
    pub subscription_id: i64,
    pub event_type: &'a str,
    pub order_id: &'a str,
    pub status_code: Option<u16>,
    pub error: Option<String>,
}

impl WebhookRepo {
    pub async fn subscribers(&self, event_type: &str) -> Result<Vec<OrderSubscriber>> {
        let rows = sqlx::query(
            r#"
            SELECT subscription_id, target_url, secret
            FROM order_webhook_subscriptions
            WHERE is_enabled AND event_type = $1
            ORDER BY subscription_id
            "#,
        )
        .bind(event_type)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| OrderSubscriber {
                subscription_id: row.get("subscription_id"),
                target_url: row.get("target_url"),
                signing_secret: row.get("secret"),
            })
            .collect())
    }

    pub async fn record_delivery(&self, attempt: DeliveryAttempt<'_>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO order_webhook_deliveries
                (subscription_id, event_type, order_id, status_code, error)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(attempt.subscription_id)
        .bind(attempt.event_type)
        .bind(attempt.order_id)
        .bind(attempt.status_code.map(i32::from))
        .bind(attempt.error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
