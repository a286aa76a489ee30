use crate::domain::order::{CompletionRecord, OrderRecord, OrderStatus, Transition};
use crate::store::OrderStore;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

#[derive(Clone)]
pub struct OrdersRepo {
    pub pool: PgPool,
}

const ORDER_COLUMNS: &str =
    "order_id, user_id, guest_email, guest_token_hash, status, payment_method, transaction_id, discount_breakdown, updated_at";

fn order_from_row(r: &PgRow) -> anyhow::Result<OrderRecord> {
    let status: String = r.get("status");
    Ok(OrderRecord {
        order_id: r.get("order_id"),
        user_id: r.get("user_id"),
        guest_email: r.get("guest_email"),
        guest_token_hash: r.get("guest_token_hash"),
        status: status.parse()?,
        payment_method: r.get("payment_method"),
        transaction_id: r.get("transaction_id"),
        discount_breakdown: r.get("discount_breakdown"),
        updated_at: r.get("updated_at"),
    })
}

impl OrdersRepo {
    /// Tells a no-op conditional update apart from a missing order.
    async fn current_status(&self, order_id: &str) -> anyhow::Result<Transition> {
        let row = sqlx::query("SELECT status FROM orders WHERE order_id = $1")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(r) => {
                let status: String = r.get("status");
                Ok(Transition::Unchanged(status.parse()?))
            }
            None => Ok(Transition::Missing),
        }
    }
}

#[async_trait::async_trait]
impl OrderStore for OrdersRepo {
    async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find(&self, order_id: &str) -> anyhow::Result<Option<OrderRecord>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1");
        let row = sqlx::query(&sql).bind(order_id).fetch_optional(&self.pool).await?;
        row.as_ref().map(order_from_row).transpose()
    }

    async fn attach_guest(&self, order_id: &str, email: &str, token_hash: &str) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE orders SET guest_email = $2, guest_token_hash = $3, updated_at = now() \
             WHERE order_id = $1 AND user_id IS NULL AND status <> 'completed' \
             AND (guest_email IS NULL OR lower(guest_email) = lower($2))",
        )
        .bind(order_id)
        .bind(email)
        .bind(token_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn complete_unless_completed(&self, order_id: &str, record: &CompletionRecord) -> anyhow::Result<Transition> {
        let sql = format!(
            "UPDATE orders SET status = 'completed', payment_method = $2, transaction_id = $3, \
             discount_breakdown = COALESCE($4, discount_breakdown), failure_reason = NULL, updated_at = now() \
             WHERE order_id = $1 AND status <> 'completed' \
             RETURNING {ORDER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(order_id)
            .bind(&record.payment_method)
            .bind(&record.transaction_id)
            .bind(&record.discount_breakdown)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => Ok(Transition::Applied(order_from_row(&r)?)),
            None => self.current_status(order_id).await,
        }
    }

    async fn settle_pending(&self, order_id: &str, status: OrderStatus, reason: &str) -> anyhow::Result<Transition> {
        let sql = format!(
            "UPDATE orders SET status = $2, failure_reason = $3, updated_at = now() \
             WHERE order_id = $1 AND status = 'pending' \
             RETURNING {ORDER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(order_id)
            .bind(status.as_str())
            .bind(reason)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => Ok(Transition::Applied(order_from_row(&r)?)),
            None => self.current_status(order_id).await,
        }
    }
}
