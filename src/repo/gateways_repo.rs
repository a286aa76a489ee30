use crate::domain::gateway::{Gateway, Provider};
use crate::store::GatewayStore;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

#[derive(Clone)]
pub struct GatewaysRepo {
    pub pool: PgPool,
}

const GATEWAY_COLUMNS: &str = "g.gateway_id, g.provider, g.display_name, g.public_key, g.secret_key, g.is_enabled, \
     COALESCE(array_agg(c.code ORDER BY c.code) FILTER (WHERE c.code IS NOT NULL), '{}') AS currencies";

const GATEWAY_JOINS: &str = "FROM payment_gateways g \
     LEFT JOIN gateway_currencies gc ON gc.gateway_id = g.gateway_id \
     LEFT JOIN currencies c ON c.currency_id = gc.currency_id";

fn gateway_from_row(r: &PgRow) -> anyhow::Result<Gateway> {
    let provider: String = r.get("provider");
    Ok(Gateway {
        gateway_id: r.get("gateway_id"),
        provider: provider.parse()?,
        display_name: r.get("display_name"),
        public_key: r.get("public_key"),
        secret_key: r.get("secret_key"),
        is_enabled: r.get("is_enabled"),
        currencies: r.get("currencies"),
    })
}

#[async_trait::async_trait]
impl GatewayStore for GatewaysRepo {
    async fn currency_id(&self, code: &str) -> anyhow::Result<Option<i64>> {
        let row = sqlx::query("SELECT currency_id FROM currencies WHERE upper(code) = upper($1)")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("currency_id")))
    }

    async fn list_enabled(&self, currency_id: Option<i64>) -> anyhow::Result<Vec<Gateway>> {
        let sql = format!(
            "SELECT {GATEWAY_COLUMNS} {GATEWAY_JOINS} \
             WHERE g.is_enabled = true \
               AND ($1::BIGINT IS NULL OR EXISTS (SELECT 1 FROM gateway_currencies f WHERE f.gateway_id = g.gateway_id AND f.currency_id = $1)) \
             GROUP BY g.gateway_id \
             ORDER BY g.provider ASC, g.display_name ASC"
        );
        let rows = sqlx::query(&sql).bind(currency_id).fetch_all(&self.pool).await?;

        rows.iter().map(gateway_from_row).collect()
    }

    async fn find_enabled(&self, gateway_id: &str) -> anyhow::Result<Option<Gateway>> {
        let sql = format!(
            "SELECT {GATEWAY_COLUMNS} {GATEWAY_JOINS} \
             WHERE g.gateway_id = $1 AND g.is_enabled = true \
             GROUP BY g.gateway_id"
        );
        let row = sqlx::query(&sql).bind(gateway_id).fetch_optional(&self.pool).await?;
        row.as_ref().map(gateway_from_row).transpose()
    }

    async fn find_enabled_by_provider(&self, provider: Provider) -> anyhow::Result<Option<Gateway>> {
        let sql = format!(
            "SELECT {GATEWAY_COLUMNS} {GATEWAY_JOINS} \
             WHERE g.provider = $1 AND g.is_enabled = true \
             GROUP BY g.gateway_id \
             ORDER BY g.updated_at DESC \
             LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(provider.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(gateway_from_row).transpose()
    }
}
