use crate::domain::gateway::GatewayView;
use crate::error::CheckoutError;
use crate::AppState;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct GatewaysQuery {
    pub currency: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewaysResponse {
    pub gateways: Vec<GatewayView>,
    pub in_app_purchase_enabled: bool,
}

async fn gateways_for(state: &AppState, currency: Option<&str>) -> Result<GatewaysResponse, CheckoutError> {
    let gateways = state.registry.list_gateways(currency).await?;
    let settings = state.storefront.checkout_settings().await?;
    Ok(GatewaysResponse {
        gateways: gateways.iter().map(GatewayView::from).collect(),
        in_app_purchase_enabled: settings.in_app_purchase_enabled,
    })
}

pub async fn list_gateways(State(state): State<AppState>, Query(query): Query<GatewaysQuery>) -> impl IntoResponse {
    match gateways_for(&state, query.currency.as_deref()).await {
        Ok(resp) => (axum::http::StatusCode::OK, Json(resp)).into_response(),
        Err(e) => e.into_response(),
    }
}
