use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

/// Ready once the order store answers. The enabled gateway count is informational;
/// zero gateways still serves free orders.
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = match state.orders.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "readiness: order store unreachable");
            false
        }
    };
    let enabled_gateways = match state.registry.list_gateways(None).await {
        Ok(gateways) => Some(gateways.len()),
        Err(e) => {
            tracing::warn!(error = %e, "readiness: gateway registry unavailable");
            None
        }
    };

    let status = if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(serde_json::json!({
            "ready": db_ok,
            "db": db_ok,
            "enabledGateways": enabled_gateways,
        })),
    )
        .into_response()
}

pub async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({"alive": true}))).into_response()
}
