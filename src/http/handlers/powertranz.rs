use crate::service::three_ds_bridge::{bridge_page, classify, parse_callback_body};
use crate::AppState;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Redirect};
use axum::Json;
use serde::Deserialize;

/// Bank callback at the end of the 3-D Secure challenge. Only relays the result to the
/// checkout page; the page then calls `/payments/confirm`.
pub async fn three_ds_response(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let result = classify(&parse_callback_body(&body));
    tracing::info!(
        success = result.success,
        iso_response_code = ?result.iso_response_code,
        order_id = ?result.order_identifier,
        "powertranz 3ds callback"
    );
    let page = bridge_page(&result, &state.callbacks.storefront_origin());
    (
        StatusCode::OK,
        [(header::CACHE_CONTROL, "no-store")],
        Html(page),
    )
        .into_response()
}

/// Browser returning from the hosted page.
pub async fn hpp_callback(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let result = classify(&parse_callback_body(&body));
    let target = match state.confirmation.settle_hosted_page(&result).await {
        Ok(resp) => {
            // an unapproved hosted-page result leaves the order pending; the page shows a failure
            let status = match resp.status {
                Some(s) => s.as_str(),
                None => "failed",
            };
            let order_id = resp.order_id.or_else(|| result.order_identifier.clone());
            state.callbacks.checkout_result(order_id.as_deref(), status)
        }
        Err(e) => {
            tracing::warn!(error = %e, order_id = ?result.order_identifier, "hosted page confirmation failed");
            state
                .callbacks
                .checkout_result(result.order_identifier.as_deref(), "error")
        }
    };
    Redirect::to(&target).into_response()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelQuery {
    pub order_id: Option<String>,
}

pub async fn hpp_cancel(State(state): State<AppState>, Query(query): Query<CancelQuery>) -> impl IntoResponse {
    tracing::info!(order_id = ?query.order_id, "hosted page cancelled by buyer");
    Redirect::to(&state.callbacks.checkout_page(query.order_id.as_deref())).into_response()
}

/// Server-to-server notification. Always answers 200 so PowerTranz does not keep
/// retrying; duplicates for a completed order are absorbed by the order state writes
/// and results without a verifiable token are ignored.
pub async fn hpp_notify(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let result = classify(&parse_callback_body(&body));
    match state.confirmation.settle_hosted_page(&result).await {
        Ok(resp) => tracing::info!(
            success = resp.success,
            order_id = ?resp.order_id,
            status = ?resp.status,
            "powertranz notification handled"
        ),
        Err(e) => tracing::warn!(error = %e, order_id = ?result.order_identifier, "powertranz notification not applied"),
    }
    (StatusCode::OK, Json(serde_json::json!({"received": true}))).into_response()
}
