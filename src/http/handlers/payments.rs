use crate::domain::checkout::{ConfirmRequest, InitPaymentRequest};
use crate::domain::guest_token::digest_token;
use crate::domain::order::OrderRecord;
use crate::error::CheckoutError;
use crate::http::identity::{authenticated_user, guest_token};
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, CheckoutError> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| CheckoutError::validation(format!("invalid request body: {}", e.body_text())))
}

pub async fn init_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<InitPaymentRequest>, JsonRejection>,
) -> impl IntoResponse {
    let req = match body(payload) {
        Ok(req) => req,
        Err(e) => return e.into_response(),
    };
    let user_id = authenticated_user(&headers);
    match state.checkout.init_payment(user_id.as_deref(), req).await {
        Ok(resp) => (axum::http::StatusCode::OK, Json(resp)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn confirm_payment(
    State(state): State<AppState>,
    payload: Result<Json<ConfirmRequest>, JsonRejection>,
) -> impl IntoResponse {
    let req = match body(payload) {
        Ok(req) => req,
        Err(e) => return e.into_response(),
    };
    match state.confirmation.confirm(req).await {
        Ok(resp) => (axum::http::StatusCode::OK, Json(resp)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Owners see their order; guests need the token handed out at checkout.
fn may_view(order: &OrderRecord, user_id: Option<&str>, guest_token: Option<&str>) -> bool {
    if let (Some(owner), Some(caller)) = (order.user_id.as_deref(), user_id) {
        return owner == caller;
    }
    match (order.guest_token_hash.as_deref(), guest_token) {
        (Some(stored), Some(token)) => digest_token(token) == stored,
        _ => false,
    }
}

pub async fn get_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(order_id): Path<String>,
) -> impl IntoResponse {
    let user_id = authenticated_user(&headers);
    let token = guest_token(&headers);
    match state.orders.find(&order_id).await {
        Ok(Some(order)) if may_view(&order, user_id.as_deref(), token.as_deref()) => {
            (axum::http::StatusCode::OK, Json(order)).into_response()
        }
        Ok(_) => (
            axum::http::StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "error": {"code": "NOT_FOUND", "message": "order not found", "details": null}
            })),
        )
            .into_response(),
        Err(e) => CheckoutError::Internal(e).into_response(),
    }
}

pub async fn health() -> impl IntoResponse {
    (axum::http::StatusCode::OK, "ok")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::OrderStatus;

    fn order(user_id: Option<&str>, token_hash: Option<String>) -> OrderRecord {
        OrderRecord {
            order_id: "ord-1".to_string(),
            user_id: user_id.map(str::to_string),
            guest_email: None,
            guest_token_hash: token_hash,
            status: OrderStatus::Pending,
            payment_method: None,
            transaction_id: None,
            discount_breakdown: None,
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn owner_may_view_and_others_may_not() {
        let o = order(Some("u-1"), None);
        assert!(may_view(&o, Some("u-1"), None));
        assert!(!may_view(&o, Some("u-2"), None));
        assert!(!may_view(&o, None, None));
    }

    #[test]
    fn guest_needs_matching_token() {
        let o = order(None, Some(digest_token("raw-token")));
        assert!(may_view(&o, None, Some("raw-token")));
        assert!(!may_view(&o, None, Some("other-token")));
        assert!(!may_view(&o, None, None));
    }
}
