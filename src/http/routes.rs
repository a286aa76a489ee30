use crate::http::handlers::{gateways, ops, payments, powertranz};
use crate::AppState;
use axum::routing::{get, post};
use axum::Router;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(payments::health))
        .route("/payments/gateways", get(gateways::list_gateways))
        .route("/payments/init", post(payments::init_payment))
        .route("/payments/confirm", post(payments::confirm_payment))
        .route("/payments/orders/:order_id", get(payments::get_order))
        .route("/payments/powertranz/3ds-response", post(powertranz::three_ds_response))
        .route("/payments/powertranz/hpp-callback", post(powertranz::hpp_callback))
        .route("/payments/powertranz/hpp-cancel", get(powertranz::hpp_cancel))
        .route("/payments/powertranz/hpp-notify", post(powertranz::hpp_notify))
        .route("/ops/readiness", get(ops::readiness))
        .route("/ops/liveness", get(ops::liveness))
        .with_state(state)
}
