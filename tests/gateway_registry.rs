mod support;

use esim_payments::domain::gateway::Provider;
use esim_payments::error::CheckoutError;
use support::*;

#[tokio::test]
async fn blank_currency_lists_every_enabled_gateway_in_order() {
    let mut gateways = default_gateways();
    gateways
        .gateways
        .push(gateway("gw_stripe_b", Provider::Stripe, "Apple Pay", &["USD"]));
    let mut disabled = gateway("gw_paystack", Provider::Paystack, "Paystack", &["USD"]);
    disabled.is_enabled = false;
    gateways.gateways.push(disabled);
    let h = harness(gateways, MemoryStorefront::default(), MemoryOrders::default());

    for currency in [None, Some("  ")] {
        let listed = h.state.registry.list_gateways(currency).await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|g| g.gateway_id.as_str()).collect();
        assert_eq!(ids, vec!["gw_pt", "gw_rzp", "gw_stripe_b", "gw_stripe"]);
    }
}

#[tokio::test]
async fn currency_filter_is_case_insensitive() {
    let h = harness(default_gateways(), MemoryStorefront::default(), MemoryOrders::default());

    let listed = h.state.registry.list_gateways(Some("jmd")).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].provider, Provider::Powertranz);
}

#[tokio::test]
async fn unknown_currency_is_rejected() {
    let h = harness(default_gateways(), MemoryStorefront::default(), MemoryOrders::default());

    let err = h.state.registry.list_gateways(Some("XYZ")).await.unwrap_err();
    assert!(matches!(err, CheckoutError::UnsupportedCurrency(c) if c == "XYZ"));
}

#[tokio::test]
async fn readiness_reports_enabled_gateways() {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    let h = harness(default_gateways(), MemoryStorefront::default(), MemoryOrders::default());
    let router = esim_payments::http::routes::build_router(h.state.clone());

    let req = Request::builder().uri("/ops/readiness").body(Body::empty()).unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["ready"], true);
    assert_eq!(v["enabledGateways"], 3);
}
