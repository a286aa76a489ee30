mod support;

use axum::body::{Body, Bytes};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use esim_payments::domain::checkout::{Verdict, VerifyOutcome};
use esim_payments::domain::order::OrderStatus;
use esim_payments::http::routes::build_router;
use http_body_util::BodyExt;
use support::*;
use tower::ServiceExt;

async fn call(router: Router, req: Request<Body>) -> (StatusCode, Option<String>, Bytes) {
    let resp = router.oneshot(req).await.expect("router call failed");
    let status = resp.status();
    let location = resp
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = resp.into_body().collect().await.expect("collect body").to_bytes();
    (status, location, body)
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn approved_notification(order_id: &str) -> serde_json::Value {
    serde_json::json!({
        "Approved": false,
        "IsoResponseCode": "SP4",
        "ResponseMessage": "SPI Preprocessing complete",
        "SpiToken": "spi-tok-1",
        "OrderIdentifier": order_id,
    })
}

#[tokio::test]
async fn three_ds_response_renders_bridge_page() {
    let h = harness(default_gateways(), MemoryStorefront::default(), MemoryOrders::default());
    let router = build_router(h.state.clone());

    let req = Request::builder()
        .method("POST")
        .uri("/payments/powertranz/3ds-response")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("IsoResponseCode=SP4&SpiToken=abc&OrderIdentifier=ord_1"))
        .unwrap();
    let (status, _, body) = call(router, req).await;

    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.contains("POWERTRANZ_3DS_RESULT"));
    assert!(html.contains("https://shop.example.com"));
    // the bank callback never touches the order
    assert_eq!(h.events.count(), 0);
}

#[tokio::test]
async fn duplicate_notification_completes_once() {
    let h = harness(
        default_gateways(),
        MemoryStorefront::default(),
        MemoryOrders::with(vec![pending_order("ord_pt", None)]),
    );
    h.adapters.set_outcome(VerifyOutcome {
        verdict: Verdict::Approved,
        order_id: Some("ord_pt".to_string()),
        transaction_id: Some("pt-txn-1".to_string()),
    });

    for _ in 0..2 {
        let router = build_router(h.state.clone());
        let (status, _, body) = call(
            router,
            post_json("/payments/powertranz/hpp-notify", approved_notification("ord_pt")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["received"], true);
    }

    let order = h.orders.get("ord_pt").unwrap();
    assert_eq!(order.status, OrderStatus::Completed);
    assert_eq!(order.payment_method.as_deref(), Some("powertranz-hpp"));
    assert_eq!(h.events.count(), 1);
}

#[tokio::test]
async fn failed_notification_still_answers_ok() {
    let h = harness(
        default_gateways(),
        MemoryStorefront::default(),
        MemoryOrders::with(vec![pending_order("ord_pt2", None)]),
    );
    let router = build_router(h.state.clone());

    // no SpiToken, so nothing can be read back from PowerTranz
    let body = serde_json::json!({
        "IsoResponseCode": "05",
        "ResponseMessage": "Do not honour",
        "OrderIdentifier": "ord_pt2",
    });
    let (status, _, body) = call(router, post_json("/payments/powertranz/hpp-notify", body)).await;

    assert_eq!(status, StatusCode::OK);
    let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["received"], true);
    assert_eq!(h.orders.get("ord_pt2").unwrap().status, OrderStatus::Pending);
    assert_eq!(h.events.count(), 0);
}

#[tokio::test]
async fn form_posted_failure_leaves_order_pending() {
    let h = harness(
        default_gateways(),
        MemoryStorefront::default(),
        MemoryOrders::with(vec![pending_order("ord_pt3", None)]),
    );
    let router = build_router(h.state.clone());

    let req = Request::builder()
        .method("POST")
        .uri("/payments/powertranz/hpp-notify")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("OrderIdentifier=ord_pt3"))
        .unwrap();
    let (status, _, _) = call(router, req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.orders.get("ord_pt3").unwrap().status, OrderStatus::Pending);
    assert_eq!(h.events.count(), 0);
}

#[tokio::test]
async fn verified_decline_on_hosted_page_keeps_order_pending() {
    let h = harness(
        default_gateways(),
        MemoryStorefront::default(),
        MemoryOrders::with(vec![pending_order("ord_pt4", None)]),
    );
    h.adapters.set_outcome(VerifyOutcome {
        verdict: Verdict::Declined("Do not honour".to_string()),
        order_id: Some("ord_pt4".to_string()),
        transaction_id: None,
    });
    let router = build_router(h.state.clone());

    let (status, _, _) = call(
        router,
        post_json("/payments/powertranz/hpp-notify", approved_notification("ord_pt4")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.orders.get("ord_pt4").unwrap().status, OrderStatus::Pending);
    assert_eq!(h.events.count(), 0);
}

#[tokio::test]
async fn hosted_page_callback_without_token_redirects_as_failed() {
    let h = harness(
        default_gateways(),
        MemoryStorefront::default(),
        MemoryOrders::with(vec![pending_order("ord_cb2", None)]),
    );
    let router = build_router(h.state.clone());

    let body = serde_json::json!({
        "IsoResponseCode": "05",
        "OrderIdentifier": "ord_cb2",
    });
    let (status, location, _) = call(router, post_json("/payments/powertranz/hpp-callback", body)).await;

    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(
        location.as_deref(),
        Some("https://shop.example.com/checkout/result?status=failed&orderId=ord_cb2")
    );
    assert_eq!(h.orders.get("ord_cb2").unwrap().status, OrderStatus::Pending);
}

#[tokio::test]
async fn hosted_page_callback_redirects_to_result_page() {
    let h = harness(
        default_gateways(),
        MemoryStorefront::default(),
        MemoryOrders::with(vec![pending_order("ord_cb", None)]),
    );
    h.adapters.set_outcome(VerifyOutcome {
        verdict: Verdict::Approved,
        order_id: Some("ord_cb".to_string()),
        transaction_id: Some("pt-txn-2".to_string()),
    });
    let router = build_router(h.state.clone());

    let (status, location, _) = call(
        router,
        post_json("/payments/powertranz/hpp-callback", approved_notification("ord_cb")),
    )
    .await;

    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(
        location.as_deref(),
        Some("https://shop.example.com/checkout/result?status=completed&orderId=ord_cb")
    );
}

#[tokio::test]
async fn hosted_page_cancel_returns_to_checkout() {
    let h = harness(default_gateways(), MemoryStorefront::default(), MemoryOrders::default());
    let router = build_router(h.state.clone());

    let req = Request::builder()
        .uri("/payments/powertranz/hpp-cancel?orderId=ord_9")
        .body(Body::empty())
        .unwrap();
    let (status, location, _) = call(router, req).await;

    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(
        location.as_deref(),
        Some("https://shop.example.com/checkout?orderId=ord_9&cancelled=true")
    );
}

#[tokio::test]
async fn unknown_currency_filter_is_a_bad_request() {
    let h = harness(default_gateways(), MemoryStorefront::default(), MemoryOrders::default());
    let router = build_router(h.state.clone());

    let req = Request::builder()
        .uri("/payments/gateways?currency=XYZ")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = call(router, req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["error"]["code"], "UNSUPPORTED_CURRENCY");
}

#[tokio::test]
async fn guest_order_lookup_needs_matching_token() {
    let mut order = pending_order("ord_g", None);
    order.guest_email = Some("guest@example.com".to_string());
    order.guest_token_hash = Some(esim_payments::domain::guest_token::digest_token("tok-guest"));
    let h = harness(default_gateways(), MemoryStorefront::default(), MemoryOrders::with(vec![order]));

    let lookup = |token: &str| {
        Request::builder()
            .uri("/payments/orders/ord_g")
            .header("X-Guest-Token", token)
            .body(Body::empty())
            .unwrap()
    };

    let (status, _, body) = call(build_router(h.state.clone()), lookup("tok-guest")).await;
    assert_eq!(status, StatusCode::OK);
    let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["orderId"], "ord_g");
    assert!(v.get("guestTokenHash").is_none());

    let (status, _, _) = call(build_router(h.state.clone()), lookup("wrong")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
