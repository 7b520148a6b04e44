use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use vantalu_core::backend::{Backend, BackendError, RestBackend};
use vantalu_core::model::OrderStatus;
use vantalu_core::tracking::{FollowOutcome, OrderTracker};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn record(status: &str) -> serde_json::Value {
    json!({
        "id": "ord-1",
        "items": [{ "dish_id": "2", "name": "Crispy Masala Dosa", "price": 80, "quantity": 1 }],
        "subtotal": 80,
        "delivery_fee": 30,
        "packaging_fee": 20,
        "total_amount": 130,
        "customer_name": "Sita",
        "phone": "9876543210",
        "delivery_address": "4-12 Arundelpet",
        "city": "Guntur",
        "pincode": "522002",
        "status": status,
        "payment_method": "cod",
        "created_at": "2026-10-01T10:00:00Z"
    })
}

fn sse_body(events: &[serde_json::Value]) -> String {
    events
        .iter()
        .map(|event| format!("event: postgres_changes\ndata: {event}\n\n"))
        .collect()
}

async fn mount_order(server: &MockServer, status: &str) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/orders"))
        .and(query_param("id", "eq.ord-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([record(status)])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn feed_yields_updates_for_the_order() {
    let server = MockServer::start().await;
    let body = sse_body(&[
        json!({ "type": "INSERT", "record": record("placed") }),
        json!({ "type": "UPDATE", "record": record("preparing") }),
        json!({ "type": "UPDATE", "record": record("out_for_delivery") }),
    ]);
    Mock::given(method("GET"))
        .and(path("/realtime/v1/orders"))
        .and(query_param("id", "eq.ord-1"))
        .and(header("accept", "text/event-stream"))
        .and(header("apikey", "anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let backend = RestBackend::new(&server.uri(), "anon-key");
    let mut feed = backend.subscribe_order("ord-1").await.unwrap();

    let first = feed.next_update().await.unwrap().unwrap();
    let second = feed.next_update().await.unwrap().unwrap();
    assert_eq!(first.status, OrderStatus::Preparing);
    assert_eq!(second.status, OrderStatus::OutForDelivery);
    assert!(feed.next_update().await.is_none());
}

#[tokio::test]
async fn rejected_subscription_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/realtime/v1/orders"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Invalid API key" })),
        )
        .mount(&server)
        .await;

    let backend = RestBackend::new(&server.uri(), "bad-key");
    let err = backend.subscribe_order("ord-1").await.err().unwrap();
    assert!(matches!(err, BackendError::Api { status: 401, ref message } if message == "Invalid API key"));
}

#[tokio::test]
async fn tracker_follows_feed_to_delivery() {
    let server = MockServer::start().await;
    mount_order(&server, "placed").await;
    let body = sse_body(&[
        json!({ "type": "UPDATE", "record": record("confirmed") }),
        json!({ "type": "UPDATE", "record": record("confirmed") }),
        json!({ "type": "UPDATE", "record": record("delivered") }),
        json!({ "type": "UPDATE", "record": record("cancelled") }),
    ]);
    Mock::given(method("GET"))
        .and(path("/realtime/v1/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let backend: Arc<dyn Backend> = Arc::new(RestBackend::new(&server.uri(), "anon-key"));
    let mut tracker = OrderTracker::open(backend, "ord-1").await.unwrap();
    assert_eq!(tracker.stage(), Some(0));

    let mut titles = Vec::new();
    let outcome = tracker
        .follow(|_, note| {
            if let Some(note) = note {
                titles.push(note.title.clone());
            }
        })
        .await
        .unwrap();

    assert_eq!(outcome, FollowOutcome::Terminal(OrderStatus::Delivered));
    assert_eq!(
        titles,
        vec![
            "Order #ord-1: Confirmed".to_string(),
            "Order #ord-1: Delivered".to_string(),
        ]
    );
    assert_eq!(tracker.order().status, OrderStatus::Delivered);
}

#[tokio::test]
async fn tracker_reports_closed_feed() {
    let server = MockServer::start().await;
    mount_order(&server, "preparing").await;
    Mock::given(method("GET"))
        .and(path("/realtime/v1/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            sse_body(&[json!({ "type": "UPDATE", "record": record("out_for_delivery") })]),
            "text/event-stream",
        ))
        .mount(&server)
        .await;

    let backend: Arc<dyn Backend> = Arc::new(RestBackend::new(&server.uri(), "anon-key"));
    let mut tracker = OrderTracker::open(backend, "ord-1").await.unwrap();
    let outcome = tracker.follow(|_, _| {}).await.unwrap();
    assert_eq!(outcome, FollowOutcome::FeedClosed);
    assert_eq!(tracker.progress(), Some(66));
}
