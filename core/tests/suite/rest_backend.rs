use pretty_assertions::assert_eq;
use serde_json::json;
use vantalu_core::backend::{Backend, BackendError, RestBackend};
use vantalu_core::model::{DeliveryAreaInput, OrderStatus};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn order_row(id: &str, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "user_id": "user-1",
        "items": "[{\"dish_id\":\"1\",\"name\":\"Special Hyderabadi Biryani\",\"price\":250,\"quantity\":2}]",
        "subtotal": 500,
        "delivery_fee": 30,
        "packaging_fee": 20,
        "total_amount": 550,
        "customer_name": "Lakshmi",
        "phone": "9876543210",
        "email": null,
        "delivery_address": "12-3 Brodipet",
        "city": "Guntur",
        "pincode": "522002",
        "status": status,
        "payment_method": "cod",
        "created_at": "2026-10-01T10:00:00+00:00",
        "estimated_delivery_time": "2026-10-01T10:45:00+00:00"
    })
}

#[tokio::test]
async fn delivery_area_lookup_sends_filter_and_keys() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/delivery_areas"))
        .and(query_param("pincode", "eq.522002"))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "area-1",
            "pincode": "522002",
            "area_name": "Brodipet",
            "city": "Guntur",
            "delivery_fee": 30,
            "estimated_delivery_minutes": 45,
            "is_serviceable": true
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let backend = RestBackend::new(&server.uri(), "anon-key")
        .with_access_token(Some("user-token".to_string()));
    let area = backend.delivery_area("522002").await.unwrap().unwrap();
    assert_eq!(area.area_name, "Brodipet");
    assert_eq!(area.delivery_fee, 30);
}

#[tokio::test]
async fn anon_key_is_bearer_without_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/delivery_areas"))
        .and(header("authorization", "Bearer anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let backend = RestBackend::new(&server.uri(), "anon-key");
    assert_eq!(backend.delivery_area("500001").await.unwrap(), None);
}

#[tokio::test]
async fn orders_for_user_decode_string_items() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/orders"))
        .and(query_param("user_id", "eq.user-1"))
        .and(query_param("order", "created_at.desc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([order_row("ord-2", "preparing")])),
        )
        .mount(&server)
        .await;

    let backend = RestBackend::new(&server.uri(), "anon-key");
    let orders = backend.orders(Some("user-1")).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].items[0].quantity, 2);
    assert_eq!(orders[0].item_count(), 2);
    assert_eq!(orders[0].status, OrderStatus::Preparing);
}

#[tokio::test]
async fn status_update_patches_and_returns_row() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/orders"))
        .and(query_param("id", "eq.ord-1"))
        .and(header("prefer", "return=representation"))
        .and(body_json(json!({ "status": "out_for_delivery" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([order_row("ord-1", "out_for_delivery")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let backend = RestBackend::new(&server.uri(), "anon-key");
    let order = backend
        .update_order_status("ord-1", OrderStatus::OutForDelivery)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::OutForDelivery);
}

#[tokio::test]
async fn empty_representation_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let backend = RestBackend::new(&server.uri(), "anon-key");
    let err = backend
        .update_order_status("ghost", OrderStatus::Delivered)
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::NotFound { table: "orders", ref id } if id == "ghost"));
}

#[tokio::test]
async fn server_errors_keep_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/delivery_areas"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint"
        })))
        .mount(&server)
        .await;

    let backend = RestBackend::new(&server.uri(), "anon-key");
    let err = backend
        .insert_delivery_area(&DeliveryAreaInput {
            pincode: "522002".to_string(),
            area_name: "Brodipet".to_string(),
            city: "Guntur".to_string(),
            delivery_fee: 30,
            estimated_delivery_minutes: 45,
            is_serviceable: true,
        })
        .await
        .unwrap_err();
    match err {
        BackendError::Api { status, message } => {
            assert_eq!(status, 409);
            assert_eq!(message, "duplicate key value violates unique constraint");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn favorites_and_roles() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/favorites"))
        .and(query_param("select", "dish_id"))
        .and(query_param("user_id", "eq.user-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "dish_id": "3" }, { "dish_id": "6" }])),
        )
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/favorites"))
        .and(query_param("dish_id", "eq.3"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/user_roles"))
        .and(query_param("role", "eq.admin"))
        .and(query_param("user_id", "eq.user-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "role": "admin" }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/user_roles"))
        .and(query_param("user_id", "eq.user-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let backend = RestBackend::new(&server.uri(), "anon-key");
    assert_eq!(
        backend.favorites("user-1").await.unwrap(),
        vec!["3".to_string(), "6".to_string()]
    );
    backend.remove_favorite("user-1", "3").await.unwrap();
    assert!(backend.has_role("user-1", "admin").await.unwrap());
    assert!(!backend.has_role("user-2", "admin").await.unwrap());
}
