//! End-to-end router tests against the in-memory store.

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use lighting_storefront::api::{build_router, AppState};
use lighting_storefront::config::AppConfig;
use lighting_storefront::events::EventBus;
use lighting_storefront::store::MemoryStore;

fn app() -> Router {
    app_with(Arc::new(MemoryStore::new()))
}

fn app_with(store: Arc<MemoryStore>) -> Router {
    build_router(AppState::new(store, EventBus::disabled(), AppConfig::default()))
}

async fn send(app: &Router, method: &str, uri: &str, user: Option<(&str, &str)>, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some((id, role)) = user {
        req = req.header("x-user-id", id).header("x-user-role", role);
    }
    let req = match body {
        Some(b) => req.header("content-type", "application/json").body(Body::from(b.to_string())),
        None => req.body(Body::empty()),
    }
    .expect("request");
    let response = app.clone().oneshot(req).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body bytes");
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).expect("json parse") };
    (status, json)
}

const ADMIN: Option<(&str, &str)> = Some(("admin_1", "admin"));
const ALICE: Option<(&str, &str)> = Some(("alice", "customer"));
const BOB: Option<(&str, &str)> = Some(("bob", "customer"));

fn dec(v: &Value) -> Decimal {
    v.as_str().expect("decimal string").parse().expect("decimal")
}

fn pendant() -> Value {
    json!({
        "sku": "pl-100",
        "name": {"ar": "مصباح معلق", "en": "Pendant Light"},
        "description": {"ar": "مصباح معلق من الألمنيوم", "en": "Aluminium pendant"},
        "brand": "Lumina",
        "category": "indoor",
        "price": "199.99",
        "discount_percent": "15",
        "images": ["https://cdn.example.com/pl-100.jpg"],
        "options": {
            "color_temperatures": [{"value": "warm"}, {"value": "cool", "price_increase": "20"}],
            "ip_ratings": [{"value": "IP20"}, {"value": "IP65", "price_increase": "35"}],
            "wattages": [{"value": 12}, {"value": 18, "price_increase": "15"}]
        },
        "inventory": 10,
        "publish": true
    })
}

async fn create_pendant(app: &Router) -> String {
    let (status, body) = send(app, "POST", "/api/v1/products", ADMIN, Some(pendant())).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_str().expect("product id").to_owned()
}

fn address() -> Value {
    json!({
        "full_name": "Alice Example",
        "phone": "+966500000000",
        "email": "alice@example.com",
        "street": "12 King Fahd Road",
        "city": "Riyadh",
        "country": "SA"
    })
}

async fn create_configuration(app: &Router, product_id: &str, quantity: u32) -> String {
    let create = json!({"product_id": product_id, "quantity": quantity});
    let (status, body) = send(app, "POST", "/api/v1/configurations", ALICE, Some(create)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_str().expect("configuration id").to_owned()
}

/// Places a one-unit order for Alice through the configuration flow.
async fn place_order(app: &Router, product_id: &str) -> String {
    let id = create_configuration(app, product_id, 1).await;
    send(app, "POST", &format!("/api/v1/configurations/{id}/confirm"), ALICE, Some(json!({"shipping_address": address()}))).await;
    let (status, order) = send(app, "POST", &format!("/api/v1/configurations/{id}/complete"), ALICE, None).await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    order["id"].as_str().expect("order id").to_owned()
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(&app(), "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let req = Request::builder().uri("/health").header("x-request-id", "req-42").body(Body::empty()).expect("request");
    let response = app().oneshot(req).await.expect("response");
    assert_eq!(response.headers().get("x-request-id").and_then(|v| v.to_str().ok()), Some("req-42"));
}

#[tokio::test]
async fn test_product_admin_routes_require_admin() {
    let app = app();
    let (status, body) = send(&app, "POST", "/api/v1/products", ALICE, Some(pendant())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "forbidden");

    let (status, _) = send(&app, "POST", "/api/v1/products", None, Some(pendant())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    create_pendant(&app).await;
    let (status, body) = send(&app, "POST", "/api/v1/products", ADMIN, Some(pendant())).await;
    assert_eq!(status, StatusCode::CONFLICT, "duplicate sku: {body}");
}

#[tokio::test]
async fn test_product_listing_is_localized() {
    let app = app();
    let id = create_pendant(&app).await;

    let (status, body) = send(&app, "GET", &format!("/api/v1/products/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "مصباح معلق");
    assert_eq!(body["direction"], "rtl");
    assert_eq!(body["sku"], "PL-100");
    assert_eq!(dec(&body["pricing"]["discounted_price"]), Decimal::from(170));

    let (_, body) = send(&app, "GET", &format!("/api/v1/products/{id}?locale=en"), None, None).await;
    assert_eq!(body["name"], "Pendant Light");
    assert_eq!(body["direction"], "ltr");

    let (status, body) = send(&app, "GET", "/api/v1/products?search=pendant&brand=Lumina", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    let (_, body) = send(&app, "GET", "/api/v1/products?category=outdoor", None, None).await;
    assert_eq!(body["total"], 0);

    let (_, body) = send(&app, "GET", "/api/v1/brands", None, None).await;
    assert_eq!(body, json!(["Lumina"]));
}

#[tokio::test]
async fn test_draft_products_are_hidden_from_customers() {
    let app = app();
    let mut draft = pendant();
    draft["publish"] = json!(false);
    let (_, body) = send(&app, "POST", "/api/v1/products", ADMIN, Some(draft)).await;
    let id = body["id"].as_str().expect("id").to_owned();

    let (status, _) = send(&app, "GET", &format!("/api/v1/products/{id}"), ALICE, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "GET", &format!("/api/v1/products/{id}"), ADMIN, None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&app, "GET", "/api/v1/products?all=true", ADMIN, None).await;
    assert_eq!(body["total"], 1);
    let (_, body) = send(&app, "GET", "/api/v1/products?all=true", ALICE, None).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_product_options_and_price_are_validated() {
    let app = app();
    let mut negative = pendant();
    negative["options"]["wattages"][1]["price_increase"] = json!("-15");
    let (status, body) = send(&app, "POST", "/api/v1/products", ADMIN, Some(negative)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");

    let mut duplicated = pendant();
    duplicated["options"]["ip_ratings"] = json!([{"value": "IP65"}, {"value": "IP65", "price_increase": "10"}]);
    let (status, _) = send(&app, "POST", "/api/v1/products", ADMIN, Some(duplicated)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let mut huge = pendant();
    huge["price"] = json!("792281625142643375935439503");
    let (status, _) = send(&app, "POST", "/api/v1/products", ADMIN, Some(huge)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, body) = send(&app, "GET", "/api/v1/products?all=true", ADMIN, None).await;
    assert_eq!(body["total"], 0);

    let id = create_pendant(&app).await;
    let bad = json!({"options": {"color_temperatures": [{"value": "warm", "price_increase": "-1"}]}});
    let (status, _) = send(&app, "PUT", &format!("/api/v1/products/{id}"), ADMIN, Some(bad)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Every configuration of a stored product can be priced, so none is saved and then rejected.
    let create = json!({"product_id": id, "selection": {"color_temperature": "cool", "ip_rating": "IP65", "wattage": 18}, "quantity": 999});
    let (status, body) = send(&app, "POST", "/api/v1/configurations", ALICE, Some(create)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    // (170 + 20 + 35 + 15) * 999 + 50
    assert_eq!(dec(&body["quote"]["total"]), Decimal::from(239_810));
}

#[tokio::test]
async fn test_admin_update_publish_and_archive() {
    let app = app();
    let mut draft = pendant();
    draft["publish"] = json!(false);
    let (_, body) = send(&app, "POST", "/api/v1/products", ADMIN, Some(draft)).await;
    let id = body["id"].as_str().expect("product id").to_owned();

    let update = json!({"name": {"ar": "مصباح معلق برو", "en": "Pendant Pro"}, "price": "300", "discount_percent": "0"});
    let (status, _) = send(&app, "PUT", &format!("/api/v1/products/{id}"), ALICE, Some(update.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = send(&app, "PUT", &format!("/api/v1/products/{id}?locale=en"), ADMIN, Some(update)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["name"], "Pendant Pro");
    assert_eq!(dec(&body["pricing"]["discounted_price"]), Decimal::from(300));
    assert_eq!(body["inventory"], 10);
    assert_eq!(body["status"], "draft");

    let (status, _) = send(&app, "POST", "/api/v1/cart/items", ADMIN, Some(json!({"product_id": id, "quantity": 1}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "drafts cannot be added to a cart");

    let (status, body) = send(&app, "POST", &format!("/api/v1/products/{id}/publish"), ADMIN, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "active");
    let (status, _) = send(&app, "GET", &format!("/api/v1/products/{id}"), ALICE, None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, cart) = send(&app, "POST", "/api/v1/cart/items", ALICE, Some(json!({"product_id": id, "quantity": 1}))).await;
    assert_eq!(dec(&cart["total"]), Decimal::from(350));

    let (status, _) = send(&app, "DELETE", &format!("/api/v1/products/{id}"), ALICE, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, "DELETE", &format!("/api/v1/products/{id}"), ADMIN, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send(&app, "GET", "/api/v1/products", None, None).await;
    assert_eq!(body["total"], 0);
    let (status, _) = send(&app, "GET", &format!("/api/v1/products/{id}"), ALICE, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, body) = send(&app, "GET", "/api/v1/brands", None, None).await;
    assert_eq!(body, json!([]));

    let (_, cart) = send(&app, "GET", "/api/v1/cart", ALICE, None).await;
    assert_eq!(cart["item_count"], 1);
    assert_eq!(cart["items"][0]["available"], false);
    assert_eq!(dec(&cart["shipping"]), Decimal::ZERO);
    assert_eq!(dec(&cart["total"]), Decimal::ZERO);
    let (status, _) = send(&app, "POST", "/api/v1/checkout", ALICE, Some(json!({"shipping_address": address()}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_quote_applies_discount_surcharges_and_shipping() {
    let app = app();
    let id = create_pendant(&app).await;
    let request = json!({"selection": {"color_temperature": "cool", "ip_rating": "IP65"}, "quantity": 2});
    let (status, body) = send(&app, "POST", &format!("/api/v1/products/{id}/quote"), None, Some(request)).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    // ceil(199.99 * 0.85) = 170; (170 + 20 + 35) * 2 = 450; plus 50 shipping.
    let quote = &body["quote"];
    assert_eq!(dec(&quote["subtotal"]), Decimal::from(450));
    assert_eq!(dec(&quote["shipping"]), Decimal::from(50));
    assert_eq!(dec(&quote["total"]), Decimal::from(500));
    assert_eq!(body["selection"]["wattage"], 12);

    let bad = json!({"selection": {"ip_rating": "IP68"}, "quantity": 1});
    let (status, body) = send(&app, "POST", &format!("/api/v1/products/{id}/quote"), None, Some(bad)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "validation_error");

    let zero = json!({"quantity": 0});
    let (status, _) = send(&app, "POST", &format!("/api/v1/products/{id}/quote"), None, Some(zero)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_configuration_flow_places_order() {
    let app = app();
    let product_id = create_pendant(&app).await;

    let create = json!({"product_id": product_id, "selection": {"color_temperature": "warm"}, "quantity": 3});
    let (status, body) = send(&app, "POST", "/api/v1/configurations", ALICE, Some(create)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["status"], "draft");
    let id = body["id"].as_str().expect("configuration id").to_owned();

    // Completing before confirming is an invalid transition.
    let (status, body) = send(&app, "POST", &format!("/api/v1/configurations/{id}/complete"), ALICE, None).await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    let (status, body) = send(&app, "PATCH", &format!("/api/v1/configurations/{id}"), ALICE, Some(json!({"quantity": 2}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dec(&body["quote"]["total"]), Decimal::from(390));

    let (status, _) = send(&app, "GET", &format!("/api/v1/configurations/{id}"), BOB, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "POST", &format!("/api/v1/configurations/{id}/confirm"), ALICE, Some(json!({"shipping_address": address()}))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "confirmed");

    let (status, order) = send(&app, "POST", &format!("/api/v1/configurations/{id}/complete?locale=en"), ALICE, None).await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(dec(&order["total"]), Decimal::from(390));
    assert_eq!(order["status"], "pending");
    assert_eq!(order["configuration_id"], id.as_str());
    let number = order["order_number"].as_u64().expect("order number");
    assert_eq!(order["message"], format!("Thank you! Your order #{number} has been received."));

    let (_, body) = send(&app, "GET", &format!("/api/v1/configurations/{id}"), ALICE, None).await;
    assert_eq!(body["status"], "ordered");
    assert_eq!(body["order_id"], order["id"]);

    let (status, _) = send(&app, "POST", &format!("/api/v1/configurations/{id}/abandon"), ALICE, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, product) = send(&app, "GET", &format!("/api/v1/products/{product_id}"), None, None).await;
    assert_eq!(product["inventory"], 8);

    let order_id = order["id"].as_str().expect("order id");
    let (status, body) = send(&app, "GET", &format!("/api/v1/orders/{order_id}"), ALICE, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order_number"], number);
    let (status, _) = send(&app, "GET", &format!("/api/v1/orders/{order_id}"), BOB, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, body) = send(&app, "GET", "/api/v1/orders", ALICE, None).await;
    assert_eq!(body.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_confirm_rejects_invalid_address() {
    let app = app();
    let product_id = create_pendant(&app).await;
    let (_, body) = send(&app, "POST", "/api/v1/configurations", ALICE, Some(json!({"product_id": product_id}))).await;
    let id = body["id"].as_str().expect("configuration id").to_owned();

    let mut bad = address();
    bad["email"] = json!("not-an-email");
    let (status, body) = send(&app, "POST", &format!("/api/v1/configurations/{id}/confirm"), ALICE, Some(json!({"shipping_address": bad}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "validation_error");
}

#[tokio::test]
async fn test_reconfirm_replaces_address() {
    let app = app();
    let product_id = create_pendant(&app).await;
    let id = create_configuration(&app, &product_id, 1).await;
    let confirm = format!("/api/v1/configurations/{id}/confirm");
    send(&app, "POST", &confirm, ALICE, Some(json!({"shipping_address": address()}))).await;

    let mut moved = address();
    moved["city"] = json!("Jeddah");
    let (status, body) = send(&app, "POST", &confirm, ALICE, Some(json!({"shipping_address": moved}))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "confirmed");
    assert_eq!(body["shipping_address"]["city"], "Jeddah");

    let (status, order) = send(&app, "POST", &format!("/api/v1/configurations/{id}/complete"), ALICE, None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["shipping_address"]["city"], "Jeddah");

    // A repeated complete finds the configuration already ordered.
    let (status, body) = send(&app, "POST", &format!("/api/v1/configurations/{id}/complete"), ALICE, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "conflict");
    let (_, body) = send(&app, "GET", "/api/v1/orders", ALICE, None).await;
    assert_eq!(body.as_array().map(Vec::len), Some(1));
    let (_, product) = send(&app, "GET", &format!("/api/v1/products/{product_id}"), None, None).await;
    assert_eq!(product["inventory"], 9);
}

#[tokio::test]
async fn test_abandon_draft() {
    let app = app();
    let product_id = create_pendant(&app).await;
    let id = create_configuration(&app, &product_id, 2).await;

    let (status, _) = send(&app, "POST", &format!("/api/v1/configurations/{id}/abandon"), BOB, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = send(&app, "POST", &format!("/api/v1/configurations/{id}/abandon"), ALICE, None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "abandoned");

    let (status, _) = send(&app, "PATCH", &format!("/api/v1/configurations/{id}"), ALICE, Some(json!({"quantity": 1}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = send(&app, "POST", &format!("/api/v1/configurations/{id}/confirm"), ALICE, Some(json!({"shipping_address": address()}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = send(&app, "POST", &format!("/api/v1/configurations/{id}/complete"), ALICE, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = send(&app, "POST", &format!("/api/v1/configurations/{id}/abandon"), ALICE, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_order_ships_and_delivers() {
    let app = app();
    let product_id = create_pendant(&app).await;
    let order_id = place_order(&app, &product_id).await;

    let (status, _) = send(&app, "POST", &format!("/api/v1/orders/{order_id}/ship"), ADMIN, None).await;
    assert_eq!(status, StatusCode::CONFLICT, "unpaid orders are not shipped");
    send(&app, "POST", &format!("/api/v1/orders/{order_id}/pay"), ADMIN, None).await;

    let (status, _) = send(&app, "POST", &format!("/api/v1/orders/{order_id}/ship"), ALICE, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = send(&app, "POST", &format!("/api/v1/orders/{order_id}/ship?locale=en"), ADMIN, None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "shipped");
    assert_eq!(body["status_label"], "Shipped");

    let (status, body) = send(&app, "POST", &format!("/api/v1/orders/{order_id}/deliver?locale=en"), ADMIN, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "delivered");
    assert_eq!(body["status_label"], "Delivered");
    assert_eq!(body["payment_status"], "paid");

    let (status, _) = send(&app, "POST", &format!("/api/v1/orders/{order_id}/cancel"), ALICE, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (_, body) = send(&app, "GET", &format!("/api/v1/orders/{order_id}"), ALICE, None).await;
    assert_eq!(body["status"], "delivered");
}

#[tokio::test]
async fn test_order_lifecycle_and_cancel() {
    let app = app();
    let product_id = create_pendant(&app).await;
    let (_, body) = send(&app, "POST", "/api/v1/configurations", ALICE, Some(json!({"product_id": product_id}))).await;
    let id = body["id"].as_str().expect("configuration id").to_owned();
    send(&app, "POST", &format!("/api/v1/configurations/{id}/confirm"), ALICE, Some(json!({"shipping_address": address()}))).await;
    let (_, order) = send(&app, "POST", &format!("/api/v1/configurations/{id}/complete"), ALICE, None).await;
    let order_id = order["id"].as_str().expect("order id").to_owned();

    let (status, _) = send(&app, "POST", &format!("/api/v1/orders/{order_id}/pay"), ALICE, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = send(&app, "POST", &format!("/api/v1/orders/{order_id}/pay"), ADMIN, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "processing");
    assert_eq!(body["payment_status"], "paid");

    let (status, body) = send(&app, "POST", &format!("/api/v1/orders/{order_id}/cancel?locale=en"), ALICE, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");
    assert_eq!(body["status_label"], "Cancelled");
    assert_eq!(body["payment_status"], "refunded");

    let (status, _) = send(&app, "POST", &format!("/api/v1/orders/{order_id}/ship"), ADMIN, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_cart_checkout() {
    let app = app();
    let product_id = create_pendant(&app).await;

    let (status, body) = send(&app, "POST", "/api/v1/checkout", ALICE, Some(json!({"shipping_address": address()}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "empty cart: {body}");

    let (_, cart) = send(&app, "GET", "/api/v1/cart?locale=en", ALICE, None).await;
    assert_eq!(cart["empty_message"], "Your cart is empty");
    assert_eq!(dec(&cart["total"]), Decimal::ZERO);

    let item = json!({"product_id": product_id, "selection": {"color_temperature": "cool"}, "quantity": 1});
    send(&app, "POST", "/api/v1/cart/items", ALICE, Some(item.clone())).await;
    let (status, cart) = send(&app, "POST", "/api/v1/cart/items", ALICE, Some(item)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(cart["item_count"], 1);
    assert_eq!(cart["unit_count"], 2);
    // (170 + 20) * 2 + 50
    assert_eq!(dec(&cart["total"]), Decimal::from(430));

    let line_id = cart["items"][0]["id"].as_str().expect("line id").to_owned();
    let (status, cart) = send(&app, "PATCH", &format!("/api/v1/cart/items/{line_id}"), ALICE, Some(json!({"quantity": 4}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["unit_count"], 4);

    let (status, _) = send(&app, "PATCH", &format!("/api/v1/cart/items/{}", uuid::Uuid::nil()), ALICE, Some(json!({"quantity": 1}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, bob_cart) = send(&app, "GET", "/api/v1/cart", BOB, None).await;
    assert_eq!(bob_cart["item_count"], 0);

    let (status, order) = send(&app, "POST", "/api/v1/checkout", ALICE, Some(json!({"shipping_address": address()}))).await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(dec(&order["total"]), Decimal::from(810));
    assert_eq!(order["lines"].as_array().map(Vec::len), Some(1));

    let (_, cart) = send(&app, "GET", "/api/v1/cart", ALICE, None).await;
    assert_eq!(cart["item_count"], 0);
    let (_, product) = send(&app, "GET", &format!("/api/v1/products/{product_id}"), None, None).await;
    assert_eq!(product["inventory"], 6);
}

#[tokio::test]
async fn test_cart_remove_and_clear() {
    let app = app();
    let product_id = create_pendant(&app).await;
    send(&app, "POST", "/api/v1/cart/items", ALICE, Some(json!({"product_id": product_id, "quantity": 1}))).await;
    let cool = json!({"product_id": product_id, "selection": {"color_temperature": "cool"}, "quantity": 2});
    let (_, cart) = send(&app, "POST", "/api/v1/cart/items", ALICE, Some(cool)).await;
    assert_eq!(cart["item_count"], 2);
    let warm_line = cart["items"][0]["id"].as_str().expect("line id").to_owned();

    let (status, cart) = send(&app, "DELETE", &format!("/api/v1/cart/items/{warm_line}"), ALICE, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["item_count"], 1);
    assert_eq!(cart["items"][0]["selection"]["color_temperature"], "cool");
    // (170 + 20) * 2 + 50
    assert_eq!(dec(&cart["total"]), Decimal::from(430));

    let (status, _) = send(&app, "DELETE", &format!("/api/v1/cart/items/{warm_line}"), ALICE, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "DELETE", "/api/v1/cart", ALICE, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);
    let (_, cart) = send(&app, "GET", "/api/v1/cart?locale=en", ALICE, None).await;
    assert_eq!(cart["item_count"], 0);
    assert_eq!(cart["empty_message"], "Your cart is empty");
    let (status, _) = send(&app, "POST", "/api/v1/checkout", ALICE, Some(json!({"shipping_address": address()}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_checkout_rejects_quantity_beyond_stock() {
    let app = app();
    let product_id = create_pendant(&app).await;
    send(&app, "POST", "/api/v1/cart/items", ALICE, Some(json!({"product_id": product_id, "quantity": 11}))).await;
    let (status, body) = send(&app, "POST", "/api/v1/checkout", ALICE, Some(json!({"shipping_address": address()}))).await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
    let (_, cart) = send(&app, "GET", "/api/v1/cart", ALICE, None).await;
    assert_eq!(cart["unit_count"], 11);
}

#[tokio::test]
async fn test_pages_and_messages() {
    let app = app();
    let (status, body) = send(&app, "GET", "/api/v1/pages/about?locale=en", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "About us");
    assert_eq!(body["direction"], "ltr");

    let (status, body) = send(&app, "GET", "/api/v1/pages/careers", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");

    let req = Request::builder().uri("/api/v1/messages").header("accept-language", "en-US,en;q=0.9").body(Body::empty()).expect("request");
    let response = app.clone().oneshot(req).await.expect("response");
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body bytes");
    let body: Value = serde_json::from_slice(&bytes).expect("json parse");
    assert_eq!(body["locale"], "en");
    assert_eq!(body["messages"]["cart"]["empty"], "Your cart is empty");

    let (_, body) = send(&app, "GET", "/api/v1/messages", None, None).await;
    assert_eq!(body["locale"], "ar");
    assert_eq!(body["direction"], "rtl");
}

#[tokio::test]
async fn test_contact_form() {
    let store = Arc::new(MemoryStore::new());
    let app = app_with(store.clone());
    let message = json!({
        "name": "Sara",
        "email": "sara@example.com",
        "subject": "Hotel lobby project",
        "message": "We need 40 outdoor fixtures rated IP65 for a hotel entrance."
    });
    let (status, body) = send(&app, "POST", "/api/v1/contact?locale=en", None, Some(message.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Thanks for reaching out. We will get back to you shortly.");
    let stored = store.contact_messages().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].email, "sara@example.com");
    assert_eq!(stored[0].locale, lighting_storefront::i18n::Locale::En);

    let mut bad = message;
    bad["email"] = json!("nope");
    let (status, _) = send(&app, "POST", "/api/v1/contact", None, Some(bad)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(store.contact_messages().await.len(), 1);
}
