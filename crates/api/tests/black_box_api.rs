use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;

use forgeroute_api::app::services::AppServices;
use forgeroute_routing::{NoopGeocoder, RoutingSettings};

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over in-memory stores, bound to an ephemeral port.
        let services = Arc::new(AppServices::in_memory(RoutingSettings::default(), Arc::new(NoopGeocoder)));
        let app = forgeroute_api::app::build_app(services);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn put(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self.client.put(self.url(path)).json(&body).send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self.client.post(self.url(path)).json(&body).send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let res = self.client.get(self.url(path)).send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    /// Active seller `km` east of the customer with `stock` units of `product`.
    async fn seller(&self, name: &str, km: f64, product: Uuid, stock: u32) -> String {
        let id = Uuid::now_v7().to_string();
        let (status, _) = self
            .put(
                &format!("/sellers/{id}"),
                json!({"business_name": name, "latitude": 0.0, "longitude": km / 111.195}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = self
            .put(&format!("/sellers/{id}/stock"), json!({"product_id": product, "on_hand": stock}))
            .await;
        assert_eq!(status, StatusCode::OK);
        id
    }

    async fn place(&self, product: Uuid, quantity: u32) -> (StatusCode, Value) {
        self.post(
            "/orders",
            json!({
                "lines": [{"product_id": product, "variation_id": null, "quantity": quantity}],
                "shipping": {
                    "street": "1 Equator Way",
                    "city": "Nowhere",
                    "country": "Atlantic",
                    "coordinates": {"lat": 0.0, "lon": 0.0}
                }
            }),
        )
        .await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn health_is_ok() {
    let srv = TestServer::spawn().await;
    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn order_is_routed_to_nearest_stocked_seller_and_accepted() {
    let srv = TestServer::spawn().await;
    let product = Uuid::now_v7();
    let near = srv.seller("Near", 5.0, product, 2).await;
    let _far = srv.seller("Far", 50.0, product, 10).await;

    let (status, body) = srv.place(product, 1).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["outcome"]["outcome"], "assigned");
    assert_eq!(body["outcome"]["seller_id"], near.as_str());
    assert_eq!(body["order"]["status"], "assigned");
    assert_eq!(body["order"]["attempt_count"], 1);
    let order_id = body["order"]["id"].as_str().unwrap().to_string();

    let (_, pending) = srv.get(&format!("/sellers/{near}/orders/pending")).await;
    assert_eq!(pending.as_array().unwrap().len(), 1);
    assert_eq!(pending[0]["id"], order_id.as_str());

    let (_, stock) = srv.get(&format!("/sellers/{near}/stock")).await;
    assert_eq!(stock[0]["reserved"], 1);
    assert_eq!(stock[0]["available"], 1);

    let (status, accepted) = srv.post(&format!("/sellers/{near}/orders/{order_id}/accept"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["status"], "accepted");

    let (_, dashboard) = srv.get("/admin/fulfillment/dashboard").await;
    assert_eq!(dashboard["accepted_by_sellers"], 1);
    assert_eq!(dashboard["pending_seller_acceptance"], 0);
}

#[tokio::test]
async fn seller_reject_reassigns_and_other_sellers_are_refused() {
    let srv = TestServer::spawn().await;
    let product = Uuid::now_v7();
    let near = srv.seller("Near", 5.0, product, 2).await;
    let far = srv.seller("Far", 50.0, product, 10).await;

    let (_, body) = srv.place(product, 1).await;
    let order_id = body["order"]["id"].as_str().unwrap().to_string();

    let (status, refused) = srv.post(&format!("/sellers/{far}/orders/{order_id}/reject"), json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(refused["error"], "unauthorized");

    let (status, body) = srv.post(&format!("/sellers/{near}/orders/{order_id}/reject"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"]["seller_id"], far.as_str());
    assert_eq!(body["order"]["attempt_count"], 2);
    assert_eq!(body["order"]["excluded_sellers"][0], near.as_str());

    let (_, stock) = srv.get(&format!("/sellers/{near}/stock")).await;
    assert_eq!(stock[0]["reserved"], 0);
}

#[tokio::test]
async fn order_without_candidates_falls_back_to_admin_and_alerts() {
    let srv = TestServer::spawn().await;
    let product = Uuid::now_v7();
    let (status, _) = srv
        .put(&format!("/admin/stock/{product}"), json!({"quantity": 1}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = srv.place(product, 1).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["outcome"]["outcome"], "fell_back_to_admin");
    assert_eq!(body["outcome"]["reason"], "candidates_exhausted");
    assert_eq!(body["outcome"]["out_of_stock_alerts"], 1);
    assert_eq!(body["order"]["status"], "admin_fallback");
    assert_eq!(body["order"]["fulfillment_source"], "admin");
    assert!(body["order"]["assigned_seller_id"].is_null());

    let (_, dashboard) = srv.get("/admin/fulfillment/dashboard").await;
    assert_eq!(dashboard["admin_fallbacks"], 1);
}

#[tokio::test]
async fn cancel_releases_stock_and_is_idempotent() {
    let srv = TestServer::spawn().await;
    let product = Uuid::now_v7();
    let seller = srv.seller("Only", 5.0, product, 3).await;

    let (_, body) = srv.place(product, 2).await;
    let order_id = body["order"]["id"].as_str().unwrap().to_string();

    let (status, first) = srv.post(&format!("/orders/{order_id}/cancel"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["status"], "cancelled");
    let (status, _) = srv.post(&format!("/orders/{order_id}/cancel"), json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (_, stock) = srv.get(&format!("/sellers/{seller}/stock")).await;
    assert_eq!(stock[0]["reserved"], 0);
    assert_eq!(stock[0]["on_hand"], 3);

    let (_, again) = srv.post(&format!("/orders/{order_id}/assign"), json!({})).await;
    assert_eq!(again["success"], false);
    assert_eq!(again["outcome"]["outcome"], "not_routable");
}

#[tokio::test]
async fn admin_override_takes_order_from_seller() {
    let srv = TestServer::spawn().await;
    let product = Uuid::now_v7();
    let seller = srv.seller("Only", 5.0, product, 3).await;

    let (_, body) = srv.place(product, 1).await;
    let order_id = body["order"]["id"].as_str().unwrap().to_string();

    let (status, body) = srv
        .post("/admin/fulfillment/override", json!({"order_id": order_id}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"]["reason"], "admin_override");
    assert_eq!(body["order"]["status"], "admin_fallback");

    let (_, stock) = srv.get(&format!("/sellers/{seller}/stock")).await;
    assert_eq!(stock[0]["reserved"], 0);
}

#[tokio::test]
async fn stock_cannot_drop_below_reserved() {
    let srv = TestServer::spawn().await;
    let product = Uuid::now_v7();
    let seller = srv.seller("Only", 5.0, product, 3).await;
    srv.place(product, 2).await;

    let (status, body) = srv
        .put(&format!("/sellers/{seller}/stock"), json!({"product_id": product, "on_hand": 1}))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invariant_violation");
}

#[tokio::test]
async fn unknown_and_malformed_ids_are_rejected() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv.get(&format!("/orders/{}", Uuid::now_v7())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, body) = srv.get("/orders/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_id");

    let (status, _) = srv
        .post("/orders", json!({"lines": [], "shipping": {}}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
