use reqwest::StatusCode;
use serde_json::{Value, json};

use storefront_api::app::{router_for, services::AppServices};

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over a fresh in-memory store, on an ephemeral port.
        let app = router_for(AppServices::in_memory());
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

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self.client.post(self.url(path)).json(&body).send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap())
    }

    async fn put(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self.client.put(self.url(path)).json(&body).send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap())
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let res = self.client.get(self.url(path)).send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap())
    }

    async fn delete(&self, path: &str) -> (StatusCode, Value) {
        let res = self.client.delete(self.url(path)).send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap())
    }

    /// Tags 1..=4.
    async fn seed_tags(&self) {
        for name in ["rock music", "pop music", "blue", "red"] {
            let (status, _) = self.post("/api/tags", json!({ "tag_name": name })).await;
            assert_eq!(status, StatusCode::CREATED);
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn tag_ids(product: &Value) -> Vec<i64> {
    let mut ids: Vec<i64> = product["tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_i64().unwrap())
        .collect();
    ids.sort_unstable();
    ids
}

#[tokio::test]
async fn health_reports_ok_with_request_id() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"], "in_memory");
}

#[tokio::test]
async fn product_tag_lifecycle_reconciles_over_http() {
    let srv = TestServer::spawn().await;
    srv.seed_tags().await;

    let (status, created) = srv
        .post(
            "/api/products",
            json!({ "product_name": "Basketball", "price": 200.0, "stock": 3, "tagIds": [1, 2, 3] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["productTagIdArr"].as_array().unwrap().len(), 3);
    let id = created["product"]["id"].as_i64().unwrap();

    let (status, updated) = srv
        .put(&format!("/api/products/{id}"), json!({ "tagIds": [2, 3, 4] }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tag_ids(&updated), vec![2, 3, 4]);

    // Price only: tags stay as they are.
    let (status, updated) = srv
        .put(&format!("/api/products/{id}"), json!({ "price": 10.0 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["price"], 10.0);
    assert_eq!(tag_ids(&updated), vec![2, 3, 4]);
}

#[tokio::test]
async fn unknown_tag_on_update_rolls_back_scalar_change() {
    let srv = TestServer::spawn().await;
    srv.seed_tags().await;

    let (_, created) = srv
        .post(
            "/api/products",
            json!({ "product_name": "Basketball", "price": 200.0, "tagIds": [1, 2] }),
        )
        .await;
    let id = created["product"]["id"].as_i64().unwrap();

    let (status, body) = srv
        .put(
            &format!("/api/products/{id}"),
            json!({ "product_name": "Renamed", "tagIds": [1, 2, 999] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "store_error");

    let (status, product) = srv.get(&format!("/api/products/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(product["product_name"], "Basketball");
    assert_eq!(tag_ids(&product), vec![1, 2]);
}

#[tokio::test]
async fn product_without_tags_is_created_with_default_stock() {
    let srv = TestServer::spawn().await;

    let (status, product) = srv
        .post("/api/products", json!({ "product_name": "Cap", "price": 5.5 }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(product["stock"], 10);
    assert!(product["category_id"].is_null());
}

#[tokio::test]
async fn product_validation_and_missing_rows() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv
        .post("/api/products", json!({ "product_name": "Cap", "price": -1.0 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, _) = srv.get("/api/products/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = srv.get("/api/products/42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = srv.put("/api/products/42", json!({ "tagIds": [1] })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = srv.delete("/api/products/42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn categories_crud_and_conflicts() {
    let srv = TestServer::spawn().await;

    let (status, _) = srv.get("/api/categories").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = srv.post("/api/categories", json!({ "category_name": "  " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, shirts) = srv.post("/api/categories", json!({ "category_name": "Shirts" })).await;
    assert_eq!(status, StatusCode::CREATED);
    let category_id = shirts["id"].as_i64().unwrap();

    let (status, _) = srv.post("/api/categories", json!({ "category_name": "Shirts" })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = srv
        .post(
            "/api/products",
            json!({ "product_name": "Plain T-Shirt", "price": 15.0, "category_id": category_id }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, list) = srv.get("/api/categories").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list[0]["products"][0]["product_name"], "Plain T-Shirt");

    let (status, renamed) = srv
        .put(&format!("/api/categories/{category_id}"), json!({ "category_name": "Tops" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["category_name"], "Tops");

    let (status, body) = srv.delete(&format!("/api/categories/{category_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Category deleted successfully. 1 row(s) removed.");

    let (_, products) = srv.get("/api/products").await;
    assert!(products[0]["category"].is_null());
}

#[tokio::test]
async fn tags_crud_and_cascade() {
    let srv = TestServer::spawn().await;
    srv.seed_tags().await;

    let (_, created) = srv
        .post(
            "/api/products",
            json!({ "product_name": "Basketball", "price": 200.0, "tagIds": [1, 2] }),
        )
        .await;
    let id = created["product"]["id"].as_i64().unwrap();

    let (status, tag) = srv.get("/api/tags/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tag["products"][0]["id"], id);

    let (status, _) = srv.put("/api/tags/2", json!({ "tag_name": "rock music" })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = srv.delete("/api/tags/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Tag deleted successfully. 1 row(s) removed.");

    let (_, product) = srv.get(&format!("/api/products/{id}")).await;
    assert_eq!(tag_ids(&product), vec![2]);

    let (status, _) = srv.delete("/api/tags/1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_json_gets_error_body() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .post(srv.url("/api/tags"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_body");
}
