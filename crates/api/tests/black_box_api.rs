use chrono::{Duration as ChronoDuration, Utc};
use gbau_auth::{Actor, JwtClaims};
use gbau_core::{SellerId, UserId};
use gbau_infra::config::AppConfig;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Bind first so pagination links can point at the real address.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let config = AppConfig::from_lookup(|var| match var {
            "JWT_SECRET" => Some(JWT_SECRET.to_string()),
            "APP_URL" => Some(base_url.clone()),
            "PAG_LIMIT" => Some("2".to_string()),
            _ => None,
        })
        .unwrap();
        let app = gbau_api::app::build_app(&config).await.unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(actor: Actor) -> String {
    let now = Utc::now();
    let claims = JwtClaims::new(actor, now - ChronoDuration::seconds(5), now + ChronoDuration::minutes(10));

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

async fn create_product(client: &reqwest::Client, srv: &TestServer, seller: &str, title: &str) -> Value {
    let res = client
        .post(srv.url("/products"))
        .bearer_auth(seller)
        .json(&json!({ "title": title, "description": "Plain cotton tee" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

async fn create_variant(client: &reqwest::Client, srv: &TestServer, token: &str, body: Value) -> Value {
    let res = client
        .post(srv.url("/variants"))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

async fn get_json(client: &reqwest::Client, url: String, token: &str) -> Value {
    let res = client.get(url).bearer_auth(token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    res.json().await.unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(srv.url("/products"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn actor_is_derived_from_token() {
    let srv = TestServer::spawn().await;
    let seller = SellerId::new();
    let token = mint_jwt(Actor::Seller(seller));

    let body = get_json(&reqwest::Client::new(), srv.url("/whoami"), &token).await;
    assert_eq!(body["role"], "seller");
    assert_eq!(body["subject"].as_str().unwrap(), seller.to_string());
}

#[tokio::test]
async fn variants_keep_product_aggregates_in_step() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let seller = mint_jwt(Actor::Seller(SellerId::new()));

    let product = create_product(&client, &srv, &seller, "Tee").await;
    let product_id = product["id"].as_str().unwrap().to_string();
    assert_eq!(product["stock"], 0);

    let a = create_variant(
        &client,
        &srv,
        &seller,
        json!({ "product_id": product_id, "company": "Acme", "stock": 5, "value": 10.0, "color": ["RED"], "size": "M" }),
    )
    .await;
    assert_eq!(a["original_value"], 10.0);
    create_variant(
        &client,
        &srv,
        &seller,
        json!({ "product_id": product_id, "company": "Acme", "stock": 3, "value": 20.0 }),
    )
    .await;

    let product = get_json(&client, srv.url(&format!("/products/{product_id}")), &seller).await;
    assert_eq!(product["stock"], 8);
    assert_eq!(product["average_price"], 15.0);

    let a_id = a["id"].as_str().unwrap();
    let res = client
        .patch(srv.url(&format!("/variants/{a_id}")))
        .bearer_auth(&seller)
        .json(&json!({ "stock": 7, "value": 12.5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["stock"], 7);
    assert_eq!(updated["original_value"], 10.0);

    let product = get_json(&client, srv.url(&format!("/products/{product_id}")), &seller).await;
    assert_eq!(product["stock"], 10);
}

#[tokio::test]
async fn order_prices_lines_and_takes_stock() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let seller = mint_jwt(Actor::Seller(SellerId::new()));
    let buyer = mint_jwt(Actor::Buyer(UserId::new()));

    let product = create_product(&client, &srv, &seller, "Tee").await;
    let product_id = product["id"].as_str().unwrap();
    let a = create_variant(
        &client,
        &srv,
        &seller,
        json!({ "product_id": product_id, "company": "Acme", "stock": 5, "value": 10.0 }),
    )
    .await;
    let b = create_variant(
        &client,
        &srv,
        &seller,
        json!({ "product_id": product_id, "company": "Acme", "stock": 3, "value": 20.0 }),
    )
    .await;

    let res = client
        .post(srv.url("/orders"))
        .bearer_auth(&buyer)
        .json(&json!({ "lines": [
            { "variant_id": a["id"], "quantity": 2 },
            { "variant_id": b["id"], "quantity": 1 },
        ]}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let order: Value = res.json().await.unwrap();
    assert_eq!(order["status"], "Pending");
    assert_eq!(order["lines"][0]["price"], 20.0);
    assert_eq!(order["lines"][1]["price"], 20.0);

    let a_now = get_json(&client, srv.url(&format!("/variants/{}", a["id"].as_str().unwrap())), &buyer).await;
    assert_eq!(a_now["stock"], 3);
    let product = get_json(&client, srv.url(&format!("/products/{product_id}")), &buyer).await;
    assert_eq!(product["stock"], 5);

    // Cancelling does not put stock back.
    let order_id = order["id"].as_str().unwrap();
    let res = client
        .delete(srv.url(&format!("/orders/{order_id}")))
        .bearer_auth(&buyer)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let product = get_json(&client, srv.url(&format!("/products/{product_id}")), &buyer).await;
    assert_eq!(product["stock"], 5);

    let stored = get_json(&client, srv.url(&format!("/orders/{order_id}")), &buyer).await;
    assert_eq!(stored["status"], "Cancelled");
}

#[tokio::test]
async fn duplicate_variant_ids_are_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let seller = mint_jwt(Actor::Seller(SellerId::new()));
    let buyer = mint_jwt(Actor::Buyer(UserId::new()));

    let product = create_product(&client, &srv, &seller, "Tee").await;
    let a = create_variant(
        &client,
        &srv,
        &seller,
        json!({ "product_id": product["id"], "company": "Acme", "stock": 5, "value": 10.0 }),
    )
    .await;

    let res = client
        .post(srv.url("/orders"))
        .bearer_auth(&buyer)
        .json(&json!({ "lines": [
            { "variant_id": a["id"], "quantity": 1 },
            { "variant_id": a["id"], "quantity": 2 },
        ]}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");

    let listing = get_json(&client, srv.url("/orders"), &buyer).await;
    assert_eq!(listing["orders"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn orders_are_scoped_to_their_parties() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let seller = mint_jwt(Actor::Seller(SellerId::new()));
    let buyer = mint_jwt(Actor::Buyer(UserId::new()));
    let stranger = mint_jwt(Actor::Buyer(UserId::new()));
    let admin = mint_jwt(Actor::Admin(UserId::new()));

    let product = create_product(&client, &srv, &seller, "Tee").await;
    let a = create_variant(
        &client,
        &srv,
        &seller,
        json!({ "product_id": product["id"], "company": "Acme", "stock": 5, "value": 10.0 }),
    )
    .await;
    let res = client
        .post(srv.url("/orders"))
        .bearer_auth(&buyer)
        .json(&json!({ "lines": [{ "variant_id": a["id"], "quantity": 1 }] }))
        .send()
        .await
        .unwrap();
    let order: Value = res.json().await.unwrap();
    let order_url = srv.url(&format!("/orders/{}", order["id"].as_str().unwrap()));

    let res = client.get(&order_url).bearer_auth(&stranger).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    get_json(&client, order_url.clone(), &seller).await;
    let res = client
        .patch(&order_url)
        .bearer_auth(&admin)
        .json(&json!({ "status": "Shipped" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["status"], "Shipped");
}

#[tokio::test]
async fn role_and_input_errors_map_to_statuses() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let buyer = mint_jwt(Actor::Buyer(UserId::new()));

    let res = client
        .post(srv.url("/products"))
        .bearer_auth(&buyer)
        .json(&json!({ "title": "Tee", "description": "Plain cotton tee" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .get(srv.url("/products/not-a-uuid"))
        .bearer_auth(&buyer)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_id");

    let res = client
        .get(srv.url(&format!("/variants/{}", uuid::Uuid::now_v7())))
        .bearer_auth(&buyer)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listings_carry_page_links() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let seller = mint_jwt(Actor::Seller(SellerId::new()));

    for title in ["Tee", "Cap", "Mug"] {
        create_product(&client, &srv, &seller, title).await;
    }

    let first = get_json(&client, srv.url("/products"), &seller).await;
    assert_eq!(first["products"].as_array().unwrap().len(), 2);
    assert_eq!(first["pages"], 2);
    assert!(first["prev"].is_null());
    assert_eq!(first["next"], srv.url("/products?page=2&limit=2"));

    let res = client
        .get(srv.url("/products?page=3"))
        .bearer_auth(&seller)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
