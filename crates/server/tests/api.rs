//! HTTP-level tests over the full router.
//!
//! The router is wired against the in-memory stores and a lazy (never
//! connected) database pool, so these exercise the real extractors, status
//! mapping, and JSON envelopes without external services.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::Utc;
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::{Value, json};
use sqlx::PgPool;
use tempfile::TempDir;
use tower::ServiceExt;

use bodega_core::{Email, UserId};
use bodega_server::config::Config;
use bodega_server::models::{Role, User};
use bodega_server::routes;
use bodega_server::services::FsImageStore;
use bodega_server::state::AppState;
use bodega_server::stores::memory::{InMemoryCarts, InMemoryCatalog, InMemoryUsers};
use bodega_server::stores::revocation::RevocationRegistry;

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "admin-password";

struct TestApp {
    router: Router,
    users: Arc<InMemoryUsers>,
    _media: TempDir,
}

fn test_config() -> Config {
    Config {
        database_url: SecretString::from("postgres://invalid:5432/db"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        jwt_secret: SecretString::from("integration-signing-key-0123456789abcdef"),
        media_dir: PathBuf::from("unused"),
        cors_origin: None,
        sentry_dsn: None,
    }
}

async fn spawn() -> TestApp {
    let media = TempDir::new().expect("tempdir");
    let users = Arc::new(InMemoryUsers::new());
    let catalog = Arc::new(InMemoryCatalog::new());
    let carts = Arc::new(InMemoryCarts::new());
    let revocations = Arc::new(RevocationRegistry::new());
    let images = Arc::new(
        FsImageStore::create(media.path(), "/media")
            .await
            .expect("image store"),
    );
    let pool = PgPool::connect_lazy("postgres://invalid:5432/db").expect("lazy pool");

    let state = AppState::with_stores(
        test_config(),
        pool,
        users.clone(),
        catalog,
        carts,
        revocations,
        images,
    );

    TestApp {
        router: routes::router().with_state(state),
        users,
        _media: media,
    }
}

impl TestApp {
    fn seed_admin(&self) {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(ADMIN_PASSWORD.as_bytes(), &salt)
            .expect("hash")
            .to_string();
        self.users.seed(
            User {
                id: UserId::generate(),
                email: Email::parse(ADMIN_EMAIL).expect("email"),
                first_name: "Ada".to_owned(),
                last_name: "Admin".to_owned(),
                role: Role::Admin,
                created_at: Utc::now(),
            },
            hash,
        );
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, body)
    }

    async fn json(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");
        self.send(request).await
    }

    async fn register(&self, email: &str) -> String {
        let (status, body) = self
            .json(
                "POST",
                "/user/register",
                None,
                Some(json!({
                    "first_name": "Sam",
                    "last_name": "Shopper",
                    "email": email,
                    "password": "hunter22",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body["token"].as_str().expect("token in body").to_owned()
    }

    async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.json(
            "POST",
            "/user/login",
            None,
            Some(json!({"email": email, "password": password})),
        )
        .await
    }

    async fn admin_token(&self) -> String {
        self.seed_admin();
        let (status, body) = self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
        assert_eq!(status, StatusCode::OK, "admin login failed: {body}");
        body["token"].as_str().expect("token").to_owned()
    }

    async fn create_item(&self, admin_token: &str, name: &str, price: i64, stock: i64) -> String {
        let (status, body) = self
            .json(
                "POST",
                "/items",
                Some(admin_token),
                Some(json!({
                    "name": name,
                    "description": format!("{name} description"),
                    "price": price,
                    "category": "Electronics",
                    "stock": stock,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create item failed: {body}");
        body["item"]["id"].as_str().expect("item id").to_owned()
    }
}

fn decimal(value: &Value) -> Decimal {
    serde_json::from_value(value.clone()).expect("decimal value")
}

#[tokio::test]
async fn register_login_and_profile_flow() {
    let app = spawn().await;

    let token = app.register("sam@example.com").await;

    let (status, body) = app.json("GET", "/user/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "sam@example.com");
    assert_eq!(body["user"]["role"], "user");

    // A fresh login also works and issues a usable token
    let (status, body) = app.login("sam@example.com", "hunter22").await;
    assert_eq!(status, StatusCode::OK);
    let relogin_token = body["token"].as_str().expect("token");
    let (status, _) = app
        .json("GET", "/user/profile", Some(relogin_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn register_sets_session_cookie() {
    let app = spawn().await;

    let request = Request::builder()
        .method("POST")
        .uri("/user/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "first_name": "Sam",
                "last_name": "Shopper",
                "email": "cookie@example.com",
                "password": "hunter22",
            })
            .to_string(),
        ))
        .expect("request");

    let response = app.router.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("set-cookie header");
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Max-Age=3600"));

    // The cookie itself authenticates requests
    let token = cookie
        .strip_prefix("token=")
        .and_then(|rest| rest.split(';').next())
        .expect("token value");
    let request = Request::builder()
        .method("GET")
        .uri("/cart")
        .header(header::COOKIE, format!("token={token}"))
        .body(Body::empty())
        .expect("request");
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = spawn().await;
    app.register("dup@example.com").await;

    let (status, body) = app
        .json(
            "POST",
            "/user/register",
            None,
            Some(json!({
                "first_name": "Sam",
                "last_name": "Shopper",
                "email": "dup@example.com",
                "password": "hunter22",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let app = spawn().await;
    app.register("sam@example.com").await;

    let (status, body) = app.login("sam@example.com", "wrong-password").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Invalid credentials");
}

#[tokio::test]
async fn cart_requires_a_token() {
    let app = spawn().await;

    let (status, _) = app.json("GET", "/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.json("GET", "/cart", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_the_token() {
    let app = spawn().await;
    let token = app.register("sam@example.com").await;

    let (status, _) = app.json("GET", "/cart", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.json("POST", "/user/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    // Same token, same signature, same expiry: now denied everywhere.
    for uri in ["/cart", "/user/profile"] {
        let (status, _) = app.json("GET", uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri} after logout");
    }
}

#[tokio::test]
async fn cart_flow_with_stock_bounds() {
    let app = spawn().await;
    let admin = app.admin_token().await;
    let widget = app.create_item(&admin, "Widget", 10, 5).await;
    let token = app.register("sam@example.com").await;

    // Empty virtual cart before anything is added
    let (status, body) = app.json("GET", "/cart", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cart"]["items"], json!([]));
    assert_eq!(decimal(&body["cart"]["total"]), Decimal::ZERO);

    // Add 3 -> total 30
    let (status, body) = app
        .json(
            "POST",
            "/cart/add",
            Some(&token),
            Some(json!({"item_id": widget, "quantity": 3})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(decimal(&body["cart"]["total"]), Decimal::from(30));

    // Adding 3 more exceeds stock 5
    let (status, body) = app
        .json(
            "POST",
            "/cart/add",
            Some(&token),
            Some(json!({"item_id": widget, "quantity": 3})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    // Adding 2 lands exactly on the stock bound
    let (status, body) = app
        .json(
            "POST",
            "/cart/add",
            Some(&token),
            Some(json!({"item_id": widget, "quantity": 2})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cart"]["items"][0]["quantity"], 5);
    assert_eq!(decimal(&body["cart"]["total"]), Decimal::from(50));

    // Update to 0 removes the line; the cart then reads back empty, not 404
    let (status, body) = app
        .json(
            "PUT",
            &format!("/cart/update/{widget}"),
            Some(&token),
            Some(json!({"quantity": 0})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cart"]["items"], json!([]));

    let (status, body) = app.json("GET", "/cart", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cart"]["items"], json!([]));
    assert_eq!(decimal(&body["cart"]["total"]), Decimal::ZERO);

    // Removing the already-removed line is a 404
    let (status, _) = app
        .json(
            "DELETE",
            &format!("/cart/remove/{widget}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The (persisted, empty) cart can still be cleared
    let (status, body) = app.json("DELETE", "/cart/clear", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["cart"]["total"]), Decimal::ZERO);
}

#[tokio::test]
async fn cart_rejects_bad_quantities_and_unknown_items() {
    let app = spawn().await;
    let admin = app.admin_token().await;
    let widget = app.create_item(&admin, "Widget", 10, 5).await;
    let token = app.register("sam@example.com").await;

    let (status, _) = app
        .json(
            "POST",
            "/cart/add",
            Some(&token),
            Some(json!({"item_id": widget, "quantity": 0})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .json(
            "POST",
            "/cart/add",
            Some(&token),
            Some(json!({"item_id": bodega_core::ItemId::generate(), "quantity": 1})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    app.json(
        "POST",
        "/cart/add",
        Some(&token),
        Some(json!({"item_id": widget, "quantity": 1})),
    )
    .await;
    let (status, _) = app
        .json(
            "PUT",
            &format!("/cart/update/{widget}"),
            Some(&token),
            Some(json!({"quantity": -1})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn item_management_requires_admin() {
    let app = spawn().await;
    let token = app.register("sam@example.com").await;

    let (status, _) = app
        .json(
            "POST",
            "/items",
            Some(&token),
            Some(json!({
                "name": "Widget",
                "description": "nope",
                "price": 10,
                "category": "Electronics",
                "stock": 1,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn item_crud_and_listing() {
    let app = spawn().await;
    let admin = app.admin_token().await;

    let widget = app.create_item(&admin, "Widget", 10, 5).await;
    app.create_item(&admin, "Gadget", 30, 2).await;
    app.create_item(&admin, "Gizmo", 99, 1).await;

    // Duplicate name conflicts
    let (status, _) = app
        .json(
            "POST",
            "/items",
            Some(&admin),
            Some(json!({
                "name": "Widget",
                "description": "again",
                "price": 1,
                "category": "Other",
                "stock": 1,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Public read
    let (status, body) = app.json("GET", &format!("/items/{widget}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["item"]["name"], "Widget");

    // Listing with a price filter and pagination metadata
    let (status, body) = app
        .json("GET", "/items?max_price=50&page=1&limit=1", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total_items"], 2);
    assert_eq!(body["pagination"]["total_pages"], 2);
    assert_eq!(body["items"].as_array().expect("items").len(), 1);

    // Name search
    let (status, body) = app.json("GET", "/items?search=gad", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["name"], "Gadget");

    // Update
    let (status, body) = app
        .json(
            "PUT",
            &format!("/items/{widget}"),
            Some(&admin),
            Some(json!({"price": 12, "stock": 7})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["item"]["price"]), Decimal::from(12));
    assert_eq!(body["item"]["stock"], 7);

    // Delete, then the item is gone
    let (status, _) = app
        .json("DELETE", &format!("/items/{widget}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.json("GET", &format!("/items/{widget}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn item_create_validation_errors() {
    let app = spawn().await;
    let admin = app.admin_token().await;

    for (body, what) in [
        (
            json!({"name": "A", "description": "d", "price": -1, "category": "Other", "stock": 1}),
            "negative price",
        ),
        (
            json!({"name": "A", "description": "d", "price": 1, "category": "Nope", "stock": 1}),
            "unknown category",
        ),
        (
            json!({"name": "A", "description": "d", "price": 1, "category": "Other", "stock": -1}),
            "negative stock",
        ),
    ] {
        let (status, _) = app.json("POST", "/items", Some(&admin), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{what}");
    }
}

#[tokio::test]
async fn image_upload_via_multipart() {
    let app = spawn().await;
    let admin = app.admin_token().await;
    let widget = app.create_item(&admin, "Widget", 10, 5).await;

    let boundary = "test-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"image\"; filename=\"widget.png\"\r\n\
         Content-Type: image/png\r\n\r\n\
         fake-png-bytes\r\n\
         --{boundary}--\r\n"
    );

    let request = Request::builder()
        .method("POST")
        .uri(format!("/items/{widget}/image"))
        .header(header::AUTHORIZATION, format!("Bearer {admin}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .expect("request");

    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let url = body["item"]["image_url"].as_str().expect("image url");
    assert!(url.starts_with("/media/"));
    assert!(url.ends_with(".png"));
}
