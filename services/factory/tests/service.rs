//! End-to-end tests driving the factory router over in-process HTTP.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
use ed25519_dalek::pkcs8::{EncodePrivateKey, EncodePublicKey};
use ed25519_dalek::SigningKey;
use factory::config::FactoryConfig;
use factory::keys::KeyMaterial;
use factory::notify::LogNotifier;
use factory::router::create_router;
use factory::state::AppState;
use factory::store::Store;
use rand::rngs::OsRng;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tower::ServiceExt;
use types::vendor::{Role, Vendor};

const TEST_BASE_URL: &str = "http://factory.test";
const TEST_DELAY_MS: u64 = 100;

struct TestApp {
    app: Router,
    store: Store,
    _dir: TempDir,
}

async fn test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("factory.db").display()
    );
    let store = Store::connect(&url).await.unwrap();

    let signing = SigningKey::generate(&mut OsRng);
    let private_pem = signing.to_pkcs8_pem(LineEnding::LF).unwrap();
    let public_pem = signing
        .verifying_key()
        .to_public_key_pem(LineEnding::LF)
        .unwrap();
    let keys = KeyMaterial::from_pems(private_pem.as_bytes(), &public_pem).unwrap();

    let config = FactoryConfig {
        base_url: TEST_BASE_URL.to_owned(),
        order_delay: Duration::from_millis(TEST_DELAY_MS),
        ..FactoryConfig::default()
    };

    let state = AppState::new(store.clone(), keys, config, Arc::new(LogNotifier));
    TestApp {
        app: create_router(state),
        store,
        _dir: dir,
    }
}

async fn seed_vendor(store: &Store, id: &str) -> Vendor {
    let mut vendor = Vendor::new(id);
    vendor.name = Some(format!("{id} pizza"));
    vendor.email = Some(format!("{id}@jwt.com"));
    store.add_vendor(&vendor).await.unwrap();
    vendor
}

fn request(method: &str, uri: &str, auth: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = auth {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {key}"));
    }
    match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn order_body(items: usize) -> Value {
    json!({
        "diner": { "id": 719, "name": "j", "email": "j@jwt.com" },
        "order": {
            "items": (0..items)
                .map(|i| json!({ "menuId": i, "description": "Veggie", "price": 0.0038 }))
                .collect::<Vec<_>>(),
            "storeId": "5",
            "franchiseId": 4
        }
    })
}

async fn place_order(app: &Router, api_key: &str, items: usize) -> (StatusCode, Value) {
    send(
        app,
        request("POST", "/api/order", Some(api_key), Some(order_body(items))),
    )
    .await
}

/// Turn an absolute report URL into a path this router can serve.
fn report_path(report_url: &str) -> String {
    report_url
        .strip_prefix(TEST_BASE_URL)
        .expect("report URL should start with the configured base URL")
        .to_owned()
}

#[tokio::test]
async fn order_requires_authentication() {
    let t = test_app().await;

    let (status, body) = place_order(&t.app, "not-a-key", 1).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "invalid authentication");

    let (status, _) = send(
        &t.app,
        request("POST", "/api/order", None, Some(order_body(1))),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn order_issues_verifiable_token() {
    let t = test_app().await;
    let vendor = seed_vendor(&t.store, "v1").await;

    let (status, body) = place_order(&t.app, vendor.api_key.as_str(), 1).await;
    assert_eq!(status, StatusCode::OK);
    let jwt = body["jwt"].as_str().unwrap();
    assert_eq!(jwt.split('.').count(), 3);
    assert!(body.get("reportUrl").is_none());

    let (status, body) = send(
        &t.app,
        request("POST", "/api/order/verify", None, Some(json!({ "jwt": jwt }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "valid");
    assert_eq!(body["payload"]["vendor"]["id"], "v1");
    assert_eq!(body["payload"]["vendor"]["name"], "v1 pizza");
    assert_eq!(body["payload"]["diner"]["name"], "j");
    assert_eq!(body["payload"]["order"]["storeId"], "5");
    assert_eq!(body["payload"]["iss"], "pizza-factory");
}

#[tokio::test]
async fn order_with_missing_fields_is_rejected() {
    let t = test_app().await;
    let vendor = seed_vendor(&t.store, "v1").await;
    let key = vendor.api_key.as_str();

    for body in [
        json!({ "order": { "items": [{ "menuId": 1 }] } }),
        json!({ "diner": { "name": "j" } }),
        json!({ "diner": null, "order": { "items": [{ "menuId": 1 }] } }),
        json!({ "diner": {}, "order": { "items": [{ "menuId": 1 }] } }),
    ] {
        let (status, response) =
            send(&t.app, request("POST", "/api/order", Some(key), Some(body))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["message"], "Missing required parameters");
    }
}

#[tokio::test]
async fn order_item_bounds_fail_after_delay() {
    let t = test_app().await;
    let vendor = seed_vendor(&t.store, "v1").await;

    for items in [0, 21] {
        let started = Instant::now();
        let (status, body) = place_order(&t.app, vendor.api_key.as_str(), items).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            body["message"],
            "Unable to satisfy pizza order. The oven is full."
        );
        assert!(
            started.elapsed() >= Duration::from_millis(TEST_DELAY_MS),
            "oven-full response must not arrive before the configured delay"
        );
    }

    // The boundary item counts themselves are fine
    let (status, _) = place_order(&t.app, vendor.api_key.as_str(), 20).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn verify_rejects_garbage_uniformly() {
    let t = test_app().await;

    for body in [
        json!({ "jwt": "deadbeef" }),
        json!({ "jwt": "a.b.c" }),
        json!({}),
    ] {
        let (status, response) = send(
            &t.app,
            request("POST", "/api/order/verify", None, Some(body)),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(response["message"], "invalid");
    }
}

#[tokio::test]
async fn jwks_document_is_public() {
    let t = test_app().await;

    let (status, body) = send(&t.app, request("GET", "/.well-known/jwks.json", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    let key = &body["keys"][0];
    assert_eq!(key["kty"], "OKP");
    assert_eq!(key["crv"], "Ed25519");
    assert_eq!(key["alg"], "EdDSA");
    assert!(key["x"].is_string());
    assert!(key["kid"].is_string());
}

#[tokio::test]
async fn chaos_requires_known_kind() {
    let t = test_app().await;
    let vendor = seed_vendor(&t.store, "v1").await;
    let key = vendor.api_key.as_str();

    for kind in ["oops", "none"] {
        let (status, body) = send(
            &t.app,
            request("PUT", &format!("/api/vendor/chaos/{kind}"), Some(key), None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid chaos type");
    }
}

#[tokio::test]
async fn badjwt_chaos_returns_corrupt_token() {
    let t = test_app().await;
    let vendor = seed_vendor(&t.store, "v1").await;
    let key = vendor.api_key.as_str();

    let (status, body) = send(
        &t.app,
        request("PUT", "/api/vendor/chaos/badjwt", Some(key), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Chaos initiated");

    let (status, body) = place_order(&t.app, key, 1).await;
    assert_eq!(status, StatusCode::OK);
    let jwt = body["jwt"].as_str().unwrap().to_owned();
    assert_eq!(jwt.split('.').count(), 3, "corrupt token still looks like a token");
    let report_url = body["reportUrl"].as_str().unwrap();
    assert!(report_url.contains(key));

    // The corrupt token never verifies
    let (status, body) = send(
        &t.app,
        request("POST", "/api/order/verify", None, Some(json!({ "jwt": jwt }))),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "invalid");
}

#[tokio::test]
async fn fail_chaos_is_deterministic_until_resolved() {
    let t = test_app().await;
    let vendor = seed_vendor(&t.store, "v1").await;
    let key = vendor.api_key.as_str();

    send(
        &t.app,
        request("PUT", "/api/vendor/chaos/fail", Some(key), None),
    )
    .await;

    // Every issuance fails the same way while the fault is active
    let mut report_url = String::new();
    for _ in 0..2 {
        let (status, body) = place_order(&t.app, key, 1).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "chaos monkey");
        report_url = body["reportUrl"].as_str().unwrap().to_owned();
        assert!(report_url.contains(key));
    }

    // A wrong fix code leaves the fault in place
    let wrong_path = format!("/api/support/{key}/report/00000000");
    let (status, body) = send(&t.app, request("GET", &wrong_path, None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "unresolved");
    let (status, _) = place_order(&t.app, key, 1).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    // The embedded fix code clears it
    let (status, body) = send(&t.app, request("GET", &report_path(&report_url), None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Problem resolved. Pizza is back on the menu!");

    let (status, body) = place_order(&t.app, key, 1).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("reportUrl").is_none());

    // The code was consumed: replaying it reports no active chaos
    let (status, body) = send(&t.app, request("GET", &report_path(&report_url), None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "No chaos currently executing");
}

#[tokio::test]
async fn throttle_chaos_example_scenario() {
    let t = test_app().await;
    let vendor = seed_vendor(&t.store, "v1").await;
    let key = vendor.api_key.as_str();

    // Healthy vendor: fast issuance, no report URL
    let (status, body) = place_order(&t.app, key, 1).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("reportUrl").is_none());

    send(
        &t.app,
        request("PUT", "/api/vendor/chaos/throttle", Some(key), None),
    )
    .await;

    // Throttled: a real token still comes back, late, with the report URL
    let started = Instant::now();
    let (status, body) = place_order(&t.app, key, 1).await;
    assert_eq!(status, StatusCode::OK);
    assert!(started.elapsed() >= Duration::from_millis(TEST_DELAY_MS));
    let jwt = body["jwt"].as_str().unwrap().to_owned();
    let report_url = body["reportUrl"].as_str().unwrap().to_owned();

    let (status, verify_body) = send(
        &t.app,
        request("POST", "/api/order/verify", None, Some(json!({ "jwt": jwt }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verify_body["message"], "valid");

    // Resolving restores normal issuance
    let (status, body) = send(&t.app, request("GET", &report_path(&report_url), None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Problem resolved. Pizza is back on the menu!");

    let (status, body) = place_order(&t.app, key, 1).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("reportUrl").is_none());
}

#[tokio::test]
async fn support_report_for_unknown_vendor() {
    let t = test_app().await;

    let (status, body) = send(
        &t.app,
        request("GET", "/api/support/ghost/report/00000000", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Unknown vendor");
}

#[tokio::test]
async fn vendor_record_redacts_fix_code() {
    let t = test_app().await;
    let vendor = seed_vendor(&t.store, "v1").await;
    let key = vendor.api_key.as_str();

    send(
        &t.app,
        request("PUT", "/api/vendor/chaos/fail", Some(key), None),
    )
    .await;

    let (status, body) = send(&t.app, request("GET", "/api/vendor", Some(key), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "v1");
    assert_eq!(body["chaos"]["type"], "fail");
    assert!(body["chaos"].get("fixCode").is_none());
}

#[tokio::test]
async fn vendor_profile_update() {
    let t = test_app().await;
    let vendor = seed_vendor(&t.store, "v1").await;
    let key = vendor.api_key.as_str();

    let (status, body) = send(
        &t.app,
        request(
            "PUT",
            "/api/vendor",
            Some(key),
            Some(json!({ "website": "https://pizza.example" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["website"], "https://pizza.example");
    assert_eq!(body["name"], "v1 pizza");
}

#[tokio::test]
async fn login_code_flow_registers_vendor() {
    let t = test_app().await;

    let (status, body) = send(
        &t.app,
        request(
            "POST",
            "/api/vendor/code",
            None,
            Some(json!({ "id": "newvendor" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Code sent to newvendor");

    // A wrong code is rejected
    let (status, body) = send(
        &t.app,
        request(
            "POST",
            "/api/vendor/auth",
            None,
            Some(json!({ "id": "newvendor", "code": "wrong" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid code");

    // Plant a known code and authenticate with it
    t.store.add_auth_code("newvendor", "cafebabe").await.unwrap();
    let (status, body) = send(
        &t.app,
        request(
            "POST",
            "/api/vendor/auth",
            None,
            Some(json!({ "id": "newvendor", "code": "cafebabe" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "newvendor");
    let api_key = body["apiKey"].as_str().unwrap().to_owned();

    // The returned key authenticates
    let (status, body) = send(&t.app, request("GET", "/api/vendor", Some(&api_key), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "newvendor");

    // Re-authenticating returns the same vendor, not a new one
    let (status, body) = send(
        &t.app,
        request(
            "POST",
            "/api/vendor/auth",
            None,
            Some(json!({ "id": "newvendor", "code": "cafebabe" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["apiKey"], api_key);
}

#[tokio::test]
async fn connect_pairs_two_vendors() {
    let t = test_app().await;
    let a = seed_vendor(&t.store, "a").await;
    let b = seed_vendor(&t.store, "b").await;

    // Purpose is required
    let (status, body) = send(
        &t.app,
        request(
            "POST",
            "/api/vendor/connect",
            Some(a.api_key.as_str()),
            Some(json!({ "purpose": "" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid purpose");

    // First request waits
    let (status, body) = send(
        &t.app,
        request(
            "POST",
            "/api/vendor/connect",
            Some(a.api_key.as_str()),
            Some(json!({ "purpose": "penetrationTesting" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["id"].is_null());

    // Second request pairs, exposing partner contact fields
    let (status, body) = send(
        &t.app,
        request(
            "POST",
            "/api/vendor/connect",
            Some(b.api_key.as_str()),
            Some(json!({ "purpose": "penetrationTesting" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "a");
    assert_eq!(body["name"], "a pizza");
    assert_eq!(body["email"], "a@jwt.com");

    // The first side sees the link through its own record
    let (status, body) = send(
        &t.app,
        request("GET", "/api/vendor", Some(a.api_key.as_str()), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["connections"]["penetrationTesting"]["id"], "b");
}

#[tokio::test]
async fn rating_applies_to_fulfilled_pairing() {
    let t = test_app().await;
    let a = seed_vendor(&t.store, "a").await;
    let b = seed_vendor(&t.store, "b").await;
    t.store.request_connection("a", "test").await.unwrap();
    t.store.request_connection("b", "test").await.unwrap();

    // Out-of-range rating
    let (status, body) = send(
        &t.app,
        request(
            "PUT",
            "/api/vendor/connect",
            Some(a.api_key.as_str()),
            Some(json!({ "id": "b", "purpose": "test", "rating": 6 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid rating");

    let (status, body) = send(
        &t.app,
        request(
            "PUT",
            "/api/vendor/connect",
            Some(a.api_key.as_str()),
            Some(json!({ "id": "b", "purpose": "test", "rating": 4 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rating"], 4);

    // Rating a pairing that does not exist
    let (status, _) = send(
        &t.app,
        request(
            "PUT",
            "/api/vendor/connect",
            Some(b.api_key.as_str()),
            Some(json!({ "id": "ghost", "purpose": "test", "rating": 3 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_surface_requires_role() {
    let t = test_app().await;
    let plain = seed_vendor(&t.store, "plain").await;
    let boss = seed_vendor(&t.store, "boss").await;
    t.store.assign_role("boss", Role::Admin, true).await.unwrap();

    let (status, _) = send(
        &t.app,
        request("GET", "/api/admin/vendors", Some(plain.api_key.as_str()), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &t.app,
        request("GET", "/api/admin/vendors", Some(boss.api_key.as_str()), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    // Promote, then demote
    let (status, body) = send(
        &t.app,
        request(
            "PUT",
            "/api/admin/vendor",
            Some(boss.api_key.as_str()),
            Some(json!({ "id": "plain", "roles": ["admin"] })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["roles"]
        .as_array()
        .unwrap()
        .iter()
        .any(|r| r == "admin"));

    let (status, body) = send(
        &t.app,
        request(
            "PUT",
            "/api/admin/vendor",
            Some(boss.api_key.as_str()),
            Some(json!({ "id": "plain", "roles": [] })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body["roles"]
        .as_array()
        .unwrap()
        .iter()
        .any(|r| r == "admin"));

    // Removal cascades and invalidates the credential
    let (status, _) = send(
        &t.app,
        request(
            "DELETE",
            "/api/admin/vendor/plain",
            Some(boss.api_key.as_str()),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(
        &t.app,
        request("GET", "/api/vendor", Some(plain.api_key.as_str()), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_can_clear_chaos_directly() {
    let t = test_app().await;
    let vendor = seed_vendor(&t.store, "v1").await;
    let boss = seed_vendor(&t.store, "boss").await;
    t.store.assign_role("boss", Role::Admin, true).await.unwrap();

    send(
        &t.app,
        request(
            "PUT",
            "/api/vendor/chaos/fail",
            Some(vendor.api_key.as_str()),
            None,
        ),
    )
    .await;

    let (status, _) = send(
        &t.app,
        request(
            "DELETE",
            "/api/admin/vendor/v1/chaos",
            Some(boss.api_key.as_str()),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Issuance is back to normal without a challenge-response
    let (status, body) = place_order(&t.app, vendor.api_key.as_str(), 1).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("reportUrl").is_none());
}

#[tokio::test]
async fn unknown_endpoints_are_404() {
    let t = test_app().await;

    let (status, body) = send(&t.app, request("GET", "/api/nope", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "unknown endpoint");
}

#[tokio::test]
async fn docs_list_the_surface() {
    let t = test_app().await;

    let (status, body) = send(&t.app, request("GET", "/api/docs", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["endpoints"].as_array().unwrap().len() >= 10);
}
