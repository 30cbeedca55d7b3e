use crate::handlers::{admin, order, support, vendor};
use crate::state::AppState;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    let order_routes = Router::new()
        .route("/", post(order::create_order))
        .route("/verify", post(order::verify_order));

    let vendor_routes = Router::new()
        .route("/", get(vendor::get_vendor).put(vendor::update_vendor))
        .route("/code", post(vendor::create_code))
        .route("/auth", post(vendor::auth_vendor))
        .route(
            "/connect",
            post(vendor::connect).put(vendor::rate_connection),
        )
        .route("/chaos/{kind}", put(vendor::initiate_chaos));

    let admin_routes = Router::new()
        .route("/vendors", get(admin::list_vendors))
        .route("/vendor", put(admin::update_vendor))
        .route("/vendor/{id}", delete(admin::delete_vendor))
        .route("/vendor/{id}/chaos", delete(admin::clear_chaos));

    let support_routes = Router::new().route("/{api_key}/report/{fix_code}", get(support::report));

    let api_routes = Router::new()
        .nest("/order", order_routes)
        .nest("/vendor", vendor_routes)
        .nest("/admin", admin_routes)
        .nest("/support", support_routes)
        .route("/docs", get(docs));

    Router::new()
        .nest("/api", api_routes)
        .route("/.well-known/jwks.json", get(order::jwks))
        .fallback(unknown_endpoint)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn docs() -> Json<serde_json::Value> {
    Json(json!({
        "message": "welcome to JWT Pizza Factory",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            { "method": "POST", "path": "/api/order", "description": "Create a JWT pizza" },
            { "method": "POST", "path": "/api/order/verify", "description": "Verify a pizza order" },
            { "method": "GET", "path": "/.well-known/jwks.json", "description": "Get the JSON Web Key Set for independent JWT verification" },
            { "method": "GET", "path": "/api/vendor", "description": "Get vendor information" },
            { "method": "PUT", "path": "/api/vendor", "description": "Update a vendor" },
            { "method": "POST", "path": "/api/vendor/code", "description": "Send a vendor authorization code" },
            { "method": "POST", "path": "/api/vendor/auth", "description": "Authorize a vendor with a code" },
            { "method": "POST", "path": "/api/vendor/connect", "description": "Connect to another vendor for a purpose" },
            { "method": "PUT", "path": "/api/vendor/connect", "description": "Rate a vendor connection" },
            { "method": "PUT", "path": "/api/vendor/chaos/{kind}", "description": "Initiate chaos testing" },
            { "method": "GET", "path": "/api/support/{apiKey}/report/{fixCode}", "description": "Report a problem" },
            { "method": "GET", "path": "/api/admin/vendors", "description": "Get all vendors" },
            { "method": "PUT", "path": "/api/admin/vendor", "description": "Update vendor roles" },
            { "method": "DELETE", "path": "/api/admin/vendor/{id}", "description": "Delete a vendor" },
            { "method": "DELETE", "path": "/api/admin/vendor/{id}/chaos", "description": "Clear a vendor's chaos state" },
        ],
    }))
}

async fn unknown_endpoint() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "unknown endpoint" })),
    )
}
