// routes.rs
use std::sync::Arc;

use axum::{middleware, routing::get, Extension, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    handler::{
        chat::chat_handler, direct_request::direct_request_handler,
        quote_request::quote_request_handler,
    },
    middleware::auth,
    realtime::socket::socket_handler,
    AppState,
};

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running"
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_route = Router::new()
        .nest("/direct-requests", direct_request_handler())
        .nest("/quote-requests", quote_request_handler())
        .nest("/messages", chat_handler())
        .layer(middleware::from_fn(auth))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state.clone()));

    Router::new()
        .route("/health", get(health_check))
        .route(
            "/ws",
            get(socket_handler).layer(Extension(app_state)),
        )
        .nest("/api", api_route)
}
