mod config;
mod db;
mod dtos;
mod error;
mod extractors;
mod handler;
mod middleware;
mod models;
mod realtime;
mod routes;
mod service;
mod utils;

use std::sync::Arc;

use axum::http::{header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE}, HeaderValue, Method};
use config::Config;
use db::{
    chatdb::ChatExt,
    db::DBClient,
    requestdb::EngagementExt,
    userdb::{CatalogExt, ParticipantExt},
};
use dotenv::dotenv;
use realtime::registry::{InMemoryRoomRegistry, RoomRegistry};
use routes::create_router;
use service::{lifecycle_service::LifecycleService, messaging_service::MessagingService};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::filter::LevelFilter;

#[derive(Clone)]
pub struct AppState {
    pub env: Config,
    pub directory: Arc<dyn ParticipantExt>,
    pub rooms: Arc<dyn RoomRegistry>,
    // Services
    pub lifecycle_service: Arc<LifecycleService>,
    pub messaging_service: Arc<MessagingService>,
}

impl AppState {
    pub fn new<S>(store: Arc<S>, rooms: Arc<dyn RoomRegistry>, config: Config) -> Self
    where
        S: EngagementExt + ChatExt + ParticipantExt + CatalogExt + 'static,
    {
        let lifecycle_service = Arc::new(LifecycleService::new(
            store.clone(),
            store.clone(),
            store.clone(),
        ));
        let messaging_service = Arc::new(MessagingService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            rooms.clone(),
        ));

        Self {
            env: config,
            directory: store,
            rooms,
            lifecycle_service,
            messaging_service,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::DEBUG)
        .init();

    dotenv().ok();

    let config = Config::init();

    let pool = match PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("✅ Connection to the database is successful!");
            pool
        }
        Err(err) => {
            tracing::error!("🔥 Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    let db_client = DBClient::new(pool);
    if let Err(err) = db_client.migrate().await {
        tracing::error!("🔥 Failed to apply migrations: {:?}", err);
        std::process::exit(1);
    }

    let allowed_origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE]);

    let rooms: Arc<dyn RoomRegistry> = Arc::new(InMemoryRoomRegistry::new());
    let app_state = Arc::new(AppState::new(Arc::new(db_client), rooms, config.clone()));

    let app = create_router(app_state).layer(cors);

    tracing::info!("🚀 Server is running on http://localhost:{}", config.port);

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", &config.port)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("🔥 Failed to bind port {}: {:?}", config.port, err);
            std::process::exit(1);
        }
    };

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!("🔥 Server error: {:?}", err);
    }
}
