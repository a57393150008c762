use axum::middleware::from_fn;
use axum::{Extension, Router};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;
use utoipa_swagger_ui::SwaggerUi;

mod api;
mod config;
mod db;
mod middleware;
mod utils;

use crate::api::auth::AuthDoc;
use crate::config::Config;
use crate::db::queries::analytics::AnalyticsDoc;
use crate::db::queries::interaction::InteractionDoc;
use crate::db::queries::moderation::ModerationDoc;
use crate::db::queries::notification::NotificationDoc;
use crate::db::queries::product::ProductDoc;
use crate::db::queries::review::ReviewDoc;
use crate::middleware::auth::{create_ownership_cache, jwt_middleware};

#[tokio::main]
async fn main() {
    Config::init();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(true)
        .init();

    let ownership_cache = create_ownership_cache();
    let pool = db::pool::get_db_pool().await;

    let merged_doc = AuthDoc::openapi()
        .merge_from(ProductDoc::openapi())
        .merge_from(ReviewDoc::openapi())
        .merge_from(InteractionDoc::openapi())
        .merge_from(NotificationDoc::openapi())
        .merge_from(ModerationDoc::openapi())
        .merge_from(AnalyticsDoc::openapi());

    // Public routes (registration and login)
    let public_routes = Router::new().merge(api::auth::auth_routes());

    // Private routes
    let private_routes = Router::new()
        .merge(api::product::product_routes())
        .merge(api::review::review_routes())
        .merge(api::interaction::interaction_routes())
        .merge(api::notification::notification_routes())
        .merge(api::moderation::moderation_routes())
        .merge(api::analytics::analytics_routes())
        .route_layer(from_fn(jwt_middleware));

    let app = Router::new()
        .merge(api::health::health_routes())
        .merge(public_routes)
        .merge(private_routes)
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", merged_doc.clone()))
        .merge(RapiDoc::with_openapi("/api-docs/rapidoc.json", merged_doc).path("/rapidoc"))
        .layer(CorsLayer::permissive())
        .layer(Extension(ownership_cache.clone()))
        .with_state(pool.clone());

    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);

    run_server(app, shutdown_tx, pool).await;
    println!("Shutdown complete.");
}

async fn shutdown_signal(mut shutdown_rx: broadcast::Receiver<()>, pool: PgPool) {
    tokio::select! {
        _ = signal::ctrl_c() => println!("Received Ctrl+C, shutting down..."),
        _ = shutdown_rx.recv() => println!("Received shutdown signal."),
    }
    println!("🛠️ Closing database pool...");
    pool.close().await;
    println!("✅ Database pool closed. Server shutting down.");
}

async fn run_server(app: Router, shutdown_tx: broadcast::Sender<()>, pool: PgPool) {
    let addr = Config::get().bind_addr;
    println!("Server running at http://{}", addr);

    let listener = TcpListener::bind(&addr).await.expect("Failed to bind listener");

    let shutdown_signal = shutdown_signal(shutdown_tx.subscribe(), pool.clone());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .expect("Server encountered an error");
}
