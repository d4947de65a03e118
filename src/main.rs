//! EasyReview Backend
//!
//! A REST backend for reviewing Dataverse dataset metadata, with SQLite
//! persistence and on-demand schema reconciliation.

mod api;
mod config;
mod dataverse;
mod db;
mod errors;
mod ingest;
mod models;
mod openfields;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use dataverse::DataverseClient;
use db::Repository;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub dataverse: Arc<DataverseClient>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(config.log_json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!config.log_json).then(tracing_subscriber::fmt::layer))
        .init();

    tracing::info!("Starting EasyReview Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    let dataverse = Arc::new(DataverseClient::new(config.http_timeout)?);

    // Create application state
    let state = AppState { repo, dataverse };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API routes
    let api_routes = Router::new()
        // Reviews
        .route("/reviews", get(api::list_reviews))
        .route("/reviews/fetch", post(api::fetch_dataset))
        .route(
            "/reviews/{id}",
            get(api::get_review)
                .put(api::update_review)
                .delete(api::delete_review),
        )
        .route("/reviews/doi/{*doi}", get(api::list_reviews_by_doi))
        .route(
            "/reviews/reviewer/{reviewer_id}",
            get(api::list_reviews_by_reviewer),
        )
        .route("/reviews/{id}/field-count", get(api::get_field_count))
        .route("/reviews/{id}/open-fields", get(api::get_open_fields))
        .route("/reviews/{id}/files", get(api::list_review_files))
        // Metadata tree
        .route(
            "/metadatablocks/{id}",
            get(api::get_metadatablock)
                .put(api::update_metadatablock)
                .delete(api::delete_metadatablock),
        )
        .route(
            "/compounds/{id}",
            get(api::get_compound)
                .put(api::update_compound)
                .delete(api::delete_compound),
        )
        .route(
            "/fields/{id}",
            get(api::get_field)
                .put(api::update_field)
                .delete(api::delete_field),
        )
        // Reviewers
        .route(
            "/reviewers",
            get(api::list_reviewers).post(api::create_reviewer),
        )
        .route(
            "/reviewers/{id}",
            get(api::get_reviewer)
                .put(api::update_reviewer)
                .delete(api::delete_reviewer),
        )
        // Files
        .route("/files", post(api::create_file))
        .route(
            "/files/{id}",
            get(api::get_file)
                .put(api::update_file)
                .delete(api::delete_file),
        )
        // Messages
        .route(
            "/messages",
            get(api::list_messages).post(api::create_message),
        )
        .route(
            "/messages/{id}",
            get(api::get_message).put(api::update_message),
        );

    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
