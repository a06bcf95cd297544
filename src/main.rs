//! Staff Awards Portal Backend
//!
//! REST backend for staff award nominations, shortlisting and voting, with
//! SQLite persistence and a Tantivy staff directory.

mod analytics;
mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;
mod results;
mod search;
mod storage;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use auth::google::GoogleAuth;
use config::Config;
use db::Repository;
use search::SearchIndex;
use storage::{ImageStore, MAX_IMAGE_BYTES};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub search: Arc<SearchIndex>,
    pub images: Arc<ImageStore>,
    pub google: Option<Arc<GoogleAuth>>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Open the database, search index and image store described by `config`.
    pub async fn build(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        let pool = db::init_database(&config.db_path).await?;
        let repo = Arc::new(Repository::new(pool));

        let search = Arc::new(SearchIndex::open(&config.index_path)?);
        tracing::info!("Building staff index...");
        search.rebuild(&repo.list_staff().await?).await?;

        let images = Arc::new(ImageStore::new(
            config.upload_dir.clone(),
            &config.public_url,
        ));
        images.initialize().await?;

        let google = match &config.google {
            Some(google) => Some(Arc::new(GoogleAuth::new(
                google,
                config.allowed_email_domain.clone(),
            )?)),
            None => {
                tracing::warn!(
                    "Google sign-in is disabled (AWARDS_GOOGLE_CLIENT_ID / _SECRET / _REDIRECT_URL not set)"
                );
                None
            }
        };

        Ok(AppState {
            repo,
            search,
            images,
            google,
            config: Arc::new(config),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Staff Awards Portal Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Index path: {:?}", config.index_path);
    tracing::info!("Upload directory: {:?}", config.upload_dir);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.allowed_email_domain.is_none() {
        tracing::warn!("No AWARDS_ALLOWED_EMAIL_DOMAIN set; any email address may sign up");
    }
    if config.expose_magic_links {
        tracing::warn!("AWARDS_EXPOSE_MAGIC_LINKS is on; magic link tokens are returned by the API");
    }

    let bind_addr = config.bind_addr;
    let state = AppState::build(config).await?;

    tokio::spawn(auth::continuously_purge_expired(
        state.repo.clone(),
        auth::PURGE_INTERVAL,
    ));

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let admin_routes = Router::new()
        .route("/dashboard", get(api::get_dashboard))
        .route("/analytics", get(api::get_analytics))
        // Categories
        .route("/categories", post(api::create_category))
        .route(
            "/categories/{id}",
            put(api::update_category).delete(api::delete_category),
        )
        .route("/categories/{id}/winner", post(api::publish_winner))
        .route("/categories/{id}/shortlist", get(api::get_shortlist))
        .route("/categories/{id}/finalists", post(api::select_finalists))
        // Staff
        .route("/staff", post(api::create_staff))
        .route(
            "/staff/{id}",
            put(api::update_staff).delete(api::delete_staff),
        )
        // Departments
        .route("/departments", post(api::create_department))
        .route(
            "/departments/{id}",
            put(api::update_department).delete(api::delete_department),
        )
        // Nominations
        .route("/nominations", get(api::list_nominations))
        .route("/nominations/{id}", delete(api::delete_nomination))
        .route("/nominations/{id}/status", put(api::update_nomination_status))
        .route("/nominations/{id}/finalist", delete(api::remove_finalist))
        // Votes and results
        .route("/votes", get(api::list_votes))
        .route("/results", get(api::admin_results))
        .route("/results/export", get(api::export_results))
        // Feedback
        .route("/feedback", get(api::list_feedback))
        .route(
            "/feedback/{id}",
            put(api::update_feedback).delete(api::delete_feedback),
        );

    let api_routes = Router::new()
        // Auth
        .route("/auth/sign-up", post(api::sign_up))
        .route("/auth/sign-in", post(api::sign_in))
        .route("/auth/password", post(api::set_password))
        .route("/auth/magic-link", post(api::request_magic_link))
        .route("/auth/magic-link/verify", post(api::verify_magic_link))
        .route("/auth/google", get(api::google_start))
        .route("/auth/session", get(api::get_session))
        .route("/auth/sign-out", post(api::sign_out))
        // Public
        .route("/departments", get(api::list_departments))
        .route("/categories", get(api::list_categories))
        .route("/categories/{id}", get(api::get_category))
        .route("/categories/{id}/finalists", get(api::list_category_finalists))
        .route("/results", get(api::public_results))
        .route("/feedback", post(api::submit_feedback))
        // Signed in
        .route("/staff", get(api::list_staff))
        .route("/staff/search", get(api::search_staff))
        .route("/staff/{id}", get(api::get_staff))
        .route("/me", put(api::update_profile))
        .route("/nominations", post(api::create_nomination))
        .route(
            "/nominations/{id}",
            get(api::get_nomination).delete(api::cancel_nomination),
        )
        .route("/my-nominations", get(api::my_nominations))
        .route("/votes", post(api::cast_vote))
        .route("/my-votes", get(api::my_votes))
        .route(
            "/uploads/{bucket}",
            put(api::upload_image).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + 1)),
        )
        .nest("/admin", admin_routes);

    let storage = ServeDir::new(state.images.root());

    Router::new()
        .nest("/api", api_routes)
        .route("/auth/callback", get(api::google_callback))
        .route("/health", get(health_check))
        .nest_service("/storage", storage)
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

#[cfg(test)]
mod tests;
