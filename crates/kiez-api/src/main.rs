//! kiez-api - HTTP API server for kiezmarkt

mod handlers;
mod services;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, State},
    http::{header, request::Parts, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use kiez_core::defaults::MAX_IMAGE_BYTES;
use kiez_core::{JobFeed, OwnerRepository};
use kiez_db::{Database, FilesystemBackend, ObjectStore};
use kiez_inference::{GeminiBackend, ListingContentBackend};
use kiez_jobs::{JobWorker, ListingContentHandler, WorkerConfig};

use handlers::{auth, images, items, jobs, messages, owners, requests, storage, wizard};
use services::ListingWizardService;

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

// =============================================================================
// APP STATE
// =============================================================================

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    /// Object storage for originals and thumbnails.
    pub store: ObjectStore,
    /// In-process job status feed, shared with the worker.
    pub feed: JobFeed,
    /// Orchestration for the listing wizard endpoints.
    pub wizard: ListingWizardService,
    /// Settings endpoint of the external auth service, if configured.
    pub auth_settings_url: Option<String>,
    /// Shared client for outbound calls (auth settings proxy).
    pub http: reqwest::Client,
}

// =============================================================================
// AUTH PRINCIPAL
// =============================================================================

/// The authenticated user, as asserted by the auth proxy in front of this
/// service. Authentication itself is external; we only trust the header
/// the proxy injects after validating the session.
pub struct CurrentUser(pub Uuid);

#[async_trait::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing x-user-id header".to_string()))?;

        let user_id = raw
            .parse::<Uuid>()
            .map_err(|_| ApiError::Unauthorized("Invalid x-user-id header".to_string()))?;

        Ok(CurrentUser(user_id))
    }
}

/// The caller's preferred response language, from `Accept-Language`.
/// Only the primary subtag matters; unknown languages fall back later.
pub fn request_language(parts: &axum::http::HeaderMap) -> String {
    parts
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.split(';').next())
        .and_then(|v| v.split('-').next())
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "en".to_string())
}

// =============================================================================
// ERROR HANDLING
// =============================================================================

#[derive(Debug)]
pub enum ApiError {
    Internal(kiez_core::Error),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    BadRequest(String),
}

impl From<kiez_core::Error> for ApiError {
    fn from(err: kiez_core::Error) -> Self {
        match err {
            kiez_core::Error::Validation(msg) => ApiError::BadRequest(msg),
            kiez_core::Error::Unauthorized(msg) => ApiError::Unauthorized(msg),
            kiez_core::Error::Forbidden(msg) => ApiError::Forbidden(msg),
            kiez_core::Error::NotFound(msg) => ApiError::NotFound(msg),
            kiez_core::Error::ItemNotFound(id) => {
                ApiError::NotFound(format!("Item {} not found", id))
            }
            kiez_core::Error::JobNotFound(id) => {
                ApiError::NotFound(format!("Processing job {} not found", id))
            }
            kiez_core::Error::Database(sqlx::Error::RowNotFound) => {
                ApiError::NotFound("Not found".to_string())
            }
            other => ApiError::Internal(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::Internal(err) => {
                tracing::error!(error = %err, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

/// Shared owner guard for item-mutating handlers.
pub async fn require_owner(state: &AppState, item_id: Uuid, user_id: Uuid) -> Result<(), ApiError> {
    if state.db.owners.is_owner(item_id, user_id).await? {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!(
            "User is not an owner of item {}",
            item_id
        )))
    }
}

// =============================================================================
// ROUTER
// =============================================================================

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = sqlx::query("SELECT 1").execute(state.db.pool()).await.is_ok();
    Json(serde_json::json!({
        "status": if db_healthy { "healthy" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub fn app(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Listing wizard
        .route("/api/wizard/images", post(wizard::submit_images))
        .route("/api/wizard/details", post(wizard::submit_details))
        // Items
        .route("/api/items", get(items::list_items).post(items::create_item))
        .route(
            "/api/items/:id",
            get(items::get_item)
                .put(items::update_item)
                .delete(items::delete_item),
        )
        .route("/api/items/:id/status", put(items::set_status))
        .route("/api/categories", get(items::list_categories))
        // Images
        .route(
            "/api/items/:id/images",
            get(images::list_images).post(images::upload_images),
        )
        .route("/api/items/:id/images/reorder", put(images::reorder_images))
        .route("/api/images/:image_id", delete(images::delete_image))
        // Owners
        .route(
            "/api/items/:id/owners",
            get(owners::list_owners).post(owners::add_owner),
        )
        .route("/api/items/:id/owners/:user_id", delete(owners::remove_owner))
        // Processing jobs
        .route("/api/items/:id/jobs/latest", get(jobs::latest_job))
        .route("/api/items/:id/jobs/events", get(jobs::job_events))
        .route("/api/jobs/:job_id/retry", post(jobs::retry_job))
        // Messages
        .route("/api/messages", post(messages::send_message))
        .route("/api/conversations", get(messages::list_conversations))
        .route(
            "/api/conversations/:counterpart_id",
            get(messages::get_thread),
        )
        .route(
            "/api/conversations/:counterpart_id/read",
            post(messages::mark_read),
        )
        .route("/api/messages/unread-count", get(messages::unread_count))
        // Buy/rent requests
        .route(
            "/api/requests",
            get(requests::list_requests).post(requests::create_request),
        )
        .route("/api/requests/:id", get(requests::get_request))
        .route("/api/requests/:id/status", put(requests::set_request_status))
        // Auth providers (proxied from the auth service)
        .route("/api/auth/providers", get(auth::list_providers))
        // Stored objects, for deployments without a separate storage front
        .route("/storage/:bucket/*key", get(storage::serve_object))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer({
            let allowed_origins = parse_allowed_origins();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(allowed_origins))
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
                .allow_credentials(true)
                .max_age(std::time::Duration::from_secs(3600))
        })
        // Upload batches: up to 8 images at 5 MiB each, plus form overhead
        .layer(RequestBodyLimitLayer::new(10 * MAX_IMAGE_BYTES))
        .with_state(state)
}

fn parse_allowed_origins() -> Vec<HeaderValue> {
    let origins_str = std::env::var("ALLOWED_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000".to_string());

    origins_str
        .split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!("Invalid CORS origin '{}': {}", trimmed, e);
                    None
                }
            }
        })
        .collect()
}

// =============================================================================
// MAIN
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   RUST_LOG    - standard env filter (default: "kiez_api=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "kiez_api=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("kiez-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false),
                )
                .init();
        }
        Some(guard)
    } else if log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
        None
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    // Get configuration from environment
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/kiezmarkt".to_string());
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()
        .unwrap_or(3000);

    // Connect to database
    info!("Connecting to database...");
    let db = Arc::new(Database::connect(&database_url).await?);
    info!("Database connected");

    // Run pending database migrations on startup
    info!("Running database migrations...");
    db.migrate().await?;
    info!("Database migrations complete");

    // Initialize object storage
    let storage_root = std::env::var("STORAGE_ROOT")
        .unwrap_or_else(|_| "/var/lib/kiezmarkt/storage".to_string());
    let public_base_url = std::env::var("PUBLIC_BASE_URL")
        .unwrap_or_else(|_| format!("http://{}:{}", host, port));
    let signing_key = std::env::var("STORAGE_SIGNING_KEY").unwrap_or_else(|_| {
        tracing::warn!("STORAGE_SIGNING_KEY not set, using an ephemeral key");
        Uuid::new_v4().to_string()
    });

    let backend = FilesystemBackend::new(&storage_root);
    backend
        .validate()
        .await
        .map_err(|e| anyhow::anyhow!("storage validation failed: {}", e))?;
    let store = ObjectStore::new(
        Arc::new(backend),
        &public_base_url,
        signing_key.into_bytes(),
    );
    info!("Object storage initialized at {}", storage_root);

    // Job feed shared between the worker and SSE subscribers
    let feed = JobFeed::new(256);

    // Create and start the job worker
    let _worker_handle = match GeminiBackend::from_env() {
        Some(gemini) => {
            info!("Starting job worker with model {}", gemini.model_name());
            let handler = ListingContentHandler::new(
                db.clone(),
                store.clone(),
                Arc::new(gemini),
            );
            let worker = JobWorker::new(
                db.clone(),
                WorkerConfig::from_env(),
                Arc::new(handler),
                feed.clone(),
            );
            Some(worker.start())
        }
        None => {
            tracing::warn!("GOOGLE_GEMINI_API_KEY not set, job worker disabled");
            None
        }
    };

    let auth_settings_url = std::env::var("AUTH_SETTINGS_URL").ok();
    if auth_settings_url.is_none() {
        tracing::warn!("AUTH_SETTINGS_URL not set, /api/auth/providers will return an empty list");
    }

    let wizard = ListingWizardService::new(db.clone(), store.clone(), feed.clone());

    let state = AppState {
        db,
        store,
        feed,
        wizard,
        auth_settings_url,
        http: reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?,
    };

    let app = app(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_language_primary_subtag() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("de-DE,de;q=0.9,en;q=0.8"),
        );
        assert_eq!(request_language(&headers), "de");
    }

    #[test]
    fn test_request_language_defaults_to_english() {
        let headers = axum::http::HeaderMap::new();
        assert_eq!(request_language(&headers), "en");
    }

    #[test]
    fn test_request_language_strips_quality() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("ja;q=0.7"));
        assert_eq!(request_language(&headers), "ja");
    }

    #[test]
    fn test_api_error_maps_validation_to_bad_request() {
        let err: ApiError = kiez_core::Error::Validation("missing title".to_string()).into();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn test_api_error_maps_item_not_found() {
        let err: ApiError = kiez_core::Error::ItemNotFound(Uuid::nil()).into();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn test_api_error_maps_row_not_found() {
        let err: ApiError = kiez_core::Error::Database(sqlx::Error::RowNotFound).into();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn test_parse_allowed_origins_skips_invalid() {
        std::env::set_var("ALLOWED_ORIGINS", "http://localhost:3000, ,https://kiezmarkt.example");
        let origins = parse_allowed_origins();
        assert_eq!(origins.len(), 2);
        std::env::remove_var("ALLOWED_ORIGINS");
    }
}
