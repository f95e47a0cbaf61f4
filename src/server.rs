//! HTTP API for the Covet extension.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/pins` | Save a pin (idempotent under the dedupe policy) |
//! | `GET` | `/api/pins` | List all pins, newest first |
//! | `DELETE` | `/api/pins/{id}` | Delete one pin; reports whether it existed |
//! | `DELETE` | `/api/pins` | Delete every pin; reports how many |
//! | `POST` | `/api/curate` | Ask the curator for a coherent outfit subset |
//! | `GET` | `/health` | Health check (returns version) |
//!
//! # Error contract
//!
//! Error responses are `{ "error": { "code": "...", "message": "..." } }`
//! with codes `missing_field` (400), `invalid_input` (400), and `internal`
//! (500). Curation deliberately has almost no error surface: anything past
//! input validation is absorbed by the curator's fallback ladder, and even
//! an unexpected failure there is answered with a random selection.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted — the client is a
//! browser extension posting from arbitrary page origins.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::completion;
use crate::config::Config;
use crate::curator::Curator;
use crate::db;
use crate::migrate;
use crate::models::{CuratedItem, Pin, PinCandidate};
use crate::store::PinStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    store: PinStore,
    curator: Arc<Curator>,
}

/// Start the backend: open the database, run migrations, wire the curator
/// to whatever credential the environment provides, and serve until the
/// process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(&config.db).await?;
    migrate::run_migrations(&pool, config.store.dedupe_images).await?;

    let store = PinStore::new(pool.clone(), config.store.dedupe_images);
    let client = completion::create_client(&config.curation)?;
    let curator = Arc::new(Curator::new(client));

    let state = AppState { store, curator };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route(
            "/api/pins",
            post(handle_save_pin)
                .get(handle_list_pins)
                .delete(handle_clear_pins),
        )
        .route("/api/pins/{id}", delete(handle_delete_pin))
        .route("/api/curate", post(handle_curate))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    info!(bind = %config.server.bind, "covet backend listening");

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    pool.close().await;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// 400 for a required field that is absent or empty.
fn missing_field(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "missing_field".to_string(),
        message: message.into(),
    }
}

/// 400 for a structurally invalid curation request.
fn invalid_input(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "invalid_input".to_string(),
        message: message.into(),
    }
}

/// 500 for anything unexpected from the store.
fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /api/pins ============

async fn handle_save_pin(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<Pin>), AppError> {
    let image = body
        .get("image")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| missing_field("image is required"))?;

    let text = body.get("text").and_then(|v| v.as_str());

    let pin = state.store.save(image, text).await.map_err(|e| {
        error!(error = %e, "failed to save pin");
        internal(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(pin)))
}

// ============ GET /api/pins ============

#[derive(Serialize)]
struct ListPinsResponse {
    pins: Vec<Pin>,
}

async fn handle_list_pins(
    State(state): State<AppState>,
) -> Result<Json<ListPinsResponse>, AppError> {
    let pins = state.store.list_all().await.map_err(|e| {
        error!(error = %e, "failed to list pins");
        internal(e.to_string())
    })?;

    Ok(Json(ListPinsResponse { pins }))
}

// ============ DELETE /api/pins/{id} ============

#[derive(Serialize)]
struct DeletePinResponse {
    deleted: bool,
}

/// Deleting an unknown id is not an error: the response just says
/// `deleted: false`.
async fn handle_delete_pin(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeletePinResponse>, AppError> {
    let deleted = state.store.delete_by_id(id).await.map_err(|e| {
        error!(error = %e, "failed to delete pin");
        internal(e.to_string())
    })?;

    Ok(Json(DeletePinResponse { deleted }))
}

// ============ DELETE /api/pins ============

#[derive(Serialize)]
struct ClearPinsResponse {
    removed: u64,
}

async fn handle_clear_pins(
    State(state): State<AppState>,
) -> Result<Json<ClearPinsResponse>, AppError> {
    let removed = state.store.delete_all().await.map_err(|e| {
        error!(error = %e, "failed to clear pins");
        internal(e.to_string())
    })?;

    Ok(Json(ClearPinsResponse { removed }))
}

// ============ POST /api/curate ============

#[derive(Serialize)]
struct CurateResponse {
    items: Vec<CuratedItem>,
}

async fn handle_curate(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<CurateResponse>, AppError> {
    // The body is validated by hand so a missing or non-array `pins` field
    // maps to our invalid_input code rather than a framework rejection.
    let pins_value = body
        .get("pins")
        .cloned()
        .ok_or_else(|| invalid_input("pins array is required"))?;

    let pins: Vec<PinCandidate> = serde_json::from_value(pins_value)
        .map_err(|_| invalid_input("pins must be an array of { image, text } objects"))?;

    if pins.is_empty() {
        return Err(invalid_input("pins must not be empty"));
    }

    match state.curator.curate(&pins).await {
        Ok(items) => Ok(Json(CurateResponse { items })),
        Err(e) => {
            // The curator only errors on empty input, which was checked
            // above; if it ever fails anyway, still answer with the
            // best-effort random selection.
            error!(error = %e, "curation failed past validation");
            let items = state.curator.random_fallback(&pins);
            if items.is_empty() {
                return Err(internal("curation failed"));
            }
            Ok(Json(CurateResponse { items }))
        }
    }
}
