// 🌐 API Surface - REST over the resolution engine (axum)
//
//   GET    /v1/swift-codes/:swift_code            details (+ branches for headquarters)
//   GET    /v1/swift-codes/country/:country_iso2  all codes for a country
//   POST   /v1/swift-codes                        create
//   DELETE /v1/swift-codes/:swift_code            delete
//   GET    /health

use crate::db::SqliteStore;
use crate::entities::SwiftCodeCandidate;
use crate::error::RegistryError;
use crate::resolver::{Confirmation, CountryView, DetailView, Registry};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    registry: Arc<Mutex<Registry<SqliteStore>>>,
}

impl AppState {
    pub fn new(registry: Registry<SqliteStore>) -> Self {
        AppState {
            registry: Arc::new(Mutex::new(registry)),
        }
    }

    // Guards are never held across an await point
    fn registry(&self) -> Result<MutexGuard<'_, Registry<SqliteStore>>, ApiError> {
        self.registry.lock().map_err(|_| {
            ApiError::from(RegistryError::Internal(anyhow::anyhow!("registry lock poisoned")))
        })
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

#[derive(Debug)]
pub enum ApiError {
    Registry(RegistryError),
    /// Body was not valid JSON for a candidate
    BadRequest(String),
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        ApiError::Registry(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Registry(err) => {
                let status = StatusCode::from_u16(err.http_status())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                if status.is_server_error() {
                    tracing::error!(error = %err, "Request failed");
                }
                (
                    status,
                    ErrorBody {
                        error: err.kind().to_string(),
                        message: err.to_string(),
                    },
                )
            }
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "InvalidRequest".to_string(),
                    message,
                },
            ),
        };

        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    records: i64,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let records = state.registry()?.count()?;
    Ok(Json(HealthResponse { status: "ok", records }))
}

/// GET /v1/swift-codes/:swift_code
async fn get_swift_code_details(
    State(state): State<AppState>,
    Path(swift_code): Path<String>,
) -> Result<Json<DetailView>, ApiError> {
    let view = state.registry()?.resolve_details(&swift_code)?;
    Ok(Json(view))
}

/// GET /v1/swift-codes/country/:country_iso2
async fn get_swift_codes_by_country(
    State(state): State<AppState>,
    Path(country_iso2): Path<String>,
) -> Result<Json<CountryView>, ApiError> {
    let view = state.registry()?.resolve_by_country(&country_iso2)?;
    Ok(Json(view))
}

/// POST /v1/swift-codes
async fn add_swift_code(
    State(state): State<AppState>,
    payload: Result<Json<SwiftCodeCandidate>, JsonRejection>,
) -> Result<(StatusCode, Json<Confirmation>), ApiError> {
    let Json(candidate) = payload?;
    let confirmation = state.registry()?.create(&candidate)?;
    Ok((StatusCode::CREATED, Json(confirmation)))
}

/// DELETE /v1/swift-codes/:swift_code
async fn delete_swift_code(
    State(state): State<AppState>,
    Path(swift_code): Path<String>,
) -> Result<Json<Confirmation>, ApiError> {
    let confirmation = state.registry()?.remove(&swift_code)?;
    Ok(Json(confirmation))
}

// ============================================================================
// Router
// ============================================================================

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/v1/swift-codes", post(add_swift_code))
        .route(
            "/v1/swift-codes/country/:country_iso2",
            get(get_swift_codes_by_country),
        )
        .route(
            "/v1/swift-codes/:swift_code",
            get(get_swift_code_details).delete(delete_swift_code),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
