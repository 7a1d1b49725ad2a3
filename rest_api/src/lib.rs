// rest_api/src/lib.rs
// HTTP surface of the hospital management backend. Handlers only translate
// between JSON and the workflow services; every rule lives in `lib::services`.

use anyhow::{Context, Error as AnyhowError};
use axum::{
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use lib::config::ServerConfig;
use lib::services::Services;
use models::ServiceError;
use security::{AuthError, CredentialService};
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};

pub mod extract;
pub mod handlers;

pub use extract::{ApiJson, ApiPath, ApiQuery, CurrentStaff};

// Define the REST API error enum
#[derive(Debug, Error)]
pub enum RestApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<AuthError> for RestApiError {
    fn from(err: AuthError) -> Self {
        RestApiError::Service(err.into())
    }
}

impl RestApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RestApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            RestApiError::Service(err) => match err {
                ServiceError::ReferenceNotFound(_) | ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
                ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
                ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
                ServiceError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
                ServiceError::InvalidState(_) | ServiceError::Conflict { .. } | ServiceError::Duplicate(_) => {
                    StatusCode::CONFLICT
                }
                ServiceError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

// Implement IntoResponse for RestApiError to convert it into an HTTP response
impl IntoResponse for RestApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Request failed: {}", self);
            "internal server error".to_string()
        } else {
            let kind = match &self {
                RestApiError::Service(err) => err.kind(),
                RestApiError::InvalidInput(_) => "invalid_input",
            };
            tracing::debug!(kind, "Request rejected ({}): {}", status, self);
            self.to_string()
        };

        let body = Json(ApiResponse::<()> {
            status: "error",
            message,
            data: None,
        });
        (status, body).into_response()
    }
}

/// The JSON envelope every endpoint answers with.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

pub fn success<T: Serialize>(status: StatusCode, message: impl Into<String>, data: T) -> Response {
    let body = ApiResponse {
        status: "success",
        message: message.into(),
        data: Some(data),
    };
    (status, Json(body)).into_response()
}

pub type ApiResult = Result<Response, RestApiError>;

// Shared state for the Axum application
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub credentials: CredentialService,
}

impl AppState {
    pub fn new(services: Services, credentials: CredentialService) -> Self {
        AppState { services, credentials }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers(Any)
        .allow_origin(Any);

    let api = Router::new()
        .route("/health", get(handlers::health_check_handler))
        .route("/version", get(handlers::version_handler))
        .route("/auth/login", post(handlers::login_handler))
        .route("/auth/refresh", post(handlers::refresh_handler))
        .route("/staff", post(handlers::create_staff).get(handlers::list_staff))
        .route(
            "/staff/:id",
            get(handlers::get_staff).patch(handlers::update_staff).delete(handlers::delete_staff),
        )
        .route("/patients", post(handlers::create_patient).get(handlers::list_patients))
        .route(
            "/patients/registration/:registration_number",
            get(handlers::get_patient_by_registration_number),
        )
        .route(
            "/patients/:id",
            get(handlers::get_patient).patch(handlers::update_patient).delete(handlers::delete_patient),
        )
        .route(
            "/appointments",
            post(handlers::create_appointment).get(handlers::list_appointments),
        )
        .route(
            "/appointments/:id",
            get(handlers::get_appointment)
                .patch(handlers::update_appointment)
                .delete(handlers::delete_appointment),
        )
        .route("/clinical-notes", post(handlers::create_clinical_note))
        .route(
            "/clinical-notes/appointment/:appointment_id",
            get(handlers::get_clinical_note_by_appointment),
        )
        .route(
            "/clinical-notes/patient/:patient_id",
            get(handlers::get_clinical_notes_by_patient),
        )
        .route(
            "/clinical-notes/:id",
            get(handlers::get_clinical_note)
                .patch(handlers::update_clinical_note)
                .delete(handlers::delete_clinical_note),
        );

    Router::new()
        .nest("/api/v1", api)
        .fallback(handlers::not_found_handler)
        .with_state(state)
        .layer(cors)
}

/// Serves the API until `shutdown_rx` fires.
pub async fn start_server(
    config: &ServerConfig,
    state: AppState,
    shutdown_rx: oneshot::Receiver<()>,
) -> Result<(), AnyhowError> {
    let app = build_router(state);
    let addr = format!("{}:{}", config.host, config.port);

    let listener = TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind to address: {}", addr))?;
    tracing::info!("REST API server listening on {}", addr);

    let shutdown_signal = async {
        if shutdown_rx.await.is_ok() {
            tracing::info!("Received shutdown signal.");
        }
    };

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("REST API server failed to start or run")?;

    tracing::info!("REST API server stopped.");
    Ok(())
}
