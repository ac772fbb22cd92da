mod classify;
mod health;
mod metrics;
mod model_status;

use crate::{
    classifier::ClassifyError,
    model_backend::ModelBackend,
    registry::RegistryError,
    server::SharedState,
    validation::{ValidationError, MAX_FILE_SIZE},
};
use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use thiserror::Error;

pub fn api_routes<B: ModelBackend>() -> Router<SharedState<B>> {
    Router::new()
        .route("/api/classify/", post(classify::classify::<B>))
        .route("/api/model-status/", get(model_status::model_status::<B>))
        .route("/healthcheck", get(health::healthcheck))
        .route("/metrics", get(metrics::metrics_handler::<B>))
        // Headroom over the validator cap so oversized uploads get the
        // JSON TooLarge error instead of a bare 413.
        .layer(DefaultBodyLimit::max(MAX_FILE_SIZE + 1024 * 1024))
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("no image file uploaded")]
    MissingImage,
    #[error("no model selected")]
    MissingModel,
    #[error("invalid model selection: {0}")]
    InvalidModel(String),
    #[error("invalid multipart payload: {0}")]
    Multipart(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to store upload: {0}")]
    Upload(String),
    #[error(transparent)]
    Classify(#[from] ClassifyError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::MissingImage
            | ApiError::MissingModel
            | ApiError::InvalidModel(_)
            | ApiError::Multipart(_)
            | ApiError::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Classify(ClassifyError::Registry(RegistryError::NotFound(_))) => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            ApiError::Classify(ClassifyError::Registry(RegistryError::Unknown(_))) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            ApiError::Upload(_) | ApiError::Classify(_) => {
                tracing::error!(error = %self, "classification request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "classification failed due to an internal error".to_string(),
                )
            }
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                error: message,
            }),
        )
            .into_response()
    }
}
