use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::services::classifier::ClassifierError;
use crate::services::encoder::EncodeError;

/// Errors of the recommendation model lifecycle
#[derive(thiserror::Error, Debug)]
pub enum ModelError {
    #[error("Model is not trained yet")]
    NotTrained,

    #[error("A training run is already in progress")]
    TrainingInProgress,

    #[error("Encoding error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Data provider error: {0}")]
    Provider(String),

    #[error("Corrupt model artifact: {0}")]
    CorruptArtifact(String),

    #[error("Artifact I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Training task failed: {0}")]
    Task(String),
}

pub type ModelResult<T> = Result<T, ModelError>;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Model(ModelError::NotTrained) => {
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
            AppError::Model(ModelError::TrainingInProgress) => {
                (StatusCode::CONFLICT, self.to_string())
            }
            AppError::Model(e) => {
                tracing::error!(error = %e, "Model failure");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
