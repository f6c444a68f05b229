use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use aws_smithy_types::error::operation::BuildError as SmithyBuildError;
use thiserror::Error; // Use thiserror for cleaner error definitions
use uuid::Uuid;

// --- Domain/Infrastructure Errors ---

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("Meme not found with ID: {0}")]
    NotFound(Uuid),

    #[error("Duplicate meme ID: {0}")]
    Duplicate(Uuid),

    #[error("Stored meme data is corrupt: {0}")]
    DataCorruption(String),

    #[error("Database backend error: {0}")]
    BackendError(#[from] anyhow::Error), // Wrap Anyhow errors from DB layer
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("File upload failed: {0}")]
    UploadFailed(String), // Pass specific reason

    #[error("File not found with key: {0}")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    BackendError(#[from] anyhow::Error), // Wrap Anyhow errors from Storage layer
}

// --- Web Layer Error ---

#[derive(Error, Debug)]
pub enum AppError {
    // Input validation / request parsing errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Missing form field: {0}")]
    MissingFormField(String),
    #[error("Error processing multipart form data: {0}")]
    MultipartError(#[from] axum::extract::multipart::MultipartError),
    #[error("Invalid meme ID format: {0}")]
    InvalidUuid(#[from] uuid::Error),

    // Authorization for destructive operations
    #[error("Missing or invalid admin token")]
    Unauthorized,
    #[error("Deleting memes is disabled on this server")]
    DeleteDisabled,

    // Domain/Service level errors (mapped from RepoError/StorageError)
    #[error("Meme not found with ID: {0}")]
    MemeNotFound(Uuid),
    #[error("Image not found with key: {0}")]
    ImageNotFound(String),
    #[error("Could not save meme data")]
    RepositoryError(#[source] RepoError), // Source allows seeing underlying RepoError
    #[error("Could not perform file storage operation")]
    StorageError(#[source] StorageError), // Source allows seeing underlying StorageError

    // Configuration / Startup errors
    #[error("Configuration error: {0}")]
    ConfigError(String), // Keep simple string for now
    #[error("Initialization error: {0}")]
    InitError(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic Internal Server Error
    #[error("Internal server error: {0}")]
    InternalServerError(String), // Catch-all or specific internal issues
}

// --- Conversions from Domain Errors to AppError ---

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(id) => AppError::MemeNotFound(id),
            e => AppError::RepositoryError(e),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AppError::ImageNotFound(key),
            e => AppError::StorageError(e),
        }
    }
}

impl From<crate::config::ConfigError> for AppError {
    fn from(err: crate::config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

// The AWS builders used during startup fail with this type
impl From<SmithyBuildError> for AppError {
    fn from(err: SmithyBuildError) -> Self {
        AppError::InitError(format!("Failed to build AWS request: {}", err))
    }
}

// --- Axum Response Implementation ---

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            // 4xx Client Errors
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::MissingFormField(field) => (StatusCode::BAD_REQUEST, format!("Missing form field: {}", field)),
            // 413 when the body limit was hit, 400 for malformed forms
            AppError::MultipartError(e) => (e.status(), format!("Invalid multipart form data: {}", e)),
            AppError::InvalidUuid(e) => (StatusCode::BAD_REQUEST, format!("Invalid ID format: {}", e)),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Missing or invalid admin token".to_string()),
            AppError::DeleteDisabled => (StatusCode::FORBIDDEN, "Deleting memes is disabled on this server".to_string()),
            AppError::MemeNotFound(id) => (StatusCode::NOT_FOUND, format!("Meme not found with ID: {}", id)),
            AppError::ImageNotFound(key) => (StatusCode::NOT_FOUND, format!("Image not found with key: {}", key)),

            // 5xx Server Errors
            AppError::RepositoryError(e) => {
                tracing::error!(error.source = ?e, "Repository error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, "Database operation failed".to_string())
            },
            AppError::StorageError(e) => {
                tracing::error!(error.source = ?e, "Storage error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, "File storage operation failed".to_string())
            },
            AppError::ConfigError(msg) => {
                tracing::error!("Configuration error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server configuration error".to_string())
            },
            AppError::InitError(msg) => {
                tracing::error!("Initialization error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server initialization error".to_string())
            }
            AppError::Io(e) => {
                tracing::error!(error = %e, "I/O error");
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal server error occurred".to_string())
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal server error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal server error occurred".to_string())
            }
        };

        if status.is_server_error() {
            tracing::error!(error.message=%error_message, error.detail=%self, "Responding with error");
        } else {
            tracing::warn!(error.message=%error_message, status=%status, "Rejecting request");
        }

        // Build JSON response
        let body = Json(serde_json::json!({ "error": error_message }));
        (status, body).into_response()
    }
}
