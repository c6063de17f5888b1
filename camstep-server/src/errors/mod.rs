use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use camstep_embedded::{TEXT_PLAIN, UpdateError};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Not Found")]
    NotFound,

    #[error("Device state unavailable")]
    DeviceUnavailable,

    #[error("Update failed: {0}")]
    Update(#[from] UpdateError),

    #[error("Worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::Update(UpdateError::Auth) => StatusCode::UNAUTHORIZED,
            ServerError::Update(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::DeviceUnavailable | ServerError::Worker(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("{}", self);
        }

        (status, [(CONTENT_TYPE, TEXT_PLAIN)], self.to_string()).into_response()
    }
}
