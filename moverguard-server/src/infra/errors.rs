use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use moverguard_config::SettingsError;
use moverguard_core::ExclusionError;
use moverguard_core::library::LibraryError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "message": self.message,
                "status": self.status.as_u16(),
            }
        }));

        (self.status, body).into_response()
    }
}

impl From<ExclusionError> for AppError {
    fn from(err: ExclusionError) -> Self {
        match err {
            ExclusionError::BuildInProgress => {
                Self::conflict("An exclusion build is already running")
            }
            ExclusionError::UpstreamUnavailable { .. } => {
                Self::bad_gateway(err.to_string())
            }
            _ => {
                tracing::error!(error = %err, "exclusion operation failed");
                Self::internal(err.to_string())
            }
        }
    }
}

impl From<LibraryError> for AppError {
    fn from(err: LibraryError) -> Self {
        match err {
            LibraryError::NotConfigured { .. } => {
                Self::bad_request(err.to_string())
            }
            _ => Self::bad_gateway(err.to_string()),
        }
    }
}

impl From<SettingsError> for AppError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::Invalid(invalid) => {
                Self::bad_request(invalid.to_string())
            }
            other => {
                tracing::error!(error = %other, "settings could not be saved");
                Self::internal(other.to_string())
            }
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_in_progress_is_a_conflict() {
        let err = AppError::from(ExclusionError::BuildInProgress);
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[test]
    fn unconfigured_library_is_a_client_error() {
        let err = AppError::from(LibraryError::NotConfigured {
            service: "sonarr",
        });
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
