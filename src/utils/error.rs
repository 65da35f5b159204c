use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str, key: String },

    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("{message}")]
    Conflict { message: String },

    #[error("Authentication required")]
    Unauthorized,

    #[error("Admin access required")]
    Forbidden,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{service} request failed: {message}")]
    Upstream { service: &'static str, message: String },

    #[error("Failed to send email")]
    MailDelivery,

    #[error("Upstream request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid configuration value for {field} ({value}): {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    NotFound,
    Validation,
    Conflict,
    Auth,
    Upstream,
    Config,
    Internal,
}

impl AppError {
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        AppError::NotFound {
            entity,
            key: key.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        AppError::Conflict {
            message: message.into(),
        }
    }

    pub fn upstream(service: &'static str, message: impl Into<String>) -> Self {
        AppError::Upstream {
            service,
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::NotFound { .. } => ErrorCategory::NotFound,
            AppError::Validation { .. } => ErrorCategory::Validation,
            AppError::Conflict { .. } => ErrorCategory::Conflict,
            AppError::Unauthorized | AppError::Forbidden | AppError::InvalidCredentials => {
                ErrorCategory::Auth
            }
            AppError::Upstream { .. } | AppError::MailDelivery | AppError::Http(_) => {
                ErrorCategory::Upstream
            }
            AppError::InvalidConfigValue { .. }
            | AppError::Toml(_) => ErrorCategory::Config,
            AppError::Io(_) | AppError::Serialization(_) => ErrorCategory::Internal,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            _ => match self.category() {
                ErrorCategory::NotFound => StatusCode::NOT_FOUND,
                ErrorCategory::Validation => StatusCode::BAD_REQUEST,
                ErrorCategory::Conflict => StatusCode::CONFLICT,
                ErrorCategory::Upstream => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(category = ?self.category(), "{}", self);
        } else {
            tracing::warn!(category = ?self.category(), "{}", self);
        }

        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
