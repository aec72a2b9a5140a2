//! Error types for socialcore
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.

use std::collections::BTreeMap;
use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Field-level validation failures
///
/// Keys are attribute names (`text`, `ends_at`, ...), values are the
/// human-readable messages collected for that attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against an attribute
    pub fn add(&mut self, field: &str, message: &str) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether any message was recorded for `field`
    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn fields(&self) -> &BTreeMap<String, Vec<String>> {
        &self.fields
    }

    /// Single-field shortcut
    pub fn single(field: &str, message: &str) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// `Ok(())` when nothing was recorded, the collected errors otherwise
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages = self
            .fields
            .iter()
            .flat_map(|(field, messages)| {
                messages
                    .iter()
                    .map(move |message| format!("{} {}", humanize_field(field), message))
            })
            .collect::<Vec<_>>();
        write!(f, "{}", messages.join(", "))
    }
}

fn humanize_field(field: &str) -> String {
    let spaced = field.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Application-wide error type
///
/// This enum represents all possible errors that can occur
/// in the application. It implements `IntoResponse` to
/// automatically convert errors to appropriate HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found, or not visible to the caller (404)
    #[error("Record not found")]
    NotFound,

    /// Authentication required (401)
    #[error("The access token is invalid")]
    Unauthorized,

    /// Access denied (403)
    #[error("This action is not allowed")]
    Forbidden,

    /// Validation failed (422)
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl AppError {
    /// HTTP status this error is reported with
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Database(_) | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Maps each error variant to appropriate HTTP status code
    /// and JSON error body.
    fn into_response(self) -> Response {
        use axum::Json;

        let status = self.status_code();
        let (error_message, error_type) = match &self {
            AppError::NotFound => (self.to_string(), "not_found"),
            AppError::Unauthorized => (self.to_string(), "unauthorized"),
            AppError::Forbidden => (self.to_string(), "forbidden"),
            AppError::Validation(_) => (self.to_string(), "validation"),
            AppError::Database(error) => {
                tracing::error!(%error, "Database error while handling request");
                ("Database error".to_string(), "database")
            }
            AppError::Config(msg) => (msg.clone(), "config"),
            AppError::Internal(error) => {
                tracing::error!(%error, "Internal error while handling request");
                ("Internal server error".to_string(), "internal")
            }
        };

        crate::metrics::ERRORS_TOTAL
            .with_label_values(&[error_type])
            .inc();

        let body = match &self {
            AppError::Validation(errors) => Json(serde_json::json!({
                "error": error_message,
                "details": errors.fields(),
            })),
            _ => Json(serde_json::json!({
                "error": error_message,
            })),
        };

        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_render_humanized_messages() {
        let mut errors = ValidationErrors::new();
        errors.add("text", "can't be blank");
        errors.add("ends_at", "can't be blank");

        assert!(errors.has("text"));
        assert!(!errors.has("starts_at"));
        assert_eq!(
            AppError::Validation(errors).to_string(),
            "Validation failed: Ends at can't be blank, Text can't be blank"
        );
    }

    #[test]
    fn empty_validation_errors_are_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
        assert!(matches!(
            ValidationErrors::single("text", "can't be blank").into_result(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn not_found_maps_to_404() {
        let response = AppError::NotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response =
            AppError::Validation(ValidationErrors::single("text", "can't be blank"))
                .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
