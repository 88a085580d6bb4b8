use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application-specific error types.
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// A categorical input is not a member of its field's enumeration.
    UnknownCategory {
        /// Column name of the categorical field.
        field: String,
        /// The rejected value.
        value: String,
    },
    /// A required raw input is absent.
    MissingField(String),
    /// The request body could not be decoded into applicant fields.
    InvalidInput(String),
    /// A numeric input is present but outside its allowed range.
    OutOfRange {
        /// Column name of the numeric field.
        field: String,
        /// The rejected value.
        value: f64,
    },
    /// The text-generation service failed.
    ExternalServiceFailure(String),
    /// The selected model artifact cannot be loaded or is unusable.
    ModelArtifactMissing(String),
    /// Internal server error.
    InternalError(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// Returns the innermost error, skipping any context wrappers.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the error stems from the submitted input rather than the service.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self.root(),
            AppError::UnknownCategory { .. }
                | AppError::MissingField(_)
                | AppError::InvalidInput(_)
                | AppError::OutOfRange { .. }
        )
    }

    /// Message safe to show to the end user.
    pub fn user_message(&self) -> String {
        match self.root() {
            AppError::UnknownCategory { field, value } => {
                format!("'{}' is not a valid choice for {}", value, field)
            }
            AppError::MissingField(field) => format!("Please provide a value for {}", field),
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::OutOfRange { field, value } => {
                format!("{} is outside the allowed range for {}", value, field)
            }
            AppError::ExternalServiceFailure(_) => {
                "The explanation service is currently unavailable".to_string()
            }
            AppError::ModelArtifactMissing(_) => {
                "The prediction model is not available".to_string()
            }
            AppError::InternalError(_) | AppError::WithContext { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::UnknownCategory { field, value } => {
                write!(f, "Unknown category '{}' for field {}", value, field)
            }
            AppError::MissingField(field) => write!(f, "Missing field: {}", field),
            AppError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AppError::OutOfRange { field, value } => {
                write!(f, "Value {} out of range for field {}", value, field)
            }
            AppError::ExternalServiceFailure(msg) => write!(f, "External service error: {}", msg),
            AppError::ModelArtifactMissing(msg) => write!(f, "Model artifact missing: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Maps each error variant to an HTTP status code and a JSON body.
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::UnknownCategory { .. }
            | AppError::MissingField(_)
            | AppError::InvalidInput(_)
            | AppError::OutOfRange { .. } => StatusCode::BAD_REQUEST,
            AppError::ExternalServiceFailure(msg) => {
                tracing::error!("External service error: {}", msg);
                StatusCode::BAD_GATEWAY
            }
            AppError::ModelArtifactMissing(msg) => {
                tracing::error!("Model artifact missing: {}", msg);
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::WithContext { source, context } => {
                tracing::error!("Error with context: {} -> {}", context, source);
                return source.as_ref().clone().into_response();
            }
        };

        let body = Json(json!({
            "error": self.user_message(),
        }));

        (status, body).into_response()
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_preserves_root() {
        let err: Result<(), AppError> = Err(AppError::MissingField("Age".to_string()));
        let wrapped = err.context("assembling record").unwrap_err();

        assert_eq!(wrapped.root(), &AppError::MissingField("Age".to_string()));
        assert!(wrapped.is_input_error());
        assert_eq!(wrapped.to_string(), "assembling record: Missing field: Age");
    }

    #[test]
    fn test_status_mapping() {
        let resp = AppError::MissingField("Age".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = AppError::ModelArtifactMissing("gone".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let resp = AppError::WithContext {
            source: Box::new(AppError::ExternalServiceFailure("boom".to_string())),
            context: "explaining".to_string(),
        }
        .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_invalid_input_is_bad_request() {
        let err = AppError::InvalidInput("'abc' is not a number".to_string());
        assert!(err.is_input_error());
        assert_eq!(err.user_message(), "'abc' is not a number");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_user_message_hides_internal_detail() {
        let err = AppError::InternalError("secret stack trace".to_string());
        assert_eq!(err.user_message(), "Internal server error");
    }
}
