// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::common::i18n;
use crate::middleware::i18n::Locale;
use crate::models::workflow::Step;

/// Stage of the submission sequence that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStage {
    ReadCounter,
    Render,
    SendEmail,
    IncrementCounter,
    PersistRecord,
    DeductStock,
}

impl SubmissionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStage::ReadCounter => "read_counter",
            SubmissionStage::Render => "render",
            SubmissionStage::SendEmail => "send_email",
            SubmissionStage::IncrementCounter => "increment_counter",
            SubmissionStage::PersistRecord => "persist_record",
            SubmissionStage::DeductStock => "deduct_stock",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Step {step:?} is missing '{field}'")]
    StepIncomplete { step: Step, field: &'static str },

    #[error("Invalid workflow transition from {0:?}")]
    InvalidTransition(Step),

    #[error("Invalid draft: {0}")]
    InvalidDraft(String),

    #[error("Workflow not found")]
    WorkflowNotFound,

    #[error("Customer not found")]
    CustomerNotFound,

    #[error("Employee not found")]
    EmployeeNotFound,

    #[error("Solution not found")]
    SolutionNotFound,

    #[error("Record not found")]
    RecordNotFound,

    #[error("Unique constraint violated: {0}")]
    UniqueConstraintViolation(String),

    #[error("Insufficient stock for solution '{solution}'")]
    InsufficientStock { solution: String },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Administrator session required")]
    Forbidden,

    #[error("User not found")]
    UserNotFound,

    #[error("Template error: {0}")]
    Template(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Template fetch failed: {0}")]
    TemplateFetch(String),

    #[error("Mail error: {0}")]
    Mail(String),

    #[error("Missing recipient address")]
    MissingRecipient,

    #[error("Invalid attachment: {0}")]
    InvalidAttachment(String),

    /// A step of the finish sequence failed; earlier steps are not undone.
    #[error("Submission failed at {}: {source}", stage.as_str())]
    SubmissionFailed {
        stage: SubmissionStage,
        #[source]
        source: Box<AppError>,
    },

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal server error")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Bcrypt error: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    pub fn failed_at(stage: SubmissionStage, source: AppError) -> Self {
        AppError::SubmissionFailed {
            stage,
            source: Box::new(source),
        }
    }

    fn status_and_key(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, "invalid_fields"),
            AppError::StepIncomplete { .. } => (StatusCode::BAD_REQUEST, "step_incomplete"),
            AppError::InvalidTransition(_) => (StatusCode::CONFLICT, "invalid_transition"),
            AppError::InvalidDraft(_) => (StatusCode::BAD_REQUEST, "invalid_draft"),
            AppError::WorkflowNotFound => (StatusCode::NOT_FOUND, "workflow_not_found"),
            AppError::CustomerNotFound => (StatusCode::NOT_FOUND, "customer_not_found"),
            AppError::EmployeeNotFound => (StatusCode::NOT_FOUND, "employee_not_found"),
            AppError::SolutionNotFound => (StatusCode::NOT_FOUND, "solution_not_found"),
            AppError::RecordNotFound => (StatusCode::NOT_FOUND, "record_not_found"),
            AppError::UniqueConstraintViolation(_) => (StatusCode::CONFLICT, "already_exists"),
            AppError::InsufficientStock { .. } => (StatusCode::CONFLICT, "insufficient_stock"),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token"),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::UserNotFound => (StatusCode::NOT_FOUND, "user_not_found"),
            AppError::Template(_) => (StatusCode::UNPROCESSABLE_ENTITY, "template_invalid"),
            AppError::Render(_) => (StatusCode::UNPROCESSABLE_ENTITY, "render_failed"),
            AppError::MissingRecipient => (StatusCode::BAD_REQUEST, "missing_recipient"),
            AppError::InvalidAttachment(_) => (StatusCode::BAD_REQUEST, "invalid_attachment"),
            AppError::TemplateFetch(_) | AppError::Mail(_) => {
                (StatusCode::BAD_GATEWAY, "external_call_failed")
            }
            AppError::SubmissionFailed { .. } => (StatusCode::BAD_GATEWAY, "submission_failed"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }

    /// Converts into the HTTP error body in the caller's language.
    pub fn to_api_error(&self, locale: &Locale) -> ApiError {
        let (status, key) = self.status_and_key();

        match self {
            AppError::SubmissionFailed { stage, source } => {
                tracing::error!(stage = stage.as_str(), error = %source, "Submission aborted");
            }
            _ if status.is_server_error() => {
                tracing::error!("Internal server error: {}", self);
            }
            _ => {}
        }

        let mut message = i18n::message(&locale.0, key);

        match self {
            AppError::StepIncomplete { field, .. } => {
                message = format!("{} ({})", message, i18n::message(&locale.0, field));
            }
            AppError::InsufficientStock { solution } => {
                message = format!("{}: {}", message, solution);
            }
            AppError::InvalidDraft(detail) | AppError::InvalidAttachment(detail) => {
                message = format!("{}: {}", message, detail);
            }
            _ => {}
        }

        let details = match self {
            AppError::ValidationError(errors) => Some(validation_details(errors)),
            _ => None,
        };

        ApiError {
            status,
            message,
            details,
        }
    }
}

fn validation_details(errors: &validator::ValidationErrors) -> serde_json::Value {
    let mut details = serde_json::Map::new();
    for (field, field_errors) in errors.field_errors() {
        let messages: Vec<String> = field_errors
            .iter()
            .map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string())
            })
            .collect();
        details.insert(field.to_string(), json!(messages));
    }
    serde_json::Value::Object(details)
}

/// Error body returned by the handlers.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.message, "details": details }),
            None => json!({ "error": self.message }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_failure_hides_the_stage_from_the_user() {
        let err = AppError::failed_at(
            SubmissionStage::PersistRecord,
            AppError::InternalServerError(anyhow::anyhow!("insert failed")),
        );
        let api = err.to_api_error(&Locale("en".to_string()));

        assert_eq!(api.status, StatusCode::BAD_GATEWAY);
        assert!(!api.message.contains("persist"));
        assert!(!api.message.contains("insert"));
    }

    #[test]
    fn step_incomplete_names_the_missing_field() {
        let err = AppError::StepIncomplete {
            step: Step::ReviewAndSign,
            field: "employee_signature",
        };
        let api = err.to_api_error(&Locale("ro".to_string()));

        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert!(api.message.contains("semnătura angajatului"));
    }
}
