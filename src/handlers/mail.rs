// src/handlers/mail.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::i18n::Locale,
    models::mail::{SendEmailRequest, SendEmailResponse},
};

// Front-end callers read `success` from the body, so delivery failures are
// reported in it rather than as an error body.
#[utoipa::path(
    post,
    path = "/api/mail/send-email",
    tag = "Mail",
    request_body = SendEmailRequest,
    responses(
        (status = 200, description = "Email trimis", body = SendEmailResponse),
        (status = 400, description = "Destinatar sau atasament invalid", body = SendEmailResponse),
        (status = 502, description = "Serverul SMTP a refuzat mesajul", body = SendEmailResponse)
    ),
    security(("api_jwt" = []))
)]
pub async fn send_email(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<SendEmailRequest>,
) -> Result<impl IntoResponse, ApiError> {
    match app_state.relay_mail.relay(payload).await {
        Ok(message_id) => {
            tracing::info!(message_id = %message_id, "Email relayed");
            Ok((StatusCode::OK, Json(SendEmailResponse::sent(message_id))))
        }
        Err(e) => {
            let api_error = e.to_api_error(&locale);
            Ok((api_error.status, Json(SendEmailResponse::failed(api_error.message))))
        }
    }
}
