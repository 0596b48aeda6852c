// src/models/mail.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of `POST /api/mail/send-email`. Field aliases match the two
/// front-end callers (certificate screen and export screen).
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailRequest {
    #[serde(alias = "recipientEmail")]
    #[schema(example = "client@example.ro")]
    pub to: Option<String>,
    pub subject: Option<String>,
    pub text: Option<String>,
    /// Base64 PDF.
    #[serde(alias = "pdfBytes")]
    pub attachment: Option<String>,
    /// Raw CSV text.
    pub csv_content: Option<String>,
    pub filename: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendEmailResponse {
    pub fn sent(message_id: String) -> Self {
        Self {
            success: true,
            message_id: Some(message_id),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error.into()),
        }
    }
}
