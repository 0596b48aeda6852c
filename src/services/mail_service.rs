// src/services/mail_service.rs

use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::{SmtpSettings, SmtpTls},
    models::mail::SendEmailRequest,
};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

const DEFAULT_SUBJECT: &str = "Proces verbal";
const DEFAULT_PDF_NAME: &str = "proces-verbal.pdf";
const DEFAULT_CSV_NAME: &str = "lucrari.csv";

#[derive(Debug, Clone, PartialEq)]
pub struct MailAttachment {
    pub filename: String,
    pub content_type: &'static str,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub attachments: Vec<MailAttachment>,
}

/// Delivers a message and returns its Message-ID.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<String, AppError>;
}

// =============================================================================
//  SMTP
// =============================================================================

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> anyhow::Result<Self> {
        let builder = match settings.tls {
            SmtpTls::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?,
            SmtpTls::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)?,
            SmtpTls::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host),
        };

        let builder = match (&settings.username, &settings.password) {
            (Some(user), Some(password)) => {
                builder.credentials(Credentials::new(user.clone(), password.clone()))
            }
            _ => builder,
        };

        Ok(Self {
            transport: builder.port(settings.port).build(),
            from: settings.from.parse()?,
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<String, AppError> {
        let to: Mailbox = mail
            .to
            .parse()
            .map_err(|e| AppError::Mail(format!("invalid recipient '{}': {}", mail.to, e)))?;

        let message_id = format!("<{}@{}>", Uuid::new_v4(), self.from.email.domain());

        let mut body = MultiPart::mixed().singlepart(SinglePart::plain(mail.text));
        for attachment in mail.attachments {
            let content_type = ContentType::parse(attachment.content_type)
                .map_err(|e| AppError::Mail(e.to_string()))?;
            body = body.singlepart(
                Attachment::new(attachment.filename).body(attachment.content, content_type),
            );
        }

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject)
            .message_id(Some(message_id.clone()))
            .multipart(body)
            .map_err(|e| AppError::Mail(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::Mail(e.to_string()))?;

        Ok(message_id)
    }
}

// =============================================================================
//  MAIL SERVICE
// =============================================================================

/// Where a mailer takes its recipient from.
#[derive(Debug, Clone, PartialEq)]
pub enum RecipientSource {
    /// Always this address; whatever the caller supplies is ignored.
    Fixed(String),
    /// Address in the relay request body.
    FromRequest,
    /// Address stored on the record being mailed (the customer).
    FromRecord,
}

impl RecipientSource {
    pub fn resolve(&self, supplied: Option<&str>) -> Result<String, AppError> {
        match self {
            RecipientSource::Fixed(address) => Ok(address.clone()),
            RecipientSource::FromRequest | RecipientSource::FromRecord => supplied
                .map(str::trim)
                .filter(|address| !address.is_empty())
                .map(str::to_string)
                .ok_or(AppError::MissingRecipient),
        }
    }
}

#[derive(Clone)]
pub struct MailService {
    transport: Arc<dyn MailTransport>,
    recipients: RecipientSource,
}

impl MailService {
    pub fn new(transport: Arc<dyn MailTransport>, recipients: RecipientSource) -> Self {
        Self {
            transport,
            recipients,
        }
    }

    pub async fn send(
        &self,
        supplied_to: Option<&str>,
        subject: String,
        text: String,
        attachments: Vec<MailAttachment>,
    ) -> Result<String, AppError> {
        let to = self.recipients.resolve(supplied_to)?;

        tracing::info!(to = %to, subject = %subject, attachments = attachments.len(), "Sending email");

        let message_id = self
            .transport
            .send(OutgoingMail {
                to,
                subject,
                text,
                attachments,
            })
            .await?;

        tracing::info!(message_id = %message_id, "Email sent");
        Ok(message_id)
    }

    /// Sends a relay request: a base64 PDF, a CSV text, or neither.
    pub async fn relay(&self, request: SendEmailRequest) -> Result<String, AppError> {
        let attachments = relay_attachments(&request)?;

        self.send(
            request.to.as_deref(),
            request.subject.unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
            request.text.unwrap_or_default(),
            attachments,
        )
        .await
    }
}

fn relay_attachments(request: &SendEmailRequest) -> Result<Vec<MailAttachment>, AppError> {
    let mut attachments = Vec::new();

    if let Some(encoded) = request.attachment.as_deref().filter(|s| !s.trim().is_empty()) {
        // Browsers send either a data URL or bare base64.
        let encoded = match encoded.split_once(',') {
            Some((header, data)) if header.starts_with("data:") => data,
            _ => encoded,
        };

        let content = STANDARD
            .decode(encoded.trim())
            .map_err(|e| AppError::InvalidAttachment(format!("attachment is not base64: {}", e)))?;

        if !content.starts_with(crate::services::document_service::PDF_SIGNATURE) {
            return Err(AppError::InvalidAttachment("attachment is not a PDF".to_string()));
        }

        attachments.push(MailAttachment {
            filename: request
                .filename
                .clone()
                .unwrap_or_else(|| DEFAULT_PDF_NAME.to_string()),
            content_type: PDF_CONTENT_TYPE,
            content,
        });
    }

    if let Some(csv) = request.csv_content.as_deref() {
        let filename = match (&request.filename, attachments.is_empty()) {
            (Some(name), true) => name.clone(),
            _ => DEFAULT_CSV_NAME.to_string(),
        };

        attachments.push(MailAttachment {
            filename,
            content_type: CSV_CONTENT_TYPE,
            content: csv.as_bytes().to_vec(),
        });
    }

    Ok(attachments)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every message instead of delivering it.
    #[derive(Default)]
    pub(crate) struct RecordingTransport {
        pub(crate) sent: Mutex<Vec<OutgoingMail>>,
        pub(crate) fail: bool,
    }

    impl RecordingTransport {
        pub(crate) fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        pub(crate) fn sent(&self) -> Vec<OutgoingMail> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MailTransport for RecordingTransport {
        async fn send(&self, mail: OutgoingMail) -> Result<String, AppError> {
            if self.fail {
                return Err(AppError::Mail("connection refused".to_string()));
            }
            let mut sent = self.sent.lock().unwrap();
            sent.push(mail);
            Ok(format!("<{}@test>", sent.len()))
        }
    }

    #[test]
    fn fixed_source_ignores_the_supplied_address() {
        let source = RecipientSource::Fixed("office@firma.ro".to_string());
        assert_eq!(source.resolve(Some("other@x.ro")).unwrap(), "office@firma.ro");
        assert_eq!(source.resolve(None).unwrap(), "office@firma.ro");
    }

    #[test]
    fn request_source_needs_an_address() {
        let source = RecipientSource::FromRequest;
        assert_eq!(source.resolve(Some(" a@b.ro ")).unwrap(), "a@b.ro");
        assert!(matches!(source.resolve(Some("  ")), Err(AppError::MissingRecipient)));
        assert!(matches!(
            RecipientSource::FromRecord.resolve(None),
            Err(AppError::MissingRecipient)
        ));
    }

    #[tokio::test]
    async fn relay_decodes_the_pdf_attachment() {
        let transport = Arc::new(RecordingTransport::default());
        let service = MailService::new(transport.clone(), RecipientSource::FromRequest);

        let message_id = service
            .relay(SendEmailRequest {
                to: Some("client@x.ro".to_string()),
                attachment: Some(format!("data:application/pdf;base64,{}", STANDARD.encode(b"%PDF-1.4"))),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(message_id, "<1@test>");
        let sent = transport.sent();
        assert_eq!(sent[0].subject, DEFAULT_SUBJECT);
        assert_eq!(sent[0].attachments[0].filename, DEFAULT_PDF_NAME);
        assert_eq!(sent[0].attachments[0].content, b"%PDF-1.4");
    }

    #[tokio::test]
    async fn relay_attaches_csv_under_the_given_name() {
        let transport = Arc::new(RecordingTransport::default());
        let service = MailService::new(transport.clone(), RecipientSource::Fixed("office@firma.ro".into()));

        service
            .relay(SendEmailRequest {
                csv_content: Some("a,b\n1,2\n".to_string()),
                filename: Some("export.csv".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let sent = transport.sent();
        assert_eq!(sent[0].to, "office@firma.ro");
        assert_eq!(sent[0].attachments[0].filename, "export.csv");
        assert_eq!(sent[0].attachments[0].content_type, CSV_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn relay_rejects_a_non_pdf_attachment() {
        let transport = Arc::new(RecordingTransport::default());
        let service = MailService::new(transport.clone(), RecipientSource::FromRequest);

        let err = service
            .relay(SendEmailRequest {
                to: Some("client@x.ro".to_string()),
                attachment: Some(STANDARD.encode(b"<html></html>")),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidAttachment(_)));
        assert!(transport.sent().is_empty());
    }
}
