// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use anyhow::{anyhow, bail, Context};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{
        CustomerRepository, EmployeeRepository, PgSubmissionStore, ReceptionRepository,
        ServiceRecordRepository, SolutionRepository, UserRepository,
    },
    services::{
        auth::{AuthService, SessionCodec},
        customer_service::CustomerService,
        document_service::DocumentService,
        employee_service::EmployeeService,
        mail_service::{MailService, MailTransport, RecipientSource, SmtpMailer},
        record_service::RecordService,
        solution_service::SolutionService,
        submission_service::{StockPolicy, SubmissionService},
        template_source::{FileTemplate, HttpTemplate, TemplateSource},
        workflow_service::WorkflowService,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpTls {
    StartTls,
    Tls,
    None,
}

impl FromStr for SmtpTls {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "starttls" => Ok(SmtpTls::StartTls),
            "tls" => Ok(SmtpTls::Tls),
            "none" => Ok(SmtpTls::None),
            other => bail!("unknown SMTP TLS mode '{}'", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub tls: SmtpTls,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Sender mailbox, e.g. `Birou <birou@firma.ro>`.
    pub from: String,
}

#[derive(Debug, Clone)]
pub enum TemplateLocation {
    Url(String),
    Path(String),
}

/// Everything read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub smtp: SmtpSettings,
    pub relay_recipients: RecipientSource,
    pub certificate_recipients: RecipientSource,
    pub template: TemplateLocation,
    pub stock_policy: StockPolicy,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

fn required(name: &str) -> anyhow::Result<String> {
    env::var(name).with_context(|| format!("{} must be set", name))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// `fixed` needs the address; `request` and `record` ignore it.
fn parse_recipient_source(mode: &str, fixed: Option<String>) -> anyhow::Result<RecipientSource> {
    match mode.trim().to_lowercase().as_str() {
        "fixed" => fixed
            .map(RecipientSource::Fixed)
            .ok_or_else(|| anyhow!("fixed recipient mode needs an address")),
        "request" => Ok(RecipientSource::FromRequest),
        "record" => Ok(RecipientSource::FromRecord),
        other => bail!("unknown recipient mode '{}'", other),
    }
}

fn recipient_source(mode_var: &str, fixed_var: &str, default_mode: &str) -> anyhow::Result<RecipientSource> {
    let mode = optional(mode_var).unwrap_or_else(|| default_mode.to_string());
    parse_recipient_source(&mode, optional(fixed_var))
        .with_context(|| format!("{} / {}", mode_var, fixed_var))
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        let tls = optional("SMTP_TLS")
            .map(|v| v.parse::<SmtpTls>())
            .transpose()
            .context("SMTP_TLS")?
            .unwrap_or(SmtpTls::StartTls);

        let template = match (optional("TEMPLATE_URL"), optional("TEMPLATE_PATH")) {
            (Some(url), _) => TemplateLocation::Url(url),
            (None, Some(path)) => TemplateLocation::Path(path),
            (None, None) => bail!("TEMPLATE_URL or TEMPLATE_PATH must be set"),
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            database_max_connections: optional("DATABASE_MAX_CONNECTIONS")
                .map(|v| v.parse())
                .transpose()
                .context("DATABASE_MAX_CONNECTIONS must be a number")?
                .unwrap_or(5),
            jwt_secret: required("JWT_SECRET")?,
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3001".to_string()),
            smtp: SmtpSettings {
                host: required("SMTP_HOST")?,
                port: optional("SMTP_PORT")
                    .map(|v| v.parse())
                    .transpose()
                    .context("SMTP_PORT must be a number")?
                    .unwrap_or(587),
                tls,
                username: optional("SMTP_USERNAME"),
                password: optional("SMTP_PASSWORD"),
                from: required("MAIL_FROM")?,
            },
            relay_recipients: recipient_source("RELAY_RECIPIENT_MODE", "RELAY_FIXED_RECIPIENT", "request")?,
            certificate_recipients: recipient_source(
                "CERTIFICATE_RECIPIENT_MODE",
                "CERTIFICATE_FIXED_RECIPIENT",
                "record",
            )?,
            template,
            stock_policy: optional("STOCK_POLICY")
                .map(|v| v.parse::<StockPolicy>())
                .transpose()
                .map_err(|e| anyhow!(e))?
                .unwrap_or_default(),
            admin_email: optional("ADMIN_EMAIL"),
            admin_password: optional("ADMIN_PASSWORD"),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth_service: AuthService,
    pub customer_service: CustomerService,
    pub employee_service: EmployeeService,
    pub solution_service: SolutionService,
    pub record_service: RecordService,
    pub workflow_service: WorkflowService,
    pub relay_mail: MailService,
}

impl AppState {
    pub async fn new(settings: &Settings) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(settings.database_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&settings.database_url)
            .await?;

        tracing::info!("Database connection established");

        // --- Dependency graph ---
        let user_repo = UserRepository::new(db_pool.clone());
        let customer_repo = CustomerRepository::new(db_pool.clone());
        let employee_repo = EmployeeRepository::new(db_pool.clone());
        let solution_repo = SolutionRepository::new(db_pool.clone());
        let record_repo = ServiceRecordRepository::new(db_pool.clone());

        let auth_service = AuthService::new(user_repo, SessionCodec::new(settings.jwt_secret.clone()));

        // One SMTP transport shared by both mailers.
        let transport: Arc<dyn MailTransport> = Arc::new(SmtpMailer::new(&settings.smtp)?);
        let relay_mail = MailService::new(transport.clone(), settings.relay_recipients.clone());
        let certificate_mail = MailService::new(transport, settings.certificate_recipients.clone());

        let template: Arc<dyn TemplateSource> = match &settings.template {
            TemplateLocation::Url(url) => Arc::new(HttpTemplate::new(reqwest::Client::new(), url.clone())),
            TemplateLocation::Path(path) => Arc::new(FileTemplate::new(path.clone())),
        };

        let store = Arc::new(PgSubmissionStore::new(
            db_pool.clone(),
            ReceptionRepository::new(),
            record_repo.clone(),
            solution_repo.clone(),
        ));

        let submission_service = SubmissionService::new(
            store,
            DocumentService::new(template),
            certificate_mail,
            settings.stock_policy,
        );

        let workflow_service = WorkflowService::new(
            customer_repo.clone(),
            employee_repo.clone(),
            solution_repo.clone(),
            submission_service,
        );

        Ok(Self {
            db_pool,
            auth_service,
            customer_service: CustomerService::new(customer_repo),
            employee_service: EmployeeService::new(employee_repo),
            solution_service: SolutionService::new(solution_repo),
            record_service: RecordService::new(record_repo, relay_mail.clone()),
            workflow_service,
            relay_mail,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tls_modes_parse_case_insensitively() {
        assert_eq!("STARTTLS".parse::<SmtpTls>().unwrap(), SmtpTls::StartTls);
        assert_eq!(" tls ".parse::<SmtpTls>().unwrap(), SmtpTls::Tls);
        assert_eq!("none".parse::<SmtpTls>().unwrap(), SmtpTls::None);
        assert!("ssl".parse::<SmtpTls>().is_err());
    }

    #[test]
    fn fixed_recipient_mode_needs_an_address() {
        assert!(parse_recipient_source("fixed", None).is_err());
        assert!(matches!(
            parse_recipient_source("Fixed", Some("birou@firma.ro".to_string())).unwrap(),
            RecipientSource::Fixed(address) if address == "birou@firma.ro"
        ));
    }

    #[test]
    fn other_recipient_modes_ignore_the_address() {
        assert!(matches!(
            parse_recipient_source("request", Some("x@y.ro".to_string())).unwrap(),
            RecipientSource::FromRequest
        ));
        assert!(matches!(
            parse_recipient_source("record", None).unwrap(),
            RecipientSource::FromRecord
        ));
        assert!(parse_recipient_source("broadcast", None).is_err());
    }
}
