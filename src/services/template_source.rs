// src/services/template_source.rs

use std::path::PathBuf;

use async_trait::async_trait;

use crate::common::error::AppError;

/// Where the blank certificate PDF comes from.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<u8>, AppError>;
}

/// Template served over HTTP(S), e.g. from object storage.
pub struct HttpTemplate {
    client: reqwest::Client,
    url: String,
}

impl HttpTemplate {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl TemplateSource for HttpTemplate {
    async fn fetch(&self) -> Result<Vec<u8>, AppError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::TemplateFetch(e.to_string()))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::TemplateFetch(e.to_string()))?;

        tracing::debug!(url = %self.url, size = bytes.len(), "Template fetched");
        Ok(bytes.to_vec())
    }
}

/// Template read from disk on every call.
pub struct FileTemplate {
    path: PathBuf,
}

impl FileTemplate {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TemplateSource for FileTemplate {
    async fn fetch(&self) -> Result<Vec<u8>, AppError> {
        tokio::fs::read(&self.path)
            .await
            .map_err(|e| AppError::TemplateFetch(format!("{}: {}", self.path.display(), e)))
    }
}
