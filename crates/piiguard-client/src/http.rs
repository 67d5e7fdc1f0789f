use std::time::Duration;

use async_trait::async_trait;
use piiguard_core::{AnalysisResult, SelectedFile};
use reqwest::multipart::{Form, Part};
use tracing::debug;

use crate::error::{Result, ServiceError};
use crate::service::{AnalysisService, RedactedImage};

/// Longest slice of an error body kept in `ServiceError::Status`
const ERROR_BODY_LIMIT: usize = 200;

/// Connection settings for the analysis service
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: String,
    pub api_prefix: String,
    pub timeout: Duration,
    pub user_agent: String,
}

/// Absolute URLs of the two endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub upload: String,
    pub redact_image: String,
}

impl Endpoints {
    pub fn new(base_url: &str, api_prefix: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        let prefix = api_prefix.trim_matches('/');
        let root = if prefix.is_empty() {
            base.to_string()
        } else {
            format!("{}/{}", base, prefix)
        };

        Self {
            upload: format!("{}/upload", root),
            redact_image: format!("{}/redact-image", root),
        }
    }
}

pub struct HttpAnalysisService {
    client: reqwest::Client,
    endpoints: Endpoints,
    timeout: Duration,
}

impl HttpAnalysisService {
    pub fn new(options: &ClientOptions) -> Result<Self> {
        if !options.base_url.starts_with("http://") && !options.base_url.starts_with("https://") {
            return Err(ServiceError::InvalidRequest(format!(
                "Server URL must start with http:// or https://: {}",
                options.base_url
            )));
        }

        let client = reqwest::Client::builder()
            .user_agent(options.user_agent.as_str())
            .timeout(options.timeout)
            .build()?;

        Ok(Self {
            client,
            endpoints: Endpoints::new(&options.base_url, &options.api_prefix),
            timeout: options.timeout,
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Multipart body with the document in a single `file` field
    fn form(file: &SelectedFile) -> Result<Form> {
        let part = Part::bytes(file.content().to_vec())
            .file_name(file.name().to_string())
            .mime_str(file.media_type())?;
        Ok(Form::new().part("file", part))
    }

    async fn post(&self, url: &str, file: &SelectedFile) -> Result<reqwest::Response> {
        debug!(url, file = file.name(), size = file.len(), "posting document");

        let response = self
            .client
            .post(url)
            .multipart(Self::form(file)?)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body: truncate(&body, ERROR_BODY_LIMIT),
            });
        }

        Ok(response)
    }

    fn transport_error(&self, error: reqwest::Error) -> ServiceError {
        if error.is_timeout() {
            ServiceError::TimedOut(self.timeout)
        } else {
            ServiceError::Http(error)
        }
    }
}

#[async_trait]
impl AnalysisService for HttpAnalysisService {
    async fn analyze(&self, file: &SelectedFile) -> Result<AnalysisResult> {
        let response = self.post(&self.endpoints.upload, file).await?;
        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;

        AnalysisResult::from_json(&body).map_err(|e| ServiceError::MalformedResponse(e.to_string()))
    }

    async fn redact_image(&self, file: &SelectedFile) -> Result<RedactedImage> {
        let response = self.post(&self.endpoints.redact_image, file).await?;

        let media_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| v.starts_with("image/"))
            .map(|s| s.to_string())
            .unwrap_or_else(|| file.media_type().to_string());

        let content = response.bytes().await.map_err(|e| self.transport_error(e))?;
        if content.is_empty() {
            return Err(ServiceError::MalformedResponse(
                "empty image body".to_string(),
            ));
        }

        Ok(RedactedImage {
            content: content.to_vec(),
            media_type,
        })
    }
}

fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
