use crate::core::extraction::records_from_response;
use crate::core::{DesignDataSource, Record, WorksheetImageSource};
use crate::domain::model::WorksheetMeta;
use crate::utils::error::{AssociationError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use std::collections::HashMap;
use std::time::Duration;

/// Connection settings for the design-data service.
#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub endpoint: String,
    pub headers: HashMap<String, String>,
    pub timeout: Option<Duration>,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
}

impl SourceSettings {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            headers: HashMap::new(),
            timeout: None,
            retry_attempts: 0,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// REST client for worksheet features and imagery.
pub struct DesignDataClient {
    client: Client,
    settings: SourceSettings,
}

impl DesignDataClient {
    pub fn new(settings: SourceSettings) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    fn url(&self, worksheet_id: &str, resource: &str) -> String {
        format!(
            "{}/worksheets/{}/{}",
            self.settings.endpoint.trim_end_matches('/'),
            worksheet_id,
            resource
        )
    }

    fn request(&self, url: &str, query: &[(&str, String)]) -> RequestBuilder {
        let mut request = self.client.get(url);

        // 添加自定義標頭
        for (key, value) in &self.settings.headers {
            request = request.header(key, value);
        }

        if !query.is_empty() {
            request = request.query(query);
        }

        if let Some(timeout) = self.settings.timeout {
            request = request.timeout(timeout);
        }

        request
    }

    /// GET with retry on transport failures and 5xx answers.
    async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<Response> {
        let mut attempt = 0;

        loop {
            tracing::debug!("Making API request to: {} (attempt {})", url, attempt + 1);

            let err = match self.request(url, query).send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => AssociationError::HttpStatusError {
                    status: response.status().as_u16(),
                    url: url.to_string(),
                },
                Err(e) => AssociationError::ApiError(e),
            };

            if attempt >= self.settings.retry_attempts || !err.is_retryable() {
                return Err(err);
            }

            attempt += 1;
            tracing::warn!(
                "⚠️ Request to {} failed ({}), retrying in {:?}",
                url,
                err,
                self.settings.retry_delay
            );
            tokio::time::sleep(self.settings.retry_delay).await;
        }
    }

    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<serde_json::Value> {
        let response = self.get(url, query).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl DesignDataSource for DesignDataClient {
    async fn fetch_ducts(&self, worksheet_id: &str) -> Result<Vec<Record>> {
        let url = self.url(worksheet_id, "ducts");
        let body = self.get_json(&url, &[]).await?;
        let records = records_from_response(body);
        tracing::debug!("Retrieved {} ducts", records.len());
        Ok(records)
    }

    async fn fetch_dampers(&self, worksheet_id: &str) -> Result<Vec<Record>> {
        let url = self.url(worksheet_id, "points");
        let body = self
            .get_json(&url, &[("type", "DAMPER".to_string())])
            .await?;
        let records = records_from_response(body);
        tracing::debug!("Retrieved {} dampers", records.len());
        Ok(records)
    }
}

#[async_trait]
impl WorksheetImageSource for DesignDataClient {
    async fn fetch_image(&self, worksheet_id: &str, zoom: u32) -> Result<Vec<u8>> {
        let url = self.url(worksheet_id, "image");
        let response = self
            .get(
                &url,
                &[
                    ("zoom", zoom.to_string()),
                    ("bg_removal", "false".to_string()),
                ],
            )
            .await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn fetch_meta(&self, worksheet_id: &str) -> Result<WorksheetMeta> {
        let url = self.url(worksheet_id, "meta");
        let body = self.get_json(&url, &[]).await?;
        Ok(serde_json::from_value(body)?)
    }
}
