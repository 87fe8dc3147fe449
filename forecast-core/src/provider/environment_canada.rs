use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::{
    error::{RefreshError, truncate_body},
    location::Location,
    station::decode_document,
};

use super::StationSource;

/// Fetches city-page XML from the Environment Canada datamart.
#[derive(Debug, Clone)]
pub struct EnvironmentCanadaClient {
    base_url: String,
    http: Client,
}

impl EnvironmentCanadaClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RefreshError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RefreshError::Network(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into(),
            http,
        })
    }

    /// `{base}/{province}/{station}_e.xml`
    pub fn document_url(&self, location: &Location) -> String {
        format!(
            "{}/{}/{}_e.xml",
            self.base_url.trim_end_matches('/'),
            location.province,
            location.station_code
        )
    }
}

#[async_trait]
impl StationSource for EnvironmentCanadaClient {
    #[instrument(skip(self, location), fields(station = %location.station_code))]
    async fn fetch_document(&self, location: &Location) -> Result<String, RefreshError> {
        let url = self.document_url(location);
        debug!("Fetching station document: {}", url);

        let res = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| RefreshError::Network(e.to_string()))?;

        let status = res.status();
        // Raw bytes: the feed's charset is in the XML declaration, not the headers.
        let bytes = res
            .bytes()
            .await
            .map_err(|e| RefreshError::Network(format!("Failed to read station response body: {e}")))?;

        if !status.is_success() {
            return Err(RefreshError::Status {
                status: status.as_u16(),
                body: truncate_body(&String::from_utf8_lossy(&bytes)),
            });
        }

        debug!(bytes = bytes.len(), "Received station document");
        Ok(decode_document(&bytes)?)
    }
}
