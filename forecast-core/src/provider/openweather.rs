use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::{
    error::{PrecipKind, truncate_body},
    model::MinutePrecipitationSeries,
};

use super::MinutelySource;

/// Everything but the minute block is excluded from the One Call payload.
const EXCLUDE: &str = "current,hourly,daily,alerts";

/// OpenWeatherMap One Call client, used for its `minutely` block only.
#[derive(Debug, Clone)]
pub struct OneCallClient {
    url: String,
    http: Client,
}

impl OneCallClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, PrecipKind> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PrecipKind::Unavailable(e.to_string()))?;

        Ok(Self {
            url: url.into(),
            http,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OcMinute {
    #[serde(default)]
    precipitation: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OcResponse {
    #[serde(default)]
    minutely: Option<Vec<OcMinute>>,
}

#[async_trait]
impl MinutelySource for OneCallClient {
    #[instrument(skip(self, api_key))]
    async fn fetch_minutely(
        &self,
        latitude: f64,
        longitude: f64,
        api_key: &str,
    ) -> Result<MinutePrecipitationSeries, PrecipKind> {
        let lat = latitude.to_string();
        let lon = longitude.to_string();

        let res = self
            .http
            .get(&self.url)
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("exclude", EXCLUDE),
                ("appid", api_key),
                ("units", "metric"),
            ])
            .send()
            .await
            // the request URL carries the key
            .map_err(|e| {
                PrecipKind::Unavailable(format!(
                    "Failed to send request to OpenWeather: {}",
                    e.without_url()
                ))
            })?;

        let status = res.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(PrecipKind::InvalidCredential);
        }

        let body = res.text().await.map_err(|e| {
            PrecipKind::Unavailable(format!(
                "Failed to read OpenWeather response body: {}",
                e.without_url()
            ))
        })?;

        if !status.is_success() {
            return Err(PrecipKind::Unavailable(format!(
                "OpenWeather request failed with status {}: {}",
                status,
                truncate_body(&body),
            )));
        }

        let parsed: OcResponse = serde_json::from_str(&body).map_err(|e| {
            PrecipKind::Unavailable(format!("Failed to parse OpenWeather JSON: {e}"))
        })?;

        let minutes = parsed.minutely.unwrap_or_default();
        debug!(minutes = minutes.len(), "Received minute precipitation");

        Ok(MinutePrecipitationSeries::from_amounts(
            minutes.into_iter().map(|m| m.precipitation),
        ))
    }
}
