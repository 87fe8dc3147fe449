use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    config::Credential,
    error::PrecipKind,
    model::MinutePrecipitationSeries,
    provider::MinutelySource,
};

/// Short phrase describing when precipitation begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecipitationState {
    HappeningNow,
    StartingIn(usize),
    NoneExpected,
}

impl fmt::Display for PrecipitationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HappeningNow => f.write_str("happening now"),
            Self::StartingIn(minutes) => write!(f, "starting in {minutes} minutes"),
            Self::NoneExpected => f.write_str("no precipitation expected"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecipitationSummary {
    pub series: MinutePrecipitationSeries,
    pub total: f64,
    pub peak: f64,
    /// Index of the first minute with any precipitation.
    pub onset: Option<usize>,
    pub state: PrecipitationState,
}

impl PrecipitationSummary {
    pub fn from_series(series: MinutePrecipitationSeries) -> Self {
        let total: f64 = series.samples.iter().map(|s| s.amount).sum();
        let peak = series.samples.iter().map(|s| s.amount).fold(0.0, f64::max);
        let onset = if total > 0.0 {
            series.samples.iter().position(|s| s.amount > 0.0)
        } else {
            None
        };

        let state = match onset {
            Some(0) => PrecipitationState::HappeningNow,
            Some(minutes) => PrecipitationState::StartingIn(minutes),
            None => PrecipitationState::NoneExpected,
        };

        Self {
            series,
            total,
            peak,
            onset,
            state,
        }
    }

    /// Each minute's amount relative to the peak, from 0.0 to 1.0.
    pub fn intensity_profile(&self) -> Vec<f64> {
        self.series
            .samples
            .iter()
            .map(|s| if self.peak > 0.0 { s.amount / self.peak } else { 0.0 })
            .collect()
    }
}

/// Result of the optional secondary stage of a refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum PrecipitationOutcome {
    /// No credential, so the secondary source was never called.
    NotRequested,
    Ready(PrecipitationSummary),
    Degraded(PrecipKind),
}

impl PrecipitationOutcome {
    pub fn summary(&self) -> Option<&PrecipitationSummary> {
        match self {
            Self::Ready(summary) => Some(summary),
            _ => None,
        }
    }
}

/// Fetch the next hour of minute precipitation and summarize it.
///
/// An absent credential short-circuits to [`PrecipKind::MissingCredential`]
/// before `source` is touched.
#[instrument(skip(source, credential))]
pub async fn fetch_precipitation(
    source: &dyn MinutelySource,
    latitude: f64,
    longitude: f64,
    credential: &Credential,
) -> Result<PrecipitationSummary, PrecipKind> {
    let Some(api_key) = credential.expose() else {
        return Err(PrecipKind::MissingCredential);
    };

    let series = source.fetch_minutely(latitude, longitude, api_key).await?;
    debug!(minutes = series.len(), "Fetched minute precipitation");

    Ok(PrecipitationSummary::from_series(series))
}
