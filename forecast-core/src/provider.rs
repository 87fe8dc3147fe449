use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::{PrecipKind, RefreshError},
    location::Location,
    model::MinutePrecipitationSeries,
};

pub mod environment_canada;
pub mod openweather;

pub use environment_canada::EnvironmentCanadaClient;
pub use openweather::OneCallClient;

/// Primary source: the raw station document for a location.
#[async_trait]
pub trait StationSource: Send + Sync + Debug {
    async fn fetch_document(&self, location: &Location) -> Result<String, RefreshError>;
}

/// Secondary source: the next hour of minute precipitation.
#[async_trait]
pub trait MinutelySource: Send + Sync + Debug {
    async fn fetch_minutely(
        &self,
        latitude: f64,
        longitude: f64,
        api_key: &str,
    ) -> Result<MinutePrecipitationSeries, PrecipKind>;
}
