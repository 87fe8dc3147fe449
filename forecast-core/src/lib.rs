//! Core library for the `forecast` dashboard.
//!
//! This crate defines:
//! - Configuration & credential storage
//! - Clients for the station XML feed and the minute precipitation API
//! - Parsing of station documents into one forecast model
//! - The refresh orchestrator and its scheduler
//!
//! It is used by `forecast-cli`, but a different presenter can drive it just as well.

pub mod config;
pub mod error;
pub mod icon;
pub mod location;
pub mod model;
pub mod orchestrator;
pub mod precipitation;
pub mod provider;
pub mod scheduler;
pub mod station;

pub use config::{Config, Credential, CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use error::{ParseError, PrecipKind, RefreshError};
pub use icon::{IconCategory, normalize_icon};
pub use location::Location;
pub use model::{
    Alert, CurrentConditions, DailySlot, ForecastBundle, HourlySlot, MinutePrecipitationSeries,
    MinuteSample, Reading, Snapshot,
};
pub use orchestrator::{Orchestrator, RefreshState};
pub use precipitation::{
    PrecipitationOutcome, PrecipitationState, PrecipitationSummary, fetch_precipitation,
};
pub use provider::{EnvironmentCanadaClient, MinutelySource, OneCallClient, StationSource};
pub use scheduler::{Presenter, Scheduler, Trigger};
pub use station::{decode_document, parse_station_document};
