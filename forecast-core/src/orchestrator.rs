//! Two-stage refresh: the station feed is required, minute precipitation is
//! optional and can only degrade its own section.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, watch};
use tracing::{info, instrument, warn};

use crate::{
    config::{Config, Credential},
    error::{PrecipKind, RefreshError},
    location::Location,
    model::{ForecastBundle, Snapshot},
    precipitation::{PrecipitationOutcome, fetch_precipitation},
    provider::{EnvironmentCanadaClient, MinutelySource, OneCallClient, StationSource},
    station::parse_station_document,
};

/// Where the most recent refresh is.
#[derive(Debug, Clone, Default)]
pub enum RefreshState {
    #[default]
    Idle,
    FetchingPrimary,
    FetchingSecondary,
    Done,
    Failed(RefreshError),
}

#[derive(Debug)]
pub struct Orchestrator {
    station: Arc<dyn StationSource>,
    minutely: Arc<dyn MinutelySource>,
    // held for the whole refresh so cycles never interleave
    in_flight: Mutex<()>,
    state: watch::Sender<RefreshState>,
    latest: watch::Sender<Option<Arc<Snapshot>>>,
}

impl Orchestrator {
    pub fn new(station: Arc<dyn StationSource>, minutely: Arc<dyn MinutelySource>) -> Self {
        Self {
            station,
            minutely,
            in_flight: Mutex::new(()),
            state: watch::Sender::new(RefreshState::Idle),
            latest: watch::Sender::new(None),
        }
    }

    /// Orchestrator talking to the real upstreams configured in `config`.
    pub fn from_config(config: &Config) -> Result<Self, RefreshError> {
        let station = EnvironmentCanadaClient::new(&config.station_base_url, config.timeout())?;
        let minutely = OneCallClient::new(&config.onecall_url, config.timeout())
            .map_err(|e| RefreshError::Network(e.to_string()))?;

        Ok(Self::new(Arc::new(station), Arc::new(minutely)))
    }

    pub fn state(&self) -> RefreshState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RefreshState> {
        self.state.subscribe()
    }

    /// Snapshot of the last successful refresh.
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.latest.borrow().clone()
    }

    pub fn subscribe_latest(&self) -> watch::Receiver<Option<Arc<Snapshot>>> {
        self.latest.subscribe()
    }

    /// Run one refresh cycle for `location`.
    ///
    /// Fails only when the station feed cannot be fetched or parsed. The
    /// precipitation stage runs only with a credential, and its failures end
    /// up in [`Snapshot::precipitation`]. A call made while another refresh
    /// is running waits for it to finish.
    #[instrument(skip(self, location, credential), fields(location = %location.name))]
    pub async fn refresh(
        &self,
        location: &Location,
        credential: &Credential,
    ) -> Result<Snapshot, RefreshError> {
        let _guard = self.in_flight.lock().await;

        self.state.send_replace(RefreshState::FetchingPrimary);
        let bundle = match self.fetch_primary(location).await {
            Ok(bundle) => bundle,
            Err(e) => {
                warn!("Refresh failed: {e}");
                self.state.send_replace(RefreshState::Failed(e.clone()));
                return Err(e);
            }
        };

        let precipitation = if credential.is_present() {
            self.state.send_replace(RefreshState::FetchingSecondary);
            self.fetch_secondary(location, credential).await
        } else {
            PrecipitationOutcome::NotRequested
        };

        let snapshot = Snapshot {
            location: location.clone(),
            bundle,
            precipitation,
            fetched_at: Utc::now(),
        };

        self.latest.send_replace(Some(Arc::new(snapshot.clone())));
        self.state.send_replace(RefreshState::Done);

        info!(
            hourly = snapshot.bundle.hourly.len(),
            daily = snapshot.bundle.daily.len(),
            alerts = snapshot.bundle.alerts.len(),
            "Refresh complete"
        );

        Ok(snapshot)
    }

    async fn fetch_primary(&self, location: &Location) -> Result<ForecastBundle, RefreshError> {
        let doc = self.station.fetch_document(location).await?;
        Ok(parse_station_document(&doc)?)
    }

    async fn fetch_secondary(
        &self,
        location: &Location,
        credential: &Credential,
    ) -> PrecipitationOutcome {
        let result = fetch_precipitation(
            self.minutely.as_ref(),
            location.latitude,
            location.longitude,
            credential,
        )
        .await;

        match result {
            Ok(summary) => PrecipitationOutcome::Ready(summary),
            Err(kind) => {
                match &kind {
                    PrecipKind::InvalidCredential => warn!("Precipitation API rejected the key"),
                    other => warn!("Precipitation section degraded: {other}"),
                }
                PrecipitationOutcome::Degraded(kind)
            }
        }
    }
}
