use std::{sync::Arc, time::Duration};

use tokio::{
    sync::mpsc,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, info};

use crate::{
    config::Credential, error::RefreshError, location::Location, model::Snapshot,
    orchestrator::Orchestrator,
};

/// Receives the outcome of every refresh cycle.
pub trait Presenter: Send + Sync {
    fn loading(&self, location: &Location);
    fn show(&self, snapshot: &Snapshot);
    fn error(&self, location: &Location, error: &RefreshError);
}

/// Something other than the timer asking for a refresh.
#[derive(Debug, Clone)]
pub enum Trigger {
    LocationChanged(Location),
    /// A new key was saved; it is used from this cycle on.
    CredentialSaved(Credential),
    Retry,
}

/// Drives the orchestrator on a fixed interval plus explicit triggers.
#[derive(Debug)]
pub struct Scheduler {
    orchestrator: Arc<Orchestrator>,
    location: Location,
    credential: Credential,
    period: Duration,
    triggers: mpsc::Receiver<Trigger>,
}

impl Scheduler {
    /// The returned sender is how callers change location, save a key or
    /// retry. The scheduler stops once every sender is dropped.
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        location: Location,
        credential: Credential,
        period: Duration,
    ) -> (Self, mpsc::Sender<Trigger>) {
        let (tx, triggers) = mpsc::channel(16);
        let scheduler = Self {
            orchestrator,
            location,
            credential,
            period,
            triggers,
        };
        (scheduler, tx)
    }

    /// Refresh immediately, then on every tick and every trigger.
    ///
    /// Ticks keep their fixed spacing no matter how long a cycle takes or
    /// whether it failed; ticks missed while a cycle ran are skipped.
    pub async fn run<P>(mut self, presenter: &P)
    where
        P: Presenter + ?Sized,
    {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(location = %self.location, every = ?self.period, "Starting refresh loop");

        loop {
            tokio::select! {
                biased;
                _ = ticker.tick() => debug!("Scheduled refresh"),
                trigger = self.triggers.recv() => match trigger {
                    Some(trigger) => self.apply(trigger),
                    None => break,
                },
            }

            self.cycle(presenter).await;
        }

        info!("Refresh loop stopped");
    }

    fn apply(&mut self, trigger: Trigger) {
        debug!(?trigger, "Refresh triggered");
        match trigger {
            Trigger::LocationChanged(location) => self.location = location,
            Trigger::CredentialSaved(credential) => self.credential = credential,
            Trigger::Retry => {}
        }
    }

    async fn cycle<P>(&self, presenter: &P)
    where
        P: Presenter + ?Sized,
    {
        presenter.loading(&self.location);
        match self.orchestrator.refresh(&self.location, &self.credential).await {
            Ok(snapshot) => presenter.show(&snapshot),
            Err(e) => presenter.error(&self.location, &e),
        }
    }
}
