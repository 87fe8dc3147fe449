use std::{io::BufRead, sync::Arc, time::Duration};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use forecast_core::{
    Config, Credential, CredentialStore, FileCredentialStore, Location, Orchestrator, Scheduler,
    Trigger,
};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::render::{SnapshotView, TerminalPresenter};

/// Environment variable that overrides the saved API key for one session.
const API_KEY_ENV: &str = "OWM_API_KEY";

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "forecast", version, about = "Weather dashboard for the terminal")]
pub struct Cli {
    /// OpenWeatherMap API key for this run only.
    #[arg(long, global = true, env = API_KEY_ENV, hide_env_values = true)]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the supported locations.
    Locations,

    /// Save an OpenWeatherMap API key, or the default location.
    Configure {
        /// Key to save; prompted for when neither flag is given.
        #[arg(long)]
        key: Option<String>,

        /// Location to show when none is given.
        #[arg(long)]
        location: Option<String>,
    },

    /// Fetch the forecast once and print it.
    Show {
        /// Location name, e.g. "Richmond Hill".
        location: Option<String>,
    },

    /// Keep the forecast on screen, refreshing periodically until Ctrl-C.
    ///
    /// While running, type `l <location>`, `k <api key>` or `r` and Enter.
    Watch {
        location: Option<String>,

        /// Minutes between refreshes; defaults to the configured interval.
        #[arg(long)]
        every: Option<u64>,
    },
}

/// Everything a refresh needs, resolved from config, flags and environment.
struct Session {
    config: Config,
    location: Location,
    credential: Credential,
    store: Arc<dyn CredentialStore>,
}

impl Session {
    fn open(api_key: Option<String>, location: Option<String>) -> anyhow::Result<Self> {
        let config = config_or_default(Config::load());
        let location = match location {
            Some(name) => Location::find(&name)?,
            None => config.default_location()?,
        };

        let store: Arc<dyn CredentialStore> = Arc::new(FileCredentialStore::open());
        let credential = match api_key.map(Credential::new) {
            Some(flag) if flag.is_present() => flag,
            _ => store.get(),
        };
        debug!(%location, ?credential, "Session ready");

        Ok(Self {
            config,
            location,
            credential,
            store,
        })
    }
}

/// Settings for a refresh; an unreadable config file only costs the saved
/// preferences, never the forecast.
fn config_or_default(loaded: anyhow::Result<Config>) -> Config {
    loaded.unwrap_or_else(|e| {
        warn!("Using default settings, config could not be loaded: {e:#}");
        Config::default()
    })
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Locations => {
                for loc in Location::all() {
                    println!(
                        "{:<14} {:<18} {}/{}",
                        loc.name,
                        loc.coordinate_key(),
                        loc.province,
                        loc.station_code
                    );
                }
            }
            Command::Configure { key, location } => configure(key, location)?,
            Command::Show { location } => {
                let session = Session::open(self.api_key, location)?;
                show(session).await?;
            }
            Command::Watch { location, every } => {
                let session = Session::open(self.api_key, location)?;
                watch(session, every).await?;
            }
        }

        Ok(())
    }
}

fn configure(key: Option<String>, location: Option<String>) -> anyhow::Result<()> {
    let prompt_for_key = key.is_none() && location.is_none();

    if let Some(name) = location {
        let loc = Location::find(&name)?;
        let mut cfg = Config::load()?;
        cfg.default_location = Some(loc.name.clone());
        cfg.save()?;
        println!("Default location set to {loc}.");
    }

    let key = match key {
        Some(key) => key,
        None if prompt_for_key => inquire::Password::new("OpenWeatherMap API key:")
            .without_confirmation()
            .with_help_message("Free keys at https://home.openweathermap.org/api_keys")
            .prompt()
            .context("Failed to read API key")?,
        None => return Ok(()),
    };

    let credential = Credential::new(key);
    if !credential.is_present() {
        bail!("No API key entered; nothing saved.");
    }

    FileCredentialStore::open().set(credential);
    println!("API key saved.");
    Ok(())
}

async fn show(session: Session) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::from_config(&session.config)?;

    let snapshot = orchestrator
        .refresh(&session.location, &session.credential)
        .await
        .with_context(|| {
            format!(
                "Failed to load weather data for {}. Please try again",
                session.location
            )
        })?;

    println!("{}", SnapshotView(&snapshot));
    Ok(())
}

async fn watch(session: Session, every: Option<u64>) -> anyhow::Result<()> {
    let orchestrator = Arc::new(Orchestrator::from_config(&session.config)?);
    let period = every
        .map(|minutes| Duration::from_secs(minutes.max(1) * 60))
        .unwrap_or_else(|| session.config.refresh_interval());

    let (scheduler, triggers) =
        Scheduler::new(orchestrator, session.location, session.credential, period);

    // Keeps the loop alive even after stdin closes.
    let _keepalive = triggers.clone();
    spawn_input_reader(triggers, session.store);

    let presenter = TerminalPresenter;
    tokio::select! {
        _ = scheduler.run(&presenter) => {}
        signal = tokio::signal::ctrl_c() => signal.context("Failed to listen for Ctrl-C")?,
    }

    Ok(())
}

/// A line typed while `watch` runs.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Location(String),
    Key(String),
    Retry,
}

fn parse_input(line: &str) -> Option<Input> {
    let line = line.trim();
    let (cmd, arg) = line.split_once(' ').unwrap_or((line, ""));
    let arg = arg.trim();

    match cmd {
        "l" | "location" if !arg.is_empty() => Some(Input::Location(arg.to_string())),
        "k" | "key" if !arg.is_empty() => Some(Input::Key(arg.to_string())),
        "r" | "retry" => Some(Input::Retry),
        _ => None,
    }
}

/// Reads commands from stdin on a plain thread, so a pending read never holds
/// up runtime shutdown.
fn spawn_input_reader(triggers: mpsc::Sender<Trigger>, store: Arc<dyn CredentialStore>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };

            let trigger = match parse_input(&line) {
                Some(Input::Location(name)) => match Location::find(&name) {
                    Ok(location) => Trigger::LocationChanged(location),
                    Err(e) => {
                        eprintln!("{e}");
                        continue;
                    }
                },
                Some(Input::Key(key)) => {
                    let credential = Credential::new(key);
                    store.set(credential.clone());
                    Trigger::CredentialSaved(credential)
                }
                Some(Input::Retry) => Trigger::Retry,
                None => {
                    if !line.trim().is_empty() {
                        eprintln!("Commands: l <location>, k <api key>, r");
                    }
                    continue;
                }
            };

            if triggers.blocking_send(trigger).is_err() {
                warn!("Refresh loop has stopped; ignoring input");
                break;
            }
        }
    });
}
