use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The station document is not well-formed XML.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("XML parsing error: {message}")]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Anything that stops the primary stage of a refresh.
#[derive(Debug, Clone, Error)]
pub enum RefreshError {
    #[error("Unknown location {0}")]
    UnknownLocation(String),

    #[error("Failed to reach the station feed: {0}")]
    Network(String),

    #[error("Station feed request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Why the minute precipitation section could not be filled.
///
/// None of these abort a refresh; they only degrade that section.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum PrecipKind {
    #[error("No OpenWeatherMap API key configured")]
    MissingCredential,

    #[error("Invalid API key. Please check and try again.")]
    InvalidCredential,

    #[error("Precipitation data unavailable: {0}")]
    Unavailable(String),
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
