use std::fmt;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::{icon::IconCategory, location::Location, precipitation::PrecipitationOutcome};

/// Placeholder shown for condition text the station did not report.
pub const NOT_AVAILABLE: &str = "N/A";

/// Placeholder shown for a numeric or descriptive field the station did not report.
pub const UNKNOWN_TEXT: &str = "--";

pub const MAX_HOURLY_SLOTS: usize = 24;
pub const MAX_DAILY_SLOTS: usize = 7;

/// A numeric observation that may be missing upstream.
///
/// Absent, blank and non-numeric text all become [`Reading::Unknown`]; a
/// missing value is never coerced to zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Reading {
    #[default]
    Unknown,
    Value(f64),
}

impl Reading {
    pub fn parse(text: Option<&str>) -> Self {
        text.map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .map_or(Self::Unknown, Self::Value)
    }

    /// Like [`Reading::parse`], but anything outside 0..=100 is unknown.
    pub fn parse_percent(text: Option<&str>) -> Self {
        match Self::parse(text) {
            Self::Value(v) if (0.0..=100.0).contains(&v) => Self::Value(v),
            _ => Self::Unknown,
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Unknown => None,
            Self::Value(v) => Some(*v),
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// `self` if known, otherwise `other`.
    pub fn or(self, other: Reading) -> Reading {
        if self.is_known() { self } else { other }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => f.write_str(UNKNOWN_TEXT),
            Self::Value(v) if v.fract() == 0.0 => write!(f, "{v:.0}"),
            Self::Value(v) => write!(f, "{v}"),
        }
    }
}

/// Wind chill if reported, else humidex, else the plain temperature.
fn feels_like(temperature: Reading, wind_chill: Option<Reading>, humidex: Option<Reading>) -> Reading {
    wind_chill
        .unwrap_or_default()
        .or(humidex.unwrap_or_default())
        .or(temperature)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub station: Option<String>,
    pub temperature: Reading,
    pub condition: String,
    pub icon: IconCategory,
    /// kPa
    pub pressure: Reading,
    pub humidity: Reading,
    pub wind: String,
    pub wind_chill: Option<Reading>,
    pub humidex: Option<Reading>,
}

impl CurrentConditions {
    pub fn feels_like(&self) -> Reading {
        feels_like(self.temperature, self.wind_chill, self.humidex)
    }
}

impl Default for CurrentConditions {
    fn default() -> Self {
        Self {
            station: None,
            temperature: Reading::Unknown,
            condition: NOT_AVAILABLE.to_string(),
            icon: IconCategory::default(),
            pressure: Reading::Unknown,
            humidity: Reading::Unknown,
            wind: UNKNOWN_TEXT.to_string(),
            wind_chill: None,
            humidex: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlySlot {
    /// Start of the hour, if the station gave a parseable timestamp.
    pub time: Option<DateTime<Utc>>,
    pub temperature: Reading,
    pub condition: String,
    pub icon: IconCategory,
    /// Probability of precipitation, percent.
    pub pop: u8,
    pub wind_chill: Option<Reading>,
    pub humidex: Option<Reading>,
}

impl HourlySlot {
    pub fn feels_like(&self) -> Reading {
        feels_like(self.temperature, self.wind_chill, self.humidex)
    }

    /// Hour of day in the local timezone, e.g. `3 PM`.
    pub fn local_hour_label(&self) -> String {
        match self.time {
            Some(t) => t.with_timezone(&Local).format("%-I %p").to_string(),
            None => UNKNOWN_TEXT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySlot {
    pub period: String,
    pub high: Reading,
    pub low: Reading,
    pub pop: u8,
    pub icon: IconCategory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: String,
    pub description: String,
}

/// Everything the primary station feed contributes to one refresh.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ForecastBundle {
    pub current: CurrentConditions,
    pub hourly: Vec<HourlySlot>,
    pub daily: Vec<DailySlot>,
    pub alerts: Vec<Alert>,
}

/// One minute of the short-term precipitation nowcast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinuteSample {
    pub offset: u32,
    /// mm/h, never negative
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MinutePrecipitationSeries {
    pub samples: Vec<MinuteSample>,
}

impl MinutePrecipitationSeries {
    /// Build a series from raw amounts in minute order.
    ///
    /// Missing amounts count as zero; negative ones are clamped to zero.
    pub fn from_amounts<I>(amounts: I) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let samples = amounts
            .into_iter()
            .enumerate()
            .map(|(i, amount)| MinuteSample {
                offset: u32::try_from(i).unwrap_or(u32::MAX),
                amount: amount.filter(|a| a.is_finite()).unwrap_or(0.0).max(0.0),
            })
            .collect();

        Self { samples }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }
}

/// What a presenter receives after a successful refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub location: Location,
    pub bundle: ForecastBundle,
    pub precipitation: PrecipitationOutcome,
    pub fetched_at: DateTime<Utc>,
}
