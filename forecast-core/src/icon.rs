use serde::{Deserialize, Serialize};

/// Generic weather category that presenters draw from.
///
/// Environment Canada publishes a numbered icon per condition; this collapses
/// them into the handful of pictures a dashboard actually shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IconCategory {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Drizzle,
    Rain,
    Thunderstorm,
    Snow,
    FogHazy,
    NightClear,
    NightCloudy,
}

impl IconCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly cloudy",
            Self::Cloudy => "Cloudy",
            Self::Drizzle => "Showers",
            Self::Rain => "Rain",
            Self::Thunderstorm => "Thunderstorm",
            Self::Snow => "Snow",
            Self::FogHazy => "Fog",
            Self::NightClear => "Clear night",
            Self::NightCloudy => "Cloudy night",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Clear => "☀️",
            Self::PartlyCloudy => "🌤️",
            Self::Cloudy => "☁️",
            Self::Drizzle => "🌦️",
            Self::Rain => "🌧️",
            Self::Thunderstorm => "⛈️",
            Self::Snow => "🌨️",
            Self::FogHazy => "🌫️",
            Self::NightClear => "🌙",
            Self::NightCloudy => "☁️",
        }
    }
}

/// Map a provider icon code (e.g. `"02"`) to its category.
///
/// Codes outside the published table, empty strings and garbage all land on
/// [`IconCategory::Clear`].
pub fn normalize_icon(code: &str) -> IconCategory {
    let Ok(n) = code.trim().parse::<u8>() else {
        return IconCategory::default();
    };

    match n {
        0 | 1 | 32 => IconCategory::Clear,
        2 | 3 | 4 | 30 | 31 | 36 => IconCategory::PartlyCloudy,
        5 | 35 => IconCategory::Cloudy,
        6 | 7 | 14 | 20 | 45 => IconCategory::Drizzle,
        8 | 10 | 11 | 12 | 13 | 21 | 27 | 38 | 44 => IconCategory::Rain,
        9 | 15 | 19 | 29 | 37 | 39 | 46 => IconCategory::Thunderstorm,
        16 | 17 | 18 | 22 | 25 | 26 | 28 | 40 | 41 | 42 | 43 | 47 | 48 => IconCategory::Snow,
        23 | 24 => IconCategory::FogHazy,
        33 => IconCategory::NightClear,
        34 => IconCategory::NightCloudy,
        _ => IconCategory::default(),
    }
}
