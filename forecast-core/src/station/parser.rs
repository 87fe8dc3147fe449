use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use tracing::debug;

use crate::{
    error::ParseError,
    icon::{IconCategory, normalize_icon},
    model::{
        Alert, CurrentConditions, DailySlot, ForecastBundle, HourlySlot, MAX_DAILY_SLOTS,
        MAX_HOURLY_SLOTS, NOT_AVAILABLE, Reading, UNKNOWN_TEXT,
    },
};

use super::{
    daily::{RawPeriod, merge_periods},
    xml::Element,
};

/// Icon code assumed when a block carries none.
const DEFAULT_ICON_CODE: &str = "00";

/// Alert type the feed uses for warnings that are no longer in effect.
const ENDED_ALERT: &str = "ended";

/// Parse an Environment Canada city-page document.
///
/// Only a document that is not well-formed XML is an error. Every missing
/// block or field falls back to its sentinel (`--`, `N/A`, icon `00`, 0 %).
pub fn parse_station_document(doc: &str) -> Result<ForecastBundle, ParseError> {
    let root = Element::parse(doc)?;

    let bundle = ForecastBundle {
        current: root
            .find("currentConditions")
            .map(parse_current)
            .unwrap_or_default(),
        hourly: root
            .find_all("hourlyForecast")
            .take(MAX_HOURLY_SLOTS)
            .map(parse_hourly)
            .collect(),
        daily: root.find("forecastGroup").map(parse_daily).unwrap_or_default(),
        alerts: parse_alerts(&root),
    };

    debug!(
        hourly = bundle.hourly.len(),
        daily = bundle.daily.len(),
        alerts = bundle.alerts.len(),
        "Parsed station document"
    );

    Ok(bundle)
}

fn parse_current(block: &Element) -> CurrentConditions {
    CurrentConditions {
        station: block.text_at(&["station"]).map(str::to_string),
        temperature: Reading::parse(block.text_at(&["temperature"])),
        condition: text_or(block.text_at(&["condition"]), NOT_AVAILABLE),
        icon: icon_of(block, &["iconCode"]),
        pressure: Reading::parse(block.text_at(&["pressure"])),
        humidity: Reading::parse_percent(block.text_at(&["relativeHumidity"])),
        wind: describe_wind(block),
        wind_chill: optional_reading(block, "windChill"),
        humidex: optional_reading(block, "humidex"),
    }
}

fn parse_hourly(entry: &Element) -> HourlySlot {
    HourlySlot {
        time: entry.attr("dateTimeUTC").and_then(parse_utc_hour),
        temperature: Reading::parse(entry.text_at(&["temperature"])),
        condition: text_or(entry.text_at(&["condition"]), NOT_AVAILABLE),
        icon: icon_of(entry, &["iconCode"]),
        pop: parse_pop(entry.text_at(&["lop"])),
        wind_chill: optional_reading(entry, "windChill"),
        humidex: optional_reading(entry, "humidex"),
    }
}

fn parse_daily(group: &Element) -> Vec<DailySlot> {
    let periods = group.find_all("forecast").map(|forecast| RawPeriod {
        label: period_label(forecast),
        temperature: Reading::parse(forecast.text_at(&["temperatures", "temperature"])),
        pop: parse_pop(forecast.text_at(&["abbreviatedForecast", "pop"])),
        icon: icon_of(forecast, &["abbreviatedForecast", "iconCode"]),
    });

    let mut days = merge_periods(periods);
    days.truncate(MAX_DAILY_SLOTS);
    days
}

fn parse_alerts(root: &Element) -> Vec<Alert> {
    root.find_all("warnings")
        .flat_map(|warnings| warnings.find_all("event"))
        .filter_map(|event| {
            let kind = event.attr("type").filter(|s| !s.is_empty())?;
            let description = event.attr("description").filter(|s| !s.is_empty())?;
            (kind != ENDED_ALERT).then(|| Alert {
                kind: kind.to_string(),
                description: description.trim().to_string(),
            })
        })
        .collect()
}

fn period_label(forecast: &Element) -> String {
    let period = forecast.find("period");
    period
        .and_then(Element::text)
        .or_else(|| period.and_then(|p| p.attr("textForecastName")))
        .unwrap_or_default()
        .to_string()
}

/// `"NW 20 km/h gust 35"`, or `--` when no speed is reported.
fn describe_wind(block: &Element) -> String {
    let Some(speed) = block.find_path(&["wind", "speed"]) else {
        return UNKNOWN_TEXT.to_string();
    };
    let Some(speed_text) = speed.text() else {
        return UNKNOWN_TEXT.to_string();
    };

    let mut parts = Vec::new();
    if let Some(direction) = block.text_at(&["wind", "direction"]) {
        parts.push(direction.to_string());
    }
    match speed.attr("units") {
        Some(units) if speed_text.parse::<f64>().is_ok() => {
            parts.push(format!("{speed_text} {units}"));
        }
        _ => parts.push(speed_text.to_string()),
    }
    if let Some(gust) = block.text_at(&["wind", "gust"]) {
        parts.push(format!("gust {gust}"));
    }

    parts.join(" ")
}

fn icon_of(block: &Element, path: &[&str]) -> IconCategory {
    normalize_icon(block.text_at(path).unwrap_or(DEFAULT_ICON_CODE))
}

/// Present-but-empty elements (`<humidex/>`) count as absent.
fn optional_reading(block: &Element, name: &str) -> Option<Reading> {
    block.text_at(&[name]).map(|text| Reading::parse(Some(text)))
}

fn text_or(text: Option<&str>, default: &str) -> String {
    text.unwrap_or(default).to_string()
}

fn parse_pop(text: Option<&str>) -> u8 {
    text.and_then(|t| t.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .map_or(0, |v| v.round().clamp(0.0, 100.0) as u8)
}

/// Accepts the feed's `YYYYMMDDHHMM` form as well as RFC 3339.
fn parse_utc_hour(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    let parsed = NaiveDateTime::parse_from_str(text, "%Y%m%d%H%M")
        .map(|naive| naive.and_utc())
        .or_else(|_| DateTime::parse_from_rfc3339(text).map(|dt| dt.with_timezone(&Utc)))
        .ok()?;

    parsed.with_minute(0)?.with_second(0)?.with_nanosecond(0)
}
