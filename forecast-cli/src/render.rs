use std::fmt;

use chrono::Local;
use forecast_core::{
    Location, PrecipKind, PrecipitationOutcome, PrecipitationState, PrecipitationSummary,
    Presenter, Reading, RefreshError, Snapshot,
};

/// Prints each refresh to the terminal.
#[derive(Debug, Default)]
pub struct TerminalPresenter;

impl Presenter for TerminalPresenter {
    fn loading(&self, location: &Location) {
        eprintln!("Loading weather for {location}...");
    }

    fn show(&self, snapshot: &Snapshot) {
        println!("{}", SnapshotView(snapshot));
    }

    fn error(&self, location: &Location, error: &RefreshError) {
        eprintln!("Failed to load weather data for {location}. Please try again. Error: {error}");
    }
}

/// Human-readable rendering of a whole snapshot.
pub struct SnapshotView<'a>(pub &'a Snapshot);

impl fmt::Display for SnapshotView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.0;
        let bundle = &snapshot.bundle;
        let current = &bundle.current;

        writeln!(f, "{} · {}", snapshot.location, current.condition)?;
        writeln!(
            f,
            "  {}  {}°  feels like {}°",
            current.icon.symbol(),
            current.temperature,
            current.feels_like()
        )?;
        writeln!(
            f,
            "  Humidity {}%   Wind {}   Pressure {}",
            current.humidity,
            current.wind,
            with_unit(current.pressure, "kPa")
        )?;
        if let Some(station) = &current.station {
            writeln!(f, "  Observed at {station}")?;
        }

        if !bundle.alerts.is_empty() {
            writeln!(f)?;
            for alert in &bundle.alerts {
                writeln!(f, "  ⚠️ {}: {}", alert.kind, alert.description)?;
            }
        }

        if !bundle.hourly.is_empty() {
            writeln!(f, "\nHourly")?;
            for hour in &bundle.hourly {
                writeln!(
                    f,
                    "  {:>5}  {}  {:>4}°  feels {:>4}°  {:>3}%",
                    hour.local_hour_label(),
                    hour.icon.symbol(),
                    hour.temperature.to_string(),
                    hour.feels_like().to_string(),
                    hour.pop
                )?;
            }
        }

        if !bundle.daily.is_empty() {
            writeln!(f, "\nDaily")?;
            for day in &bundle.daily {
                writeln!(
                    f,
                    "  {:<14} {}  {:>4}° / {:>4}°  {:>3}%",
                    day.period,
                    day.icon.symbol(),
                    day.high.to_string(),
                    day.low.to_string(),
                    day.pop
                )?;
            }
        }

        writeln!(f, "\nNext hour")?;
        write_precipitation(f, &snapshot.precipitation)?;

        write!(
            f,
            "\nLast updated: {}",
            snapshot.fetched_at.with_timezone(&Local).format("%-I:%M:%S %p")
        )
    }
}

fn write_precipitation(f: &mut fmt::Formatter<'_>, outcome: &PrecipitationOutcome) -> fmt::Result {
    match outcome {
        PrecipitationOutcome::NotRequested
        | PrecipitationOutcome::Degraded(PrecipKind::MissingCredential) => writeln!(
            f,
            "  🔑 Add a free OpenWeatherMap API key to see minute-by-minute precipitation.\n  \
             Get one at https://home.openweathermap.org/api_keys, then run `forecast configure`."
        ),
        PrecipitationOutcome::Degraded(PrecipKind::InvalidCredential) => writeln!(
            f,
            "  🔑 {} Run `forecast configure` to replace it.",
            PrecipKind::InvalidCredential
        ),
        PrecipitationOutcome::Degraded(kind) => writeln!(f, "  {kind}"),
        PrecipitationOutcome::Ready(summary) => write_summary(f, summary),
    }
}

fn write_summary(f: &mut fmt::Formatter<'_>, summary: &PrecipitationSummary) -> fmt::Result {
    if summary.series.is_empty() {
        return writeln!(f, "  No precipitation expected in the next hour");
    }

    match summary.state {
        PrecipitationState::NoneExpected => writeln!(f, "  No precipitation expected")?,
        state => writeln!(f, "  🌧️ Precipitation {state}")?,
    }
    let profile = summary.intensity_profile();
    writeln!(f, "  {}", sparkline(&profile))?;
    writeln!(f, "  {}", timeline(profile.len()))?;
    writeln!(f, "  Peak {:.2} mm/h", summary.peak)
}

fn with_unit(reading: Reading, unit: &str) -> String {
    match reading {
        Reading::Unknown => reading.to_string(),
        Reading::Value(_) => format!("{reading} {unit}"),
    }
}

/// One block character per value in 0.0..=1.0; zero renders blank.
fn sparkline(profile: &[f64]) -> String {
    const BARS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
    profile
        .iter()
        .map(|v| BARS[(v.clamp(0.0, 1.0) * 8.0).round() as usize])
        .collect()
}

/// Minute markers lined up under a sparkline of `width` columns. The last
/// marker ends on the final column; markers that would collide are dropped.
fn timeline(width: usize) -> String {
    let mut line = vec![' '; width];
    let last = width.to_string() + "m";
    let markers = [
        (0, "Now".to_string()),
        (15, "15m".to_string()),
        (30, "30m".to_string()),
        (45, "45m".to_string()),
        (width.saturating_sub(last.len()), last),
    ];

    for (start, label) in markers {
        let end = start + label.chars().count();
        let clear = end <= width
            && line[start.saturating_sub(1)..end].iter().all(|c| *c == ' ');
        if clear {
            for (slot, ch) in line[start..end].iter_mut().zip(label.chars()) {
                *slot = ch;
            }
        }
    }

    line.into_iter().collect::<String>().trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use forecast_core::{MinutePrecipitationSeries, parse_station_document};

    fn snapshot(precipitation: PrecipitationOutcome) -> Snapshot {
        let doc = r#"<siteData>
            <warnings><event type="warning" description="HEAT WARNING IN EFFECT"/></warnings>
            <currentConditions>
                <condition>Sunny</condition><iconCode>00</iconCode>
                <temperature>31</temperature><humidex>38</humidex>
                <relativeHumidity>60</relativeHumidity>
            </currentConditions>
            <forecastGroup>
                <forecast><period>Monday</period><temperatures><temperature>32</temperature></temperatures></forecast>
                <forecast><period>Monday night</period><temperatures><temperature>21</temperature></temperatures></forecast>
            </forecastGroup>
        </siteData>"#;

        Snapshot {
            location: Location::default_location(),
            bundle: parse_station_document(doc).expect("well-formed"),
            precipitation,
            fetched_at: Utc::now(),
        }
    }

    fn summary(amounts: &[f64]) -> PrecipitationOutcome {
        PrecipitationOutcome::Ready(PrecipitationSummary::from_series(
            MinutePrecipitationSeries::from_amounts(amounts.iter().copied().map(Some)),
        ))
    }

    #[test]
    fn renders_core_sections_with_sentinels() {
        let text = SnapshotView(&snapshot(PrecipitationOutcome::NotRequested)).to_string();

        assert!(text.starts_with("Toronto · Sunny"));
        assert!(text.contains("31°  feels like 38°"));
        assert!(text.contains("Humidity 60%"));
        assert!(text.contains("Wind --"));
        assert!(text.contains("Pressure --"));
        assert!(text.contains("⚠️ warning: HEAT WARNING IN EFFECT"));
        assert!(text.contains("Monday"));
        assert!(text.contains("32° /   21°"));
        assert!(!text.contains("Hourly"));
        assert!(text.contains("API key"));
    }

    #[test]
    fn renders_precipitation_summary() {
        let text = SnapshotView(&snapshot(summary(&[0.0, 0.0, 2.0, 4.0]))).to_string();

        assert!(text.contains("Precipitation starting in 2 minutes"));
        assert!(text.contains("  ▄█"));
        assert!(text.contains("Peak 4.00 mm/h"));
    }

    #[test]
    fn renders_degraded_states() {
        let invalid = SnapshotView(&snapshot(PrecipitationOutcome::Degraded(
            PrecipKind::InvalidCredential,
        )))
        .to_string();
        assert!(invalid.contains("Invalid API key"));

        let down = SnapshotView(&snapshot(PrecipitationOutcome::Degraded(
            PrecipKind::Unavailable("status 503".into()),
        )))
        .to_string();
        assert!(down.contains("Precipitation data unavailable: status 503"));

        let empty = SnapshotView(&snapshot(summary(&[]))).to_string();
        assert!(empty.contains("No precipitation expected in the next hour"));
    }

    #[test]
    fn timeline_markers_sit_under_their_minutes() {
        let line = timeline(60);

        assert_eq!(line.chars().count(), 60);
        assert_eq!(line.find("15m"), Some(15));
        assert_eq!(line.find("30m"), Some(30));
        assert_eq!(line.find("45m"), Some(45));
        assert!(line.starts_with("Now"));
        assert!(line.ends_with("60m"));
    }

    #[test]
    fn short_timeline_drops_colliding_markers() {
        assert_eq!(timeline(4), "Now");
        assert_eq!(timeline(20), format!("Now{}15m", " ".repeat(12)));
        assert_eq!(timeline(0), "");
    }

    #[test]
    fn sparkline_scales_to_eight_levels() {
        assert_eq!(sparkline(&[0.0, 0.5, 1.0]), " ▄█");
        assert_eq!(sparkline(&[]), "");
    }
}
