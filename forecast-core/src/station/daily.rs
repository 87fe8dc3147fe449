use crate::{
    icon::IconCategory,
    model::{DailySlot, Reading},
};

/// One `<forecast>` entry of the station's forecast group, before merging.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPeriod {
    pub label: String,
    pub temperature: Reading,
    pub pop: u8,
    pub icon: IconCategory,
}

impl RawPeriod {
    pub fn is_night(&self) -> bool {
        self.label.to_lowercase().contains("night")
    }
}

/// Fold alternating day/night periods into one slot per day.
///
/// A day period opens a slot with its temperature as the high. A night period
/// sets the low of the slot opened just before it. Nights with nothing open
/// are dropped. Upstream order is trusted: periods are paired by adjacency,
/// never by date, so two days in a row leave the first without a low.
pub fn merge_periods<I>(periods: I) -> Vec<DailySlot>
where
    I: IntoIterator<Item = RawPeriod>,
{
    let mut days: Vec<DailySlot> = Vec::new();

    for period in periods {
        if !period.is_night() {
            days.push(DailySlot {
                period: period.label,
                high: period.temperature,
                low: Reading::Unknown,
                pop: period.pop,
                icon: period.icon,
            });
        } else if let Some(open) = days.last_mut() {
            if period.temperature.is_known() {
                open.low = period.temperature;
            }
        }
    }

    days
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period(label: &str, temp: Option<f64>) -> RawPeriod {
        RawPeriod {
            label: label.to_string(),
            temperature: temp.map_or(Reading::Unknown, Reading::Value),
            pop: 0,
            icon: IconCategory::Clear,
        }
    }

    fn highs_lows(days: &[DailySlot]) -> Vec<(Reading, Reading)> {
        days.iter().map(|d| (d.high, d.low)).collect()
    }

    #[test]
    fn alternating_periods_pair_up() {
        let days = merge_periods([
            period("Monday", Some(10.0)),
            period("Monday night", Some(2.0)),
            period("Tuesday", Some(12.0)),
            period("Tuesday night", Some(4.0)),
        ]);

        assert_eq!(
            highs_lows(&days),
            vec![
                (Reading::Value(10.0), Reading::Value(2.0)),
                (Reading::Value(12.0), Reading::Value(4.0)),
            ]
        );
        assert_eq!(days[0].period, "Monday");
        assert_eq!(days[1].period, "Tuesday");
    }

    #[test]
    fn leading_night_is_dropped() {
        let days = merge_periods([period("Tonight", Some(2.0)), period("Wednesday", Some(10.0))]);

        assert_eq!(highs_lows(&days), vec![(Reading::Value(10.0), Reading::Unknown)]);
    }

    #[test]
    fn night_without_temperature_keeps_low_unknown() {
        let days = merge_periods([period("Friday", Some(7.0)), period("Friday night", None)]);

        assert_eq!(highs_lows(&days), vec![(Reading::Value(7.0), Reading::Unknown)]);
    }

    #[test]
    fn night_match_is_case_insensitive() {
        let days = merge_periods([period("Saturday", Some(5.0)), period("Saturday NIGHT", Some(-1.0))]);

        assert_eq!(days.len(), 1);
        assert_eq!(days[0].low, Reading::Value(-1.0));
    }

    // Known limitation: pairing is positional, so consecutive days are not
    // reconciled by date and the first one never gets a low.
    #[test]
    fn consecutive_days_are_not_reconciled() {
        let days = merge_periods([
            period("Sunday", Some(9.0)),
            period("Monday", Some(11.0)),
            period("Monday night", Some(3.0)),
        ]);

        assert_eq!(
            highs_lows(&days),
            vec![
                (Reading::Value(9.0), Reading::Unknown),
                (Reading::Value(11.0), Reading::Value(3.0)),
            ]
        );
    }
}
