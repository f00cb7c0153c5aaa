// Display formatting for workout values
use crate::model::MetricValue;
use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;

/// Placeholder shown for anything that was not recorded.
pub const MISSING: &str = "-";

static TEMPERATURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+(\.\d+)?)\s*(degF|degC)$").expect("valid temperature regex"));

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Format a duration given in minutes as `HH:MM:SS`.
///
/// The value is rounded to whole seconds before splitting. Hours are not
/// wrapped at 24.
pub fn format_duration(minutes: f64) -> String {
    let total_seconds = if minutes.is_finite() && minutes > 0.0 {
        (minutes * 60.0).round() as u64
    } else {
        0
    };
    let hours = total_seconds / 3600;
    let mins = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;
    format!("{hours:02}:{mins:02}:{secs:02}")
}

/// Split an export timestamp such as `2024-01-03 07:15:00 -0500` into the
/// wall-clock part and its UTC offset.
fn split_offset(raw: &str) -> (&str, Option<FixedOffset>) {
    let raw = raw.trim();
    if raw.len() > 6 && raw.is_char_boundary(raw.len() - 6) {
        let (head, suffix) = raw.split_at(raw.len() - 6);
        if suffix.starts_with(' ') {
            if let Ok(dt) = DateTime::parse_from_str(&format!("2000-01-01 00:00:00{suffix}"), "%Y-%m-%d %H:%M:%S %z") {
                return (head.trim_end(), Some(*dt.offset()));
            }
            return (head.trim_end(), None);
        }
    }
    (raw, None)
}

fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
}

/// Parse an export timestamp into an absolute instant.
///
/// With a valid offset suffix the instant is exact. Without one the
/// wall-clock time is read in `zone`, or as UTC if no zone is available.
pub fn parse_timestamp(raw: &str, zone: Option<Tz>) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw.trim()) {
        return Some(dt.with_timezone(&Utc));
    }
    let (wall, offset) = split_offset(raw);
    let naive = parse_naive(wall)?;
    match (offset, zone) {
        (Some(off), _) => off
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.with_timezone(&Utc)),
        (None, Some(tz)) => tz
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc)),
        (None, None) => Some(Utc.from_utc_datetime(&naive)),
    }
}

/// Render `raw` in `time_zone` using `pattern`. Unknown zone names fall back
/// to the offset embedded in the timestamp.
fn render_in_zone(raw: &str, time_zone: &str, pattern: &str) -> Option<String> {
    let zone = time_zone.trim().parse::<Tz>().ok();
    let instant = parse_timestamp(raw, zone)?;
    let rendered = match zone {
        Some(tz) => instant.with_timezone(&tz).format(pattern).to_string(),
        None => {
            let offset = split_offset(raw).1.unwrap_or_else(|| Utc.fix());
            instant.with_timezone(&offset).format(pattern).to_string()
        }
    };
    Some(rendered)
}

/// Format a workout timestamp as `M/D/YYYY, H:MM:SS AM/PM` in the workout's
/// time zone.
pub fn format_date(raw: &str, time_zone: &str) -> String {
    render_in_zone(raw, time_zone, "%-m/%-d/%Y, %-I:%M:%S %p").unwrap_or_else(|| {
        log::warn!("Unparseable workout timestamp: {raw:?}");
        MISSING.to_string()
    })
}

/// Format the start and end of a workout as `H:MM AM/PM - H:MM AM/PM`.
pub fn format_date_range(start: &str, end: &str, time_zone: &str) -> String {
    let fmt = |raw: &str| {
        render_in_zone(raw, time_zone, "%-I:%M %p").unwrap_or_else(|| MISSING.to_string())
    };
    format!("{} - {}", fmt(start), fmt(end))
}

/// Numbers are shown with two decimals; text passes through.
pub fn format_distance(value: &MetricValue) -> String {
    match value {
        MetricValue::Known(v) => format!("{v:.2}"),
        MetricValue::Text(s) => s.clone(),
        MetricValue::Unknown => MISSING.to_string(),
    }
}

/// Round to a whole number and attach `unit`. A unit is never attached to
/// the placeholder.
pub fn format_heart_rate(value: &MetricValue, unit: &str) -> String {
    match value {
        MetricValue::Known(v) if unit.is_empty() => format!("{}", v.round()),
        MetricValue::Known(v) => format!("{} {unit}", v.round()),
        MetricValue::Text(s) => s.clone(),
        MetricValue::Unknown => MISSING.to_string(),
    }
}

pub fn format_temperature(value: &MetricValue) -> String {
    match value {
        MetricValue::Unknown => MISSING.to_string(),
        MetricValue::Known(v) => format!("{} °F", v.round()),
        MetricValue::Text(s) => match TEMPERATURE.captures(s) {
            Some(caps) => {
                let degrees: f64 = caps[1].parse().unwrap_or_default();
                let symbol = if &caps[3] == "degF" { "°F" } else { "°C" };
                format!("{} {symbol}", degrees.round())
            }
            None => s.clone(),
        },
    }
}

pub fn format_humidity(value: &MetricValue) -> String {
    match value {
        MetricValue::Known(v) => format!("{}%", v.round()),
        MetricValue::Text(s) => s.clone(),
        MetricValue::Unknown => MISSING.to_string(),
    }
}

/// Generic card value: at most two decimals with trailing zeros removed.
pub fn format_value(value: &MetricValue) -> String {
    match value {
        MetricValue::Known(v) => {
            let s = format!("{v:.2}");
            s.trim_end_matches('0').trim_end_matches('.').to_string()
        }
        MetricValue::Text(s) => s.clone(),
        MetricValue::Unknown => MISSING.to_string(),
    }
}

pub fn format_energy(value: &MetricValue) -> String {
    format_distance(value)
}

/// Join a formatted value with its unit unless the value is the placeholder.
pub fn with_unit(value: String, unit: &str) -> String {
    if value == MISSING || unit.is_empty() {
        value
    } else {
        format!("{value} {unit}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_examples() {
        assert_eq!(format_duration(0.0), "00:00:00");
        assert_eq!(format_duration(1.5), "00:01:30");
        assert_eq!(format_duration(61.0), "01:01:00");
        assert_eq!(format_duration(1500.0), "25:00:00");
        assert_eq!(format_duration(0.9999), "00:01:00");
        assert_eq!(format_duration(f64::NAN), "00:00:00");
    }

    #[test]
    fn distance_examples() {
        assert_eq!(format_distance(&5.0.into()), "5.00");
        assert_eq!(format_distance(&"".into()), "-");
        assert_eq!(format_distance(&"3.1 mi".into()), "3.1 mi");
        assert_eq!(format_distance(&3.14159.into()), "3.14");
    }

    #[test]
    fn temperature_examples() {
        assert_eq!(format_temperature(&"72.3 degF".into()), "72 °F");
        assert_eq!(format_temperature(&"21degC".into()), "21 °C");
        assert_eq!(format_temperature(&"".into()), "-");
        assert_eq!(format_temperature(&68.0.into()), "68 °F");
        assert_eq!(format_temperature(&"warm".into()), "warm");
    }

    #[test]
    fn heart_rate_examples() {
        assert_eq!(format_heart_rate(&"".into(), "BPM"), "-");
        assert_eq!(format_heart_rate(&142.6.into(), "BPM"), "143 BPM");
        assert_eq!(format_heart_rate(&98.2.into(), ""), "98");
    }

    #[test]
    fn humidity_examples() {
        assert_eq!(format_humidity(&MetricValue::Unknown), "-");
        assert_eq!(format_humidity(&64.5.into()), "65%");
    }

    #[test]
    fn value_trims_trailing_zeros() {
        assert_eq!(format_value(&9.1.into()), "9.1");
        assert_eq!(format_value(&12.0.into()), "12");
        assert_eq!(format_value(&MetricValue::Unknown), "-");
        assert_eq!(with_unit(format_value(&MetricValue::Unknown), "m"), "-");
        assert_eq!(with_unit(format_value(&25.0.into()), "m"), "25 m");
    }

    #[test]
    fn date_uses_workout_zone_not_offset_text() {
        let raw = "2024-01-03 07:15:30 -0500";
        assert_eq!(format_date(raw, "America/New_York"), "1/3/2024, 7:15:30 AM");
        assert_eq!(format_date(raw, "Europe/London"), "1/3/2024, 12:15:30 PM");
    }

    #[test]
    fn date_with_unknown_zone_keeps_embedded_offset() {
        assert_eq!(
            format_date("2024-07-04 18:05:00 -0700", "Not/AZone"),
            "7/4/2024, 6:05:00 PM"
        );
        assert_eq!(format_date("garbage", "UTC"), "-");
    }

    #[test]
    fn date_range_examples() {
        assert_eq!(
            format_date_range(
                "2024-01-03 07:15:00 -0500",
                "2024-01-03 08:02:59 -0500",
                "America/New_York"
            ),
            "7:15 AM - 8:02 AM"
        );
        assert_eq!(
            format_date_range("2024-01-03 13:00:00", "", "America/Chicago"),
            "1:00 PM - -"
        );
    }
}
