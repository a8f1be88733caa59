use chrono::{DateTime, Local, TimeZone};
use saweather_core::{
    FallbackReason, LookupReport, ResolutionOutcome, SnapshotOrigin, WeatherRecord,
    WeatherSnapshot,
};

/// "Sun, Oct 18, 2026 at 3:04 PM"
pub fn format_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%a, %b %-d, %Y at %-I:%M %p").to_string()
}

/// Advisory messages for the fallback paths a lookup went through.
pub fn notices(report: &LookupReport) -> Vec<String> {
    let mut out = Vec::new();

    if let Some(ResolutionOutcome::Place { query, reason }) = &report.resolution {
        out.push(match reason {
            FallbackReason::Timeout => format!("Location timeout, using {query}"),
            FallbackReason::PermissionDenied => {
                format!("Location permission denied. Using {query}")
            }
            FallbackReason::Unavailable => format!("Location unavailable, using {query}"),
        });
    }

    match report.fetched.origin {
        SnapshotOrigin::Live => {}
        SnapshotOrigin::FallbackCity => {
            out.push("Unable to get weather for your location".to_string())
        }
        SnapshotOrigin::Default => out.push(format!(
            "Failed to fetch weather, showing default data for {}",
            report.fetched.snapshot.city_name
        )),
    }

    out
}

pub fn snapshot(s: &WeatherSnapshot, at: &DateTime<Local>) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", s.city_name));
    out.push_str(&format!("{}\n\n", format_timestamp(at)));
    out.push_str(&format!("  {}°C  {}\n", s.display_temperature(), s.condition_description));
    out.push_str(&format!("  Humidity: {}%\n", s.humidity_percent));
    out.push_str(&format!("  Wind:     {} km/h\n", s.display_wind_speed()));
    if s.pressure > 0.0 {
        out.push_str(&format!("  Pressure: {} hPa\n", s.pressure));
    }
    out.push_str(&format!("  Theme:    {}\n", s.backdrop().as_str()));
    out
}

pub fn history_line(r: &WeatherRecord) -> String {
    let local = r.recorded_at.with_timezone(&Local);
    format!(
        "{}  {:<20} {:>4}°C  {}",
        format_timestamp(&local),
        r.snapshot.city_name,
        r.snapshot.display_temperature(),
        r.snapshot.condition_main,
    )
}
