use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::EmptyPlaceQuery;

/// A point on the globe, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// A free-text place name. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlaceQuery(String);

impl PlaceQuery {
    /// Trims `name` and rejects it if nothing is left.
    pub fn new(name: impl Into<String>) -> Result<Self, EmptyPlaceQuery> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(EmptyPlaceQuery);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PlaceQuery {
    type Error = EmptyPlaceQuery;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PlaceQuery> for String {
    fn from(value: PlaceQuery) -> Self {
        value.0
    }
}

impl fmt::Display for PlaceQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why the resolver gave up on the device location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FallbackReason {
    /// No location update arrived before the timeout.
    Timeout,
    /// Permission was refused or revoked.
    PermissionDenied,
    /// The location service failed for another reason.
    Unavailable,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::Timeout => "timeout",
            FallbackReason::PermissionDenied => "permission-denied",
            FallbackReason::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the resolver hands to the fetcher: a position, or a place to use instead.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionOutcome {
    Coordinate(Coordinate),
    Place {
        query: PlaceQuery,
        reason: FallbackReason,
    },
}

impl ResolutionOutcome {
    pub fn fallback_reason(&self) -> Option<FallbackReason> {
        match self {
            ResolutionOutcome::Coordinate(_) => None,
            ResolutionOutcome::Place { reason, .. } => Some(*reason),
        }
    }
}

/// One normalized weather observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub city_name: String,
    pub temperature_celsius: f64,
    pub condition_main: String,
    pub condition_description: String,
    pub humidity_percent: u8,
    pub wind_speed: f64,
    pub pressure: f64,
    pub icon_id: String,
}

impl WeatherSnapshot {
    pub const DEFAULT_TEMPERATURE_C: f64 = 22.0;
    pub const DEFAULT_CONDITION: &'static str = "Sunny";
    pub const DEFAULT_HUMIDITY_PCT: u8 = 45;
    pub const DEFAULT_WIND_SPEED: f64 = 15.0;

    /// Canned observation shown when no real data could be fetched.
    pub fn default_for(city: &PlaceQuery) -> Self {
        Self {
            city_name: city.as_str().to_string(),
            temperature_celsius: Self::DEFAULT_TEMPERATURE_C,
            condition_main: Self::DEFAULT_CONDITION.to_string(),
            condition_description: Self::DEFAULT_CONDITION.to_string(),
            humidity_percent: Self::DEFAULT_HUMIDITY_PCT,
            wind_speed: Self::DEFAULT_WIND_SPEED,
            pressure: 0.0,
            icon_id: String::new(),
        }
    }

    /// Temperature truncated toward zero, as shown to the user.
    pub fn display_temperature(&self) -> i64 {
        self.temperature_celsius.trunc() as i64
    }

    pub fn display_wind_speed(&self) -> i64 {
        self.wind_speed.trunc() as i64
    }

    pub fn backdrop(&self) -> Backdrop {
        Backdrop::from_condition(&self.condition_main)
    }
}

/// Where a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotOrigin {
    /// The requested coordinate or place.
    Live,
    /// The fallback city, after the coordinate lookup failed.
    FallbackCity,
    /// Canned data; every network attempt failed.
    Default,
}

/// Result of a fetch. There is no error variant.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    pub snapshot: WeatherSnapshot,
    pub origin: SnapshotOrigin,
}

/// Requested accuracy of live location updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Accuracy {
    #[default]
    High,
    Balanced,
    Low,
}

/// How a live location subscription should be driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationPolicy {
    pub accuracy: Accuracy,
    pub interval: Duration,
    pub fastest_interval: Duration,
}

impl Default for LocationPolicy {
    fn default() -> Self {
        Self {
            accuracy: Accuracy::High,
            interval: Duration::from_secs(10),
            fastest_interval: Duration::from_secs(5),
        }
    }
}

/// Background theme picked from the main condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backdrop {
    Sunny,
    Cloudy,
    Rainy,
    Storm,
    Default,
}

impl Backdrop {
    pub fn from_condition(condition_main: &str) -> Self {
        match condition_main.to_lowercase().as_str() {
            "clear" | "sunny" => Backdrop::Sunny,
            "clouds" => Backdrop::Cloudy,
            "rain" | "drizzle" => Backdrop::Rainy,
            "thunderstorm" => Backdrop::Storm,
            _ => Backdrop::Default,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Backdrop::Sunny => "sunny",
            Backdrop::Cloudy => "cloudy",
            Backdrop::Rainy => "rainy",
            Backdrop::Storm => "storm",
            Backdrop::Default => "default",
        }
    }
}
