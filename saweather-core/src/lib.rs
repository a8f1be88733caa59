//! Core library for the `saweather` client.
//!
//! This crate defines:
//! - Configuration handling
//! - Location resolution with a bounded fallback chain
//! - The weather provider abstraction and OpenWeather client
//! - Fetching, persisting and orchestrating lookups
//!
//! It is used by `saweather-cli`, but can also back other front-ends.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod location;
pub mod lookup;
pub mod model;
pub mod provider;
pub mod sink;

pub use config::{Config, DeviceConfig};
pub use error::{EmptyPlaceQuery, FetchError, LocationError, SinkError};
pub use fetcher::WeatherFetcher;
pub use location::{
    LocationCallback, LocationResolver, LocationService, PermissionPrompt, Resolution,
    ResolverSettings, SubscriptionHandle,
};
pub use lookup::{LookupReport, LookupStatus, WeatherLookup};
pub use model::{
    Accuracy, Backdrop, Coordinate, FallbackReason, Fetched, LocationPolicy, PlaceQuery,
    ResolutionOutcome, SnapshotOrigin, WeatherSnapshot,
};
pub use provider::{WeatherApi, WeatherQuery, provider_from_config};
pub use sink::{JsonlSink, SnapshotSink, WeatherRecord};
