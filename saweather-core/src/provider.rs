use crate::{
    Config,
    error::FetchError,
    model::{Coordinate, PlaceQuery, WeatherSnapshot},
    provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use std::fmt::{self, Debug};

pub mod openweather;

/// What to ask the provider for.
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherQuery {
    Coordinate(Coordinate),
    Place(PlaceQuery),
}

impl fmt::Display for WeatherQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeatherQuery::Coordinate(c) => write!(f, "({c})"),
            WeatherQuery::Place(p) => write!(f, "{p}"),
        }
    }
}

/// One outbound request for current weather.
#[async_trait]
pub trait WeatherApi: Send + Sync + Debug {
    async fn current(&self, query: &WeatherQuery) -> Result<WeatherSnapshot, FetchError>;
}

/// Construct the OpenWeather client from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherApi>> {
    let api_key = config.api_key()?;

    let provider = OpenWeatherProvider::new(
        api_key.to_owned(),
        config.base_url.clone(),
        config.request_timeout(),
    )?;

    Ok(Box::new(provider))
}
