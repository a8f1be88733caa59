use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::{error::FetchError, model::WeatherSnapshot};

use super::{WeatherApi, WeatherQuery};

/// Used when the provider returns an empty `weather` list.
pub const UNKNOWN_CONDITION_MAIN: &str = "Clear";
pub const UNKNOWN_CONDITION_DESCRIPTION: &str = "Unknown";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn fetch_current(&self, query: &WeatherQuery) -> Result<WeatherSnapshot, FetchError> {
        let url = format!("{}/weather", self.base_url);

        let mut params: Vec<(&str, String)> = match query {
            WeatherQuery::Coordinate(c) => vec![
                ("lat", c.latitude.to_string()),
                ("lon", c.longitude.to_string()),
            ],
            WeatherQuery::Place(p) => vec![("q", p.as_str().to_string())],
        };
        params.push(("units", "metric".to_string()));
        params.push(("appid", self.api_key.clone()));

        let res = self.http.get(&url).query(&params).send().await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                body: truncate_body(&body),
            });
        }

        let parsed: OwCurrentResponse = serde_json::from_str(&body)?;
        debug!(%query, city = %parsed.name, "OpenWeather current weather received");

        Ok(parsed.into())
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    humidity: u8,
    pressure: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    wind: OwWind,
}

impl From<OwCurrentResponse> for WeatherSnapshot {
    fn from(res: OwCurrentResponse) -> Self {
        let (condition_main, condition_description, icon_id) = match res.weather.into_iter().next()
        {
            Some(w) => (w.main, w.description, w.icon),
            None => (
                UNKNOWN_CONDITION_MAIN.to_string(),
                UNKNOWN_CONDITION_DESCRIPTION.to_string(),
                String::new(),
            ),
        };

        WeatherSnapshot {
            city_name: res.name,
            temperature_celsius: res.main.temp,
            condition_main,
            condition_description,
            humidity_percent: res.main.humidity,
            wind_speed: res.wind.speed,
            pressure: res.main.pressure,
            icon_id,
        }
    }
}

#[async_trait]
impl WeatherApi for OpenWeatherProvider {
    async fn current(&self, query: &WeatherQuery) -> Result<WeatherSnapshot, FetchError> {
        self.fetch_current(query).await
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Coordinate, PlaceQuery};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> OpenWeatherProvider {
        OpenWeatherProvider::new("KEY".into(), server.uri(), Duration::from_secs(5)).unwrap()
    }

    fn tokyo_body() -> serde_json::Value {
        json!({
            "name": "Tokyo",
            "main": { "temp": 18.4, "humidity": 60, "pressure": 1012 },
            "weather": [
                { "main": "Clouds", "description": "overcast clouds", "icon": "04d" }
            ],
            "wind": { "speed": 12 }
        })
    }

    #[tokio::test]
    async fn place_query_maps_response_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("q", "Tokyo"))
            .and(query_param("units", "metric"))
            .and(query_param("appid", "KEY"))
            .respond_with(ResponseTemplate::new(200).set_body_json(tokyo_body()))
            .expect(1)
            .mount(&server)
            .await;

        let query = WeatherQuery::Place(PlaceQuery::new("Tokyo").unwrap());
        let snapshot = provider(&server).current(&query).await.unwrap();

        assert_eq!(
            snapshot,
            WeatherSnapshot {
                city_name: "Tokyo".into(),
                temperature_celsius: 18.4,
                condition_main: "Clouds".into(),
                condition_description: "overcast clouds".into(),
                humidity_percent: 60,
                wind_speed: 12.0,
                pressure: 1012.0,
                icon_id: "04d".into(),
            }
        );
    }

    #[tokio::test]
    async fn coordinate_query_sends_lat_lon() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("lat", "-26.2"))
            .and(query_param("lon", "28.04"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(tokyo_body()))
            .expect(1)
            .mount(&server)
            .await;

        let query = WeatherQuery::Coordinate(Coordinate::new(-26.2, 28.04));
        assert!(provider(&server).current(&query).await.is_ok());
    }

    #[tokio::test]
    async fn empty_weather_list_uses_defaults() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "Nowhere",
                "main": { "temp": 1.5, "humidity": 90, "pressure": 1000 },
                "weather": [],
                "wind": { "speed": 0.5 }
            })))
            .mount(&server)
            .await;

        let query = WeatherQuery::Place(PlaceQuery::new("Nowhere").unwrap());
        let snapshot = provider(&server).current(&query).await.unwrap();

        assert_eq!(snapshot.condition_main, UNKNOWN_CONDITION_MAIN);
        assert_eq!(snapshot.condition_description, UNKNOWN_CONDITION_DESCRIPTION);
        assert_eq!(snapshot.icon_id, "");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(
                ResponseTemplate::new(404).set_body_string(r#"{"cod":"404","message":"city not found"}"#),
            )
            .mount(&server)
            .await;

        let query = WeatherQuery::Place(PlaceQuery::new("Atlantis").unwrap());
        let err = provider(&server).current(&query).await.unwrap_err();

        match err {
            FetchError::Status { status, body } => {
                assert_eq!(status.as_u16(), 404);
                assert!(body.contains("city not found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"name\": 5}"))
            .mount(&server)
            .await;

        let query = WeatherQuery::Place(PlaceQuery::new("Tokyo").unwrap());
        let err = provider(&server).current(&query).await.unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[test]
    fn truncate_body_caps_long_bodies() {
        let long = "x".repeat(500);
        let out = truncate_body(&long);
        assert_eq!(out.len(), 203);
        assert!(out.ends_with("..."));
        assert_eq!(truncate_body("short"), "short");
    }
}
