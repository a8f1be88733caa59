//! Turns a resolved location into a weather snapshot.
//!
//! At most two requests are made per call: a coordinate lookup that fails
//! is retried once against the fallback city, and a failing place lookup
//! yields canned data. Errors never reach the caller.

use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    model::{Coordinate, Fetched, PlaceQuery, ResolutionOutcome, SnapshotOrigin, WeatherSnapshot},
    provider::{WeatherApi, WeatherQuery},
    sink::SnapshotSink,
};

#[derive(Debug, Clone)]
pub struct WeatherFetcher {
    api: Arc<dyn WeatherApi>,
    sink: Arc<dyn SnapshotSink>,
    owner_id: String,
    fallback_city: PlaceQuery,
}

impl WeatherFetcher {
    pub fn new(
        api: Arc<dyn WeatherApi>,
        sink: Arc<dyn SnapshotSink>,
        owner_id: impl Into<String>,
        fallback_city: PlaceQuery,
    ) -> Self {
        Self {
            api,
            sink,
            owner_id: owner_id.into(),
            fallback_city,
        }
    }

    pub async fn fetch(&self, outcome: &ResolutionOutcome) -> Fetched {
        match outcome {
            ResolutionOutcome::Coordinate(c) => self.fetch_by_coordinate(*c).await,
            ResolutionOutcome::Place { query, .. } => self.fetch_by_place(query).await,
        }
    }

    pub async fn fetch_by_coordinate(&self, coordinate: Coordinate) -> Fetched {
        match self.api.current(&WeatherQuery::Coordinate(coordinate)).await {
            Ok(snapshot) => self.deliver(snapshot, SnapshotOrigin::Live).await,
            Err(e) => {
                warn!(
                    lat = coordinate.latitude,
                    lon = coordinate.longitude,
                    error = %e,
                    "weather lookup by coordinate failed, retrying with fallback city"
                );
                let fallback = self.fallback_city.clone();
                self.place_or_default(&fallback, SnapshotOrigin::FallbackCity).await
            }
        }
    }

    pub async fn fetch_by_place(&self, place: &PlaceQuery) -> Fetched {
        self.place_or_default(place, SnapshotOrigin::Live).await
    }

    async fn place_or_default(&self, place: &PlaceQuery, origin: SnapshotOrigin) -> Fetched {
        match self.api.current(&WeatherQuery::Place(place.clone())).await {
            Ok(snapshot) => self.deliver(snapshot, origin).await,
            Err(e) => {
                warn!(city = %place, error = %e, "weather lookup by place failed, using default data");
                Fetched {
                    snapshot: WeatherSnapshot::default_for(&self.fallback_city),
                    origin: SnapshotOrigin::Default,
                }
            }
        }
    }

    async fn deliver(&self, snapshot: WeatherSnapshot, origin: SnapshotOrigin) -> Fetched {
        info!(
            city = %snapshot.city_name,
            temp = snapshot.temperature_celsius,
            condition = %snapshot.condition_main,
            "weather snapshot ready"
        );

        self.persist(&snapshot).await;
        Fetched { snapshot, origin }
    }

    /// Saving touches the filesystem, so it runs on the blocking pool.
    async fn persist(&self, snapshot: &WeatherSnapshot) {
        let sink = Arc::clone(&self.sink);
        let owner_id = self.owner_id.clone();
        let record = snapshot.clone();

        match tokio::task::spawn_blocking(move || sink.save(&record, &owner_id)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(owner = %self.owner_id, error = %e, "failed to persist weather snapshot")
            }
            Err(e) => warn!(owner = %self.owner_id, error = %e, "snapshot persistence task failed"),
        }
    }
}
