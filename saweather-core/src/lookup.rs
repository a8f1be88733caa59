//! One user action at a time: resolve where the user is, then fetch the weather.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::{
    fetcher::WeatherFetcher,
    location::{LocationResolver, PermissionPrompt, Resolution},
    model::{Fetched, PlaceQuery, ResolutionOutcome},
};

/// What one user action produced.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupReport {
    /// `None` for a typed place search.
    pub resolution: Option<ResolutionOutcome>,
    pub fetched: Fetched,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LookupStatus {
    Completed(LookupReport),
    /// Another chain was already running; nothing was started.
    Busy,
    /// The owner shut down before the chain finished.
    Abandoned,
}

/// Runs resolve → fetch chains on behalf of one screen or session.
///
/// At most one chain runs at a time. Dropping the lookup (or calling
/// [`WeatherLookup::shutdown`]) abandons the running chain, which cancels
/// any live location subscription and pending request.
#[derive(Debug)]
pub struct WeatherLookup {
    resolver: LocationResolver,
    fetcher: WeatherFetcher,
    prompt: Arc<dyn PermissionPrompt>,
    in_flight: AtomicBool,
    cancel: CancellationToken,
}

impl WeatherLookup {
    pub fn new(
        resolver: LocationResolver,
        fetcher: WeatherFetcher,
        prompt: Arc<dyn PermissionPrompt>,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            prompt,
            in_flight: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        }
    }

    /// Weather for the device's current location.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> LookupStatus {
        self.run(async {
            let outcome = match self.resolver.resolve().await {
                Resolution::Resolved(outcome) => outcome,
                Resolution::PermissionRequired => {
                    let granted = self.prompt.request_permission().await;
                    debug!(granted, "permission prompt answered");
                    self.resolver.resolve_after_prompt(granted).await
                }
            };
            let fetched = self.fetcher.fetch(&outcome).await;
            LookupReport {
                resolution: Some(outcome),
                fetched,
            }
        })
        .await
    }

    /// Weather for a place the user typed.
    #[instrument(skip_all, fields(place = %place))]
    pub async fn search(&self, place: &PlaceQuery) -> LookupStatus {
        self.run(async {
            LookupReport {
                resolution: None,
                fetched: self.fetcher.fetch_by_place(place).await,
            }
        })
        .await
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    async fn run<F>(&self, chain: F) -> LookupStatus
    where
        F: Future<Output = LookupReport>,
    {
        if self.cancel.is_cancelled() {
            return LookupStatus::Abandoned;
        }
        let Some(_flight) = InFlight::begin(&self.in_flight) else {
            debug!("lookup already running");
            return LookupStatus::Busy;
        };

        tokio::select! {
            _ = self.cancel.cancelled() => {
                debug!("lookup abandoned");
                LookupStatus::Abandoned
            }
            report = chain => LookupStatus::Completed(report),
        }
    }
}

impl Drop for WeatherLookup {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn begin(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
