//! Best-effort resolution of "here".
//!
//! The resolver walks a fixed chain: permission check, last known location,
//! then a live subscription bounded by a timeout. Every path ends in exactly
//! one [`ResolutionOutcome`], falling back to a configured city when the
//! device cannot produce a position.

use std::{fmt::Debug, sync::Arc, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info, trace, warn};

use crate::{
    config::Config,
    error::LocationError,
    model::{Coordinate, FallbackReason, LocationPolicy, PlaceQuery, ResolutionOutcome},
};

/// Invoked by a [`LocationService`] for every live location update.
pub type LocationCallback = Box<dyn Fn(Coordinate) + Send + Sync>;

/// Opaque id of a live subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub u64);

/// Platform location capabilities the resolver relies on.
#[async_trait]
pub trait LocationService: Send + Sync + Debug {
    fn has_permission(&self) -> bool;

    /// Cached device position; never activates GPS or the network.
    async fn last_known_location(&self) -> Result<Option<Coordinate>, LocationError>;

    fn subscribe(
        &self,
        policy: &LocationPolicy,
        callback: LocationCallback,
    ) -> Result<SubscriptionHandle, LocationError>;

    fn unsubscribe(&self, handle: SubscriptionHandle);
}

/// Asks the user for location permission.
#[async_trait]
pub trait PermissionPrompt: Send + Sync + Debug {
    async fn request_permission(&self) -> bool;
}

/// Result of a single [`LocationResolver::resolve`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(ResolutionOutcome),
    /// Permission must be requested before the device can be queried.
    /// Follow up with [`LocationResolver::resolve_after_prompt`].
    PermissionRequired,
}

#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub fallback_city: PlaceQuery,
    pub timeout: Duration,
    pub policy: LocationPolicy,
}

impl ResolverSettings {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            fallback_city: config.fallback_place()?,
            timeout: config.location_timeout(),
            policy: config.location_policy(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct LocationResolver {
    service: Arc<dyn LocationService>,
    settings: ResolverSettings,
}

impl LocationResolver {
    pub fn new(service: Arc<dyn LocationService>, settings: ResolverSettings) -> Self {
        Self { service, settings }
    }

    pub async fn resolve(&self) -> Resolution {
        if !self.service.has_permission() {
            debug!("location permission not granted yet");
            return Resolution::PermissionRequired;
        }
        Resolution::Resolved(self.resolve_granted().await)
    }

    /// Continues a resolution once the user has answered the permission prompt.
    pub async fn resolve_after_prompt(&self, granted: bool) -> ResolutionOutcome {
        if !granted {
            return self.fallback(FallbackReason::PermissionDenied);
        }
        self.resolve_granted().await
    }

    async fn resolve_granted(&self) -> ResolutionOutcome {
        match self.service.last_known_location().await {
            Ok(Some(coordinate)) => {
                debug!(lat = coordinate.latitude, lon = coordinate.longitude, "using last known location");
                return ResolutionOutcome::Coordinate(coordinate);
            }
            Ok(None) => debug!("no last known location, requesting live updates"),
            Err(LocationError::PermissionDenied) => {
                return self.fallback(FallbackReason::PermissionDenied);
            }
            Err(e) => debug!(error = %e, "last known location failed, requesting live updates"),
        }

        self.await_first_fix().await
    }

    async fn await_first_fix(&self) -> ResolutionOutcome {
        let (tx, rx) = oneshot::channel();
        // The callback owns the only strong reference, so a service that
        // drops it closes the channel.
        let first_fix = Arc::new(FirstFix::new(tx));
        let slot = Arc::downgrade(&first_fix);

        let callback: LocationCallback = Box::new(move |coordinate| {
            if !first_fix.deliver(coordinate) {
                trace!("ignoring location update after resolution");
            }
        });

        let handle = match self.service.subscribe(&self.settings.policy, callback) {
            Ok(handle) => handle,
            Err(LocationError::PermissionDenied) => {
                return self.fallback(FallbackReason::PermissionDenied);
            }
            Err(e) => {
                warn!(error = %e, "could not start location updates");
                return self.fallback(FallbackReason::Unavailable);
            }
        };

        // Unsubscribes on every exit, including the future being dropped.
        let _subscription = ActiveSubscription {
            service: self.service.as_ref(),
            handle,
        };

        let outcome = match tokio::time::timeout(self.settings.timeout, rx).await {
            Ok(Ok(coordinate)) => {
                info!(lat = coordinate.latitude, lon = coordinate.longitude, "received live location");
                ResolutionOutcome::Coordinate(coordinate)
            }
            Ok(Err(_)) => {
                warn!("location service dropped the subscription without a fix");
                self.fallback(FallbackReason::Unavailable)
            }
            Err(_) => self.fallback(FallbackReason::Timeout),
        };

        if let Some(first_fix) = slot.upgrade() {
            first_fix.close();
        }
        outcome
    }

    fn fallback(&self, reason: FallbackReason) -> ResolutionOutcome {
        warn!(%reason, city = %self.settings.fallback_city, "using fallback city");
        ResolutionOutcome::Place {
            query: self.settings.fallback_city.clone(),
            reason,
        }
    }
}

/// Single-assignment slot shared by the update callback and the timeout path.
/// Whoever takes the sender first wins; later attempts are no-ops.
struct FirstFix {
    tx: Mutex<Option<oneshot::Sender<Coordinate>>>,
}

impl FirstFix {
    fn new(tx: oneshot::Sender<Coordinate>) -> Self {
        Self {
            tx: Mutex::new(Some(tx)),
        }
    }

    fn deliver(&self, coordinate: Coordinate) -> bool {
        match self.tx.lock().take() {
            Some(tx) => tx.send(coordinate).is_ok(),
            None => false,
        }
    }

    fn close(&self) {
        self.tx.lock().take();
    }
}

struct ActiveSubscription<'a> {
    service: &'a dyn LocationService,
    handle: SubscriptionHandle,
}

impl Drop for ActiveSubscription<'_> {
    fn drop(&mut self) {
        debug!(handle = self.handle.0, "cancelling location updates");
        self.service.unsubscribe(self.handle);
    }
}
