//! Desktop stand-ins for the phone's location service and permission dialog.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use parking_lot::Mutex;
use saweather_core::{
    Coordinate, LocationCallback, LocationError, LocationPolicy, LocationService,
    PermissionPrompt, SubscriptionHandle,
};
use tracing::debug;

/// Location service backed by the config file and command-line flags.
///
/// A desktop has no GPS, so a live subscription never produces a fix and the
/// resolver falls back once its timeout expires.
pub struct DesktopLocationService {
    permission: AtomicBool,
    last_known: Option<Coordinate>,
    next_handle: AtomicU64,
    active: Mutex<Vec<(SubscriptionHandle, LocationCallback)>>,
}

impl fmt::Debug for DesktopLocationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DesktopLocationService")
            .field("permission", &self.has_permission())
            .field("last_known", &self.last_known)
            .field("active", &self.active.lock().len())
            .finish()
    }
}

impl DesktopLocationService {
    pub fn new(permission: bool, last_known: Option<Coordinate>) -> Self {
        Self {
            permission: AtomicBool::new(permission),
            last_known,
            next_handle: AtomicU64::new(1),
            active: Mutex::new(Vec::new()),
        }
    }

    pub fn set_permission(&self, granted: bool) {
        self.permission.store(granted, Ordering::SeqCst);
    }

    #[cfg(test)]
    pub fn active_subscriptions(&self) -> usize {
        self.active.lock().len()
    }
}

#[async_trait]
impl LocationService for DesktopLocationService {
    fn has_permission(&self) -> bool {
        self.permission.load(Ordering::SeqCst)
    }

    async fn last_known_location(&self) -> Result<Option<Coordinate>, LocationError> {
        if !self.has_permission() {
            return Err(LocationError::PermissionDenied);
        }
        Ok(self.last_known)
    }

    fn subscribe(
        &self,
        policy: &LocationPolicy,
        callback: LocationCallback,
    ) -> Result<SubscriptionHandle, LocationError> {
        if !self.has_permission() {
            return Err(LocationError::PermissionDenied);
        }
        let handle = SubscriptionHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        debug!(handle = handle.0, ?policy, "live location requested, no GPS on this device");
        self.active.lock().push((handle, callback));
        Ok(handle)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.active.lock().retain(|(h, _)| *h != handle);
    }
}

/// Asks on the terminal, unless an earlier answer was saved. The answer is
/// applied to the device straight away.
#[derive(Debug)]
pub struct TerminalPrompt {
    device: Arc<DesktopLocationService>,
    remembered: Option<bool>,
    answer: Mutex<Option<bool>>,
}

impl TerminalPrompt {
    pub fn new(device: Arc<DesktopLocationService>, remembered: Option<bool>) -> Self {
        Self {
            device,
            remembered,
            answer: Mutex::new(None),
        }
    }

    fn record(&self, granted: bool) -> bool {
        self.device.set_permission(granted);
        *self.answer.lock() = Some(granted);
        granted
    }

    /// The answer given during this run, if the user was asked.
    pub fn new_answer(&self) -> Option<bool> {
        *self.answer.lock()
    }
}

#[async_trait]
impl PermissionPrompt for TerminalPrompt {
    async fn request_permission(&self) -> bool {
        if let Some(granted) = self.remembered {
            debug!(granted, "using saved permission answer");
            self.device.set_permission(granted);
            return granted;
        }

        let asked = tokio::task::spawn_blocking(|| {
            inquire::Confirm::new("Allow saweather to use your location?")
                .with_default(true)
                .with_help_message("Your answer is saved; edit the config file to change it.")
                .prompt()
        })
        .await;

        let granted = match asked {
            Ok(Ok(granted)) => granted,
            Ok(Err(e)) => {
                debug!(error = %e, "permission prompt dismissed");
                false
            }
            Err(e) => {
                debug!(error = %e, "permission prompt task failed");
                false
            }
        };

        self.record(granted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use saweather_core::{LocationResolver, PlaceQuery, Resolution, ResolutionOutcome, ResolverSettings};
    use std::time::Duration;

    #[tokio::test]
    async fn without_permission_every_query_is_denied() {
        let service = DesktopLocationService::new(false, Some(Coordinate::new(1.0, 2.0)));

        assert!(!service.has_permission());
        assert!(matches!(
            service.last_known_location().await,
            Err(LocationError::PermissionDenied)
        ));
        assert!(matches!(
            service.subscribe(&LocationPolicy::default(), Box::new(|_| {})),
            Err(LocationError::PermissionDenied)
        ));
    }

    #[tokio::test]
    async fn last_known_location_is_reported() {
        let here = Coordinate::new(-26.2, 28.04);
        let service = DesktopLocationService::new(true, Some(here));
        assert_eq!(service.last_known_location().await.unwrap(), Some(here));
    }

    #[test]
    fn unsubscribe_releases_the_handle() {
        let service = DesktopLocationService::new(true, None);
        let a = service.subscribe(&LocationPolicy::default(), Box::new(|_| {})).unwrap();
        let b = service.subscribe(&LocationPolicy::default(), Box::new(|_| {})).unwrap();
        assert_ne!(a, b);
        assert_eq!(service.active_subscriptions(), 2);

        service.unsubscribe(a);
        assert_eq!(service.active_subscriptions(), 1);
    }

    fn resolver(device: Arc<DesktopLocationService>) -> LocationResolver {
        LocationResolver::new(
            device,
            ResolverSettings {
                fallback_city: PlaceQuery::new("Johannesburg").unwrap(),
                timeout: Duration::from_millis(50),
                policy: LocationPolicy::default(),
            },
        )
    }

    #[tokio::test]
    async fn saved_answer_skips_the_prompt() {
        let device = Arc::new(DesktopLocationService::new(false, None));
        let prompt = TerminalPrompt::new(device, Some(false));
        assert!(!prompt.request_permission().await);
        assert_eq!(prompt.new_answer(), None);
    }

    #[tokio::test]
    async fn granting_at_the_prompt_unlocks_the_seeded_location() {
        let here = Coordinate::new(-26.2, 28.04);
        let device = Arc::new(DesktopLocationService::new(false, Some(here)));
        let prompt = TerminalPrompt::new(device.clone(), None);
        let resolver = resolver(device.clone());

        assert_eq!(resolver.resolve().await, Resolution::PermissionRequired);
        assert!(prompt.record(true));

        let outcome = resolver.resolve_after_prompt(true).await;
        assert_eq!(outcome, ResolutionOutcome::Coordinate(here));
        assert_eq!(prompt.new_answer(), Some(true));
    }

    #[tokio::test]
    async fn saved_grant_applies_to_the_device() {
        let here = Coordinate::new(-33.92, 18.42);
        let device = Arc::new(DesktopLocationService::new(false, Some(here)));
        let prompt = TerminalPrompt::new(device.clone(), Some(true));

        assert!(prompt.request_permission().await);
        assert!(device.has_permission());
        assert_eq!(
            resolver(device).resolve_after_prompt(true).await,
            ResolutionOutcome::Coordinate(here)
        );
    }

    #[tokio::test]
    async fn refusing_at_the_prompt_keeps_the_device_locked() {
        let device = Arc::new(DesktopLocationService::new(true, None));
        let prompt = TerminalPrompt::new(device.clone(), None);

        assert!(!prompt.record(false));
        assert!(!device.has_permission());
        assert!(matches!(
            device.last_known_location().await,
            Err(LocationError::PermissionDenied)
        ));
    }
}
