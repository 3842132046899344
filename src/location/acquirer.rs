use crate::domain::GeoPoint;
use crate::location::machine::{Effect, Input, LocationStateMachine};
use crate::location::platform::{LocationPlatform, LocationRegistration, LocationRequest};
use crate::location::state::{LocationAcquisitionState, LocationError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, instrument, warn};

/// What the owner of an acquisition gets to hear about.
#[derive(Clone, Debug, PartialEq)]
pub enum LocationEvent {
    PermissionGranted,
    Resolved(GeoPoint),
    Failed(LocationError),
}

/// Drives a [`LocationStateMachine`] against a [`LocationPlatform`].
///
/// At most one location callback is registered at any time. It is released
/// after the first delivery, on timeout, on retry and when the acquirer is
/// dropped, which covers cancellation and teardown of the owner.
#[derive(Debug)]
pub struct LocationAcquirer<P: LocationPlatform> {
    platform: Arc<P>,
    request: LocationRequest,
    fetch_timeout: Duration,
    machine: LocationStateMachine,
    registration: Option<LocationRegistration>,
    events: Sender<LocationEvent>,
}

impl<P: LocationPlatform + 'static> LocationAcquirer<P> {
    pub fn new(platform: Arc<P>, request: LocationRequest, fetch_timeout: Duration, events: Sender<LocationEvent>) -> Self {
        LocationAcquirer {
            platform,
            request,
            fetch_timeout,
            machine: LocationStateMachine::new(0),
            registration: None,
            events,
        }
    }

    /// Runs the acquisition on its own task. Increasing the value behind `retries` restarts it.
    pub fn spawn(self, retries: watch::Receiver<u64>) -> AcquisitionHandle {
        AcquisitionHandle {
            task: tokio::spawn(self.run(retries)),
        }
    }

    /// Acquires a location, then keeps serving retries until the retry counter is dropped.
    #[instrument(skip_all)]
    pub async fn run(mut self, mut retries: watch::Receiver<u64>) {
        self.machine = LocationStateMachine::new(*retries.borrow_and_update());
        let mut retries_open = true;
        let mut input = Some(Input::Activate);

        loop {
            if let Some(next) = input.take() {
                let effects = self.machine.handle(next);
                input = self.apply(effects).await;
                continue;
            }

            input = if matches!(self.machine.state(), LocationAcquisitionState::FetchingLocation) {
                self.await_location(&mut retries, &mut retries_open).await
            } else if retries_open {
                match retries.changed().await {
                    Ok(()) => Some(Input::RetryRequested(*retries.borrow_and_update())),
                    Err(_) => {
                        retries_open = false;
                        None
                    }
                }
            } else {
                break;
            };
        }

        debug!(state = ?self.machine.state(), "📍 Location acquisition finished");
    }

    async fn apply(&mut self, effects: Vec<Effect>) -> Option<Input> {
        let mut next = None;

        for effect in effects {
            let input = match effect {
                Effect::CheckPermission => Some(Input::PermissionChecked(self.platform.has_permission())),
                Effect::RequestPermission => {
                    info!("📍 Requesting location permission...");
                    Some(Input::PermissionAnswered(self.platform.request_permission().await))
                }
                Effect::NotifyPermissionGranted => {
                    info!("📍 Requesting location permission... OK");
                    self.emit(LocationEvent::PermissionGranted).await;
                    None
                }
                Effect::CheckSettings => {
                    debug!("📍 Checking location settings...");
                    Some(Input::SettingsChecked(self.platform.check_settings(&self.request).await))
                }
                Effect::PresentResolution => {
                    info!("📍 Asking the user to enable positioning...");
                    Some(Input::ResolutionAnswered(self.platform.present_resolution().await))
                }
                Effect::RegisterLocationCallback => self.register().await,
                Effect::UnregisterLocationCallback => {
                    self.unregister();
                    None
                }
                Effect::DeliverLocation(point) => {
                    info!(%point, "📍 Acquiring location... OK");
                    self.emit(LocationEvent::Resolved(point)).await;
                    None
                }
                Effect::ReportError(error) => {
                    warn!("📍 Acquiring location... failed, {}", error);
                    self.emit(LocationEvent::Failed(error)).await;
                    None
                }
            };

            if input.is_some() {
                next = input;
            }
        }

        next
    }

    async fn await_location(&mut self, retries: &mut watch::Receiver<u64>, retries_open: &mut bool) -> Option<Input> {
        let deadline = Instant::now() + self.fetch_timeout;
        let Some(registration) = self.registration.as_mut() else {
            return Some(Input::PlatformFailed("no location callback registered".to_string()));
        };

        loop {
            tokio::select! {
                delivery = timeout_at(deadline, registration.updates.recv()) => {
                    return Some(match delivery {
                        Ok(Some(location)) => Input::LocationDelivered(location),
                        Ok(None) => Input::PlatformFailed("location updates stopped".to_string()),
                        Err(_) => Input::LocationTimedOut,
                    });
                }
                changed = retries.changed(), if *retries_open => match changed {
                    Ok(()) => return Some(Input::RetryRequested(*retries.borrow_and_update())),
                    Err(_) => *retries_open = false,
                }
            }
        }
    }

    async fn register(&mut self) -> Option<Input> {
        self.unregister();

        match self.platform.register_location_callback(&self.request).await {
            Ok(registration) => {
                debug!(registration = %registration.id, "📍 Registered location callback");
                self.registration = Some(registration);
                None
            }
            Err(e) => Some(Input::PlatformFailed(e)),
        }
    }

    async fn emit(&self, event: LocationEvent) {
        if self.events.send(event).await.is_err() {
            debug!("📍 Nobody listens to location events anymore");
        }
    }
}

impl<P: LocationPlatform> LocationAcquirer<P> {
    fn unregister(&mut self) {
        if let Some(registration) = self.registration.take() {
            self.platform.unregister_location_callback(registration.id);
            debug!(registration = %registration.id, "📍 Unregistered location callback");
        }
    }
}

impl<P: LocationPlatform> Drop for LocationAcquirer<P> {
    fn drop(&mut self) {
        self.unregister();
    }
}

/// Owner side of a spawned acquisition. Dropping it stops the acquisition.
#[derive(Debug)]
pub struct AcquisitionHandle {
    task: JoinHandle<()>,
}

impl AcquisitionHandle {
    /// Stops the acquisition and waits until its location callback is released.
    pub async fn cancel(mut self) {
        self.task.abort();
        let _ = (&mut self.task).await;
    }
}

impl Drop for AcquisitionHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::platform::{RegistrationId, SettingsCheck};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::{HashSet, VecDeque};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU64, Ordering};
    use test_log::test;
    use tokio::sync::mpsc::{self, Receiver};
    use tokio::sync::Notify;

    const POINT: GeoPoint = GeoPoint::new(-12.0464, -77.0428);

    #[derive(Debug, Default)]
    enum Delivery {
        #[default]
        Point,
        Empty,
        Never,
    }

    #[derive(Debug, Default)]
    struct FakePlatform {
        permission: bool,
        permission_answer: bool,
        settings: Mutex<VecDeque<SettingsCheck>>,
        resolution_answers: Mutex<VecDeque<bool>>,
        delivery: Delivery,
        calls: Mutex<Vec<String>>,
        active: Mutex<HashSet<RegistrationId>>,
        idle_senders: Mutex<Vec<mpsc::Sender<Option<GeoPoint>>>>,
        next_id: AtomicU64,
        registered: Notify,
    }

    impl FakePlatform {
        fn granted() -> Self {
            FakePlatform {
                permission: true,
                ..Default::default()
            }
        }

        fn with_settings(self, settings: &[SettingsCheck]) -> Self {
            *self.settings.lock().unwrap() = settings.iter().copied().collect();
            self
        }

        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn count(&self, call: &str) -> usize {
            self.calls().iter().filter(|c| c.as_str() == call).count()
        }

        fn active(&self) -> usize {
            self.active.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LocationPlatform for FakePlatform {
        fn has_permission(&self) -> bool {
            self.record("has_permission");
            self.permission
        }

        async fn request_permission(&self) -> bool {
            self.record("request_permission");
            self.permission_answer
        }

        async fn check_settings(&self, _request: &LocationRequest) -> SettingsCheck {
            self.record("check_settings");
            self.settings.lock().unwrap().pop_front().unwrap_or(SettingsCheck::Satisfied)
        }

        async fn present_resolution(&self) -> bool {
            self.record("present_resolution");
            self.resolution_answers.lock().unwrap().pop_front().unwrap_or(false)
        }

        async fn register_location_callback(&self, _request: &LocationRequest) -> Result<LocationRegistration, String> {
            self.record("register");
            let id = RegistrationId(self.next_id.fetch_add(1, Ordering::SeqCst));
            let (tx, updates) = mpsc::channel(1);
            match self.delivery {
                Delivery::Point => tx.try_send(Some(POINT)).unwrap(),
                Delivery::Empty => tx.try_send(None).unwrap(),
                Delivery::Never => self.idle_senders.lock().unwrap().push(tx),
            }
            self.active.lock().unwrap().insert(id);
            self.registered.notify_one();
            Ok(LocationRegistration { id, updates })
        }

        fn unregister_location_callback(&self, id: RegistrationId) {
            self.record("unregister");
            self.active.lock().unwrap().remove(&id);
        }
    }

    fn start(platform: &Arc<FakePlatform>) -> (AcquisitionHandle, Receiver<LocationEvent>, watch::Sender<u64>) {
        let (events_tx, events_rx) = mpsc::channel(8);
        let (retry_tx, retry_rx) = watch::channel(0);
        let acquirer = LocationAcquirer::new(platform.clone(), LocationRequest::default(), Duration::from_secs(30), events_tx);

        (acquirer.spawn(retry_rx), events_rx, retry_tx)
    }

    #[test(tokio::test)]
    async fn resolves_the_location_and_releases_the_callback() {
        let platform = Arc::new(FakePlatform::granted());
        let (_handle, mut events, _retries) = start(&platform);

        assert_eq!(events.recv().await, Some(LocationEvent::Resolved(POINT)));
        assert_eq!(platform.calls(), vec!["has_permission", "check_settings", "register", "unregister"]);
        assert_eq!(platform.active(), 0);
    }

    #[test(tokio::test)]
    async fn granted_permission_is_reported_before_the_location() {
        let platform = Arc::new(FakePlatform {
            permission_answer: true,
            ..Default::default()
        });
        let (_handle, mut events, _retries) = start(&platform);

        assert_eq!(events.recv().await, Some(LocationEvent::PermissionGranted));
        assert_eq!(events.recv().await, Some(LocationEvent::Resolved(POINT)));
    }

    #[test(tokio::test)]
    async fn denied_permission_never_reaches_settings_or_fetch() {
        let platform = Arc::new(FakePlatform::default());
        let (_handle, mut events, _retries) = start(&platform);

        assert_eq!(events.recv().await, Some(LocationEvent::Failed(LocationError::PermissionDenied)));
        assert_eq!(platform.calls(), vec!["has_permission", "request_permission"]);
    }

    #[test(tokio::test)]
    async fn accepted_resolution_checks_settings_again() {
        let platform = Arc::new(FakePlatform::granted().with_settings(&[SettingsCheck::Resolvable, SettingsCheck::Satisfied]));
        platform.resolution_answers.lock().unwrap().push_back(true);
        let (_handle, mut events, _retries) = start(&platform);

        assert_eq!(events.recv().await, Some(LocationEvent::Resolved(POINT)));
        assert_eq!(platform.count("check_settings"), 2);
        assert_eq!(platform.count("present_resolution"), 1);
    }

    #[test(tokio::test)]
    async fn retry_after_gps_disabled_checks_settings_once_per_increment() {
        let platform = Arc::new(FakePlatform::granted().with_settings(&[SettingsCheck::Resolvable, SettingsCheck::Resolvable]));
        let (_handle, mut events, retries) = start(&platform);

        let failure = events.recv().await;
        assert_eq!(failure, Some(LocationEvent::Failed(LocationError::PositioningDisabled)));
        assert_eq!(platform.count("check_settings"), 1);

        retries.send(1).unwrap();
        assert_eq!(events.recv().await, Some(LocationEvent::Failed(LocationError::PositioningDisabled)));
        assert_eq!(platform.count("check_settings"), 2);

        retries.send(2).unwrap();
        assert_eq!(events.recv().await, Some(LocationEvent::Resolved(POINT)));
        assert_eq!(platform.count("check_settings"), 3);
    }

    #[test(tokio::test)]
    async fn unavailable_positioning_fails_the_attempt() {
        let platform = Arc::new(FakePlatform::granted().with_settings(&[SettingsCheck::Unavailable]));
        let (_handle, mut events, _retries) = start(&platform);

        assert_eq!(events.recv().await, Some(LocationEvent::Failed(LocationError::PositioningUnavailable)));
        assert_eq!(platform.count("register"), 0);
    }

    #[test(tokio::test)]
    async fn empty_delivery_is_reported_as_no_location() {
        let platform = Arc::new(FakePlatform {
            delivery: Delivery::Empty,
            ..FakePlatform::granted()
        });
        let (_handle, mut events, _retries) = start(&platform);

        assert_eq!(events.recv().await, Some(LocationEvent::Failed(LocationError::NoLocation)));
        assert_eq!(platform.active(), 0);
    }

    #[test(tokio::test(start_paused = true))]
    async fn missing_delivery_times_out_and_releases_the_callback() {
        let platform = Arc::new(FakePlatform {
            delivery: Delivery::Never,
            ..FakePlatform::granted()
        });
        let (_handle, mut events, _retries) = start(&platform);

        assert_eq!(events.recv().await, Some(LocationEvent::Failed(LocationError::Timeout)));
        assert_eq!(platform.active(), 0);
    }

    #[test(tokio::test)]
    async fn cancel_releases_the_pending_callback() {
        let platform = Arc::new(FakePlatform {
            delivery: Delivery::Never,
            ..FakePlatform::granted()
        });
        let (handle, _events, _retries) = start(&platform);

        platform.registered.notified().await;
        assert_eq!(platform.active(), 1);

        handle.cancel().await;
        assert_eq!(platform.active(), 0);
        assert_eq!(platform.count("unregister"), 1);
    }

    #[test(tokio::test)]
    async fn retry_while_fetching_keeps_a_single_registration() {
        let platform = Arc::new(FakePlatform {
            delivery: Delivery::Never,
            ..FakePlatform::granted()
        });
        let (handle, _events, retries) = start(&platform);

        platform.registered.notified().await;
        retries.send(1).unwrap();
        platform.registered.notified().await;

        assert_eq!(platform.count("register"), 2);
        assert_eq!(platform.count("unregister"), 1);
        assert_eq!(platform.active(), 1);

        handle.cancel().await;
        assert_eq!(platform.active(), 0);
    }
}
