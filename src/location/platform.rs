use crate::domain::GeoPoint;
use async_trait::async_trait;
use std::fmt::{self, Debug};
use std::time::Duration;
use tokio::sync::mpsc::Receiver;

/// Desired accuracy and update cadence of a location request.
#[derive(Clone, Debug, PartialEq)]
pub struct LocationRequest {
    pub high_accuracy: bool,
    pub interval: Duration,
    pub min_update_interval: Duration,
}

impl Default for LocationRequest {
    fn default() -> Self {
        LocationRequest {
            high_accuracy: true,
            interval: Duration::from_millis(1000),
            min_update_interval: Duration::from_millis(500),
        }
    }
}

/// Outcome of checking the positioning settings against a [`LocationRequest`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingsCheck {
    Satisfied,
    /// Not satisfied, but the platform can ask the user to fix it in place.
    Resolvable,
    Unavailable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RegistrationId(pub u64);

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A registered location callback. Deliveries of `None` mean the platform had no fix.
#[derive(Debug)]
pub struct LocationRegistration {
    pub id: RegistrationId,
    pub updates: Receiver<Option<GeoPoint>>,
}

/// The device location services.
#[async_trait]
pub trait LocationPlatform: Debug + Send + Sync {
    /// The cached permission grant, no user interaction.
    fn has_permission(&self) -> bool;

    /// Asks the user for the location permission and returns whether it was granted.
    async fn request_permission(&self) -> bool;

    async fn check_settings(&self, request: &LocationRequest) -> SettingsCheck;

    /// Presents the settings resolution flow and returns whether the user accepted it.
    async fn present_resolution(&self) -> bool;

    async fn register_location_callback(&self, request: &LocationRequest) -> Result<LocationRegistration, String>;

    fn unregister_location_callback(&self, id: RegistrationId);
}
