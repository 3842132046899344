use crate::app_config::Location;
use crate::domain::GeoPoint;
use crate::location::platform::{LocationPlatform, LocationRegistration, LocationRequest, RegistrationId, SettingsCheck};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// A device without location hardware that reports a configured position.
#[derive(Debug)]
pub struct SimulatedPlatform {
    position: GeoPoint,
    permission_granted: bool,
    positioning_enabled: bool,
    next_id: AtomicU64,
    active: Mutex<HashSet<RegistrationId>>,
}

impl SimulatedPlatform {
    pub fn new(config: &Location) -> Self {
        SimulatedPlatform {
            position: config.position(),
            permission_granted: config.permission_granted(),
            positioning_enabled: config.positioning_enabled(),
            next_id: AtomicU64::new(1),
            active: Mutex::new(HashSet::new()),
        }
    }

    #[cfg(test)]
    pub fn active_registrations(&self) -> usize {
        self.active.lock().map(|active| active.len()).unwrap_or_default()
    }
}

#[async_trait]
impl LocationPlatform for SimulatedPlatform {
    fn has_permission(&self) -> bool {
        self.permission_granted
    }

    async fn request_permission(&self) -> bool {
        self.permission_granted
    }

    async fn check_settings(&self, _request: &LocationRequest) -> SettingsCheck {
        if self.positioning_enabled {
            SettingsCheck::Satisfied
        } else {
            SettingsCheck::Resolvable
        }
    }

    async fn present_resolution(&self) -> bool {
        info!("📍 Positioning cannot be enabled on a simulated device, set location.positioning_enabled");
        false
    }

    async fn register_location_callback(&self, request: &LocationRequest) -> Result<LocationRegistration, String> {
        let id = RegistrationId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, updates) = mpsc::channel(1);
        tx.try_send(Some(self.position)).map_err(|e| e.to_string())?;

        self.active.lock().map_err(|e| e.to_string())?.insert(id);
        debug!(registration = %id, interval = ?request.interval, "📍 Simulating location updates");

        Ok(LocationRegistration { id, updates })
    }

    fn unregister_location_callback(&self, id: RegistrationId) {
        if let Ok(mut active) = self.active.lock() {
            active.remove(&id);
        }
    }
}
