use crate::domain::{GeoPoint, Place};
use crate::geocoding::{Geocoder, GeocodingError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Records reverse lookups and answers `Address near <point>`.
#[derive(Debug, Default)]
pub struct FakeGeocoder {
    calls: Mutex<Vec<GeoPoint>>,
    delays: Mutex<VecDeque<Duration>>,
    failures: Mutex<usize>,
}

impl FakeGeocoder {
    pub fn with_delays(delays: &[Duration]) -> Self {
        FakeGeocoder {
            delays: Mutex::new(delays.iter().copied().collect()),
            ..Default::default()
        }
    }

    pub fn failing(times: usize) -> Self {
        FakeGeocoder {
            failures: Mutex::new(times),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<GeoPoint> {
        self.calls.lock().unwrap().clone()
    }

    pub fn address(point: GeoPoint) -> String {
        format!("Address near {}", point)
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn reverse(&self, point: GeoPoint) -> Result<String, GeocodingError> {
        self.calls.lock().unwrap().push(point);

        let delay = self.delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut failures = self.failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(GeocodingError::NoAddress(point));
        }

        Ok(FakeGeocoder::address(point))
    }

    async fn search(&self, _query: &str) -> Result<Vec<Place>, GeocodingError> {
        Ok(vec![])
    }
}
