use crate::domain::GeoPoint;
use crate::location::LocationRequest;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    geocoding: Geocoding,
    routing: Routing,
    location: Location,
}

impl AppConfig {
    /// Loads `config.toml`, overlays `config_local.toml` when present and then
    /// `WAYPOINT_`-prefixed environment variables, e.g. `WAYPOINT_ROUTING__API_KEY`.
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name("config").required(true))
            .add_source(File::with_name("config_local").required(false))
            .add_source(Environment::with_prefix("WAYPOINT").prefix_separator("_").separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn geocoding(&self) -> &Geocoding {
        &self.geocoding
    }

    pub fn routing(&self) -> &Routing {
        &self.routing
    }

    pub fn location(&self) -> &Location {
        &self.location
    }
}

#[derive(Debug, Deserialize)]
pub struct Geocoding {
    url: String,
    user_agent: String,
    #[serde(with = "humantime_serde")]
    timeout: Duration,
    #[serde(with = "humantime_serde")]
    debounce: Duration,
    search_limit: usize,
}

impl Geocoding {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn search_limit(&self) -> usize {
        self.search_limit
    }
}

#[derive(Debug, Deserialize)]
pub struct Routing {
    url: String,
    api_key: String,
    language: String,
    units: String,
    retry_ms: u64,
    retry_max_delay_ms: u64,
    max_retries: usize,
}

impl Routing {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn units(&self) -> &str {
        &self.units
    }

    pub fn retry_ms(&self) -> u64 {
        self.retry_ms
    }

    pub fn retry_max_delay(&self) -> Duration {
        Duration::from_millis(self.retry_max_delay_ms)
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }
}

/// The simulated device used when no platform location service is available.
#[derive(Debug, Deserialize)]
pub struct Location {
    position: GeoPoint,
    #[serde(with = "humantime_serde")]
    fetch_timeout: Duration,
    #[serde(with = "humantime_serde")]
    interval: Duration,
    #[serde(with = "humantime_serde")]
    min_update_interval: Duration,
    permission_granted: bool,
    positioning_enabled: bool,
}

impl Location {
    pub fn position(&self) -> GeoPoint {
        self.position
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    pub fn request(&self) -> LocationRequest {
        LocationRequest {
            high_accuracy: true,
            interval: self.interval,
            min_update_interval: self.min_update_interval,
        }
    }

    pub fn permission_granted(&self) -> bool {
        self.permission_granted
    }

    pub fn positioning_enabled(&self) -> bool {
        self.positioning_enabled
    }
}

#[cfg(test)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

#[cfg(test)]
impl AppConfigBuilder {
    pub fn new() -> Self {
        AppConfigBuilder {
            config: AppConfig {
                geocoding: Geocoding {
                    url: "https://nominatim.url".to_string(),
                    user_agent: "waypoint-test".to_string(),
                    timeout: Duration::from_secs(5),
                    debounce: Duration::from_millis(800),
                    search_limit: 5,
                },
                routing: Routing {
                    url: "https://routing.url".to_string(),
                    api_key: "key".to_string(),
                    language: "es".to_string(),
                    units: "km".to_string(),
                    retry_ms: 1,
                    retry_max_delay_ms: 5,
                    max_retries: 2,
                },
                location: Location {
                    position: GeoPoint::new(-12.0464, -77.0428),
                    fetch_timeout: Duration::from_secs(30),
                    interval: Duration::from_millis(1000),
                    min_update_interval: Duration::from_millis(500),
                    permission_granted: true,
                    positioning_enabled: true,
                },
            },
        }
    }

    pub fn geocoding_url(mut self, url: String) -> Self {
        self.config.geocoding.url = url;
        self
    }

    pub fn routing_url(mut self, url: String) -> Self {
        self.config.routing.url = url;
        self
    }

    pub fn routing_api_key(mut self, api_key: String) -> Self {
        self.config.routing.api_key = api_key;
        self
    }

    pub fn permission_granted(mut self, granted: bool) -> Self {
        self.config.location.permission_granted = granted;
        self
    }

    pub fn positioning_enabled(mut self, enabled: bool) -> Self {
        self.config.location.positioning_enabled = enabled;
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}
