use crate::app_config::AppConfig;
use crate::domain::route::DirectionsResponse;
use crate::domain::{GeoPoint, TravelMode};
use crate::routing::RoutingError;
use reqwest::header::HeaderValue;
use reqwest::{Client, header};
use serde::Serialize;
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, info, instrument, warn};

/// OpenRouteService directions over HTTP.
#[derive(Debug, Clone)]
pub struct RoutingClient {
    client: Client,
    url: String,
    language: String,
    units: String,
    retry_ms: u64,
    retry_max_delay: Duration,
    max_retries: usize,
}

#[derive(Debug, Serialize)]
struct DirectionsRequest<'a> {
    /// `[longitude, latitude]` pairs.
    coordinates: Vec<[f64; 2]>,
    language: &'a str,
    units: &'a str,
    instructions: bool,
}

impl RoutingClient {
    pub fn new(config: &AppConfig) -> Result<Self, RoutingError> {
        let routing = config.routing();

        let mut headers = header::HeaderMap::new();
        let mut api_key_value = HeaderValue::from_str(routing.api_key())?;
        api_key_value.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, api_key_value);
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json, application/geo+json"));

        let client = Client::builder().default_headers(headers).build()?;

        Ok(RoutingClient {
            client,
            url: routing.url().trim_end_matches('/').to_string(),
            language: routing.language().to_string(),
            units: routing.units().to_string(),
            retry_ms: routing.retry_ms(),
            retry_max_delay: routing.retry_max_delay(),
            max_retries: routing.max_retries(),
        })
    }

    /// Requests routes through `coordinates`, in order. Transient failures are retried.
    #[instrument(skip(self, coordinates), fields(profile = mode.profile()))]
    pub async fn directions(&self, mode: TravelMode, coordinates: &[GeoPoint]) -> Result<DirectionsResponse, RoutingError> {
        if coordinates.len() < 2 {
            return Err(RoutingError::TooFewCoordinates(coordinates.len()));
        }

        let request = DirectionsRequest {
            coordinates: coordinates.iter().map(|point| [point.longitude, point.latitude]).collect(),
            language: &self.language,
            units: &self.units,
            instructions: true,
        };

        let strategy = ExponentialBackoff::from_millis(self.retry_ms)
            .factor(2)
            .max_delay(self.retry_max_delay)
            .map(jitter)
            .take(self.max_retries);

        info!("🧭 Fetching {} route through {} points...", mode, coordinates.len());
        let response = RetryIf::start(
            strategy,
            || self.request(mode, &request),
            |e: &RoutingError| {
                let transient = e.is_transient();
                if transient {
                    warn!("🧭 Fetching route failed, {}. Retrying...", e);
                }
                transient
            },
        )
        .await?;

        info!("🧭 Fetching {} route... OK, {} route(s)", mode, response.routes.len());
        Ok(response)
    }

    async fn request(&self, mode: TravelMode, body: &DirectionsRequest<'_>) -> Result<DirectionsResponse, RoutingError> {
        let response = self
            .client
            .post(format!("{}/v2/directions/{}", self.url, mode.profile()))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status_code = %status, "🧭 Routing service rejected the request: {}", body);
            return Err(RoutingError::Status { status, body });
        }

        Ok(response.json::<DirectionsResponse>().await?)
    }
}
