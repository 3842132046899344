mod client;
mod planner;

pub use client::RoutingClient;
pub use planner::{PlannedRoute, RoutePlanner};

use crate::polyline::PolylineError;
use reqwest::StatusCode;
use reqwest::header::InvalidHeaderValue;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RoutingError {
    #[error("request error: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("routing service returned status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("routing client set an invalid header value: {0}")]
    InvalidHeaderValue(#[from] InvalidHeaderValue),
    #[error("a route needs at least two coordinates, got {0}")]
    TooFewCoordinates(usize),
    #[error("no route found")]
    NoRoute,
    #[error("invalid route geometry: {0}")]
    Geometry(#[from] PolylineError),
}

impl RoutingError {
    /// Failures worth retrying: the service was unreachable, overloaded or slow.
    pub fn is_transient(&self) -> bool {
        match self {
            RoutingError::RequestError(e) => e.is_connect() || e.is_timeout(),
            RoutingError::Status { status, .. } => status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS,
            _ => false,
        }
    }
}
