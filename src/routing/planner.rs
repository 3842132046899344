use crate::domain::route::Route;
use crate::domain::{GeoPoint, TravelMode};
use crate::routing::{RoutingClient, RoutingError};
use tracing::{instrument, warn};

/// A fetched route together with its decoded geometry.
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedRoute {
    pub route: Route,
    pub points: Vec<GeoPoint>,
}

/// Holds the selected travel mode and the route currently shown.
#[derive(Debug)]
pub struct RoutePlanner {
    client: RoutingClient,
    mode: TravelMode,
    route: Option<PlannedRoute>,
}

impl RoutePlanner {
    pub fn new(client: RoutingClient) -> Self {
        RoutePlanner {
            client,
            mode: TravelMode::default(),
            route: None,
        }
    }

    pub fn mode(&self) -> TravelMode {
        self.mode
    }

    /// Switches the travel mode. A route planned for another mode is dropped.
    pub fn set_mode(&mut self, mode: TravelMode) {
        if self.mode != mode {
            self.clear_route();
        }
        self.mode = mode;
    }

    /// Fetches the best route between two points. On failure the previous route is cleared.
    #[instrument(skip(self), fields(mode = %self.mode))]
    pub async fn fetch_route(&mut self, start: GeoPoint, end: GeoPoint) -> Result<&PlannedRoute, RoutingError> {
        match self.plan(start, end).await {
            Ok(planned) => Ok(self.route.insert(planned)),
            Err(e) => {
                warn!("🧭 Planning route from {} to {}... failed, {}", start, end, e);
                self.route = None;
                Err(e)
            }
        }
    }

    async fn plan(&self, start: GeoPoint, end: GeoPoint) -> Result<PlannedRoute, RoutingError> {
        let response = self.client.directions(self.mode, &[start, end]).await?;
        let route = response.routes.into_iter().next().ok_or(RoutingError::NoRoute)?;
        let points = route.points()?;

        Ok(PlannedRoute { route, points })
    }

    pub fn route(&self) -> Option<&PlannedRoute> {
        self.route.as_ref()
    }

    pub fn clear_route(&mut self) {
        self.route = None;
    }
}
