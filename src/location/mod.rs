mod acquirer;
mod machine;
mod platform;
mod simulated;
mod state;

pub use acquirer::{LocationAcquirer, LocationEvent};
pub use platform::LocationRequest;
pub use simulated::SimulatedPlatform;
pub use state::LocationError;
