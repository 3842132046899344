use crate::domain::GeoPoint;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq)]
pub enum LocationAcquisitionState {
    /// Not started yet, or restarted by a retry before the cached permission was checked.
    Idle,
    AwaitingPermission,
    PermissionDenied,
    CheckingSettings,
    AwaitingGpsEnable,
    FetchingLocation,
    Resolved(GeoPoint),
    Failed(LocationError),
}

impl LocationAcquisitionState {
    /// Terminal states only move on when the retry counter increases.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LocationAcquisitionState::PermissionDenied | LocationAcquisitionState::Resolved(_) | LocationAcquisitionState::Failed(_)
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("positioning disabled")]
    PositioningDisabled,
    #[error("positioning unavailable")]
    PositioningUnavailable,
    #[error("the platform delivered no location")]
    NoLocation,
    #[error("no location received within the timeout")]
    Timeout,
    #[error("location platform error: {0}")]
    Platform(String),
}

impl LocationError {
    /// Whether the user can fix the failure in place, by enabling positioning and retrying.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, LocationError::PositioningDisabled)
    }
}
