use crate::domain::GeoPoint;
use crate::location::platform::SettingsCheck;
use crate::location::state::{LocationAcquisitionState, LocationError};
use LocationAcquisitionState::*;
use tracing::{debug, trace};

/// Something that happened, fed into the machine.
#[derive(Clone, Debug, PartialEq)]
pub enum Input {
    Activate,
    PermissionChecked(bool),
    PermissionAnswered(bool),
    SettingsChecked(SettingsCheck),
    ResolutionAnswered(bool),
    LocationDelivered(Option<GeoPoint>),
    LocationTimedOut,
    PlatformFailed(String),
    RetryRequested(u64),
}

/// Something the machine wants done, executed in order by the driver.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    CheckPermission,
    RequestPermission,
    NotifyPermissionGranted,
    CheckSettings,
    PresentResolution,
    RegisterLocationCallback,
    UnregisterLocationCallback,
    DeliverLocation(GeoPoint),
    ReportError(LocationError),
}

/// The location acquisition flow as explicit transitions.
///
/// The machine performs no I/O. Inputs that make no sense in the current
/// state are ignored and produce no effects.
#[derive(Debug)]
pub struct LocationStateMachine {
    state: LocationAcquisitionState,
    permission_granted: bool,
    callback_registered: bool,
    observed_retry: u64,
}

impl LocationStateMachine {
    /// Creates a machine that has already seen `retry_counter`, only larger values trigger a retry.
    pub fn new(retry_counter: u64) -> Self {
        LocationStateMachine {
            state: Idle,
            permission_granted: false,
            callback_registered: false,
            observed_retry: retry_counter,
        }
    }

    pub fn state(&self) -> &LocationAcquisitionState {
        &self.state
    }

    pub fn handle(&mut self, input: Input) -> Vec<Effect> {
        trace!(state = ?self.state, ?input, "📍 Handling input");

        let effects = match (self.state.clone(), input) {
            (_, Input::RetryRequested(counter)) => self.retry(counter),
            (state, Input::PlatformFailed(message)) if !state.is_terminal() => {
                let mut effects = self.release_callback();
                effects.extend(self.fail(LocationError::Platform(message)));
                effects
            }
            (Idle, Input::Activate) => vec![Effect::CheckPermission],
            (Idle, Input::PermissionChecked(true)) => {
                self.permission_granted = true;
                self.check_settings()
            }
            (Idle, Input::PermissionChecked(false)) => {
                self.state = AwaitingPermission;
                vec![Effect::RequestPermission]
            }
            (AwaitingPermission, Input::PermissionAnswered(true)) => {
                self.permission_granted = true;
                let mut effects = vec![Effect::NotifyPermissionGranted];
                effects.extend(self.check_settings());
                effects
            }
            (AwaitingPermission, Input::PermissionAnswered(false)) => {
                self.state = PermissionDenied;
                vec![Effect::ReportError(LocationError::PermissionDenied)]
            }
            (CheckingSettings, Input::SettingsChecked(SettingsCheck::Satisfied)) => {
                self.state = FetchingLocation;
                self.callback_registered = true;
                vec![Effect::RegisterLocationCallback]
            }
            (CheckingSettings, Input::SettingsChecked(SettingsCheck::Resolvable)) => {
                self.state = AwaitingGpsEnable;
                vec![Effect::PresentResolution]
            }
            (CheckingSettings, Input::SettingsChecked(SettingsCheck::Unavailable)) => self.fail(LocationError::PositioningUnavailable),
            (AwaitingGpsEnable, Input::ResolutionAnswered(true)) => self.check_settings(),
            (AwaitingGpsEnable, Input::ResolutionAnswered(false)) => self.fail(LocationError::PositioningDisabled),
            (FetchingLocation, Input::LocationDelivered(Some(point))) => {
                let mut effects = self.release_callback();
                self.state = Resolved(point);
                effects.push(Effect::DeliverLocation(point));
                effects
            }
            (FetchingLocation, Input::LocationDelivered(None)) => {
                let mut effects = self.release_callback();
                effects.extend(self.fail(LocationError::NoLocation));
                effects
            }
            (FetchingLocation, Input::LocationTimedOut) => {
                let mut effects = self.release_callback();
                effects.extend(self.fail(LocationError::Timeout));
                effects
            }
            (state, input) => {
                debug!(?state, ?input, "📍 Ignoring input");
                vec![]
            }
        };

        trace!(state = ?self.state, ?effects, "📍 Handled input");
        effects
    }

    fn retry(&mut self, counter: u64) -> Vec<Effect> {
        if counter <= self.observed_retry {
            debug!(counter, observed = self.observed_retry, "📍 Ignoring stale retry counter");
            return vec![];
        }
        self.observed_retry = counter;

        let mut effects = self.release_callback();
        if self.permission_granted {
            effects.extend(self.check_settings());
        } else {
            self.state = Idle;
            effects.push(Effect::CheckPermission);
        }
        effects
    }

    fn check_settings(&mut self) -> Vec<Effect> {
        self.state = CheckingSettings;
        vec![Effect::CheckSettings]
    }

    fn fail(&mut self, error: LocationError) -> Vec<Effect> {
        self.state = Failed(error.clone());
        vec![Effect::ReportError(error)]
    }

    fn release_callback(&mut self) -> Vec<Effect> {
        if std::mem::take(&mut self.callback_registered) {
            vec![Effect::UnregisterLocationCallback]
        } else {
            vec![]
        }
    }
}
