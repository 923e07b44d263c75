use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LocationOperation {
    RequestPermission,
    CurrentPosition,
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
pub enum LocationError {
    #[error("location services are not available on this device")]
    Unavailable,

    #[error("position request failed: {reason}")]
    Acquisition { reason: String },

    #[error("unexpected shell response: {reason}")]
    UnexpectedResponse { reason: String },
}

impl LocationError {
    #[must_use]
    pub fn acquisition(reason: impl Into<String>) -> Self {
        Self::Acquisition {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum LocationOutput {
    Permission { granted: bool },
    Position { latitude: f64, longitude: f64 },
}

impl LocationOutput {
    #[must_use]
    pub const fn is_granted(&self) -> bool {
        matches!(self, Self::Permission { granted: true })
    }
}

pub type LocationResult = Result<LocationOutput, LocationError>;

/// A one-shot position sample, as raw shell-delivered degrees.
pub type PositionResult = Result<(f64, f64), LocationError>;

impl Operation for LocationOperation {
    type Output = LocationResult;
}

pub struct Location<Ev> {
    context: CapabilityContext<LocationOperation, Ev>,
}

impl<Ev> Capability<Ev> for Location<Ev> {
    type Operation = LocationOperation;
    type MappedSelf<MappedEv> = Location<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static,
    {
        Location::new(self.context.map_event(f))
    }
}

impl<Ev> Location<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<LocationOperation, Ev>) -> Self {
        Self { context }
    }

    /// Asks the platform for foreground location access. Any error from the
    /// shell is reported as a denial; the distinction does not matter to the
    /// caller, which only branches on granted-or-not.
    pub fn request_permission<F>(&self, make_event: F)
    where
        F: Fn(bool) -> Ev + Send + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            let result = context
                .request_from_shell(LocationOperation::RequestPermission)
                .await;

            let granted = result.map(|output| output.is_granted()).unwrap_or(false);
            context.update_app(make_event(granted));
        });
    }

    /// Requests a single current-position sample. Not a stream: the shell
    /// resolves this exactly once, whenever the platform gets a fix. No
    /// timeout is applied on either side.
    pub fn current_position<F>(&self, make_event: F)
    where
        F: Fn(PositionResult) -> Ev + Send + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            let result = context
                .request_from_shell(LocationOperation::CurrentPosition)
                .await;

            let position = match result {
                Ok(LocationOutput::Position {
                    latitude,
                    longitude,
                }) => Ok((latitude, longitude)),
                Ok(other) => Err(LocationError::UnexpectedResponse {
                    reason: format!("{other:?}"),
                }),
                Err(e) => Err(e),
            };
            context.update_app(make_event(position));
        });
    }
}
