//! Flight actuator seam
//!
//! A flight actuator turns high-level commands into vehicle motion and
//! reports telemetry back. Physical vehicles implement it on top of their
//! radio driver; [`crate::simulator::SimulatedActuator`] implements it with
//! a position controller.

use std::time::Duration;
use swarmlink_core::{Position, Telemetry};
use thiserror::Error;

/// Errors reported by a flight actuator
#[derive(Debug, Error)]
pub enum ActuatorError {
    /// The link to the vehicle is down
    #[error("Link error: {0}")]
    Link(String),
}

/// Result type for actuator commands.
pub type ActuatorResult<T> = Result<T, ActuatorError>;

/// High-level commander of a single vehicle.
///
/// Commands return as soon as they are issued; they do not wait for the
/// maneuver to finish.
pub trait FlightActuator: Send {
    /// Climb to `height_m` over `duration`.
    fn takeoff(&mut self, height_m: f64, duration: Duration) -> ActuatorResult<()>;

    /// Descend to `height_m` over `duration`.
    fn land(&mut self, height_m: f64, duration: Duration) -> ActuatorResult<()>;

    /// Fly a straight line to `target`, arriving after `duration`.
    fn go_to(&mut self, target: Position, duration: Duration) -> ActuatorResult<()>;

    /// Cut the current maneuver immediately.
    fn stop(&mut self) -> ActuatorResult<()>;

    /// Advance by one control period of length `dt` and return the latest
    /// telemetry sample, if one arrived.
    fn sample(&mut self, dt: Duration) -> Option<Telemetry>;
}

impl<A: FlightActuator + ?Sized> FlightActuator for Box<A> {
    fn takeoff(&mut self, height_m: f64, duration: Duration) -> ActuatorResult<()> {
        (**self).takeoff(height_m, duration)
    }

    fn land(&mut self, height_m: f64, duration: Duration) -> ActuatorResult<()> {
        (**self).land(height_m, duration)
    }

    fn go_to(&mut self, target: Position, duration: Duration) -> ActuatorResult<()> {
        (**self).go_to(target, duration)
    }

    fn stop(&mut self) -> ActuatorResult<()> {
        (**self).stop()
    }

    fn sample(&mut self, dt: Duration) -> Option<Telemetry> {
        (**self).sample(dt)
    }
}
