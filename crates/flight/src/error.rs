//! Error types for vehicle flight control.

use swarmlink_core::VehicleId;
use thiserror::Error;

use crate::actuator::ActuatorError;

/// Faults that end a vehicle's control loop.
#[derive(Debug, Error)]
pub enum FlightError {
    /// An actuator command failed
    #[error("{vehicle}: {command} failed: {source}")]
    Actuator {
        /// Vehicle whose actuator failed
        vehicle: VehicleId,
        /// Command that was being issued
        command: &'static str,
        /// Underlying actuator error
        #[source]
        source: ActuatorError,
    },
}

/// Result type for flight operations.
pub type FlightResult<T> = Result<T, FlightError>;
