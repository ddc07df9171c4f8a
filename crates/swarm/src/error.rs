//! Error types for fleet coordination.

use swarmlink_core::VehicleId;
use swarmlink_flight::FlightError;
use thiserror::Error;

/// Errors that can occur while assembling or running the fleet.
#[derive(Debug, Error)]
pub enum SwarmError {
    /// A vehicle hit a fatal flight fault
    #[error("Flight fault: {0}")]
    Flight(#[from] FlightError),

    /// Two fleet members share an identifier
    #[error("Duplicate vehicle: {0}")]
    DuplicateVehicle(VehicleId),

    /// Vehicle is not part of the fleet
    #[error("Unknown vehicle: {0}")]
    UnknownVehicle(VehicleId),
}

/// Result type for fleet operations.
pub type SwarmResult<T> = Result<T, SwarmError>;
