//! Error types for the SwarmLink wire protocol.

use swarmlink_core::VehicleId;
use thiserror::Error;

/// Errors raised while encoding or decoding protocol frames.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// First byte does not name a known message
    #[error("Unknown message type: {0}")]
    UnknownMessage(u8),

    /// Operation code outside the known set
    #[error("Invalid operation code {code} for {vehicle}")]
    InvalidOperation {
        /// Vehicle the entry was addressed to
        vehicle: VehicleId,
        /// Offending code
        code: u8,
    },

    /// Vehicle state code outside the known set
    #[error("Invalid vehicle state code {code} for {vehicle}")]
    InvalidVehicleState {
        /// Vehicle the entry describes
        vehicle: VehicleId,
        /// Offending code
        code: u8,
    },

    /// Fleet state code outside the known set
    #[error("Invalid fleet state code: {0}")]
    InvalidFleetState(u8),

    /// Swarm operation code outside the known set
    #[error("Invalid swarm operation code: {0}")]
    InvalidSwarmOperation(u8),

    /// A section holds more entries than its one-byte count can express
    #[error("Too many {section} entries: {count} (max 255)")]
    TooManyEntries {
        /// Message section name
        section: &'static str,
        /// Number of entries
        count: usize,
    },

    /// Coordinate cannot be represented in 4-decimal fixed point
    #[error("Coordinate {0} does not fit the fixed-point range")]
    CoordinateOutOfRange(f64),

    /// Underlying I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
