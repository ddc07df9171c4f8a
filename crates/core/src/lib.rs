//! Core functionality for the SwarmLink fleet controller.
//!
//! This crate provides the fleet vocabulary (vehicle identifiers, positions,
//! operations and states), configuration loading and logging setup used
//! across the SwarmLink workspace.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::{Config, FlightConfig, NetworkConfig, SimulatorConfig, SwarmConfig};
pub use error::{CoreError, CoreResult};
pub use types::{
    FleetState, Operation, Position, SwarmOperation, Telemetry, VehicleId, VehicleState,
};
