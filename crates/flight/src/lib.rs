//! Single-vehicle flight control for SwarmLink.
//!
//! Holds the per-vehicle lifecycle state machine, the actuator seam it
//! drives, and a simulated actuator for virtual vehicles.

pub mod actuator;
pub mod error;
pub mod simulator;
pub mod state_machine;

pub use actuator::{ActuatorError, ActuatorResult, FlightActuator};
pub use error::{FlightError, FlightResult};
pub use simulator::{PiController, SimulatedActuator};
pub use state_machine::{FlightStateMachine, TickInput, TickOutcome};
