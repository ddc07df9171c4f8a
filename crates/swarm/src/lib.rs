//! SwarmLink fleet coordination
//!
//! Runs every vehicle's control loop, keeps the shared fleet registry,
//! watches for vehicles flying too close together and bridges fleet state
//! to the network snapshot.

pub mod aggregator;
pub mod bridge;
pub mod collision;
pub mod error;
pub mod fleet;
pub mod registry;
pub mod vehicle;

pub use aggregator::aggregate;
pub use bridge::{floor_height, Bridge};
pub use collision::CollisionMonitor;
pub use error::{SwarmError, SwarmResult};
pub use fleet::{Fleet, FleetMember};
pub use registry::{CommandSlot, FleetRegistry, VehicleTelemetry};
pub use vehicle::Vehicle;
