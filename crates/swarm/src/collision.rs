//! Proximity check between vehicles.

use std::collections::BTreeMap;
use swarmlink_core::{Position, VehicleId};

use crate::registry::VehicleTelemetry;

/// Flags vehicles that come within a fixed radius of one another.
#[derive(Debug, Clone, Copy)]
pub struct CollisionMonitor {
    safety_radius: f64,
}

impl CollisionMonitor {
    pub fn new(safety_radius: f64) -> Self {
        Self { safety_radius }
    }

    /// Closest other vehicle within the safety radius of `position`, with its
    /// distance.
    pub fn nearest_conflict(
        &self,
        vehicle: VehicleId,
        position: &Position,
        fleet: &BTreeMap<VehicleId, VehicleTelemetry>,
    ) -> Option<(VehicleId, f64)> {
        fleet
            .iter()
            .filter(|(id, _)| **id != vehicle)
            .map(|(id, other)| (*id, position.distance_to(&other.position)))
            .filter(|(_, distance)| *distance <= self.safety_radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}
