//! Fleet state aggregation.

use swarmlink_core::{FleetState, VehicleState};
use tracing::warn;

/// Fold per-vehicle states into one fleet state.
///
/// Any vehicle moving, taking off, landing or stopping (checked in that
/// order) decides the fleet state. Otherwise the fleet is Hovering or Idle if
/// every vehicle agrees. A mix of hovering and idle vehicles is treated as
/// Stopping. An empty fleet is Idle.
pub fn aggregate<I>(states: I) -> FleetState
where
    I: IntoIterator<Item = VehicleState>,
{
    let states: Vec<VehicleState> = states.into_iter().collect();
    let any = |wanted: VehicleState| states.iter().any(|s| *s == wanted);
    let all = |wanted: VehicleState| states.iter().all(|s| *s == wanted);

    if states.is_empty() {
        FleetState::Idle
    } else if any(VehicleState::Moving) {
        FleetState::Moving
    } else if any(VehicleState::TakingOff) {
        FleetState::TakingOff
    } else if any(VehicleState::Landing) {
        FleetState::Landing
    } else if any(VehicleState::Stopping) {
        FleetState::Stopping
    } else if all(VehicleState::Hovering) {
        FleetState::Hovering
    } else if all(VehicleState::Idle) {
        FleetState::Idle
    } else {
        warn!(?states, "Fleet is split between hovering and idle");
        FleetState::Stopping
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use VehicleState::*;

    #[test]
    fn test_moving_dominates() {
        assert_eq!(aggregate([Hovering, Moving]), FleetState::Moving);
        assert_eq!(aggregate([TakingOff, Moving, Stopping]), FleetState::Moving);
    }

    #[test]
    fn test_priority_order() {
        assert_eq!(aggregate([TakingOff, Landing]), FleetState::TakingOff);
        assert_eq!(aggregate([Landing, Stopping]), FleetState::Landing);
        assert_eq!(aggregate([Stopping, Idle]), FleetState::Stopping);
    }

    #[test]
    fn test_unanimous_states() {
        assert_eq!(aggregate([Idle, Idle]), FleetState::Idle);
        assert_eq!(aggregate([Hovering, Hovering, Hovering]), FleetState::Hovering);
    }

    #[test]
    fn test_mixed_hover_and_idle_is_stopping() {
        assert_eq!(aggregate([Hovering, Idle]), FleetState::Stopping);
    }

    #[test]
    fn test_empty_fleet_is_idle() {
        assert_eq!(aggregate(Vec::new()), FleetState::Idle);
    }
}
