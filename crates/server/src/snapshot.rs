//! Shared fleet snapshot
//!
//! The single point of contact between network connections and the fleet.
//! Connections write the inbound half (targets and operations requested by
//! clients) and read the outbound half (what notifications report). The bridge
//! does the opposite. Every access copies under one lock that is never held
//! across an await point.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use swarmlink_core::{FleetState, Operation, Position, VehicleId, VehicleState};
use swarmlink_protocol::{OperationMap, SwarmNotification, TargetMap};
use tracing::debug;

/// State reported to clients, as last published by the bridge
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outbound {
    pub positions: BTreeMap<VehicleId, Position>,
    pub states: BTreeMap<VehicleId, VehicleState>,
    pub operations: OperationMap,
    pub fleet_state: FleetState,
}

#[derive(Debug)]
struct Tables {
    vehicles: Vec<VehicleId>,
    targets: TargetMap,
    operations: OperationMap,
    outbound: Outbound,
}

/// Outcome of [`SharedSnapshot::exchange_operations`]
#[derive(Debug, Clone, PartialEq)]
pub enum OperationExchange {
    /// A client wrote new operations since the previous exchange
    Pulled(OperationMap),
    /// Nothing new arrived; the fleet's own operations were written back
    Republished,
}

/// Inbound and outbound fleet tables behind one lock.
#[derive(Debug)]
pub struct SharedSnapshot {
    tables: Mutex<Tables>,
}

impl SharedSnapshot {
    /// Seed the snapshot from the fleet's starting positions.
    ///
    /// Every vehicle starts Idle with no pending operation, targeting the
    /// place it stands.
    pub fn new(initial_positions: &BTreeMap<VehicleId, Position>) -> Self {
        let vehicles: Vec<VehicleId> = initial_positions.keys().copied().collect();
        let operations: OperationMap = vehicles.iter().map(|id| (*id, Operation::None)).collect();
        let outbound = Outbound {
            positions: initial_positions.clone(),
            states: vehicles.iter().map(|id| (*id, VehicleState::Idle)).collect(),
            operations: operations.clone(),
            fleet_state: FleetState::Idle,
        };
        Self {
            tables: Mutex::new(Tables {
                vehicles,
                targets: initial_positions.clone(),
                operations,
                outbound,
            }),
        }
    }

    /// Replace the whole target map.
    pub fn replace_targets(&self, targets: TargetMap) {
        debug!(count = targets.len(), "Targets replaced");
        self.tables.lock().targets = targets;
    }

    /// Replace the whole inbound operation map.
    pub fn replace_operations(&self, operations: OperationMap) {
        debug!(count = operations.len(), "Operations replaced");
        self.tables.lock().operations = operations;
    }

    /// Request `operation` for every known vehicle.
    pub fn fan_out(&self, operation: Operation) {
        let mut tables = self.tables.lock();
        let operations = tables.vehicles.iter().map(|id| (*id, operation)).collect();
        tables.operations = operations;
    }

    pub fn targets(&self) -> TargetMap {
        self.tables.lock().targets.clone()
    }

    pub fn operations(&self) -> OperationMap {
        self.tables.lock().operations.clone()
    }

    /// Reconcile inbound operations with the fleet's own.
    ///
    /// If the inbound map differs from `previous`, a client wrote to it and the
    /// new map is returned for the fleet to apply. Otherwise `fleet` is written
    /// back over it so that expired operations show up as expired. The compare
    /// and the write happen under one lock, so a client write cannot slip in
    /// between. Returns the outcome and the inbound map as it now stands.
    pub fn exchange_operations(
        &self,
        previous: &OperationMap,
        fleet: &OperationMap,
    ) -> (OperationExchange, OperationMap) {
        let mut tables = self.tables.lock();
        if tables.operations != *previous {
            let pulled = tables.operations.clone();
            (OperationExchange::Pulled(pulled.clone()), pulled)
        } else {
            tables.operations = fleet.clone();
            (OperationExchange::Republished, fleet.clone())
        }
    }

    /// Publish what notifications report.
    pub fn publish(&self, outbound: Outbound) {
        self.tables.lock().outbound = outbound;
    }

    pub fn outbound(&self) -> Outbound {
        self.tables.lock().outbound.clone()
    }

    /// Build the notification sent to registered clients.
    pub fn notification(&self) -> SwarmNotification {
        let tables = self.tables.lock();
        SwarmNotification {
            positions: tables.outbound.positions.clone(),
            targets: tables.targets.clone(),
            states: tables.outbound.states.clone(),
            operations: tables.outbound.operations.clone(),
            fleet_state: tables.outbound.fleet_state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fleet() -> SharedSnapshot {
        let positions = [
            (VehicleId(0), Position::new(0.0, 0.0, 0.1, 0.0)),
            (VehicleId(1), Position::new(1.0, 0.0, 0.12, 0.0)),
        ]
        .into_iter()
        .collect();
        SharedSnapshot::new(&positions)
    }

    #[test]
    fn test_initial_snapshot() {
        let snapshot = fleet();
        let note = snapshot.notification();
        assert_eq!(note.positions.len(), 2);
        assert_eq!(note.targets, note.positions);
        assert_eq!(note.states[&VehicleId(1)], VehicleState::Idle);
        assert_eq!(note.operations[&VehicleId(0)], Operation::None);
        assert_eq!(note.fleet_state, FleetState::Idle);
    }

    #[test]
    fn test_set_targets_replaces_map() {
        let snapshot = fleet();
        snapshot.replace_targets(TargetMap::new());
        assert!(snapshot.targets().is_empty());

        let target = Position::new(1.0, 2.0, 3.0, 0.0);
        snapshot.replace_targets([(VehicleId(2), target)].into_iter().collect());
        let targets = snapshot.targets();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[&VehicleId(2)], target);
    }

    #[test]
    fn test_fan_out_covers_every_vehicle() {
        let snapshot = fleet();
        snapshot.replace_operations([(VehicleId(0), Operation::Move)].into_iter().collect());
        snapshot.fan_out(Operation::Land);
        let operations = snapshot.operations();
        assert_eq!(operations.len(), 2);
        assert!(operations.values().all(|op| *op == Operation::Land));
    }

    #[test]
    fn test_exchange_pulls_new_requests_once() {
        let snapshot = fleet();
        let previous = snapshot.operations();
        let request: OperationMap = [(VehicleId(0), Operation::TakeOff)].into_iter().collect();
        snapshot.replace_operations(request.clone());

        let fleet_ops: OperationMap = previous.clone();
        let (outcome, observed) = snapshot.exchange_operations(&previous, &fleet_ops);
        assert_eq!(outcome, OperationExchange::Pulled(request.clone()));
        assert_eq!(observed, request);

        // Unchanged since last time: the fleet's view wins.
        let (outcome, observed) = snapshot.exchange_operations(&observed, &fleet_ops);
        assert_eq!(outcome, OperationExchange::Republished);
        assert_eq!(observed, fleet_ops);
        assert_eq!(snapshot.operations(), fleet_ops);
    }

    #[test]
    fn test_notification_reports_published_operations() {
        let snapshot = fleet();
        let mut outbound = snapshot.outbound();
        outbound.operations.insert(VehicleId(1), Operation::FastStop);
        outbound.fleet_state = FleetState::Stopping;
        snapshot.publish(outbound);

        let note = snapshot.notification();
        assert_eq!(note.operations[&VehicleId(1)], Operation::FastStop);
        assert_eq!(note.fleet_state, FleetState::Stopping);
    }
}
