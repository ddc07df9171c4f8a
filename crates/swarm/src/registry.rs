//! Fleet registry
//!
//! Per-vehicle state shared between vehicle tasks and the bridge:
//! - the telemetry table (position and lifecycle state of every vehicle)
//!   behind a single `RwLock`, so a reader always sees one consistent copy
//! - one command slot (pending operation and target) per vehicle, each
//!   behind its own `Mutex`
//!
//! Membership is fixed at construction.

use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use swarmlink_core::{Operation, Position, VehicleId, VehicleState};
use swarmlink_protocol::{OperationMap, TargetMap};

use crate::error::{SwarmError, SwarmResult};

/// Last published position and state of one vehicle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleTelemetry {
    pub position: Position,
    pub state: VehicleState,
}

/// Commands waiting for a vehicle
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CommandSlot {
    pub operation: Operation,
    pub target: Option<Position>,
}

#[derive(Debug)]
pub struct FleetRegistry {
    telemetry: RwLock<BTreeMap<VehicleId, VehicleTelemetry>>,
    commands: BTreeMap<VehicleId, Mutex<CommandSlot>>,
}

impl FleetRegistry {
    /// Register every vehicle at its starting position, Idle, with no
    /// pending operation and its own position as target.
    pub fn new(initial_positions: &BTreeMap<VehicleId, Position>) -> Self {
        let telemetry = initial_positions
            .iter()
            .map(|(id, position)| {
                let entry = VehicleTelemetry {
                    position: *position,
                    state: VehicleState::Idle,
                };
                (*id, entry)
            })
            .collect();
        let commands = initial_positions
            .iter()
            .map(|(id, position)| {
                let slot = CommandSlot {
                    operation: Operation::None,
                    target: Some(*position),
                };
                (*id, Mutex::new(slot))
            })
            .collect();
        Self {
            telemetry: RwLock::new(telemetry),
            commands,
        }
    }

    /// Publish a vehicle's position and state together.
    pub fn publish(&self, vehicle: VehicleId, position: Position, state: VehicleState) -> SwarmResult<()> {
        let mut table = self.telemetry.write();
        let entry = table
            .get_mut(&vehicle)
            .ok_or(SwarmError::UnknownVehicle(vehicle))?;
        *entry = VehicleTelemetry { position, state };
        Ok(())
    }

    /// Complete copy of the telemetry table
    pub fn telemetry(&self) -> BTreeMap<VehicleId, VehicleTelemetry> {
        self.telemetry.read().clone()
    }

    pub fn state(&self, vehicle: VehicleId) -> Option<VehicleState> {
        self.telemetry.read().get(&vehicle).map(|entry| entry.state)
    }

    pub fn command(&self, vehicle: VehicleId) -> Option<CommandSlot> {
        self.commands.get(&vehicle).map(|slot| *slot.lock())
    }

    /// Run `f` with exclusive access to a vehicle's command slot.
    pub fn with_command<R>(
        &self,
        vehicle: VehicleId,
        f: impl FnOnce(&mut CommandSlot) -> R,
    ) -> SwarmResult<R> {
        let slot = self
            .commands
            .get(&vehicle)
            .ok_or(SwarmError::UnknownVehicle(vehicle))?;
        Ok(f(&mut slot.lock()))
    }

    /// Replace every vehicle's target. Vehicles missing from `targets` lose
    /// their target; entries for unknown vehicles are ignored.
    pub fn set_targets(&self, targets: &TargetMap) {
        for (id, slot) in &self.commands {
            slot.lock().target = targets.get(id).copied();
        }
    }

    /// Replace every vehicle's pending operation. Vehicles missing from
    /// `operations` get [`Operation::None`].
    pub fn apply_operations(&self, operations: &OperationMap) {
        for (id, slot) in &self.commands {
            slot.lock().operation = operations.get(id).copied().unwrap_or_default();
        }
    }

    pub fn operations(&self) -> OperationMap {
        self.commands
            .iter()
            .map(|(id, slot)| (*id, slot.lock().operation))
            .collect()
    }

    /// Targets of every vehicle that has one
    pub fn targets(&self) -> TargetMap {
        self.commands
            .iter()
            .filter_map(|(id, slot)| slot.lock().target.map(|target| (*id, target)))
            .collect()
    }
}
