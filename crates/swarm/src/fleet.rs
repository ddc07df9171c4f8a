//! Fleet assembly
//!
//! Ties vehicles, the registry, the bridge and the network snapshot together
//! and spawns their tasks under one cancellation token.

use std::collections::BTreeMap;
use std::sync::Arc;
use swarmlink_core::{Config, Position, VehicleId};
use swarmlink_flight::{FlightActuator, SimulatedActuator};
use swarmlink_server::SharedSnapshot;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::bridge::{floor_height, Bridge};
use crate::error::{SwarmError, SwarmResult};
use crate::registry::FleetRegistry;
use crate::vehicle::Vehicle;

/// One vehicle to be flown by the fleet
pub struct FleetMember {
    pub id: VehicleId,
    pub start: Position,
    pub actuator: Box<dyn FlightActuator>,
}

impl FleetMember {
    /// A simulated vehicle resting at `start`.
    pub fn simulated(id: VehicleId, start: Position, config: &Config) -> Self {
        Self {
            id,
            start,
            actuator: Box::new(SimulatedActuator::new(start, config.simulator)),
        }
    }
}

pub struct Fleet {
    config: Config,
    members: Vec<FleetMember>,
    registry: Arc<FleetRegistry>,
    snapshot: Arc<SharedSnapshot>,
    floor: f64,
}

impl Fleet {
    pub fn new(config: Config, members: Vec<FleetMember>) -> SwarmResult<Self> {
        let mut starts = BTreeMap::new();
        for member in &members {
            if starts.insert(member.id, member.start).is_some() {
                return Err(SwarmError::DuplicateVehicle(member.id));
            }
        }
        let floor = floor_height(&starts);
        info!(vehicles = members.len(), floor, "Fleet assembled");

        Ok(Self {
            config,
            members,
            registry: Arc::new(FleetRegistry::new(&starts)),
            snapshot: Arc::new(SharedSnapshot::new(&starts)),
            floor,
        })
    }

    /// Simulated vehicles numbered in the order given.
    pub fn simulated(config: Config, starts: &[Position]) -> SwarmResult<Self> {
        let members = starts
            .iter()
            .zip(0u16..)
            .map(|(start, id)| FleetMember::simulated(VehicleId(id), *start, &config))
            .collect();
        Self::new(config, members)
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }

    pub fn registry(&self) -> Arc<FleetRegistry> {
        Arc::clone(&self.registry)
    }

    /// Snapshot to hand to the network server
    pub fn snapshot(&self) -> Arc<SharedSnapshot> {
        Arc::clone(&self.snapshot)
    }

    /// Spawn one task per vehicle plus the bridge.
    ///
    /// A vehicle that hits a fatal fault ends its own task only; the rest of
    /// the fleet keeps flying.
    pub fn spawn(self, cancel: &CancellationToken) -> JoinSet<SwarmResult<()>> {
        let mut tasks = JoinSet::new();

        for member in self.members {
            let id = member.id;
            let vehicle = Vehicle::new(
                id,
                member.actuator,
                member.start,
                &self.config,
                Arc::clone(&self.registry),
            );
            let token = cancel.child_token();
            tasks.spawn(async move {
                let result = vehicle.run(token).await;
                if let Err(e) = &result {
                    error!(vehicle = %id, error = %e, "Vehicle control loop ended");
                }
                result
            });
        }

        let bridge = Bridge::new(self.registry, self.snapshot, self.floor);
        let period = self.config.swarm.bridge_period();
        let token = cancel.child_token();
        tasks.spawn(async move {
            bridge.run(period, token).await;
            Ok(())
        });

        tasks
    }
}
