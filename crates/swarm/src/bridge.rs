//! Synchronization bridge
//!
//! Reconciles the fleet registry with the network snapshot on a short fixed
//! period. Each cycle:
//! - targets are copied from the snapshot into the registry
//! - operations are copied in only when a client wrote new ones since the last
//!   cycle; otherwise the registry's operations, expired ones included, are
//!   written back out
//! - positions (shifted down by the floor height), states, operations and the
//!   aggregate fleet state are published for notifications

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use swarmlink_core::{Position, VehicleId};
use swarmlink_protocol::OperationMap;
use swarmlink_server::{OperationExchange, Outbound, SharedSnapshot};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::aggregator::aggregate;
use crate::registry::FleetRegistry;

/// Lowest starting altitude in the fleet, or 0 for an empty fleet.
pub fn floor_height(initial_positions: &BTreeMap<VehicleId, Position>) -> f64 {
    initial_positions
        .values()
        .map(|position| position.z)
        .reduce(f64::min)
        .unwrap_or(0.0)
}

pub struct Bridge {
    registry: Arc<FleetRegistry>,
    snapshot: Arc<SharedSnapshot>,
    floor: f64,
    observed_operations: OperationMap,
}

impl Bridge {
    pub fn new(registry: Arc<FleetRegistry>, snapshot: Arc<SharedSnapshot>, floor: f64) -> Self {
        let observed_operations = snapshot.operations();
        Self {
            registry,
            snapshot,
            floor,
            observed_operations,
        }
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }

    /// Run one reconciliation cycle.
    pub fn sync(&mut self) {
        let telemetry = self.registry.telemetry();

        self.registry.set_targets(&self.snapshot.targets());

        let fleet_operations = self.registry.operations();
        let (exchange, observed) = self
            .snapshot
            .exchange_operations(&self.observed_operations, &fleet_operations);
        if let OperationExchange::Pulled(requested) = exchange {
            debug!(?requested, "Applying requested operations");
            self.registry.apply_operations(&requested);
        }
        self.observed_operations = observed;

        let outbound = Outbound {
            positions: telemetry
                .iter()
                .map(|(id, entry)| (*id, entry.position.above_floor(self.floor)))
                .collect(),
            states: telemetry.iter().map(|(id, entry)| (*id, entry.state)).collect(),
            operations: self.registry.operations(),
            fleet_state: aggregate(telemetry.values().map(|entry| entry.state)),
        };
        self.snapshot.publish(outbound);
    }

    /// Sync every `period` until cancelled.
    pub async fn run(mut self, period: Duration, cancel: CancellationToken) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(floor = self.floor, period_ms = period.as_millis() as u64, "Bridge started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Bridge stopped");
                    return;
                }
                _ = ticker.tick() => self.sync(),
            }
        }
    }
}
