//! Vehicle control task
//!
//! Each vehicle runs its own loop at the flight tick period:
//! 1. take a telemetry sample from the actuator
//! 2. read the pending command and, while moving, check for conflicts
//! 3. advance the state machine
//! 4. publish position and state, then debounce the operation slot

use std::sync::Arc;
use swarmlink_core::{Config, Position, VehicleId};
use swarmlink_flight::{FlightActuator, FlightStateMachine, TickInput, TickOutcome};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::collision::CollisionMonitor;
use crate::error::{SwarmError, SwarmResult};
use crate::registry::FleetRegistry;

pub struct Vehicle<A> {
    id: VehicleId,
    actuator: A,
    machine: FlightStateMachine,
    monitor: CollisionMonitor,
    registry: Arc<FleetRegistry>,
    position: Position,
    battery_level: Option<u8>,
}

impl<A: FlightActuator> Vehicle<A> {
    pub fn new(
        id: VehicleId,
        actuator: A,
        start: Position,
        config: &Config,
        registry: Arc<FleetRegistry>,
    ) -> Self {
        Self {
            id,
            actuator,
            machine: FlightStateMachine::new(id, config.flight.clone(), Instant::now().into_std()),
            monitor: CollisionMonitor::new(config.swarm.safety_radius_m),
            registry,
            position: start,
            battery_level: None,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    fn sample(&mut self) {
        let period = self.machine.config().tick_period();
        let Some(telemetry) = self.actuator.sample(period) else {
            return;
        };
        self.position = telemetry.position();
        if self.battery_level != Some(telemetry.battery_level) {
            info!(vehicle = %self.id, battery = telemetry.battery_level, "Battery level");
            self.battery_level = Some(telemetry.battery_level);
        }
    }

    /// Run one control tick at `now`.
    pub fn tick(&mut self, now: std::time::Instant) -> SwarmResult<TickOutcome> {
        self.sample();

        let command = self
            .registry
            .command(self.id)
            .ok_or(SwarmError::UnknownVehicle(self.id))?;
        let collision = self.machine.state() == swarmlink_core::VehicleState::Moving && {
            let fleet = self.registry.telemetry();
            match self.monitor.nearest_conflict(self.id, &self.position, &fleet) {
                Some((other, distance)) => {
                    warn!(vehicle = %self.id, other = %other, distance, "Vehicles too close");
                    true
                }
                None => false,
            }
        };

        let input = TickInput {
            now,
            operation: command.operation,
            target: command.target,
            position: self.position,
            collision,
        };
        let outcome = self.machine.tick(input, &mut self.actuator);

        self.registry
            .publish(self.id, self.position, self.machine.state())?;
        let machine = &mut self.machine;
        self.registry.with_command(self.id, |slot| {
            slot.operation = machine.settle_operation(slot.operation);
        })?;
        Ok(outcome)
    }

    /// Tick until cancelled or until a fatal fault.
    ///
    /// A vehicle that is still airborne when cancelled is stopped.
    pub async fn run(mut self, cancel: CancellationToken) -> SwarmResult<()> {
        let mut ticker = interval(self.machine.config().tick_period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(vehicle = %self.id, start = %self.position, "Vehicle control loop started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    if self.machine.state().is_airborne() {
                        info!(vehicle = %self.id, state = ?self.machine.state(), "Stopping vehicle on shutdown");
                        if let Err(e) = self.actuator.stop() {
                            error!(vehicle = %self.id, error = %e, "Stop on shutdown failed");
                        }
                    }
                    debug!(vehicle = %self.id, "Vehicle control loop cancelled");
                    return Ok(());
                }
                tick = ticker.tick() => {
                    match self.tick(tick.into_std())? {
                        TickOutcome::Continuing => {}
                        TickOutcome::FatalFault(fault) => return Err(fault.into()),
                    }
                }
            }
        }
    }
}
