//! Per-vehicle lifecycle state machine
//!
//! Evaluated once per tick against the vehicle's pending operation, its
//! latest position and the collision monitor's verdict:
//!
//! ```text
//! Idle --TakeOff--> TakingOff --timeout, altitude ok--> Hovering
//! TakingOff --timeout, altitude low | FastStop--> Stopping
//! Hovering --Move--> Moving --flight time elapsed--> Hovering
//! Hovering | Moving --Land--> Landing --timeout--> Stopping
//! any airborne state --FastStop--> Stopping (Moving also on collision)
//! Stopping --stop duration elapsed--> Idle
//! ```
//!
//! The time spent in a state resets on every transition.

use std::time::{Duration, Instant};
use swarmlink_core::{FlightConfig, Operation, Position, VehicleId, VehicleState};
use tracing::{error, info, warn};

use crate::actuator::{ActuatorResult, FlightActuator};
use crate::error::{FlightError, FlightResult};

/// Everything the state machine looks at during one tick.
#[derive(Debug, Clone, Copy)]
pub struct TickInput {
    /// Time of this tick
    pub now: Instant,
    /// Pending operation as read at the start of the tick
    pub operation: Operation,
    /// Current target of the vehicle, if one is set
    pub target: Option<Position>,
    /// Latest known position of the vehicle
    pub position: Position,
    /// Whether another vehicle is within the safety radius
    pub collision: bool,
}

/// Result of one tick.
#[derive(Debug)]
pub enum TickOutcome {
    /// Keep ticking
    Continuing,
    /// The vehicle has been stopped and its control loop must end
    FatalFault(FlightError),
}

impl TickOutcome {
    pub fn is_fatal(&self) -> bool {
        matches!(self, TickOutcome::FatalFault(_))
    }
}

/// Lifecycle state machine of one vehicle.
#[derive(Debug, Clone)]
pub struct FlightStateMachine {
    vehicle: VehicleId,
    config: FlightConfig,
    state: VehicleState,
    entered_at: Instant,
    operation_time: Duration,
    last_observed: Operation,
}

impl FlightStateMachine {
    /// Create a state machine for a vehicle resting on the ground.
    pub fn new(vehicle: VehicleId, config: FlightConfig, now: Instant) -> Self {
        Self {
            vehicle,
            config,
            state: VehicleState::Idle,
            entered_at: now,
            operation_time: Duration::ZERO,
            last_observed: Operation::None,
        }
    }

    pub fn vehicle(&self) -> VehicleId {
        self.vehicle
    }

    pub fn state(&self) -> VehicleState {
        self.state
    }

    /// Operation value seen at the end of the previous tick
    pub fn last_observed(&self) -> Operation {
        self.last_observed
    }

    /// Time allowed for the current move before it counts as arrived
    pub fn operation_time(&self) -> Duration {
        self.operation_time
    }

    pub fn config(&self) -> &FlightConfig {
        &self.config
    }

    fn enter(&mut self, next: VehicleState, now: Instant) {
        info!(vehicle = %self.vehicle, from = ?self.state, to = ?next, "State transition");
        self.state = next;
        self.entered_at = now;
    }

    fn command(
        &self,
        command: &'static str,
        result: ActuatorResult<()>,
    ) -> FlightResult<()> {
        result.map_err(|source| FlightError::Actuator {
            vehicle: self.vehicle,
            command,
            source,
        })
    }

    fn stop(&mut self, actuator: &mut dyn FlightActuator, now: Instant) -> FlightResult<()> {
        self.command("stop", actuator.stop())?;
        self.enter(VehicleState::Stopping, now);
        Ok(())
    }

    fn land(&mut self, actuator: &mut dyn FlightActuator, now: Instant) -> FlightResult<()> {
        let result = actuator.land(self.config.landing_height_m, self.config.landing_duration());
        self.command("land", result)?;
        self.enter(VehicleState::Landing, now);
        Ok(())
    }

    fn start_move(
        &mut self,
        actuator: &mut dyn FlightActuator,
        input: &TickInput,
    ) -> FlightResult<()> {
        let Some(target) = input.target else {
            warn!(vehicle = %self.vehicle, "Move requested without a target; holding position");
            return Ok(());
        };
        let flight_time = self.config.flight_time(input.position.distance_to(&target));
        info!(
            vehicle = %self.vehicle,
            from = %input.position,
            to = %target,
            flight_time_s = flight_time.as_secs_f64(),
            "Starting move"
        );
        self.command("go_to", actuator.go_to(target, flight_time))?;
        self.operation_time = self.config.move_allowance(flight_time);
        self.enter(VehicleState::Moving, input.now);
        Ok(())
    }

    fn transition(
        &mut self,
        input: &TickInput,
        actuator: &mut dyn FlightActuator,
    ) -> FlightResult<()> {
        let now = input.now;
        let elapsed = now.saturating_duration_since(self.entered_at);
        let operation = input.operation;

        match self.state {
            VehicleState::Idle => {
                if operation == Operation::TakeOff {
                    let result = actuator.takeoff(
                        self.config.takeoff_height_m,
                        self.config.takeoff_duration(),
                    );
                    self.command("takeoff", result)?;
                    self.enter(VehicleState::TakingOff, now);
                }
            }
            VehicleState::TakingOff => {
                if operation == Operation::FastStop {
                    self.stop(actuator, now)?;
                } else if elapsed > self.config.takeoff_timeout() {
                    if input.position.z < self.config.min_takeoff_altitude() {
                        warn!(
                            vehicle = %self.vehicle,
                            altitude = input.position.z,
                            "Takeoff height not reached; stopping"
                        );
                        self.stop(actuator, now)?;
                    } else {
                        self.enter(VehicleState::Hovering, now);
                    }
                }
            }
            VehicleState::Hovering => match operation {
                Operation::Move => self.start_move(actuator, input)?,
                Operation::Land => self.land(actuator, now)?,
                Operation::FastStop => self.stop(actuator, now)?,
                Operation::None | Operation::TakeOff => {}
            },
            VehicleState::Moving => {
                if operation == Operation::FastStop || input.collision {
                    if input.collision {
                        warn!(vehicle = %self.vehicle, position = %input.position, "Too close to another vehicle; stopping");
                    }
                    self.stop(actuator, now)?;
                } else if operation == Operation::Land {
                    self.land(actuator, now)?;
                } else if elapsed > self.operation_time {
                    self.enter(VehicleState::Hovering, now);
                }
            }
            VehicleState::Landing => {
                if operation == Operation::FastStop || elapsed > self.config.landing_timeout() {
                    self.stop(actuator, now)?;
                }
            }
            VehicleState::Stopping => {
                if elapsed > self.config.stop_duration() {
                    self.enter(VehicleState::Idle, now);
                }
            }
        }
        Ok(())
    }

    /// Evaluate one tick of the lifecycle.
    ///
    /// A failed actuator command is fatal: the vehicle is sent `stop()`
    /// before the fault is handed back, and the state becomes Stopping.
    pub fn tick(&mut self, input: TickInput, actuator: &mut dyn FlightActuator) -> TickOutcome {
        match self.transition(&input, actuator) {
            Ok(()) => TickOutcome::Continuing,
            Err(fault) => {
                error!(vehicle = %self.vehicle, error = %fault, "Fatal flight fault; emergency stop");
                if let Err(stop_error) = actuator.stop() {
                    error!(vehicle = %self.vehicle, error = %stop_error, "Emergency stop failed");
                }
                self.state = VehicleState::Stopping;
                self.entered_at = input.now;
                TickOutcome::FatalFault(fault)
            }
        }
    }

    /// Debounce the live operation slot at the end of a tick.
    ///
    /// If the slot still holds the same non-empty operation it held at the
    /// end of the previous tick, it is cleared. Returns the value the slot
    /// must hold from now on. An operation written between ticks is thus
    /// seen by at least one and at most two ticks.
    pub fn settle_operation(&mut self, live: Operation) -> Operation {
        let settled = if live.is_pending() && live == self.last_observed {
            Operation::None
        } else {
            live
        };
        self.last_observed = settled;
        settled
    }
}
