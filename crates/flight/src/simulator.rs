//! Simulated vehicle
//!
//! Stands in for a physical vehicle by integrating its own position once per
//! control period. Heights passed to takeoff and land are absolute, as they
//! are for physical vehicles.

use std::time::Duration;
use swarmlink_core::{Position, SimulatorConfig, Telemetry};
use tracing::debug;

use crate::actuator::{ActuatorResult, FlightActuator};

/// Proportional-integral controller for one axis.
///
/// The output is a position increment per control period.
#[derive(Debug, Clone)]
pub struct PiController {
    kp: f64,
    ki: f64,
    setpoint: f64,
    integral: f64,
}

impl PiController {
    pub fn new(kp: f64, ki: f64, setpoint: f64) -> Self {
        Self {
            kp,
            ki,
            setpoint,
            integral: 0.0,
        }
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    pub fn update(&mut self, measured: f64, dt: Duration) -> f64 {
        let error = self.setpoint - measured;
        self.integral += error * dt.as_secs_f64();
        self.kp * error + self.ki * self.integral
    }
}

#[derive(Debug, Clone)]
enum Maneuver {
    Grounded,
    Holding,
    /// Linear vertical motion toward `target_z`
    Vertical { target_z: f64, rate: f64 },
    Cruising {
        x: PiController,
        y: PiController,
        z: PiController,
    },
}

/// Simulated flight actuator.
#[derive(Debug, Clone)]
pub struct SimulatedActuator {
    position: Position,
    ground_z: f64,
    gains: SimulatorConfig,
    maneuver: Maneuver,
    battery_level: u8,
}

impl SimulatedActuator {
    /// Create a simulated vehicle resting at `start`.
    pub fn new(start: Position, gains: SimulatorConfig) -> Self {
        Self {
            position: start,
            ground_z: start.z,
            gains,
            maneuver: Maneuver::Grounded,
            battery_level: 100,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    fn vertical(&mut self, target_z: f64, duration: Duration) {
        let secs = duration.as_secs_f64();
        let distance = (target_z - self.position.z).abs();
        let rate = if secs > 0.0 { distance / secs } else { f64::INFINITY };
        self.maneuver = Maneuver::Vertical { target_z, rate };
    }
}

impl FlightActuator for SimulatedActuator {
    fn takeoff(&mut self, height_m: f64, duration: Duration) -> ActuatorResult<()> {
        self.vertical(height_m, duration);
        Ok(())
    }

    fn land(&mut self, height_m: f64, duration: Duration) -> ActuatorResult<()> {
        self.vertical(height_m.max(self.ground_z), duration);
        Ok(())
    }

    fn go_to(&mut self, target: Position, _duration: Duration) -> ActuatorResult<()> {
        let SimulatorConfig { kp, ki } = self.gains;
        self.maneuver = Maneuver::Cruising {
            x: PiController::new(kp, ki, target.x),
            y: PiController::new(kp, ki, target.y),
            z: PiController::new(kp, ki, target.z),
        };
        Ok(())
    }

    fn stop(&mut self) -> ActuatorResult<()> {
        // Motors off: the vehicle drops to where it started.
        self.position.z = self.ground_z;
        self.maneuver = Maneuver::Grounded;
        Ok(())
    }

    fn sample(&mut self, dt: Duration) -> Option<Telemetry> {
        match &mut self.maneuver {
            Maneuver::Grounded | Maneuver::Holding => {}
            Maneuver::Vertical { target_z, rate } => {
                let step = *rate * dt.as_secs_f64();
                let remaining = *target_z - self.position.z;
                if remaining.abs() <= step {
                    self.position.z = *target_z;
                    self.maneuver = Maneuver::Holding;
                } else {
                    self.position.z += step.copysign(remaining);
                }
            }
            Maneuver::Cruising { x, y, z } => {
                self.position.x += x.update(self.position.x, dt);
                self.position.y += y.update(self.position.y, dt);
                self.position.z += z.update(self.position.z, dt);
            }
        }
        debug!(position = %self.position, "Simulated position updated");

        Some(Telemetry {
            x: self.position.x,
            y: self.position.y,
            z: self.position.z,
            battery_level: self.battery_level,
        })
    }
}
