//! Configuration management for SwarmLink.
//!
//! Every section falls back to its defaults, so a TOML file only needs to
//! name the values it changes.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub network: NetworkConfig,
    pub flight: FlightConfig,
    pub swarm: SwarmConfig,
    pub simulator: SimulatorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address the control server listens on
    pub bind_address: String,
}

/// Timing and tolerance policy of the per-vehicle state machine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FlightConfig {
    pub tick_period_ms: u64,
    pub takeoff_height_m: f64,
    pub takeoff_duration_s: f64,
    pub landing_height_m: f64,
    pub landing_duration_s: f64,
    pub stop_duration_s: f64,
    /// Multiplier applied to takeoff and landing durations before timing out
    pub timeout_factor: f64,
    /// A takeoff fails if altitude is more than this far below the target height
    pub takeoff_tolerance_m: f64,
    pub cruise_speed_mps: f64,
    pub min_flight_time_s: f64,
    /// Multiplier on the planned flight time before a move counts as arrived
    pub move_time_slack: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SwarmConfig {
    /// Minimum separation between vehicles; anything closer vetoes a move
    pub safety_radius_m: f64,
    pub bridge_period_ms: u64,
}

/// Gains of the simulated vehicle's position controller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulatorConfig {
    pub kp: f64,
    pub ki: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:12345".to_string(),
        }
    }
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 100,
            takeoff_height_m: 0.8,
            takeoff_duration_s: 3.0,
            landing_height_m: 0.2,
            landing_duration_s: 3.0,
            stop_duration_s: 3.0,
            timeout_factor: 1.25,
            takeoff_tolerance_m: 0.3,
            cruise_speed_mps: 0.4,
            min_flight_time_s: 0.2,
            move_time_slack: 1.5,
        }
    }
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            safety_radius_m: 0.2,
            bridge_period_ms: 15,
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self { kp: 0.2, ki: 0.1 }
    }
}

/// Longest span any flight phase may be configured to last.
pub const MAX_PHASE_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

/// Seconds to a `Duration`, clamped to `0..=MAX_PHASE_DURATION`.
fn clamped_secs(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs)
        .map(|d| d.min(MAX_PHASE_DURATION))
        .unwrap_or(if secs > 0.0 { MAX_PHASE_DURATION } else { Duration::ZERO })
}

impl FlightConfig {
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    pub fn takeoff_duration(&self) -> Duration {
        clamped_secs(self.takeoff_duration_s)
    }

    pub fn landing_duration(&self) -> Duration {
        clamped_secs(self.landing_duration_s)
    }

    pub fn stop_duration(&self) -> Duration {
        clamped_secs(self.stop_duration_s)
    }

    /// Time after which a takeoff is judged by altitude
    pub fn takeoff_timeout(&self) -> Duration {
        clamped_secs(self.takeoff_duration_s * self.timeout_factor)
    }

    /// Time after which a landing is considered complete
    pub fn landing_timeout(&self) -> Duration {
        clamped_secs(self.landing_duration_s * self.timeout_factor)
    }

    /// Planned straight-line flight time for a move of `distance_m`.
    pub fn flight_time(&self, distance_m: f64) -> Duration {
        clamped_secs((distance_m / self.cruise_speed_mps).max(self.min_flight_time_s))
    }

    /// Time a move of `flight_time` may take before it counts as arrived
    pub fn move_allowance(&self, flight_time: Duration) -> Duration {
        clamped_secs(flight_time.as_secs_f64() * self.move_time_slack)
    }

    /// Minimum altitude a takeoff must reach to count as successful
    pub fn min_takeoff_altitude(&self) -> f64 {
        self.takeoff_height_m - self.takeoff_tolerance_m
    }
}

impl SwarmConfig {
    pub fn bridge_period(&self) -> Duration {
        Duration::from_millis(self.bridge_period_ms)
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self::default()
    }

    /// Reject values the state machine cannot run with.
    pub fn validate(&self) -> CoreResult<()> {
        let flight = &self.flight;
        if flight.tick_period_ms == 0 {
            return Err(CoreError::Config("flight.tick_period_ms must be positive".into()));
        }
        let positive = [
            ("flight.cruise_speed_mps", flight.cruise_speed_mps),
            ("flight.timeout_factor", flight.timeout_factor),
            ("flight.move_time_slack", flight.move_time_slack),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(CoreError::Config(format!("{name} must be a positive number")));
            }
        }
        let finite = [
            ("flight.takeoff_height_m", flight.takeoff_height_m),
            ("flight.landing_height_m", flight.landing_height_m),
            ("flight.takeoff_tolerance_m", flight.takeoff_tolerance_m),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(CoreError::Config(format!("{name} must be a finite number")));
            }
        }
        let durations = [
            ("flight.takeoff_duration_s", flight.takeoff_duration_s),
            ("flight.landing_duration_s", flight.landing_duration_s),
            ("flight.stop_duration_s", flight.stop_duration_s),
            ("flight.min_flight_time_s", flight.min_flight_time_s),
            ("flight.takeoff_duration_s * timeout_factor", flight.takeoff_duration_s * flight.timeout_factor),
            ("flight.landing_duration_s * timeout_factor", flight.landing_duration_s * flight.timeout_factor),
            ("flight.min_flight_time_s * move_time_slack", flight.min_flight_time_s * flight.move_time_slack),
        ];
        for (name, value) in durations {
            match Duration::try_from_secs_f64(value) {
                Ok(span) if span <= MAX_PHASE_DURATION => {}
                _ => {
                    return Err(CoreError::Config(format!(
                        "{name} must be between 0 and {} seconds",
                        MAX_PHASE_DURATION.as_secs()
                    )))
                }
            }
        }
        if !self.swarm.safety_radius_m.is_finite() || self.swarm.safety_radius_m < 0.0 {
            return Err(CoreError::Config("swarm.safety_radius_m must be non-negative".into()));
        }
        if self.swarm.bridge_period_ms == 0 {
            return Err(CoreError::Config("swarm.bridge_period_ms must be positive".into()));
        }
        Ok(())
    }
}
