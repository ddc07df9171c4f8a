//! Core fleet vocabulary shared by every SwarmLink crate.
//!
//! The numeric discriminants of the enums below are the codes used on the
//! wire, so they must never be reordered.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Session-stable vehicle identifier.
///
/// Assigned by enumeration order at startup: physical vehicles first, then
/// simulated ones. This is the only identifier ever exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VehicleId(pub u16);

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vehicle-{}", self.0)
    }
}

/// Position in meters with a yaw angle in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate (m)
    pub x: f64,
    /// Y coordinate (m)
    pub y: f64,
    /// Z coordinate / altitude (m)
    pub z: f64,
    /// Heading (rad)
    pub yaw: f64,
}

impl Position {
    /// Create a new position
    pub const fn new(x: f64, y: f64, z: f64, yaw: f64) -> Self {
        Self { x, y, z, yaw }
    }

    /// Euclidean distance over x, y and z. Yaw is ignored.
    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// The same position shifted down by `floor` meters.
    pub fn above_floor(&self, floor: f64) -> Position {
        Position {
            z: self.z - floor,
            ..*self
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(x={:.3}, y={:.3}, z={:.3}, yaw={:.3})",
            self.x, self.y, self.z, self.yaw
        )
    }
}

/// One-shot remote command for a single vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Operation {
    /// No pending command
    #[default]
    None = 0,
    /// Lift off to hover height
    TakeOff = 1,
    /// Descend and land
    Land = 2,
    /// Stop immediately and drop
    FastStop = 3,
    /// Fly straight to the vehicle's target
    Move = 4,
}

impl Operation {
    /// Wire code of this operation
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Parse a wire code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Operation::None),
            1 => Some(Operation::TakeOff),
            2 => Some(Operation::Land),
            3 => Some(Operation::FastStop),
            4 => Some(Operation::Move),
            _ => None,
        }
    }

    /// Whether this is a real command rather than the empty slot
    pub fn is_pending(self) -> bool {
        self != Operation::None
    }
}

/// Lifecycle state of a single vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum VehicleState {
    /// On the ground, motors off
    #[default]
    Idle = 0,
    /// Climbing to hover height
    TakingOff = 1,
    /// Holding position in the air
    Hovering = 2,
    /// Flying toward a target
    Moving = 3,
    /// Descending
    Landing = 4,
    /// Emergency or post-landing stop
    Stopping = 5,
}

impl VehicleState {
    /// Wire code of this state
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Parse a wire code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(VehicleState::Idle),
            1 => Some(VehicleState::TakingOff),
            2 => Some(VehicleState::Hovering),
            3 => Some(VehicleState::Moving),
            4 => Some(VehicleState::Landing),
            5 => Some(VehicleState::Stopping),
            _ => None,
        }
    }

    /// Whether the vehicle may be off the ground in this state
    pub fn is_airborne(self) -> bool {
        !matches!(self, VehicleState::Idle)
    }
}

/// Aggregate state of the whole fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum FleetState {
    /// Every vehicle idle
    #[default]
    Idle = 0,
    /// At least one vehicle taking off
    TakingOff = 1,
    /// Every vehicle hovering
    Hovering = 2,
    /// At least one vehicle moving
    Moving = 3,
    /// At least one vehicle landing
    Landing = 4,
    /// Stopping, or an inconsistent mix of states
    Stopping = 5,
}

impl FleetState {
    /// Wire code of this state
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Parse a wire code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(FleetState::Idle),
            1 => Some(FleetState::TakingOff),
            2 => Some(FleetState::Hovering),
            3 => Some(FleetState::Moving),
            4 => Some(FleetState::Landing),
            5 => Some(FleetState::Stopping),
            _ => None,
        }
    }
}

/// Fleet-wide command, fanned out to one [`Operation`] per vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SwarmOperation {
    /// All vehicles take off
    TakeOff = 0,
    /// All vehicles land
    Land = 1,
    /// All vehicles move to their targets
    Move = 2,
    /// All vehicles stop immediately
    FastStop = 3,
}

impl SwarmOperation {
    /// Wire code of this operation
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Parse a wire code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(SwarmOperation::TakeOff),
            1 => Some(SwarmOperation::Land),
            2 => Some(SwarmOperation::Move),
            3 => Some(SwarmOperation::FastStop),
            _ => None,
        }
    }

    /// The per-vehicle operation this fleet command expands to
    pub fn vehicle_operation(self) -> Operation {
        match self {
            SwarmOperation::TakeOff => Operation::TakeOff,
            SwarmOperation::Land => Operation::Land,
            SwarmOperation::Move => Operation::Move,
            SwarmOperation::FastStop => Operation::FastStop,
        }
    }
}

/// One telemetry sample reported by a flight actuator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    /// Estimated x (m)
    pub x: f64,
    /// Estimated y (m)
    pub y: f64,
    /// Estimated z (m)
    pub z: f64,
    /// Battery level as reported by the vehicle
    pub battery_level: u8,
}

impl Telemetry {
    /// Position carried by this sample. Telemetry has no heading, so yaw is zero.
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y, self.z, 0.0)
    }
}
