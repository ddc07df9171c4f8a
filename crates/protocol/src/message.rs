//! Message definitions for the swarm control protocol
//!
//! Every frame starts with a one-byte [`MessageId`]; the rest of the layout
//! is implied by that byte. There is no length prefix.

#![warn(missing_docs)]

use std::collections::BTreeMap;
use swarmlink_core::{FleetState, Operation, Position, SwarmOperation, VehicleId, VehicleState};

/// Target positions keyed by vehicle
pub type TargetMap = BTreeMap<VehicleId, Position>;

/// Pending operations keyed by vehicle
pub type OperationMap = BTreeMap<VehicleId, Operation>;

/// First byte of every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageId {
    /// Client asks for periodic swarm notifications
    RegisterNotification = 1,
    /// Server confirms the registration
    RegisterNotificationAck = 2,
    /// Periodic swarm snapshot
    SwarmNotification = 3,
    /// Client replaces the target map
    SetTargets = 4,
    /// Confirmation of a target update
    SetTargetsAck = 5,
    /// Client issues a fleet-wide command
    SwarmOperation = 6,
    /// Confirmation of a fleet-wide command
    SwarmOperationAck = 7,
    /// Client replaces the per-vehicle operation map
    DroneOperations = 8,
    /// Confirmation of an operation update
    DroneOperationsAck = 9,
}

impl MessageId {
    /// Parse the first byte of a frame
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(MessageId::RegisterNotification),
            2 => Some(MessageId::RegisterNotificationAck),
            3 => Some(MessageId::SwarmNotification),
            4 => Some(MessageId::SetTargets),
            5 => Some(MessageId::SetTargetsAck),
            6 => Some(MessageId::SwarmOperation),
            7 => Some(MessageId::SwarmOperationAck),
            8 => Some(MessageId::DroneOperations),
            9 => Some(MessageId::DroneOperationsAck),
            _ => None,
        }
    }
}

/// Snapshot of the fleet pushed to registered clients
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SwarmNotification {
    /// Floor-adjusted vehicle positions
    pub positions: BTreeMap<VehicleId, Position>,
    /// Current target of each vehicle
    pub targets: TargetMap,
    /// Lifecycle state of each vehicle
    pub states: BTreeMap<VehicleId, VehicleState>,
    /// Pending operation of each vehicle
    pub operations: OperationMap,
    /// Aggregate fleet state
    pub fleet_state: FleetState,
}

/// A decoded protocol frame
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Register for notifications every `interval_ms` milliseconds
    RegisterNotification {
        /// Requested notification cadence
        interval_ms: u16,
    },
    /// Registration accepted
    RegisterNotificationAck,
    /// Fleet snapshot
    SwarmNotification(SwarmNotification),
    /// Full replacement of the target map
    SetTargets(TargetMap),
    /// Target update accepted
    SetTargetsAck,
    /// Fleet-wide command
    SwarmOperation(SwarmOperation),
    /// Fleet-wide command accepted
    SwarmOperationAck,
    /// Full replacement of the operation map
    DroneOperations(OperationMap),
    /// Operation update accepted
    DroneOperationsAck,
}

impl Message {
    /// Identifier written as the first byte of this message
    pub fn id(&self) -> MessageId {
        match self {
            Message::RegisterNotification { .. } => MessageId::RegisterNotification,
            Message::RegisterNotificationAck => MessageId::RegisterNotificationAck,
            Message::SwarmNotification(_) => MessageId::SwarmNotification,
            Message::SetTargets(_) => MessageId::SetTargets,
            Message::SetTargetsAck => MessageId::SetTargetsAck,
            Message::SwarmOperation(_) => MessageId::SwarmOperation,
            Message::SwarmOperationAck => MessageId::SwarmOperationAck,
            Message::DroneOperations(_) => MessageId::DroneOperations,
            Message::DroneOperationsAck => MessageId::DroneOperationsAck,
        }
    }
}
