use swarmlink_core::CoreError;
use swarmlink_server::ServerError;
use swarmlink_swarm::SwarmError;
use thiserror::Error;

/// Startup and runtime failures of the node, each with its own exit code.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("At least 2 vehicles are needed to form a swarm, got {0}")]
    NotEnoughVehicles(usize),

    #[error("No driver for physical vehicles is available in this build ({0} requested)")]
    DriverUnavailable(usize),

    #[error("Configuration error: {0}")]
    Config(#[from] CoreError),

    #[error("Fleet error: {0}")]
    Fleet(#[from] SwarmError),

    #[error("Server error: {0}")]
    Server(#[from] ServerError),
}

impl NodeError {
    pub fn exit_code(&self) -> i32 {
        match self {
            NodeError::NotEnoughVehicles(_) => 3,
            NodeError::DriverUnavailable(_) => 2,
            NodeError::Config(_) | NodeError::Fleet(_) | NodeError::Server(_) => 1,
        }
    }
}
