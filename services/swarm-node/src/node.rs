//! Node assembly: configuration, fleet and server.

use std::net::SocketAddr;
use swarmlink_core::Config;
use swarmlink_server::SwarmServer;
use swarmlink_swarm::{Fleet, SwarmResult};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::Cli;
use crate::error::NodeError;

/// Load the configuration file, if any, and apply command-line overrides.
pub fn load_config(cli: &Cli) -> Result<Config, NodeError> {
    let mut config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            Config::from_file(path)?
        }
        None => Config::default_config(),
    };
    if let Some(bind) = &cli.bind {
        config.network.bind_address = bind.clone();
    }
    Ok(config)
}

/// Check the requested vehicles and build the fleet.
pub fn assemble_fleet(cli: &Cli, config: &Config) -> Result<Fleet, NodeError> {
    let requested = cli.drones.len() + cli.virtual_drones.len();
    if requested < 2 {
        return Err(NodeError::NotEnoughVehicles(requested));
    }
    if !cli.drones.is_empty() {
        return Err(NodeError::DriverUnavailable(cli.drones.len()));
    }
    Ok(Fleet::simulated(config.clone(), &cli.virtual_drones)?)
}

/// A running node
pub struct Node {
    pub local_addr: SocketAddr,
    cancel: CancellationToken,
    fleet_tasks: JoinSet<SwarmResult<()>>,
    server: tokio::task::JoinHandle<Result<(), swarmlink_server::ServerError>>,
}

impl Node {
    /// Bind the server and start every fleet task.
    pub async fn start(config: &Config, fleet: Fleet, cancel: CancellationToken) -> Result<Self, NodeError> {
        let server = SwarmServer::bind(
            &config.network.bind_address,
            fleet.snapshot(),
            cancel.child_token(),
        )
        .await?;
        let local_addr = server.local_addr()?;

        let fleet_tasks = fleet.spawn(&cancel);
        let server = tokio::spawn(server.run());

        Ok(Self {
            local_addr,
            cancel,
            fleet_tasks,
            server,
        })
    }

    /// Cancel everything and wait for the tasks to finish.
    pub async fn shutdown(mut self) -> Result<(), NodeError> {
        self.cancel.cancel();
        while let Some(joined) = self.fleet_tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Fleet task ended with error: {}", e),
                Err(e) => warn!("Fleet task panicked: {}", e),
            }
        }
        match self.server.await {
            Ok(result) => result?,
            Err(e) => warn!("Server task panicked: {}", e),
        }
        Ok(())
    }
}
