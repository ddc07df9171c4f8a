//! Test utilities for end-to-end swarm tests

use std::net::SocketAddr;
use std::time::Duration;
use swarmlink_core::{Config, Position};
use swarmlink_protocol::SwarmNotification;
use swarmlink_server::{ServerResult, SwarmClient, SwarmServer};
use swarmlink_swarm::{Fleet, SwarmResult};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Install a test subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Configuration with short maneuvers so a full flight cycle takes about a
/// second.
pub fn fast_config() -> Config {
    let mut config = Config::default_config();
    config.network.bind_address = "127.0.0.1:0".to_string();
    config.flight.tick_period_ms = 20;
    config.flight.takeoff_duration_s = 0.3;
    config.flight.landing_duration_s = 0.3;
    config.flight.stop_duration_s = 0.3;
    config.swarm.bridge_period_ms = 5;
    config
}

/// A fleet of simulated vehicles served on an ephemeral port
pub struct TestNode {
    pub addr: SocketAddr,
    pub cancel: CancellationToken,
    tasks: JoinSet<SwarmResult<()>>,
}

impl TestNode {
    pub async fn start(config: Config, starts: &[Position]) -> Self {
        init_tracing();
        let fleet = Fleet::simulated(config.clone(), starts).expect("fleet");
        let cancel = CancellationToken::new();
        let server = SwarmServer::bind(&config.network.bind_address, fleet.snapshot(), cancel.child_token())
            .await
            .expect("bind");
        let addr = server.local_addr().expect("local addr");
        tokio::spawn(server.run());
        let tasks = fleet.spawn(&cancel);
        Self { addr, cancel, tasks }
    }

    /// Two simulated vehicles one meter apart on the ground.
    pub async fn pair() -> Self {
        let starts = [Position::new(0.0, 0.0, 0.0, 0.0), Position::new(1.0, 0.0, 0.0, 0.0)];
        Self::start(fast_config(), &starts).await
    }

    pub async fn client(&self) -> ServerResult<SwarmClient> {
        SwarmClient::connect(self.addr).await
    }

    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        while let Some(joined) = self.tasks.join_next().await {
            joined.expect("fleet task panicked").expect("fleet task failed");
        }
    }
}

/// Read notifications until one satisfies `predicate`.
pub async fn wait_for_notification<F>(
    client: &mut SwarmClient,
    timeout: Duration,
    mut predicate: F,
) -> SwarmNotification
where
    F: FnMut(&SwarmNotification) -> bool,
{
    tokio::time::timeout(timeout, async {
        loop {
            let note = client.next_notification().await.expect("connection closed");
            if predicate(&note) {
                return note;
            }
        }
    })
    .await
    .expect("timed out waiting for notification")
}
