//! Full flight cycles driven over the wire

use std::time::Duration;
use swarmlink_core::{FleetState, Operation, Position, SwarmOperation, VehicleId, VehicleState};
use swarmlink_protocol::Message;

use crate::test_utils::{fast_config, wait_for_notification, TestNode};

const STEP: Duration = Duration::from_secs(3);

#[tokio::test]
async fn test_takeoff_move_land() {
    let node = TestNode::pair().await;
    let mut client = node.client().await.unwrap();
    client.register_notification(10).await.unwrap();
    assert_eq!(client.next_reply().await.unwrap(), Message::RegisterNotificationAck);

    client.swarm_operation(SwarmOperation::TakeOff).await.unwrap();
    assert_eq!(client.next_reply().await.unwrap(), Message::SwarmOperationAck);
    let hovering = wait_for_notification(&mut client, STEP, |note| {
        note.fleet_state == FleetState::Hovering
    })
    .await;
    for position in hovering.positions.values() {
        assert!((position.z - 0.8).abs() < 0.01, "unexpected altitude {}", position.z);
    }

    let targets = [
        (VehicleId(0), Position::new(0.0, 0.3, 0.8, 0.0)),
        (VehicleId(1), Position::new(1.0, 0.3, 0.8, 0.0)),
    ];
    client.set_targets(targets.into_iter().collect()).await.unwrap();
    client.swarm_operation(SwarmOperation::Move).await.unwrap();
    client.next_reply().await.unwrap();
    wait_for_notification(&mut client, STEP, |note| note.fleet_state == FleetState::Moving).await;
    wait_for_notification(&mut client, STEP, |note| note.fleet_state == FleetState::Hovering).await;

    client.swarm_operation(SwarmOperation::Land).await.unwrap();
    client.next_reply().await.unwrap();
    wait_for_notification(&mut client, STEP, |note| note.fleet_state == FleetState::Landing).await;
    let landed = wait_for_notification(&mut client, STEP, |note| {
        note.fleet_state == FleetState::Idle
    })
    .await;
    assert!(landed.operations.values().all(|op| *op == Operation::None));

    node.shutdown().await;
}

#[tokio::test]
async fn test_fast_stop_during_takeoff() {
    let node = TestNode::pair().await;
    let mut client = node.client().await.unwrap();
    client.register_notification(5).await.unwrap();
    client.next_reply().await.unwrap();

    client.swarm_operation(SwarmOperation::TakeOff).await.unwrap();
    client.next_reply().await.unwrap();
    wait_for_notification(&mut client, STEP, |note| note.fleet_state == FleetState::TakingOff).await;

    client.swarm_operation(SwarmOperation::FastStop).await.unwrap();
    client.next_reply().await.unwrap();
    let stopped = wait_for_notification(&mut client, STEP, |note| {
        note.states.values().all(|s| *s == VehicleState::Stopping)
    })
    .await;
    assert_eq!(stopped.fleet_state, FleetState::Stopping);

    node.shutdown().await;
}

#[tokio::test]
async fn test_altitude_is_reported_above_lowest_start() {
    let starts = [Position::new(0.0, 0.0, 0.25, 0.0), Position::new(2.0, 0.0, 0.05, 0.0)];
    let node = TestNode::start(fast_config(), &starts).await;
    let mut client = node.client().await.unwrap();
    client.register_notification(10).await.unwrap();
    client.next_reply().await.unwrap();

    let note = wait_for_notification(&mut client, STEP, |note| {
        note.positions[&VehicleId(1)].z.abs() < 1e-3
    })
    .await;
    // Fixed point truncation loses at most one unit of 1e-4.
    assert!((note.positions[&VehicleId(0)].z - 0.2).abs() < 2e-4);

    node.shutdown().await;
}
