//! Client session behaviour over a live connection

use std::time::Duration;
use swarmlink_core::{FleetState, Operation, Position, SwarmOperation, VehicleId, VehicleState};
use swarmlink_protocol::{Message, OperationMap, TargetMap};

use crate::test_utils::{wait_for_notification, TestNode};

#[tokio::test]
async fn test_registration_yields_ack_then_snapshots() {
    let node = TestNode::pair().await;
    let mut client = node.client().await.unwrap();

    client.register_notification(20).await.unwrap();
    assert_eq!(client.next_reply().await.unwrap(), Message::RegisterNotificationAck);

    let note = wait_for_notification(&mut client, Duration::from_secs(2), |_| true).await;
    assert_eq!(note.positions.len(), 2);
    assert_eq!(note.states.len(), 2);
    assert_eq!(note.operations.len(), 2);
    assert!(note.states.values().all(|s| *s == VehicleState::Idle));
    assert_eq!(note.fleet_state, FleetState::Idle);
    // Starting targets are where the vehicles stand.
    assert_eq!(note.targets[&VehicleId(1)], Position::new(1.0, 0.0, 0.0, 0.0));

    node.shutdown().await;
}

#[tokio::test]
async fn test_targets_are_replaced_not_merged() {
    let node = TestNode::pair().await;
    let mut client = node.client().await.unwrap();
    client.register_notification(10).await.unwrap();
    client.next_reply().await.unwrap();

    client.set_targets(TargetMap::new()).await.unwrap();
    let target = Position::new(1.0, 2.0, 3.0, 0.0);
    client
        .set_targets([(VehicleId(2), target)].into_iter().collect())
        .await
        .unwrap();

    let note = wait_for_notification(&mut client, Duration::from_secs(2), |note| {
        note.targets.len() == 1
    })
    .await;
    assert_eq!(note.targets[&VehicleId(2)], target);

    node.shutdown().await;
}

#[tokio::test]
async fn test_operations_expire_after_two_ticks() {
    let node = TestNode::pair().await;
    let mut client = node.client().await.unwrap();
    client.register_notification(5).await.unwrap();
    client.next_reply().await.unwrap();

    let request: OperationMap = [(VehicleId(0), Operation::TakeOff)].into_iter().collect();
    client.drone_operations(request).await.unwrap();

    let note = wait_for_notification(&mut client, Duration::from_secs(2), |note| {
        note.states[&VehicleId(0)] == VehicleState::TakingOff
    })
    .await;
    assert_eq!(note.states[&VehicleId(1)], VehicleState::Idle);

    wait_for_notification(&mut client, Duration::from_secs(2), |note| {
        note.operations.values().all(|op| *op == Operation::None)
    })
    .await;

    node.shutdown().await;
}

#[tokio::test]
async fn test_malformed_frames_do_not_drop_the_connection() {
    let node = TestNode::pair().await;
    let mut client = node.client().await.unwrap();

    // Unknown message type, then an operation code that does not exist.
    client.send_raw(&[0xEE, 0x01, 0x02]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    client.send_raw(&[8, 1, 0, 0, 42]).await.unwrap();

    client.swarm_operation(SwarmOperation::FastStop).await.unwrap();
    assert_eq!(client.next_reply().await.unwrap(), Message::SwarmOperationAck);
    client.register_notification(10).await.unwrap();
    assert_eq!(client.next_reply().await.unwrap(), Message::RegisterNotificationAck);

    node.shutdown().await;
}

#[tokio::test]
async fn test_clients_share_one_fleet() {
    let node = TestNode::pair().await;
    let commander = node.client().await.unwrap();
    let mut observer = node.client().await.unwrap();
    observer.register_notification(10).await.unwrap();
    observer.next_reply().await.unwrap();

    let target = Position::new(0.5, 0.5, 0.8, 0.0);
    commander
        .set_targets([(VehicleId(0), target)].into_iter().collect())
        .await
        .unwrap();

    let note = wait_for_notification(&mut observer, Duration::from_secs(2), |note| {
        note.targets.get(&VehicleId(0)) == Some(&target)
    })
    .await;
    assert_eq!(note.targets.len(), 1);

    node.shutdown().await;
}
