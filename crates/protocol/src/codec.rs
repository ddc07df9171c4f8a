//! Binary codec for the swarm control protocol
//!
//! Layout rules:
//! - little-endian throughout
//! - geometry is `floor(value * 10 000)` stored as `i32`
//! - a position entry is a `u16` vehicle id followed by x, y, z, yaw (18 bytes)
//! - an operation or state entry is a `u16` vehicle id followed by a `u8` code (3 bytes)
//!
//! | Type | Name | Layout |
//! |------|------|--------|
//! | 1 | RegisterNotification | `[1, u16 interval_ms]` |
//! | 2 | RegisterNotificationAck | `[2]` |
//! | 3 | SwarmNotification | `[3, u8 n, n*18, u8 n, n*18, u8 n, n*3, u8 n, n*3, u8 fleet]` |
//! | 4 | SetTargets | `[4, u8 n, n*18]` |
//! | 5 | SetTargetsAck | `[5]` |
//! | 6 | SwarmOperation | `[6, u8 operation]` |
//! | 7 | SwarmOperationAck | `[7]` |
//! | 8 | DroneOperations | `[8, u8 n, n*3]` |
//! | 9 | DroneOperationsAck | `[9]` |

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::collections::BTreeMap;
use swarmlink_core::{FleetState, Operation, Position, SwarmOperation, VehicleId, VehicleState};
use tokio_util::codec::Encoder;
use tracing::debug;

use crate::error::{ProtocolError, ProtocolResult};
use crate::message::{Message, MessageId, SwarmNotification};

/// Scale between meters/radians and their wire representation
pub const FIXED_POINT_SCALE: f64 = 10_000.0;

/// Size of one `(id, x, y, z, yaw)` entry
pub const POSITION_ENTRY_LEN: usize = 2 + 4 * 4;

/// Size of one `(id, code)` entry
pub const CODE_ENTRY_LEN: usize = 3;

/// Convert a coordinate to 4-decimal fixed point, rounding toward negative infinity.
pub fn to_fixed(value: f64) -> ProtocolResult<i32> {
    let scaled = (value * FIXED_POINT_SCALE).floor();
    if !scaled.is_finite() || scaled < i32::MIN as f64 || scaled > i32::MAX as f64 {
        return Err(ProtocolError::CoordinateOutOfRange(value));
    }
    Ok(scaled as i32)
}

/// Convert a fixed-point wire value back to a coordinate.
pub fn from_fixed(raw: i32) -> f64 {
    raw as f64 / FIXED_POINT_SCALE
}

fn put_count(dst: &mut BytesMut, section: &'static str, count: usize) -> ProtocolResult<()> {
    let count = u8::try_from(count).map_err(|_| ProtocolError::TooManyEntries { section, count })?;
    dst.put_u8(count);
    Ok(())
}

fn put_positions(
    dst: &mut BytesMut,
    section: &'static str,
    entries: &BTreeMap<VehicleId, Position>,
) -> ProtocolResult<()> {
    put_count(dst, section, entries.len())?;
    for (id, position) in entries {
        dst.put_u16_le(id.0);
        dst.put_i32_le(to_fixed(position.x)?);
        dst.put_i32_le(to_fixed(position.y)?);
        dst.put_i32_le(to_fixed(position.z)?);
        dst.put_i32_le(to_fixed(position.yaw)?);
    }
    Ok(())
}

fn put_codes<T: Copy>(
    dst: &mut BytesMut,
    section: &'static str,
    entries: &BTreeMap<VehicleId, T>,
    code: impl Fn(T) -> u8,
) -> ProtocolResult<()> {
    put_count(dst, section, entries.len())?;
    for (id, value) in entries {
        dst.put_u16_le(id.0);
        dst.put_u8(code(*value));
    }
    Ok(())
}

fn encode_body(message: &Message, dst: &mut BytesMut) -> ProtocolResult<()> {
    dst.put_u8(message.id() as u8);
    match message {
        Message::RegisterNotification { interval_ms } => dst.put_u16_le(*interval_ms),
        Message::SwarmNotification(notification) => {
            put_positions(dst, "position", &notification.positions)?;
            put_positions(dst, "target", &notification.targets)?;
            put_codes(dst, "state", &notification.states, VehicleState::code)?;
            put_codes(dst, "operation", &notification.operations, Operation::code)?;
            dst.put_u8(notification.fleet_state.code());
        }
        Message::SetTargets(targets) => put_positions(dst, "target", targets)?,
        Message::SwarmOperation(operation) => dst.put_u8(operation.code()),
        Message::DroneOperations(operations) => {
            put_codes(dst, "operation", operations, Operation::code)?
        }
        Message::RegisterNotificationAck
        | Message::SetTargetsAck
        | Message::SwarmOperationAck
        | Message::DroneOperationsAck => {}
    }
    Ok(())
}

/// Append the wire form of `message` to `dst`.
///
/// On error `dst` is left exactly as it was.
pub fn encode(message: &Message, dst: &mut BytesMut) -> ProtocolResult<()> {
    let start = dst.len();
    let result = encode_body(message, dst);
    if result.is_err() {
        dst.truncate(start);
    }
    result
}

/// Encode a single message into a fresh buffer.
pub fn to_bytes(message: &Message) -> ProtocolResult<Bytes> {
    let mut buf = BytesMut::new();
    encode(message, &mut buf)?;
    Ok(buf.freeze())
}

/// Length of the complete frame at the start of `buf`, or `None` if more
/// bytes are needed to tell.
fn frame_len(id: MessageId, buf: &[u8]) -> Option<usize> {
    let counted = |entry_len: usize| -> Option<usize> {
        let count = *buf.get(1)? as usize;
        Some(2 + count * entry_len)
    };
    let len = match id {
        MessageId::RegisterNotification => 3,
        MessageId::SwarmOperation => 2,
        MessageId::RegisterNotificationAck
        | MessageId::SetTargetsAck
        | MessageId::SwarmOperationAck
        | MessageId::DroneOperationsAck => 1,
        MessageId::SetTargets => counted(POSITION_ENTRY_LEN)?,
        MessageId::DroneOperations => counted(CODE_ENTRY_LEN)?,
        MessageId::SwarmNotification => {
            let mut offset = 1;
            for entry_len in [POSITION_ENTRY_LEN, POSITION_ENTRY_LEN, CODE_ENTRY_LEN, CODE_ENTRY_LEN] {
                let count = *buf.get(offset)? as usize;
                offset += 1 + count * entry_len;
            }
            offset + 1
        }
    };
    Some(len)
}

fn get_positions(frame: &mut Bytes) -> BTreeMap<VehicleId, Position> {
    let count = frame.get_u8();
    (0..count)
        .map(|_| {
            let id = VehicleId(frame.get_u16_le());
            let x = from_fixed(frame.get_i32_le());
            let y = from_fixed(frame.get_i32_le());
            let z = from_fixed(frame.get_i32_le());
            let yaw = from_fixed(frame.get_i32_le());
            (id, Position::new(x, y, z, yaw))
        })
        .collect()
}

fn get_operations(frame: &mut Bytes) -> ProtocolResult<BTreeMap<VehicleId, Operation>> {
    let count = frame.get_u8();
    let mut operations = BTreeMap::new();
    for _ in 0..count {
        let vehicle = VehicleId(frame.get_u16_le());
        let code = frame.get_u8();
        let operation =
            Operation::from_code(code).ok_or(ProtocolError::InvalidOperation { vehicle, code })?;
        operations.insert(vehicle, operation);
    }
    Ok(operations)
}

fn get_states(frame: &mut Bytes) -> ProtocolResult<BTreeMap<VehicleId, VehicleState>> {
    let count = frame.get_u8();
    let mut states = BTreeMap::new();
    for _ in 0..count {
        let vehicle = VehicleId(frame.get_u16_le());
        let code = frame.get_u8();
        let state = VehicleState::from_code(code)
            .ok_or(ProtocolError::InvalidVehicleState { vehicle, code })?;
        states.insert(vehicle, state);
    }
    Ok(states)
}

fn parse_frame(id: MessageId, mut frame: Bytes) -> ProtocolResult<Message> {
    frame.advance(1);
    let message = match id {
        MessageId::RegisterNotification => Message::RegisterNotification {
            interval_ms: frame.get_u16_le(),
        },
        MessageId::RegisterNotificationAck => Message::RegisterNotificationAck,
        MessageId::SwarmNotification => {
            let positions = get_positions(&mut frame);
            let targets = get_positions(&mut frame);
            let states = get_states(&mut frame)?;
            let operations = get_operations(&mut frame)?;
            let code = frame.get_u8();
            let fleet_state =
                FleetState::from_code(code).ok_or(ProtocolError::InvalidFleetState(code))?;
            Message::SwarmNotification(SwarmNotification {
                positions,
                targets,
                states,
                operations,
                fleet_state,
            })
        }
        MessageId::SetTargets => Message::SetTargets(get_positions(&mut frame)),
        MessageId::SetTargetsAck => Message::SetTargetsAck,
        MessageId::SwarmOperation => {
            let code = frame.get_u8();
            let operation = SwarmOperation::from_code(code)
                .ok_or(ProtocolError::InvalidSwarmOperation(code))?;
            Message::SwarmOperation(operation)
        }
        MessageId::SwarmOperationAck => Message::SwarmOperationAck,
        MessageId::DroneOperations => Message::DroneOperations(get_operations(&mut frame)?),
        MessageId::DroneOperationsAck => Message::DroneOperationsAck,
    };
    Ok(message)
}

/// Decode one message from the front of `src`.
///
/// Returns `Ok(None)` when `src` holds only part of a frame. A complete frame
/// with an invalid code is consumed and reported as an error. An unknown
/// message type leaves no way to find the next frame boundary, so everything
/// buffered is discarded.
pub fn decode(src: &mut BytesMut) -> ProtocolResult<Option<Message>> {
    let Some(&first) = src.first() else {
        return Ok(None);
    };
    let Some(id) = MessageId::from_u8(first) else {
        debug!(discarded = src.len(), "Unknown message type; dropping buffered bytes");
        src.clear();
        return Err(ProtocolError::UnknownMessage(first));
    };
    let Some(len) = frame_len(id, src) else {
        return Ok(None);
    };
    if src.len() < len {
        return Ok(None);
    }
    let frame = src.split_to(len).freeze();
    parse_frame(id, frame).map(Some)
}

/// Encoder half of the protocol, for use with `FramedWrite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SwarmCodec;

impl Encoder<Message> for SwarmCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode(&item, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn decode_all(bytes: &[u8]) -> Message {
        let mut buf = BytesMut::from(bytes);
        let message = decode(&mut buf).unwrap().expect("complete frame");
        assert!(buf.is_empty());
        message
    }

    #[test]
    fn test_register_notification_layout() {
        let bytes = to_bytes(&Message::RegisterNotification { interval_ms: 0x1234 }).unwrap();
        assert_eq!(&bytes[..], &[1, 0x34, 0x12]);
        assert_eq!(
            decode_all(&bytes),
            Message::RegisterNotification { interval_ms: 0x1234 }
        );
    }

    #[test]
    fn test_ack_is_single_byte() {
        let bytes = to_bytes(&Message::RegisterNotificationAck).unwrap();
        assert_eq!(&bytes[..], &[2]);
    }

    #[test]
    fn test_set_targets_layout() {
        let mut targets = BTreeMap::new();
        targets.insert(VehicleId(2), Position::new(1.0, -0.5, 0.25, 0.0));
        let bytes = to_bytes(&Message::SetTargets(targets.clone())).unwrap();

        assert_eq!(bytes.len(), 2 + POSITION_ENTRY_LEN);
        assert_eq!(&bytes[..4], &[4, 1, 2, 0]);
        assert_eq!(&bytes[4..8], &10_000i32.to_le_bytes());
        assert_eq!(&bytes[8..12], &(-5_000i32).to_le_bytes());
        assert_eq!(&bytes[12..16], &2_500i32.to_le_bytes());
        assert_eq!(decode_all(&bytes), Message::SetTargets(targets));
    }

    #[test]
    fn test_fixed_point_truncates_toward_negative_infinity() {
        assert_eq!(to_fixed(0.12349).unwrap(), 1234);
        assert_eq!(to_fixed(-0.12341).unwrap(), -1235);
        assert_eq!(to_fixed(0.0).unwrap(), 0);
        assert!(to_fixed(f64::NAN).is_err());
        assert!(to_fixed(1.0e6).is_err());
    }

    #[test]
    fn test_notification_carries_operations_section() {
        let mut notification = SwarmNotification {
            fleet_state: FleetState::Moving,
            ..Default::default()
        };
        notification.positions.insert(VehicleId(0), Position::new(0.1, 0.2, 0.3, 0.0));
        notification.positions.insert(VehicleId(1), Position::new(-1.0, 2.0, 0.8, 0.0));
        notification.targets.insert(VehicleId(1), Position::new(1.0, 1.0, 1.0, 0.0));
        notification.states.insert(VehicleId(0), VehicleState::Hovering);
        notification.states.insert(VehicleId(1), VehicleState::Moving);
        notification.operations.insert(VehicleId(0), Operation::None);
        notification.operations.insert(VehicleId(1), Operation::Land);

        let bytes = to_bytes(&Message::SwarmNotification(notification)).unwrap();
        let expected_len = 1 + (1 + 2 * 18) + (1 + 18) + (1 + 2 * 3) + (1 + 2 * 3) + 1;
        assert_eq!(bytes.len(), expected_len);
        assert_eq!(bytes[bytes.len() - 1], FleetState::Moving.code());
        // Last operation entry is vehicle 1 -> Land, not its state.
        assert_eq!(&bytes[bytes.len() - 4..bytes.len() - 1], &[1, 0, Operation::Land.code()]);

        match decode_all(&bytes) {
            Message::SwarmNotification(decoded) => {
                assert_eq!(decoded.operations[&VehicleId(1)], Operation::Land);
                assert_eq!(decoded.states[&VehicleId(1)], VehicleState::Moving);
                assert_eq!(decoded.fleet_state, FleetState::Moving);
                assert!((decoded.positions[&VehicleId(1)].x + 1.0).abs() < 1e-9);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_partial_frame_waits_for_more_bytes() {
        let mut operations = BTreeMap::new();
        operations.insert(VehicleId(0), Operation::TakeOff);
        operations.insert(VehicleId(1), Operation::TakeOff);
        let bytes = to_bytes(&Message::DroneOperations(operations.clone())).unwrap();

        let mut buf = BytesMut::from(&bytes[..4]);
        assert!(decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 4);

        buf.extend_from_slice(&bytes[4..]);
        assert_eq!(decode(&mut buf).unwrap(), Some(Message::DroneOperations(operations)));
    }

    #[test]
    fn test_back_to_back_frames() {
        let mut buf = BytesMut::new();
        encode(&Message::RegisterNotification { interval_ms: 50 }, &mut buf).unwrap();
        encode(&Message::SwarmOperation(SwarmOperation::Land), &mut buf).unwrap();

        assert_eq!(
            decode(&mut buf).unwrap(),
            Some(Message::RegisterNotification { interval_ms: 50 })
        );
        assert_eq!(
            decode(&mut buf).unwrap(),
            Some(Message::SwarmOperation(SwarmOperation::Land))
        );
        assert!(decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_unknown_message_discards_buffer() {
        let mut buf = BytesMut::from(&[0x42u8, 1, 2, 3][..]);
        assert!(matches!(decode(&mut buf), Err(ProtocolError::UnknownMessage(0x42))));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_invalid_operation_consumes_frame() {
        let mut buf = BytesMut::from(&[8u8, 1, 3, 0, 9, 2][..]);
        let err = decode(&mut buf).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::InvalidOperation { vehicle: VehicleId(3), code: 9 }
        ));
        // The trailing ack byte is still available.
        assert_eq!(decode(&mut buf).unwrap(), Some(Message::RegisterNotificationAck));
    }

    #[test]
    fn test_too_many_entries_leaves_buffer_untouched() {
        let targets: BTreeMap<_, _> = (0..256u16)
            .map(|i| (VehicleId(i), Position::default()))
            .collect();
        let mut buf = BytesMut::from(&[2u8][..]);
        let err = encode(&Message::SetTargets(targets), &mut buf).unwrap_err();
        assert!(matches!(err, ProtocolError::TooManyEntries { count: 256, .. }));
        assert_eq!(&buf[..], &[2]);
    }

    proptest! {
        #[test]
        fn prop_fixed_point_within_tolerance(value in -10_000.0f64..10_000.0) {
            let decoded = from_fixed(to_fixed(value).unwrap());
            prop_assert!(decoded <= value + 1e-9);
            prop_assert!(value - decoded < 1e-4 + 1e-9);
        }

        #[test]
        fn prop_target_entries_survive_the_wire(
            entries in proptest::collection::btree_map(
                any::<u16>(),
                (-100.0f64..100.0, -100.0f64..100.0, 0.0f64..10.0, -3.2f64..3.2),
                0..20,
            )
        ) {
            let targets: BTreeMap<VehicleId, Position> = entries
                .iter()
                .map(|(id, (x, y, z, yaw))| (VehicleId(*id), Position::new(*x, *y, *z, *yaw)))
                .collect();
            let bytes = to_bytes(&Message::SetTargets(targets.clone())).unwrap();
            let mut buf = BytesMut::from(&bytes[..]);
            let Some(Message::SetTargets(decoded)) = decode(&mut buf).unwrap() else {
                panic!("expected SetTargets");
            };
            prop_assert_eq!(decoded.len(), targets.len());
            for (id, original) in &targets {
                let got = decoded[id];
                prop_assert!((got.x - original.x).abs() <= 1e-4 + 1e-9);
                prop_assert!((got.y - original.y).abs() <= 1e-4 + 1e-9);
                prop_assert!((got.z - original.z).abs() <= 1e-4 + 1e-9);
                prop_assert!((got.yaw - original.yaw).abs() <= 1e-4 + 1e-9);
            }
        }
    }
}
