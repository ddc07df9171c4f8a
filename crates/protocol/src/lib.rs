//! SwarmLink Protocol
//!
//! Binary wire protocol spoken between the swarm control server and its
//! remote clients over TCP. Frames carry no length prefix; the first byte
//! names the message and implies the rest of the layout.

#![warn(missing_docs)]

pub mod codec;
pub mod error;
pub mod message;

pub use codec::{decode, encode, from_fixed, to_bytes, to_fixed, SwarmCodec};
pub use error::{ProtocolError, ProtocolResult};
pub use message::{Message, MessageId, OperationMap, SwarmNotification, TargetMap};
