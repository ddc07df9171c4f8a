//! SwarmLink network server
//!
//! Serves the swarm control protocol over TCP. Clients register for periodic
//! fleet notifications and write targets and operations into a
//! [`SharedSnapshot`] that the fleet side reads back.

pub mod client;
pub mod error;
pub mod framing;
pub mod server;
pub mod snapshot;

pub use client::SwarmClient;
pub use error::{ServerError, ServerResult};
pub use server::SwarmServer;
pub use snapshot::{OperationExchange, Outbound, SharedSnapshot};
