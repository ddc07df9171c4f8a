//! End-to-end tests for the swarm control endpoint
//!
//! This test suite validates:
//! - notification registration and periodic snapshots over TCP
//! - target and operation requests reaching the fleet
//! - full takeoff and landing cycles of simulated vehicles
//! - recovery from malformed frames

pub mod test_utils;

#[cfg(test)]
mod session_tests;

#[cfg(test)]
mod flight_cycle_tests;
