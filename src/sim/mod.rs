// Simulated robot cell used by the demo binary and the integration tests:
// in-memory transport, discovery/limits services, and a trajectory-following arm.

pub mod bus;
pub mod cell;
pub mod arm;
