// Session side: binds to one controller, ingests its feedback and, in control
// mode, streams trajectory commands to it.

pub mod transport;
pub mod feedback;
pub mod executor;
pub mod binder;
pub mod mode;
pub mod command;
