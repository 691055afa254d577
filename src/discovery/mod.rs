// Discovery side: finds controller managers, their running trajectory
// controllers, and the joint limits those controllers need.

pub mod namespace;
pub mod lister;
pub mod limits;
pub mod poller;
