//! The failure detector: round-robin target selection ([`roundrobin`]) and
//! the probing actor ([`actor`]).

pub mod actor;
pub mod roundrobin;

pub use actor::{spawn, FailureDetectorHandle};
