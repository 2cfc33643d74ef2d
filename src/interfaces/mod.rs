//! Outer surfaces: the CSV command format and the replayer driving the services.

pub mod csv;
pub mod replay;
