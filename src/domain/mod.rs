//! Domain layer: value objects, entities with their state rules, and the
//! ports the application layer talks through.

pub mod campaign;
pub mod donation;
pub mod money;
pub mod ports;
pub mod user;
