//! Adapters implementing the domain ports.

pub mod clock;
pub mod gateway;
pub mod in_memory;
pub mod mailbox;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod unit_of_work;
