//! Domain layer: value objects, records and the storage ports the engines
//! depend on.

pub mod account;
pub mod info;
pub mod item;
pub mod ports;
pub mod transaction;
