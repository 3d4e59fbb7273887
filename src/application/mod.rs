//! Application layer: the engines that run each ledger operation as one
//! atomic unit of work against the storage ports.
//!
//! [`ledger::Ledger`] wires them together for the boundary layer.

pub mod info;
pub mod ledger;
pub mod purchase;
pub mod registration;
pub mod transfer;
pub mod unit_of_work;
