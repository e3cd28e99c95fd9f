//! # Ports
//!
//! Interfaces the shim calls out to.

pub mod inbound;

pub use inbound::Chaincode;
