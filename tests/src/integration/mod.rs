//! # Integration Scenarios
//!
//! Real sessions driven by a scripted peer.

pub mod lifecycle;
pub mod queries;
