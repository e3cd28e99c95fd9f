//! # Bundled Snaps
//!
//! Chaincodes the runtime can host without any other crate.

pub mod kv;

pub use kv::KvSnap;
