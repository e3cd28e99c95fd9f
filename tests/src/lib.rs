//! # Snaps Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── harness/          # MockPeer, session runner, test chaincodes
//! └── integration/      # Session scenarios over in-process and TCP streams
//!     ├── lifecycle.rs
//!     ├── correlation.rs
//!     ├── queries.rs
//!     └── transport.rs
//! tests/benches/
//! └── shim_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p snap-tests
//!
//! # By category
//! cargo test -p snap-tests integration::lifecycle
//! cargo test -p snap-tests integration::correlation
//!
//! # Benchmarks
//! cargo bench -p snap-tests
//! ```

#![allow(dead_code)]

pub mod harness;
pub mod integration;
