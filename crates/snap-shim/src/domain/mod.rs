//! # Domain Module
//!
//! State machine, transition requests, composite keys and errors.

pub mod composite_key;
pub mod errors;
pub mod state;
pub mod transition;

pub use composite_key::{
    create_composite_key, split_composite_key, COMPOSITE_KEY_NAMESPACE, MAX_UNICODE_RUNE,
};
pub use errors::ShimError;
pub use state::{lookup, Effect, ProtocolState, Transition, TRANSITIONS};
pub use transition::TransitionRequest;
