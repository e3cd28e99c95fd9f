//! # Snap Types Crate
//!
//! Wire types shared by every snap crate: the `Message` envelope, the
//! `MessageKind` enumeration, kind-specific payloads and the chaincode
//! `Response`.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: anything that crosses the duplex stream is
//!   defined here.
//! - **Opaque pass-through**: proposals and events are carried, never parsed.
//! - **One codec**: bincode for the envelope and every structured payload.

pub mod codec;
pub mod errors;
pub mod message;
pub mod payloads;
pub mod response;

pub use codec::{decode, encode};
pub use errors::CodecError;
pub use message::{ChaincodeEvent, Message, MessageKind};
pub use payloads::*;
pub use response::{status, Response};
