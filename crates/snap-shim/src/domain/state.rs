//! # Protocol State Machine
//!
//! Lifecycle of a chaincode session as a static transition table.
//!
//! ```text
//!   Created ──REGISTERED──> Established ──READY──> Ready ◄─┐
//!                               ▲                    │     │ INIT, TRANSACTION,
//!                               │ ERROR              │     │ RESPONSE, ERROR,
//!                             Init ◄─────────────────┘     │ COMPLETED
//!                           (RESPONSE loops, COMPLETED ──> Ready)
//! ```
//!
//! `Init` has entries in the table but no path leads into it; it is kept so
//! that a peer following the legacy init flow is still understood.
//!
//! Each entry names the [`Effect`] to run. Effects that must finish before the
//! state changes (the "before" callbacks) and effects that run after it are
//! distinguished by [`Effect::runs_before`].

use serde::{Deserialize, Serialize};
use snap_types::MessageKind;
use std::fmt;

/// Lifecycle state of a session. No terminal state; a session ends with its
/// stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProtocolState {
    /// Handshake not yet acknowledged.
    #[default]
    Created,
    /// Registered; waiting for READY.
    Established,
    /// Legacy initialization cycle in progress.
    Init,
    /// Accepting INIT and TRANSACTION cycles.
    Ready,
}

impl ProtocolState {
    /// Lowercase name used in logs and error replies.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Established => "established",
            Self::Init => "init",
            Self::Ready => "ready",
        }
    }

    /// Check if `kind` is legal in this state.
    #[must_use]
    pub fn accepts(self, kind: MessageKind) -> bool {
        lookup(self, kind).is_some()
    }
}

impl fmt::Display for ProtocolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callback attached to a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Nothing beyond the state change.
    None,
    /// Check the handshake reply before leaving `Created`.
    ValidateRegistration,
    /// Start the chaincode's `init` entry point.
    BeginInit,
    /// Start the chaincode's `invoke` entry point.
    BeginTransaction,
    /// Hand the reply to whoever awaits its transaction id.
    DeliverReply,
}

impl Effect {
    /// Whether the effect runs before the state is updated.
    #[must_use]
    pub const fn runs_before(self) -> bool {
        matches!(
            self,
            Self::ValidateRegistration | Self::BeginInit | Self::BeginTransaction
        )
    }
}

/// One row of the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: ProtocolState,
    pub kind: MessageKind,
    pub to: ProtocolState,
    pub effect: Effect,
}

const fn row(from: ProtocolState, kind: MessageKind, to: ProtocolState, effect: Effect) -> Transition {
    Transition {
        from,
        kind,
        to,
        effect,
    }
}

use MessageKind as K;
use ProtocolState as S;

/// Every legal `(state, kind) -> state` move.
pub const TRANSITIONS: &[Transition] = &[
    row(S::Created, K::Registered, S::Established, Effect::ValidateRegistration),
    row(S::Established, K::Ready, S::Ready, Effect::None),
    row(S::Ready, K::Init, S::Ready, Effect::BeginInit),
    row(S::Ready, K::Transaction, S::Ready, Effect::BeginTransaction),
    row(S::Init, K::Response, S::Init, Effect::DeliverReply),
    row(S::Ready, K::Response, S::Ready, Effect::DeliverReply),
    row(S::Init, K::Error, S::Established, Effect::DeliverReply),
    row(S::Ready, K::Error, S::Ready, Effect::DeliverReply),
    row(S::Init, K::Completed, S::Ready, Effect::None),
    row(S::Ready, K::Completed, S::Ready, Effect::None),
];

/// Look up the transition for `kind` in `state`.
#[must_use]
pub fn lookup(state: ProtocolState, kind: MessageKind) -> Option<Transition> {
    TRANSITIONS
        .iter()
        .find(|t| t.from == state && t.kind == kind)
        .copied()
}
