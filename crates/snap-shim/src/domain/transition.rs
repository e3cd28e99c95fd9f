//! # Transition Requests
//!
//! Units of work for the transition sequencer. Produced by the dispatch loop
//! for inbound lifecycle messages and by chaincode tasks when a cycle ends;
//! consumed strictly one at a time by the session loop.

use snap_types::Message;

/// A message that should advance the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    /// Message whose kind selects the transition.
    pub message: Message,
    /// Write the message to the peer once the transition is applied.
    pub propagate_to_peer: bool,
}

impl TransitionRequest {
    /// A message received from the peer.
    #[must_use]
    pub fn inbound(message: Message) -> Self {
        Self {
            message,
            propagate_to_peer: false,
        }
    }

    /// A cycle result to apply locally and then send to the peer.
    #[must_use]
    pub fn outbound(message: Message) -> Self {
        Self {
            message,
            propagate_to_peer: true,
        }
    }
}
