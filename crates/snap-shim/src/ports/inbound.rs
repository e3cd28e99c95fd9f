//! # Inbound Ports
//!
//! The chaincode logic a session drives.

use async_trait::async_trait;
use snap_types::Response;

use crate::stub::ChaincodeStub;

/// Business logic behind a snap - inbound port.
///
/// Both entry points run on their own task, so they may freely await state
/// operations on the stub. A panic is caught and reported to the peer as an
/// ERROR for the cycle.
#[async_trait]
pub trait Chaincode: Send + Sync + 'static {
    /// Handle an INIT cycle. A status at or above `status::ERROR` is reported
    /// to the peer as ERROR with the response message.
    async fn init(&self, stub: &mut ChaincodeStub) -> Response;

    /// Handle a TRANSACTION cycle. The response is returned to the peer
    /// as-is; the peer judges its status.
    async fn invoke(&self, stub: &mut ChaincodeStub) -> Response;
}
