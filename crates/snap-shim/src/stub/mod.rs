//! # Chaincode Stub
//!
//! What a chaincode sees of the cycle it is running in: its arguments and
//! proposal, the event it may attach to the result, and every state
//! operation scoped to the cycle's transaction id.

mod iterator;

pub use iterator::{HistoryQueryIterator, QueryIterator, StateQueryIterator};

use snap_types::{ChaincodeEvent, ChaincodeInput, Response};

use crate::domain::{self, ShimError, MAX_UNICODE_RUNE};
use crate::handlers::OperationHandlers;

/// Request context handed to `Chaincode::init` and `Chaincode::invoke`.
pub struct ChaincodeStub {
    chaincode_name: String,
    txid: String,
    args: Vec<Vec<u8>>,
    signed_proposal: Option<Vec<u8>>,
    event: Option<ChaincodeEvent>,
    handlers: OperationHandlers,
}

impl ChaincodeStub {
    /// Build the context for one INIT or TRANSACTION cycle.
    #[must_use]
    pub fn new(
        chaincode_name: impl Into<String>,
        txid: impl Into<String>,
        input: ChaincodeInput,
        signed_proposal: Option<Vec<u8>>,
        handlers: OperationHandlers,
    ) -> Self {
        Self {
            chaincode_name: chaincode_name.into(),
            txid: txid.into(),
            args: input.args,
            signed_proposal,
            event: None,
            handlers,
        }
    }

    // =========================================================================
    // INVOCATION CONTEXT
    // =========================================================================

    pub fn txid(&self) -> &str {
        &self.txid
    }

    /// Raw arguments.
    pub fn args(&self) -> &[Vec<u8>] {
        &self.args
    }

    /// Arguments decoded as UTF-8 (lossy).
    pub fn string_args(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| String::from_utf8_lossy(a).into_owned())
            .collect()
    }

    /// First argument as the function name, the rest as its parameters.
    pub fn function_and_parameters(&self) -> (String, Vec<String>) {
        let mut args = self.string_args();
        if args.is_empty() {
            return (String::new(), Vec::new());
        }
        let function = args.remove(0);
        (function, args)
    }

    /// Proposal that triggered this cycle, if the peer sent one.
    pub fn signed_proposal(&self) -> Option<&[u8]> {
        self.signed_proposal.as_deref()
    }

    /// Attach an event to this cycle's result. A later call replaces it.
    pub fn set_event(&mut self, name: &str, payload: Vec<u8>) -> Result<(), ShimError> {
        if name.is_empty() {
            return Err(ShimError::InvalidArgument(
                "event name must not be empty".into(),
            ));
        }
        self.event = Some(ChaincodeEvent {
            chaincode_id: self.chaincode_name.clone(),
            txid: self.txid.clone(),
            event_name: name.to_string(),
            payload,
        });
        Ok(())
    }

    pub(crate) fn take_event(&mut self) -> Option<ChaincodeEvent> {
        self.event.take()
    }

    // =========================================================================
    // STATE ACCESS
    // =========================================================================

    /// Value under `key`; empty when absent.
    pub async fn get_state(&self, key: &str) -> Result<Vec<u8>, ShimError> {
        self.handlers.get_state(&self.txid, key).await
    }

    pub async fn put_state(&self, key: &str, value: impl Into<Vec<u8>>) -> Result<(), ShimError> {
        self.handlers.put_state(&self.txid, key, value.into()).await
    }

    pub async fn del_state(&self, key: &str) -> Result<(), ShimError> {
        self.handlers.del_state(&self.txid, key).await
    }

    /// Keys in `[start_key, end_key)`.
    pub async fn get_state_by_range(
        &self,
        start_key: &str,
        end_key: &str,
    ) -> Result<StateQueryIterator, ShimError> {
        let page = self
            .handlers
            .get_state_by_range(&self.txid, start_key, end_key)
            .await?;
        Ok(QueryIterator::new(self.handlers.clone(), self.txid.clone(), page))
    }

    pub async fn get_query_result(&self, query: &str) -> Result<StateQueryIterator, ShimError> {
        let page = self.handlers.get_query_result(&self.txid, query).await?;
        Ok(QueryIterator::new(self.handlers.clone(), self.txid.clone(), page))
    }

    pub async fn get_history_for_key(&self, key: &str) -> Result<HistoryQueryIterator, ShimError> {
        let page = self.handlers.get_history_for_key(&self.txid, key).await?;
        Ok(QueryIterator::new(self.handlers.clone(), self.txid.clone(), page))
    }

    /// Call another chaincode (`name` or `name/channel`) in this transaction.
    pub async fn invoke_chaincode<S: AsRef<[u8]>>(
        &self,
        chaincode_name: &str,
        args: &[S],
    ) -> Result<Response, ShimError> {
        let args = args.iter().map(|a| a.as_ref().to_vec()).collect();
        self.handlers
            .invoke_chaincode(&self.txid, chaincode_name, args)
            .await
    }

    // =========================================================================
    // COMPOSITE KEYS
    // =========================================================================

    pub fn create_composite_key<S: AsRef<str>>(
        &self,
        object_type: &str,
        attributes: &[S],
    ) -> Result<String, ShimError> {
        domain::create_composite_key(object_type, attributes)
    }

    pub fn split_composite_key(&self, key: &str) -> Result<(String, Vec<String>), ShimError> {
        domain::split_composite_key(key)
    }

    /// Every key whose composite prefix matches `object_type` and `attributes`.
    pub async fn get_state_by_partial_composite_key<S: AsRef<str>>(
        &self,
        object_type: &str,
        attributes: &[S],
    ) -> Result<StateQueryIterator, ShimError> {
        let start_key = domain::create_composite_key(object_type, attributes)?;
        let mut end_key = start_key.clone();
        end_key.push(MAX_UNICODE_RUNE);
        self.get_state_by_range(&start_key, &end_key).await
    }
}
