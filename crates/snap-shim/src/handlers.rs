//! # Operation Handlers
//!
//! One method per request kind. Each builds the kind-specific payload, runs
//! it through [`RequestDriver::send_and_await`] and turns the reply into a
//! typed result:
//!
//! | Reply | Result |
//! |-------|--------|
//! | `RESPONSE` | payload decoded into the typed reply |
//! | `ERROR` | [`ShimError::Chaincode`] carrying the payload text |
//! | other | [`ShimError::UnexpectedReply`] |

use snap_types::{
    decode, encode, ChaincodeId, ChaincodeInput, ChaincodeSpec, GetHistoryForKey, GetQueryResult,
    GetStateByRange, Message, MessageKind, PutStateInfo, QueryResponse, QueryStateClose,
    QueryStateNext, Response,
};
use tracing::{debug, warn};

use crate::domain::ShimError;
use crate::driver::{RequestDriver, EXPECTED_REPLY};

/// Typed request operations over a session's driver.
#[derive(Clone)]
pub struct OperationHandlers {
    driver: RequestDriver,
}

impl OperationHandlers {
    #[must_use]
    pub fn new(driver: RequestDriver) -> Self {
        Self { driver }
    }

    /// Send a request and return the RESPONSE payload.
    async fn call(
        &self,
        kind: MessageKind,
        txid: &str,
        payload: Vec<u8>,
    ) -> Result<Vec<u8>, ShimError> {
        let reply = self
            .driver
            .send_and_await(Message::new(kind, txid, payload))
            .await?;
        match reply.kind {
            MessageKind::Response => Ok(reply.payload),
            MessageKind::Error => {
                let text = reply.payload_text();
                debug!(txid, %kind, error = %text, "peer rejected request");
                Err(ShimError::Chaincode(text))
            }
            other => Err(ShimError::UnexpectedReply {
                kind: other,
                expected: EXPECTED_REPLY,
            }),
        }
    }

    async fn call_query(
        &self,
        kind: MessageKind,
        txid: &str,
        payload: Vec<u8>,
    ) -> Result<QueryResponse, ShimError> {
        let bytes = self.call(kind, txid, payload).await?;
        Ok(decode(&bytes)?)
    }

    /// Value stored under `key`; empty when absent.
    pub async fn get_state(&self, txid: &str, key: &str) -> Result<Vec<u8>, ShimError> {
        self.call(MessageKind::GetState, txid, key.as_bytes().to_vec())
            .await
    }

    pub async fn put_state(&self, txid: &str, key: &str, value: Vec<u8>) -> Result<(), ShimError> {
        if key.is_empty() {
            return Err(ShimError::InvalidArgument("key must not be empty".into()));
        }
        let payload = encode(&PutStateInfo {
            key: key.to_string(),
            value,
        })?;
        self.call(MessageKind::PutState, txid, payload).await?;
        Ok(())
    }

    pub async fn del_state(&self, txid: &str, key: &str) -> Result<(), ShimError> {
        self.call(MessageKind::DelState, txid, key.as_bytes().to_vec())
            .await?;
        Ok(())
    }

    /// First page of keys in `[start_key, end_key)`.
    pub async fn get_state_by_range(
        &self,
        txid: &str,
        start_key: &str,
        end_key: &str,
    ) -> Result<QueryResponse, ShimError> {
        let payload = encode(&GetStateByRange {
            start_key: start_key.to_string(),
            end_key: end_key.to_string(),
        })?;
        self.call_query(MessageKind::GetStateByRange, txid, payload)
            .await
    }

    /// Next page of an open query.
    pub async fn query_state_next(&self, txid: &str, id: &str) -> Result<QueryResponse, ShimError> {
        let payload = encode(&QueryStateNext { id: id.to_string() })?;
        self.call_query(MessageKind::QueryStateNext, txid, payload)
            .await
    }

    /// Release an open query on the peer.
    pub async fn query_state_close(
        &self,
        txid: &str,
        id: &str,
    ) -> Result<QueryResponse, ShimError> {
        let payload = encode(&QueryStateClose { id: id.to_string() })?;
        self.call_query(MessageKind::QueryStateClose, txid, payload)
            .await
    }

    /// First page of a backend-specific rich query.
    pub async fn get_query_result(
        &self,
        txid: &str,
        query: &str,
    ) -> Result<QueryResponse, ShimError> {
        let payload = encode(&GetQueryResult {
            query: query.to_string(),
        })?;
        self.call_query(MessageKind::GetQueryResult, txid, payload)
            .await
    }

    /// First page of the modification history of `key`.
    pub async fn get_history_for_key(
        &self,
        txid: &str,
        key: &str,
    ) -> Result<QueryResponse, ShimError> {
        let payload = encode(&GetHistoryForKey {
            key: key.to_string(),
        })?;
        self.call_query(MessageKind::GetHistoryForKey, txid, payload)
            .await
    }

    /// Invoke another chaincode within the current transaction.
    ///
    /// The RESPONSE carries the nested call's own envelope: a `COMPLETED`
    /// wrapping its [`Response`], or an `ERROR`. A completed call whose
    /// status is at or above the error threshold is returned as
    /// [`ShimError::NestedInvocation`] with the inner payload text (or the
    /// inner message when the payload is empty).
    pub async fn invoke_chaincode(
        &self,
        txid: &str,
        chaincode_name: &str,
        args: Vec<Vec<u8>>,
    ) -> Result<Response, ShimError> {
        let payload = encode(&ChaincodeSpec {
            chaincode_id: ChaincodeId {
                name: chaincode_name.to_string(),
            },
            input: ChaincodeInput { args },
        })?;
        let bytes = self
            .call(MessageKind::InvokeChaincode, txid, payload)
            .await?;

        let inner = Message::from_bytes(&bytes)?;
        match inner.kind {
            MessageKind::Completed => {
                let response: Response = decode(&inner.payload)?;
                if response.is_success() {
                    return Ok(response);
                }
                let text = if response.payload.is_empty() {
                    response.message
                } else {
                    String::from_utf8_lossy(&response.payload).into_owned()
                };
                warn!(txid, chaincode = chaincode_name, status = response.status, "nested invocation failed");
                Err(ShimError::NestedInvocation(text))
            }
            MessageKind::Error => {
                warn!(txid, chaincode = chaincode_name, "nested invocation returned ERROR");
                Err(ShimError::NestedInvocation(inner.payload_text()))
            }
            other => Err(ShimError::UnexpectedReply {
                kind: other,
                expected: "COMPLETED or ERROR",
            }),
        }
    }
}
