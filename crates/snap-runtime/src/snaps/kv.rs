//! # Key/Value Snap
//!
//! A minimal chaincode over the ledger's key space.
//!
//! | Function | Arguments | Result payload |
//! |----------|-----------|----------------|
//! | `put` | key, value | empty; emits a `put` event |
//! | `get` | key | value (empty when absent) |
//! | `del` | key | empty |
//! | `range` | start, end | `key=value` lines |
//! | `history` | key | `txid:value` lines, `txid:<deleted>` for deletes |
//! | `invoke` | chaincode, args... | nested call's payload |
//!
//! `init` accepts `key value` pairs and writes each of them.

use async_trait::async_trait;
use snap_shim::{Chaincode, ChaincodeStub, ShimError};
use snap_types::Response;
use tracing::{debug, warn};

/// Key/value chaincode.
#[derive(Debug, Default, Clone, Copy)]
pub struct KvSnap;

impl KvSnap {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    async fn dispatch(
        &self,
        stub: &mut ChaincodeStub,
        function: &str,
        params: &[String],
    ) -> Result<Vec<u8>, ShimError> {
        match (function, params) {
            ("put", [key, value]) => {
                stub.put_state(key, value.as_bytes()).await?;
                stub.set_event("put", key.as_bytes().to_vec())?;
                Ok(Vec::new())
            }
            ("get", [key]) => stub.get_state(key).await,
            ("del", [key]) => {
                stub.del_state(key).await?;
                Ok(Vec::new())
            }
            ("range", [start, end]) => {
                let entries = stub.get_state_by_range(start, end).await?.collect_all().await?;
                let lines: Vec<String> = entries
                    .into_iter()
                    .map(|kv| format!("{}={}", kv.key, String::from_utf8_lossy(&kv.value)))
                    .collect();
                Ok(lines.join("\n").into_bytes())
            }
            ("history", [key]) => {
                let entries = stub.get_history_for_key(key).await?.collect_all().await?;
                let lines: Vec<String> = entries
                    .into_iter()
                    .map(|m| {
                        if m.is_delete {
                            format!("{}:<deleted>", m.txid)
                        } else {
                            format!("{}:{}", m.txid, String::from_utf8_lossy(&m.value))
                        }
                    })
                    .collect();
                Ok(lines.join("\n").into_bytes())
            }
            ("invoke", [chaincode, args @ ..]) => {
                let response = stub.invoke_chaincode(chaincode, args).await?;
                Ok(response.payload)
            }
            (f, p) => Err(ShimError::InvalidArgument(format!(
                "unknown function {:?} with {} argument(s)",
                f,
                p.len()
            ))),
        }
    }
}

#[async_trait]
impl Chaincode for KvSnap {
    async fn init(&self, stub: &mut ChaincodeStub) -> Response {
        let args = stub.string_args();
        if args.len() % 2 != 0 {
            return Response::error("init expects key/value pairs");
        }
        for pair in args.chunks(2) {
            if let Err(e) = stub.put_state(&pair[0], pair[1].as_bytes()).await {
                warn!(error = %e, "init write failed");
                return Response::error(e.to_string());
            }
        }
        debug!(pairs = args.len() / 2, "kv snap initialized");
        Response::success(Vec::new())
    }

    async fn invoke(&self, stub: &mut ChaincodeStub) -> Response {
        let (function, params) = stub.function_and_parameters();
        match self.dispatch(stub, &function, &params).await {
            Ok(payload) => Response::success(payload),
            Err(e) => {
                debug!(function = %function, error = %e, "kv invocation failed");
                Response::error(e.to_string())
            }
        }
    }
}
