//! # Cycle Executor
//!
//! Runs one INIT or TRANSACTION cycle on its own task and reports the result
//! back to the transition sequencer instead of touching session state.
//!
//! | Outcome | Transition request |
//! |---------|--------------------|
//! | payload not a `ChaincodeInput` | `ERROR` with the decode error |
//! | chaincode panicked | `ERROR` with the panic text |
//! | INIT with status >= 500 | `ERROR` with the response message |
//! | otherwise | `COMPLETED` with the encoded response and the stub's event |

use futures::FutureExt;
use snap_telemetry::CHAINCODE_INVOCATIONS;
use snap_types::{decode, encode, status, ChaincodeInput, Message, MessageKind};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info_span, Instrument};

use crate::domain::{ShimError, TransitionRequest};
use crate::handlers::OperationHandlers;
use crate::ports::Chaincode;
use crate::stub::ChaincodeStub;

/// Which entry point a cycle runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Init,
    Transaction,
}

impl CyclePhase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Transaction => "transaction",
        }
    }
}

/// Everything a cycle task needs, cloned per cycle.
#[derive(Clone)]
pub(crate) struct CycleExecutor {
    pub chaincode: Arc<dyn Chaincode>,
    pub chaincode_name: String,
    pub handlers: OperationHandlers,
    pub transitions: mpsc::UnboundedSender<TransitionRequest>,
}

impl CycleExecutor {
    /// Start the cycle triggered by `msg`.
    pub fn spawn(&self, phase: CyclePhase, msg: Message) -> JoinHandle<()> {
        let executor = self.clone();
        let span = info_span!("cycle", phase = phase.as_str(), txid = %msg.txid);
        tokio::spawn(
            async move {
                let result = executor.run(phase, msg).await;
                if executor
                    .transitions
                    .send(TransitionRequest::outbound(result))
                    .is_err()
                {
                    debug!("session ended before the cycle finished");
                }
            }
            .instrument(span),
        )
    }

    async fn run(&self, phase: CyclePhase, msg: Message) -> Message {
        let txid = msg.txid.clone();

        let input: ChaincodeInput = match decode(&msg.payload) {
            Ok(input) => input,
            Err(e) => {
                let err = ShimError::from(e);
                error!(%err, "cycle payload rejected");
                record(phase, "error");
                return Message::error(txid, err.to_string());
            }
        };

        let mut stub = ChaincodeStub::new(
            self.chaincode_name.clone(),
            txid.clone(),
            input,
            msg.proposal,
            self.handlers.clone(),
        );

        let chaincode = &self.chaincode;
        let outcome = AssertUnwindSafe(async {
            match phase {
                CyclePhase::Init => chaincode.init(&mut stub).await,
                CyclePhase::Transaction => chaincode.invoke(&mut stub).await,
            }
        })
        .catch_unwind()
        .await;

        let response = match outcome {
            Ok(response) => response,
            Err(panic) => {
                let text = panic_text(panic.as_ref());
                error!(panic = %text, "chaincode panicked");
                record(phase, "panic");
                return Message::error(txid, format!("chaincode panicked: {}", text));
            }
        };

        if phase == CyclePhase::Init && response.status >= status::ERROR {
            debug!(status = response.status, "init failed");
            record(phase, "error");
            return Message::error(txid, &response.message);
        }

        match encode(&response) {
            Ok(payload) => {
                debug!(status = response.status, "cycle completed");
                record(phase, "completed");
                Message::new(MessageKind::Completed, txid, payload).with_event(stub.take_event())
            }
            Err(e) => {
                error!(error = %e, "could not encode chaincode response");
                record(phase, "error");
                Message::error(txid, e.to_string())
            }
        }
    }
}

fn record(phase: CyclePhase, outcome: &str) {
    CHAINCODE_INVOCATIONS
        .with_label_values(&[phase.as_str(), outcome])
        .inc();
}

fn panic_text(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
