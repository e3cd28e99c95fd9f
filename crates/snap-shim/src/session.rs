//! # Session
//!
//! One chaincode session over one duplex stream: registration handshake,
//! dispatch loop and transition sequencer.
//!
//! ```text
//!  stream.recv ─> [pump task] ─inbound─┐
//!                                      ├─> dispatch loop ──> state machine
//!  cycle tasks ──── transitions ───────┘        │
//!       ▲                                       ├─> registry.fulfill (replies)
//!       └──────── spawn (INIT/TRANSACTION) ◄────┘
//! ```
//!
//! ## Ordering
//!
//! The loop is the only code that reads or changes the protocol state. A
//! cycle task never applies its own result; it queues a
//! [`TransitionRequest`] that the loop pops after the transition that
//! spawned it has fully returned. The pump is the only caller of `recv`, so
//! selecting between the two queues never abandons a half-read frame.
//!
//! Writes issued by the loop (error replies, propagated cycle results) run on
//! their own tasks so the loop never waits on the stream.
//!
//! ## Teardown
//!
//! End of stream, a read error and a shutdown signal all leave the loop the
//! same way: stop the pump, close the registry (waiters get `Disconnected`),
//! then close the write side, giving up after [`WRITER_CLOSE_TIMEOUT`].

use snap_stream::{DuplexStream, MessageSource, StreamError};
use snap_telemetry::{ILLEGAL_TRANSITIONS, MESSAGES_RECEIVED};
use snap_types::{decode, encode, ChaincodeId, Message, MessageKind};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, info_span, trace, warn, Instrument};

use crate::config::ShimConfig;
use crate::domain::{lookup, Effect, ProtocolState, ShimError, TransitionRequest};
use crate::driver::RequestDriver;
use crate::executor::{CycleExecutor, CyclePhase};
use crate::handlers::OperationHandlers;
use crate::ports::Chaincode;
use crate::registry::CorrelationRegistry;
use crate::writer::SerialWriter;

/// Upper bound on flushing and closing the write side during teardown.
pub const WRITER_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// A registered chaincode session.
pub struct Session {
    config: ShimConfig,
    state: ProtocolState,
    state_tx: watch::Sender<ProtocolState>,
    driver: RequestDriver,
    source: Box<dyn MessageSource>,
    executor: CycleExecutor,
    transitions_rx: mpsc::UnboundedReceiver<TransitionRequest>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Register `chaincode` with the peer at the other end of `stream`.
    ///
    /// Sends REGISTER and waits up to `config.registration_timeout` for
    /// REGISTERED, skipping keep-alives. On success the session is in
    /// [`ProtocolState::Established`] and ready to [`run`](Self::run).
    ///
    /// # Errors
    ///
    /// - `Config` - the configuration failed validation
    /// - `RegistrationTimeout` - no reply in time
    /// - `Disconnected` / `Transport` - the stream ended or failed
    /// - `Registration` - the peer replied with anything but REGISTERED
    pub async fn start<S: DuplexStream>(
        stream: S,
        chaincode: Arc<dyn Chaincode>,
        config: ShimConfig,
    ) -> Result<Self, ShimError> {
        config.validate()?;
        let mut session = Self::new(stream, chaincode, config);

        if let Err(e) = session.register().await {
            warn!(chaincode = %session.config.chaincode_name, error = %e, "registration failed");
            session.driver.registry().close();
            if let Err(close_err) = session.driver.writer().close().await {
                debug!(error = %close_err, "closing stream after failed registration");
            }
            return Err(e);
        }
        Ok(session)
    }

    fn new<S: DuplexStream>(stream: S, chaincode: Arc<dyn Chaincode>, config: ShimConfig) -> Self {
        let (sink, source) = stream.split();
        let driver = RequestDriver::new(
            Arc::new(SerialWriter::new(sink)),
            Arc::new(CorrelationRegistry::new(config.max_pending)),
        );
        let (transitions_tx, transitions_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(ProtocolState::Created);
        let executor = CycleExecutor {
            chaincode,
            chaincode_name: config.chaincode_name.clone(),
            handlers: OperationHandlers::new(driver.clone()),
            transitions: transitions_tx,
        };

        Self {
            config,
            state: ProtocolState::Created,
            state_tx,
            driver,
            source,
            executor,
            transitions_rx,
        }
    }

    async fn register(&mut self) -> Result<(), ShimError> {
        let payload = encode(&ChaincodeId {
            name: self.config.chaincode_name.clone(),
        })?;
        self.driver
            .send(Message::new(MessageKind::Register, "", payload))
            .await?;
        info!(chaincode = %self.config.chaincode_name, "sent registration");

        let wait = self.config.registration_timeout;
        let reply = tokio::time::timeout(wait, next_lifecycle_message(self.source.as_mut()))
            .await
            .map_err(|_| ShimError::RegistrationTimeout(wait))??;
        MESSAGES_RECEIVED
            .with_label_values(&[reply.kind.as_str()])
            .inc();

        match reply.kind {
            MessageKind::Registered => {
                self.apply(TransitionRequest::inbound(reply))?;
                info!(chaincode = %self.config.chaincode_name, "registered with peer");
                Ok(())
            }
            MessageKind::Error => Err(ShimError::Registration(reply.payload_text())),
            other => Err(ShimError::Registration(format!(
                "expected REGISTERED, received {}",
                other
            ))),
        }
    }

    /// Current protocol state.
    #[must_use]
    pub fn state(&self) -> ProtocolState {
        self.state
    }

    /// Observe state changes, including after the session is moved into
    /// [`run`](Self::run).
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ProtocolState> {
        self.state_tx.subscribe()
    }

    /// Drive the session until the stream ends.
    ///
    /// On exit the correlation registry is torn down (every waiting request
    /// resolves with `Disconnected`) and the write side is closed.
    ///
    /// # Returns
    ///
    /// The error that ended the session: `Disconnected` when the peer closed
    /// the stream, `Transport` when reading failed.
    pub async fn run(self) -> ShimError {
        self.run_until(std::future::pending()).await
    }

    /// Like [`run`](Self::run), but also stops with `Shutdown` once
    /// `shutdown` completes, through the same teardown.
    pub async fn run_until<F>(mut self, shutdown: F) -> ShimError
    where
        F: Future<Output = ()> + Send,
    {
        let span = info_span!("session", chaincode = %self.config.chaincode_name);
        async move {
            let (inbound_tx, mut inbound_rx) = mpsc::channel(self.config.inbound_buffer);
            let source = std::mem::replace(&mut self.source, Box::new(Exhausted));
            let pump = tokio::spawn(pump(source, inbound_tx).in_current_span());
            info!(state = %self.state, "session running");
            tokio::pin!(shutdown);

            let reason = loop {
                tokio::select! {
                    biased;
                    () = &mut shutdown => break ShimError::Shutdown,
                    Some(request) = self.transitions_rx.recv() => self.transition(request),
                    inbound = inbound_rx.recv() => match inbound {
                        Some(Ok(msg)) => self.dispatch(msg),
                        Some(Err(e)) => break ShimError::Transport(e),
                        None => break ShimError::Disconnected,
                    },
                }
            };

            pump.abort();
            let released = self.driver.registry().close();
            match tokio::time::timeout(WRITER_CLOSE_TIMEOUT, self.driver.writer().close()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!(error = %e, "closing write side"),
                Err(_) => warn!(timeout = ?WRITER_CLOSE_TIMEOUT, "write side did not close in time"),
            }
            if reason.is_fatal() && !matches!(reason, ShimError::Disconnected) {
                error!(%reason, released, "session failed");
            } else {
                info!(%reason, released, "session ended");
            }
            reason
        }
        .instrument(span)
        .await
    }

    /// Route one inbound message.
    fn dispatch(&mut self, msg: Message) {
        MESSAGES_RECEIVED
            .with_label_values(&[msg.kind.as_str()])
            .inc();

        match msg.kind {
            MessageKind::Keepalive => trace!("keepalive"),
            kind if kind.requires_txid() && msg.txid.is_empty() => {
                let err = ShimError::MissingTxid(kind);
                warn!(error = %err, "rejecting message");
                self.spawn_write(Message::error("", err.to_string()));
            }
            kind if kind.is_reply() && self.driver.registry().is_awaiting(&msg.txid) => {
                if let Err(e) = self.driver.registry().fulfill(msg) {
                    warn!(error = %e, "reply could not be delivered");
                }
            }
            _ => self.transition(TransitionRequest::inbound(msg)),
        }
    }

    /// Apply a transition, answering the peer with ERROR if it is rejected.
    fn transition(&mut self, request: TransitionRequest) {
        let txid = request.message.txid.clone();
        if let Err(err) = self.apply(request) {
            self.spawn_write(Message::error(txid, err.to_string()));
        }
    }

    /// Look up and apply one transition with its effect.
    fn apply(&mut self, request: TransitionRequest) -> Result<(), ShimError> {
        let TransitionRequest {
            message,
            propagate_to_peer,
        } = request;

        let Some(transition) = lookup(self.state, message.kind) else {
            ILLEGAL_TRANSITIONS
                .with_label_values(&[self.state.as_str(), message.kind.as_str()])
                .inc();
            let err = ShimError::IllegalTransition {
                txid: message.txid,
                kind: message.kind,
                payload_size: message.payload.len(),
                state: self.state,
            };
            warn!(error = %err, "illegal transition");
            return Err(err);
        };

        let kind = message.kind;
        if propagate_to_peer {
            // Our own cycle result: record it, then tell the peer.
            self.set_state(transition.to, kind);
            self.spawn_write(message);
        } else if transition.effect.runs_before() {
            self.run_effect(transition.effect, message)?;
            self.set_state(transition.to, kind);
        } else {
            self.set_state(transition.to, kind);
            self.run_effect(transition.effect, message)?;
        }
        Ok(())
    }

    fn run_effect(&mut self, effect: Effect, message: Message) -> Result<(), ShimError> {
        match effect {
            Effect::None => {}
            Effect::ValidateRegistration => validate_registration(&message)?,
            Effect::BeginInit => {
                self.executor.spawn(CyclePhase::Init, message);
            }
            Effect::BeginTransaction => {
                self.executor.spawn(CyclePhase::Transaction, message);
            }
            Effect::DeliverReply => {
                let txid = message.txid.clone();
                if let Err(e) = self.driver.registry().fulfill(message) {
                    error!(txid = %txid, error = %e, "reply has no waiting request");
                }
            }
        }
        Ok(())
    }

    fn set_state(&mut self, to: ProtocolState, kind: MessageKind) {
        if self.state != to {
            debug!(from = %self.state, to = %to, %kind, "state changed");
            self.state = to;
            self.state_tx.send_replace(to);
        }
    }

    fn spawn_write(&self, msg: Message) {
        let driver = self.driver.clone();
        tokio::spawn(
            async move {
                let (txid, kind) = (msg.txid.clone(), msg.kind);
                if let Err(e) = driver.send(msg).await {
                    warn!(txid = %txid, %kind, error = %e, "write to peer failed");
                }
            }
            .in_current_span(),
        );
    }
}

/// REGISTERED may echo the chaincode id; anything else in the payload is
/// malformed.
fn validate_registration(msg: &Message) -> Result<(), ShimError> {
    if !msg.payload.is_empty() {
        decode::<ChaincodeId>(&msg.payload)?;
    }
    Ok(())
}

async fn next_lifecycle_message(source: &mut dyn MessageSource) -> Result<Message, ShimError> {
    loop {
        match source.recv().await? {
            Some(msg) if msg.kind == MessageKind::Keepalive => trace!("keepalive during handshake"),
            Some(msg) => return Ok(msg),
            None => return Err(ShimError::Disconnected),
        }
    }
}

/// Sole reader of the stream. Ends on end of stream, on a read error, or
/// when the session stops listening.
async fn pump(
    mut source: Box<dyn MessageSource>,
    inbound: mpsc::Sender<Result<Message, StreamError>>,
) {
    loop {
        match source.recv().await {
            Ok(Some(msg)) => {
                if inbound.send(Ok(msg)).await.is_err() {
                    break;
                }
            }
            Ok(None) => {
                debug!("peer closed the stream");
                break;
            }
            Err(e) => {
                let _ = inbound.send(Err(e)).await;
                break;
            }
        }
    }
}

/// Placeholder left behind once the pump owns the real source.
struct Exhausted;

#[async_trait::async_trait]
impl MessageSource for Exhausted {
    async fn recv(&mut self) -> Result<Option<Message>, StreamError> {
        Ok(None)
    }
}
