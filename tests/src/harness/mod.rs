//! # Mock Peer Harness
//!
//! Scripts the peer side of an in-process duplex pair so integration tests
//! can drive a real [`Session`] message by message.
//!
//! ```text
//!  test ──> MockPeer ══ duplex_pair ══ Session ──> chaincode
//! ```

use async_trait::async_trait;
use parking_lot::Mutex;
use snap_shim::{Chaincode, ChaincodeStub, ProtocolState, Session, ShimConfig, ShimError};
use snap_stream::{duplex_pair, InProcessSink, InProcessSource, MessageSink, MessageSource};
use snap_types::{encode, ChaincodeInput, Message, MessageKind, Response};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// How long the harness waits for any single message.
pub const STEP_TIMEOUT: Duration = Duration::from_secs(2);

/// Fresh transaction id.
pub fn txid() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// The peer end of a session's stream.
pub struct MockPeer {
    sink: InProcessSink,
    source: InProcessSource,
}

impl MockPeer {
    /// Start a session for `chaincode`, answering its REGISTER with
    /// REGISTERED. The session is returned in `Established`.
    pub async fn register(chaincode: Arc<dyn Chaincode>, config: ShimConfig) -> (Session, MockPeer) {
        let (local, remote) = duplex_pair(snap_stream::DEFAULT_CHANNEL_CAPACITY);
        let start = tokio::spawn(Session::start(local, chaincode, config));

        let (sink, source) = remote.into_parts();
        let mut peer = MockPeer { sink, source };
        let register = peer.expect(MessageKind::Register).await;
        assert!(register.txid.is_empty());
        peer.send(Message::new(MessageKind::Registered, "", Vec::new()))
            .await;

        let session = start
            .await
            .expect("start task panicked")
            .expect("registration failed");
        (session, peer)
    }

    /// Register, spawn the session loop and send READY.
    pub async fn ready(chaincode: Arc<dyn Chaincode>) -> (RunningSession, MockPeer) {
        let (session, mut peer) =
            Self::register(chaincode, ShimConfig::for_chaincode("kv")).await;
        let mut running = RunningSession::spawn(session);
        peer.send(Message::new(MessageKind::Ready, "", Vec::new()))
            .await;
        running.wait_for(ProtocolState::Ready).await;
        (running, peer)
    }

    pub async fn send(&mut self, msg: Message) {
        self.sink.send(msg).await.expect("session end of stream closed");
    }

    /// Send TRANSACTION with string arguments.
    pub async fn transaction(&mut self, txid: &str, args: &[&str]) {
        let input = encode(&ChaincodeInput::from_strings(args)).expect("encode input");
        self.send(Message::new(MessageKind::Transaction, txid, input))
            .await;
    }

    /// Send INIT with string arguments.
    pub async fn init(&mut self, txid: &str, args: &[&str]) {
        let input = encode(&ChaincodeInput::from_strings(args)).expect("encode input");
        self.send(Message::new(MessageKind::Init, txid, input)).await;
    }

    /// Answer a request with RESPONSE.
    pub async fn respond(&mut self, txid: &str, payload: impl Into<Vec<u8>>) {
        self.send(Message::new(MessageKind::Response, txid, payload))
            .await;
    }

    /// Next message from the session; panics if none arrives in time.
    pub async fn recv(&mut self) -> Message {
        timeout(STEP_TIMEOUT, self.source.recv())
            .await
            .expect("timed out waiting for the session")
            .expect("stream failed")
            .expect("session closed the stream")
    }

    /// Next message if one arrives within `wait`.
    pub async fn recv_within(&mut self, wait: Duration) -> Option<Message> {
        match timeout(wait, self.source.recv()).await {
            Ok(Ok(msg)) => msg,
            _ => None,
        }
    }

    /// Next message, asserting its kind.
    pub async fn expect(&mut self, kind: MessageKind) -> Message {
        let msg = self.recv().await;
        assert_eq!(
            msg.kind,
            kind,
            "expected {} but got {} ({})",
            kind,
            msg.kind,
            msg.payload_text()
        );
        msg
    }

    /// Whether the session has closed its write side.
    pub async fn is_closed_by_session(&mut self) -> bool {
        matches!(
            timeout(STEP_TIMEOUT, self.source.recv()).await,
            Ok(Ok(None))
        )
    }

    /// End the stream from the peer side.
    pub async fn close(&mut self) {
        self.sink.close_send().await.expect("close");
    }
}

/// A session whose loop runs on its own task.
pub struct RunningSession {
    pub handle: JoinHandle<ShimError>,
    pub state: watch::Receiver<ProtocolState>,
}

impl RunningSession {
    pub fn spawn(session: Session) -> Self {
        let state = session.watch_state();
        Self {
            handle: tokio::spawn(session.run()),
            state,
        }
    }

    pub fn current(&self) -> ProtocolState {
        *self.state.borrow()
    }

    pub async fn wait_for(&mut self, target: ProtocolState) {
        timeout(STEP_TIMEOUT, self.state.wait_for(|s| *s == target))
            .await
            .expect("state not reached in time")
            .expect("session dropped");
    }

    /// Wait for the loop to end and return why.
    pub async fn finished(self) -> ShimError {
        timeout(STEP_TIMEOUT, self.handle)
            .await
            .expect("session did not end")
            .expect("session task panicked")
    }
}

/// Wraps a chaincode and reports every response it returns, keyed by txid.
pub struct Recorder<C> {
    inner: C,
    tx: mpsc::UnboundedSender<(String, Response)>,
}

impl<C: Chaincode> Recorder<C> {
    pub fn wrap(inner: C) -> (Arc<Self>, mpsc::UnboundedReceiver<(String, Response)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { inner, tx }), rx)
    }
}

#[async_trait]
impl<C: Chaincode> Chaincode for Recorder<C> {
    async fn init(&self, stub: &mut ChaincodeStub) -> Response {
        let response = self.inner.init(stub).await;
        let _ = self.tx.send((stub.txid().to_string(), response.clone()));
        response
    }

    async fn invoke(&self, stub: &mut ChaincodeStub) -> Response {
        let response = self.inner.invoke(stub).await;
        let _ = self.tx.send((stub.txid().to_string(), response.clone()));
        response
    }
}

/// Next recorded response, with a timeout.
pub async fn recorded(rx: &mut mpsc::UnboundedReceiver<(String, Response)>) -> (String, Response) {
    timeout(STEP_TIMEOUT, rx.recv())
        .await
        .expect("chaincode did not finish in time")
        .expect("recorder dropped")
}

/// Chaincode that panics on every invocation.
pub struct Panicker;

#[async_trait]
impl Chaincode for Panicker {
    async fn init(&self, _stub: &mut ChaincodeStub) -> Response {
        panic!("init exploded")
    }

    async fn invoke(&self, _stub: &mut ChaincodeStub) -> Response {
        panic!("invoke exploded")
    }
}

/// Chaincode that records the order in which cycles start and end.
#[derive(Default)]
pub struct OrderTracker {
    pub events: Mutex<Vec<String>>,
}

#[async_trait]
impl Chaincode for OrderTracker {
    async fn init(&self, stub: &mut ChaincodeStub) -> Response {
        self.events.lock().push(format!("init:{}", stub.txid()));
        Response::success(Vec::new())
    }

    async fn invoke(&self, stub: &mut ChaincodeStub) -> Response {
        self.events.lock().push(format!("start:{}", stub.txid()));
        let value = match stub.get_state("k").await {
            Ok(v) => v,
            Err(e) => return Response::error(e.to_string()),
        };
        self.events.lock().push(format!("end:{}", stub.txid()));
        Response::success(value)
    }
}
