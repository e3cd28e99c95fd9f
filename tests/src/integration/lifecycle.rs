//! # Lifecycle Scenarios
//!
//! Handshake, READY, INIT and TRANSACTION cycles, illegal messages and
//! keep-alives, as seen from the peer.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use snap_runtime::snaps::KvSnap;
    use snap_shim::{ProtocolState, ShimConfig, ShimError};
    use snap_types::{decode, status, Message, MessageKind, PutStateInfo, Response};

    use crate::harness::{recorded, MockPeer, OrderTracker, Panicker, Recorder, RunningSession};

    // =========================================================================
    // HANDSHAKE
    // =========================================================================

    /// Created -> Established -> Ready, then a trivial transaction completes.
    #[tokio::test]
    async fn test_register_ready_transaction_completes() {
        let (session, mut peer) =
            MockPeer::register(Arc::new(KvSnap::new()), ShimConfig::for_chaincode("kv")).await;
        assert_eq!(session.state(), ProtocolState::Established);

        let mut running = RunningSession::spawn(session);
        peer.send(Message::new(MessageKind::Ready, "", Vec::new()))
            .await;
        running.wait_for(ProtocolState::Ready).await;

        peer.transaction("t1", &["del", "A"]).await;
        let del = peer.expect(MessageKind::DelState).await;
        assert_eq!(del.payload, b"A".to_vec());
        peer.respond("t1", Vec::new()).await;

        let completed = peer.expect(MessageKind::Completed).await;
        assert_eq!(completed.txid, "t1");
        let response: Response = decode(&completed.payload).unwrap();
        assert_eq!(response.status, status::OK);
        assert_eq!(running.current(), ProtocolState::Ready);
    }

    #[tokio::test]
    async fn test_ready_then_transaction_back_to_back() {
        let (session, mut peer) =
            MockPeer::register(Arc::new(OrderTracker::default()), ShimConfig::for_chaincode("kv"))
                .await;
        let _running = RunningSession::spawn(session);

        // No wait between the two: TRANSACTION must see the state READY produced.
        peer.send(Message::new(MessageKind::Ready, "", Vec::new()))
            .await;
        peer.transaction("t1", &[]).await;

        peer.expect(MessageKind::GetState).await;
        peer.respond("t1", b"v".to_vec()).await;
        peer.expect(MessageKind::Completed).await;
    }

    // =========================================================================
    // ILLEGAL MESSAGES AND KEEPALIVE
    // =========================================================================

    #[tokio::test]
    async fn test_transaction_before_ready_is_rejected() {
        let (session, mut peer) =
            MockPeer::register(Arc::new(KvSnap::new()), ShimConfig::for_chaincode("kv")).await;
        let running = RunningSession::spawn(session);

        peer.transaction("t1", &["get", "A"]).await;
        let reply = peer.expect(MessageKind::Error).await;
        assert_eq!(reply.txid, "t1");
        assert!(reply
            .payload_text()
            .starts_with("[t1] chaincode handler cannot handle message (TRANSACTION)"));
        assert!(reply.payload_text().ends_with("while in state: established"));
        assert_eq!(running.current(), ProtocolState::Established);
    }

    #[tokio::test]
    async fn test_repeated_registered_is_rejected_in_ready() {
        let (running, mut peer) = MockPeer::ready(Arc::new(KvSnap::new())).await;

        peer.send(Message::new(MessageKind::Registered, "r2", Vec::new()))
            .await;
        let reply = peer.expect(MessageKind::Error).await;
        assert!(reply.payload_text().contains("(REGISTERED)"));
        assert_eq!(running.current(), ProtocolState::Ready);
    }

    #[tokio::test]
    async fn test_keepalive_changes_nothing_and_gets_no_reply() {
        let (session, mut peer) =
            MockPeer::register(Arc::new(KvSnap::new()), ShimConfig::for_chaincode("kv")).await;
        let running = RunningSession::spawn(session);

        for _ in 0..3 {
            peer.send(Message::new(MessageKind::Keepalive, "", Vec::new()))
                .await;
        }
        assert!(peer.recv_within(Duration::from_millis(150)).await.is_none());
        assert_eq!(running.current(), ProtocolState::Established);

        // The loop is still live: an illegal INIT is answered.
        peer.send(Message::new(MessageKind::Init, "late-init", Vec::new()))
            .await;
        assert_eq!(peer.expect(MessageKind::Error).await.txid, "late-init");
    }

    // =========================================================================
    // INIT CYCLES
    // =========================================================================

    #[tokio::test]
    async fn test_init_writes_pairs_then_completes() {
        let (_running, mut peer) = MockPeer::ready(Arc::new(KvSnap::new())).await;

        peer.init("i1", &["a", "1"]).await;
        let put = peer.expect(MessageKind::PutState).await;
        let info: PutStateInfo = decode(&put.payload).unwrap();
        assert_eq!((info.key.as_str(), info.value.as_slice()), ("a", &b"1"[..]));
        peer.respond("i1", Vec::new()).await;

        let completed = peer.expect(MessageKind::Completed).await;
        assert_eq!(completed.txid, "i1");
    }

    #[tokio::test]
    async fn test_failed_init_is_reported_as_error() {
        let (_running, mut peer) = MockPeer::ready(Arc::new(KvSnap::new())).await;

        peer.init("i2", &["dangling"]).await;
        let reply = peer.expect(MessageKind::Error).await;
        assert_eq!(reply.txid, "i2");
        assert_eq!(reply.payload_text(), "init expects key/value pairs");
    }

    #[tokio::test]
    async fn test_failed_transaction_still_completes_with_status() {
        let (_running, mut peer) = MockPeer::ready(Arc::new(KvSnap::new())).await;

        peer.transaction("t1", &["nonsense"]).await;
        let completed = peer.expect(MessageKind::Completed).await;
        let response: Response = decode(&completed.payload).unwrap();
        assert_eq!(response.status, status::ERROR);
        assert!(response.message.contains("unknown function"));
    }

    #[tokio::test]
    async fn test_put_emits_event_on_completed() {
        let (_running, mut peer) = MockPeer::ready(Arc::new(KvSnap::new())).await;

        peer.transaction("t1", &["put", "color", "blue"]).await;
        peer.expect(MessageKind::PutState).await;
        peer.respond("t1", Vec::new()).await;

        let completed = peer.expect(MessageKind::Completed).await;
        let event = completed.event.expect("event attached");
        assert_eq!(event.event_name, "put");
        assert_eq!(event.payload, b"color".to_vec());
        assert_eq!(event.txid, "t1");
    }

    // =========================================================================
    // FAULTS
    // =========================================================================

    #[tokio::test]
    async fn test_chaincode_panic_becomes_error_and_session_survives() {
        let (running, mut peer) = MockPeer::ready(Arc::new(Panicker)).await;

        peer.transaction("t1", &[]).await;
        let reply = peer.expect(MessageKind::Error).await;
        assert_eq!(reply.txid, "t1");
        assert!(reply.payload_text().contains("invoke exploded"));
        assert_eq!(running.current(), ProtocolState::Ready);

        peer.transaction("t2", &[]).await;
        assert_eq!(peer.expect(MessageKind::Error).await.txid, "t2");
    }

    #[tokio::test]
    async fn test_malformed_transaction_payload_is_answered() {
        let (running, mut peer) = MockPeer::ready(Arc::new(KvSnap::new())).await;

        peer.send(Message::new(MessageKind::Transaction, "t1", vec![0xde, 0xad]))
            .await;
        let reply = peer.expect(MessageKind::Error).await;
        assert!(reply.payload_text().starts_with("malformed payload"));
        assert_eq!(running.current(), ProtocolState::Ready);
    }

    #[tokio::test]
    async fn test_peer_close_ends_session_with_disconnect() {
        let (running, mut peer) = MockPeer::ready(Arc::new(KvSnap::new())).await;

        peer.close().await;
        assert!(matches!(running.finished().await, ShimError::Disconnected));
        assert!(peer.is_closed_by_session().await);
    }

    #[tokio::test]
    async fn test_recorder_sees_every_cycle() {
        let (chaincode, mut rx) = Recorder::wrap(KvSnap::new());
        let (_running, mut peer) = MockPeer::ready(chaincode).await;

        peer.transaction("t1", &["get", "missing"]).await;
        peer.expect(MessageKind::GetState).await;
        peer.respond("t1", Vec::new()).await;

        let (txid, response) = recorded(&mut rx).await;
        assert_eq!(txid, "t1");
        assert!(response.payload.is_empty());
    }
}
