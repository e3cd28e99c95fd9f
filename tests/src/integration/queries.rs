//! # Query and Nested Invocation Scenarios
//!
//! Paged iterators and chaincode-to-chaincode calls, answered by the peer.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use snap_runtime::snaps::KvSnap;
    use snap_types::{
        decode, encode, ChaincodeSpec, GetHistoryForKey, GetStateByRange, KeyModification, Message,
        MessageKind, QueryResponse, QueryResultBytes, QueryStateClose, QueryStateNext, Response,
        KV,
    };

    use crate::harness::MockPeer;

    fn kv(key: &str, value: &str) -> QueryResultBytes {
        QueryResultBytes {
            result_bytes: encode(&KV {
                namespace: "kv".into(),
                key: key.into(),
                value: value.as_bytes().to_vec(),
            })
            .unwrap(),
        }
    }

    fn page(results: Vec<QueryResultBytes>, has_more: bool, id: &str) -> Vec<u8> {
        encode(&QueryResponse {
            results,
            has_more,
            id: id.into(),
        })
        .unwrap()
    }

    async fn completed_response(peer: &mut MockPeer) -> Response {
        let completed = peer.expect(MessageKind::Completed).await;
        decode(&completed.payload).unwrap()
    }

    #[tokio::test]
    async fn test_range_query_follows_pages_then_closes() {
        let (_running, mut peer) = MockPeer::ready(Arc::new(KvSnap::new())).await;

        peer.transaction("t1", &["range", "a", "z"]).await;
        let first = peer.expect(MessageKind::GetStateByRange).await;
        let range: GetStateByRange = decode(&first.payload).unwrap();
        assert_eq!((range.start_key.as_str(), range.end_key.as_str()), ("a", "z"));
        peer.respond("t1", page(vec![kv("a", "1"), kv("b", "2")], true, "it-1"))
            .await;

        let next = peer.expect(MessageKind::QueryStateNext).await;
        let next: QueryStateNext = decode(&next.payload).unwrap();
        assert_eq!(next.id, "it-1");
        peer.respond("t1", page(vec![kv("c", "3")], false, "it-1"))
            .await;

        let close = peer.expect(MessageKind::QueryStateClose).await;
        let close: QueryStateClose = decode(&close.payload).unwrap();
        assert_eq!(close.id, "it-1");
        peer.respond("t1", page(Vec::new(), false, "it-1")).await;

        let response = completed_response(&mut peer).await;
        assert!(response.is_success());
        assert_eq!(response.payload, b"a=1\nb=2\nc=3".to_vec());
    }

    #[tokio::test]
    async fn test_range_query_error_page_fails_transaction() {
        let (_running, mut peer) = MockPeer::ready(Arc::new(KvSnap::new())).await;

        peer.transaction("t1", &["range", "a", "z"]).await;
        peer.expect(MessageKind::GetStateByRange).await;
        peer.send(Message::error("t1", "range too wide")).await;

        let response = completed_response(&mut peer).await;
        assert!(!response.is_success());
        assert_eq!(response.message, "range too wide");
    }

    #[tokio::test]
    async fn test_history_lists_modifications() {
        let (_running, mut peer) = MockPeer::ready(Arc::new(KvSnap::new())).await;

        peer.transaction("t1", &["history", "color"]).await;
        let request = peer.expect(MessageKind::GetHistoryForKey).await;
        let request: GetHistoryForKey = decode(&request.payload).unwrap();
        assert_eq!(request.key, "color");

        let modification = |txid: &str, value: &str, is_delete| QueryResultBytes {
            result_bytes: encode(&KeyModification {
                txid: txid.into(),
                value: value.as_bytes().to_vec(),
                timestamp_secs: 1_700_000_000,
                is_delete,
            })
            .unwrap(),
        };
        peer.respond(
            "t1",
            page(
                vec![
                    modification("w1", "red", false),
                    modification("w2", "", true),
                ],
                false,
                "h-1",
            ),
        )
        .await;
        peer.expect(MessageKind::QueryStateClose).await;
        peer.respond("t1", page(Vec::new(), false, "h-1")).await;

        let response = completed_response(&mut peer).await;
        assert_eq!(response.payload, b"w1:red\nw2:<deleted>".to_vec());
    }

    #[tokio::test]
    async fn test_nested_invoke_success_returns_inner_payload() {
        let (_running, mut peer) = MockPeer::ready(Arc::new(KvSnap::new())).await;

        peer.transaction("t1", &["invoke", "other", "get", "x"]).await;
        let request = peer.expect(MessageKind::InvokeChaincode).await;
        let spec: ChaincodeSpec = decode(&request.payload).unwrap();
        assert_eq!(spec.chaincode_id.name, "other");
        assert_eq!(spec.input.args, vec![b"get".to_vec(), b"x".to_vec()]);

        let inner = Message::new(
            MessageKind::Completed,
            "t1",
            encode(&Response::success(b"nested".to_vec())).unwrap(),
        );
        peer.respond("t1", inner.to_bytes().unwrap()).await;

        let response = completed_response(&mut peer).await;
        assert!(response.is_success());
        assert_eq!(response.payload, b"nested".to_vec());
    }

    #[tokio::test]
    async fn test_nested_invoke_failure_surfaces_inner_text() {
        let (_running, mut peer) = MockPeer::ready(Arc::new(KvSnap::new())).await;

        peer.transaction("t1", &["invoke", "other"]).await;
        peer.expect(MessageKind::InvokeChaincode).await;

        let failed = Response {
            payload: b"insufficient funds".to_vec(),
            ..Response::error("ignored because payload is set")
        };
        let inner = Message::new(MessageKind::Completed, "t1", encode(&failed).unwrap());
        peer.respond("t1", inner.to_bytes().unwrap()).await;

        let response = completed_response(&mut peer).await;
        assert!(!response.is_success());
        assert_eq!(response.message, "insufficient funds");
    }

    #[tokio::test]
    async fn test_nested_invoke_inner_error_envelope() {
        let (_running, mut peer) = MockPeer::ready(Arc::new(KvSnap::new())).await;

        peer.transaction("t1", &["invoke", "other"]).await;
        peer.expect(MessageKind::InvokeChaincode).await;
        let inner = Message::error("t1", "other chaincode not found");
        peer.respond("t1", inner.to_bytes().unwrap()).await;

        let response = completed_response(&mut peer).await;
        assert_eq!(response.message, "other chaincode not found");
    }
}
