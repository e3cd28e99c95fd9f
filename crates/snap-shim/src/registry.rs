//! # Correlation Registry
//!
//! Maps a transaction id to the single caller awaiting its reply.
//!
//! Flow:
//! 1. A requester calls [`CorrelationRegistry::create_slot`] and keeps the
//!    receiver
//! 2. The requester writes its request
//! 3. The dispatch loop routes the reply to [`CorrelationRegistry::fulfill`]
//! 4. The requester always calls [`CorrelationRegistry::delete_slot`],
//!    whatever the outcome
//!
//! A fulfilled slot stays in the map until deleted, so a transaction id
//! cannot be reused by a second request before the first caller has
//! cleaned up. The lock is held only for map access, never across an await.

use parking_lot::Mutex;
use snap_telemetry::PENDING_REQUESTS;
use snap_types::Message;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::domain::ShimError;

/// Statistics for the registry.
#[derive(Debug, Default)]
pub struct RegistryStats {
    /// Slots created.
    pub total_created: AtomicU64,
    /// Replies delivered to a waiting caller.
    pub total_fulfilled: AtomicU64,
    /// Replies that found no waiting caller.
    pub total_unmatched: AtomicU64,
    /// Slots released by `close`.
    pub total_disconnected: AtomicU64,
}

struct Inner {
    /// `None` once the reply has been delivered.
    slots: HashMap<String, Option<oneshot::Sender<Message>>>,
    closed: bool,
}

/// Pending-reply map keyed by transaction id.
pub struct CorrelationRegistry {
    inner: Mutex<Inner>,
    max_pending: usize,
    stats: RegistryStats,
}

impl CorrelationRegistry {
    /// Create a registry holding at most `max_pending` slots.
    #[must_use]
    pub fn new(max_pending: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                slots: HashMap::new(),
                closed: false,
            }),
            max_pending,
            stats: RegistryStats::default(),
        }
    }

    /// Open a slot for `txid` and return the receiver its reply will arrive on.
    ///
    /// Fails if a slot for `txid` exists, the registry is closed, or the
    /// pending bound is reached.
    pub fn create_slot(&self, txid: &str) -> Result<oneshot::Receiver<Message>, ShimError> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(ShimError::RegistryClosed);
        }
        if inner.slots.contains_key(txid) {
            return Err(ShimError::DuplicateSlot(txid.to_string()));
        }
        if inner.slots.len() >= self.max_pending {
            return Err(ShimError::TooManyPending(self.max_pending));
        }

        let (tx, rx) = oneshot::channel();
        inner.slots.insert(txid.to_string(), Some(tx));
        PENDING_REQUESTS.set(inner.slots.len() as i64);
        drop(inner);

        self.stats.total_created.fetch_add(1, Ordering::Relaxed);
        debug!(txid, "created correlation slot");
        Ok(rx)
    }

    /// Deliver `msg` to the caller waiting on `msg.txid`.
    ///
    /// Fails with `UnknownTransaction` if no slot exists or it was already
    /// fulfilled. A caller that stopped waiting is not an error.
    pub fn fulfill(&self, msg: Message) -> Result<(), ShimError> {
        let sender = {
            let mut inner = self.inner.lock();
            inner.slots.get_mut(&msg.txid).and_then(Option::take)
        };

        let Some(sender) = sender else {
            self.stats.total_unmatched.fetch_add(1, Ordering::Relaxed);
            warn!(txid = %msg.txid, kind = %msg.kind, "reply for unknown transaction");
            return Err(ShimError::UnknownTransaction(msg.txid));
        };

        let txid = msg.txid.clone();
        match sender.send(msg) {
            Ok(()) => {
                self.stats.total_fulfilled.fetch_add(1, Ordering::Relaxed);
                debug!(txid = %txid, "fulfilled correlation slot");
            }
            Err(_) => debug!(txid = %txid, "reply receiver dropped"),
        }
        Ok(())
    }

    /// Whether a caller is still waiting for a reply on `txid`.
    #[must_use]
    pub fn is_awaiting(&self, txid: &str) -> bool {
        matches!(self.inner.lock().slots.get(txid), Some(Some(_)))
    }

    /// Remove the slot for `txid`. Idempotent.
    pub fn delete_slot(&self, txid: &str) {
        let mut inner = self.inner.lock();
        if inner.slots.remove(txid).is_some() {
            PENDING_REQUESTS.set(inner.slots.len() as i64);
            debug!(txid, "deleted correlation slot");
        }
    }

    /// Tear down: refuse new slots and drop every waiting sender so that
    /// callers observe a disconnection. Returns how many callers were waiting.
    pub fn close(&self) -> usize {
        let drained: Vec<_> = {
            let mut inner = self.inner.lock();
            inner.closed = true;
            inner.slots.drain().collect()
        };
        PENDING_REQUESTS.set(0);

        let waiting = drained.iter().filter(|(_, tx)| tx.is_some()).count();
        self.stats
            .total_disconnected
            .fetch_add(waiting as u64, Ordering::Relaxed);
        if waiting > 0 {
            warn!(waiting, "released pending requests on disconnect");
        }
        waiting
    }

    /// Whether `close` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Number of slots currently held.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.lock().slots.len()
    }

    /// Get statistics.
    pub fn stats(&self) -> &RegistryStats {
        &self.stats
    }
}
