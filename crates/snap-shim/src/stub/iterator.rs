//! Paged query iterators.
//!
//! A query's first page arrives with the request that opened it. Further
//! pages are fetched with QUERY_STATE_NEXT while the peer reports `has_more`;
//! `close` sends QUERY_STATE_CLOSE to release the peer-side handle.

use serde::de::DeserializeOwned;
use snap_types::{decode, KeyModification, QueryResponse, KV};
use std::marker::PhantomData;

use crate::domain::ShimError;
use crate::handlers::OperationHandlers;

/// Iterator over range and rich-query results.
pub type StateQueryIterator = QueryIterator<KV>;

/// Iterator over the modification history of one key.
pub type HistoryQueryIterator = QueryIterator<KeyModification>;

/// Entries of an open query, decoded as `T`.
pub struct QueryIterator<T> {
    handlers: OperationHandlers,
    txid: String,
    page: QueryResponse,
    index: usize,
    closed: bool,
    _entry: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> QueryIterator<T> {
    pub(crate) fn new(handlers: OperationHandlers, txid: String, first_page: QueryResponse) -> Self {
        Self {
            handlers,
            txid,
            page: first_page,
            index: 0,
            closed: false,
            _entry: PhantomData,
        }
    }

    /// Whether another entry is buffered or can be fetched.
    #[must_use]
    pub fn has_next(&self) -> bool {
        !self.closed && (self.index < self.page.results.len() || self.page.has_more)
    }

    /// Next entry, fetching the next page when the current one is used up.
    pub async fn next(&mut self) -> Result<Option<T>, ShimError> {
        loop {
            if self.closed {
                return Ok(None);
            }
            if let Some(entry) = self.page.results.get(self.index) {
                self.index += 1;
                return Ok(Some(decode(&entry.result_bytes)?));
            }
            if !self.page.has_more {
                return Ok(None);
            }
            self.page = self
                .handlers
                .query_state_next(&self.txid, &self.page.id)
                .await?;
            self.index = 0;
        }
    }

    /// Release the query on the peer. Idempotent.
    pub async fn close(&mut self) -> Result<(), ShimError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.handlers
            .query_state_close(&self.txid, &self.page.id)
            .await?;
        Ok(())
    }

    /// Drain every remaining entry, then close.
    pub async fn collect_all(mut self) -> Result<Vec<T>, ShimError> {
        let mut entries = Vec::new();
        while let Some(entry) = self.next().await? {
            entries.push(entry);
        }
        self.close().await?;
        Ok(entries)
    }
}
