//! Last-request-wins synchronisation between a query descriptor and its
//! collection state.
//!
//! Each dispatched fetch receives a [`FetchTicket`] stamped with a
//! generation number. Issuing a new ticket supersedes every earlier one;
//! when a response arrives, [`QuerySync::finish`] applies it only if its
//! ticket is still the latest. Stale responses are dropped on arrival and
//! leave the state (including the loading flag, which belongs to the newer
//! fetch) untouched. The lock is never held across an `.await`.

use parking_lot::Mutex;
use taskdesk_proto::page::Page;
use taskdesk_proto::query::PageQuery;

use crate::api::ApiError;
use crate::collection::CollectionState;

/// Permission to apply one fetch result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket<Q> {
    generation: u64,
    query: Q,
}

impl<Q> FetchTicket<Q> {
    /// The descriptor to send.
    pub const fn query(&self) -> &Q {
        &self.query
    }

    /// Generation stamp of this fetch.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

/// What happened to a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum FetchOutcome {
    /// The response was applied to the collection.
    Applied,
    /// A newer fetch was issued first; the response was discarded.
    Superseded,
    /// The fetch failed; the error was recorded and the page kept.
    Failed,
    /// The descriptor did not change, so nothing was fetched.
    Skipped,
}

struct Inner<Q, T> {
    query: Q,
    state: CollectionState<T>,
    generation: u64,
}

/// Descriptor plus collection state for one list view.
pub struct QuerySync<Q, T> {
    inner: Mutex<Inner<Q, T>>,
}

impl<Q: PageQuery, T: Clone> QuerySync<Q, T> {
    /// Creates an idle, empty collection for `query`.
    pub fn new(query: Q) -> Self {
        Self {
            inner: Mutex::new(Inner {
                query,
                state: CollectionState::new(),
                generation: 0,
            }),
        }
    }

    /// Current descriptor.
    pub fn query(&self) -> Q {
        self.inner.lock().query.clone()
    }

    /// Snapshot of the collection state.
    pub fn state(&self) -> CollectionState<T> {
        self.inner.lock().state.clone()
    }

    /// Mutates the descriptor and, if `change` reports a change, issues a
    /// ticket for the new descriptor.
    pub fn begin_with(&self, change: impl FnOnce(&mut Q) -> bool) -> Option<FetchTicket<Q>> {
        let mut inner = self.inner.lock();
        if !change(&mut inner.query) {
            return None;
        }
        Some(Self::issue(&mut inner))
    }

    /// Issues a ticket for the unchanged descriptor.
    pub fn begin_refresh(&self) -> FetchTicket<Q> {
        Self::issue(&mut self.inner.lock())
    }

    fn issue(inner: &mut Inner<Q, T>) -> FetchTicket<Q> {
        inner.generation += 1;
        inner.state.set_loading(true);
        inner.state.set_error(None);
        tracing::debug!(
            generation = inner.generation,
            page = inner.query.page(),
            "fetch dispatched"
        );
        FetchTicket {
            generation: inner.generation,
            query: inner.query.clone(),
        }
    }

    /// Applies a fetch result if `ticket` is still the latest.
    pub fn finish(&self, ticket: &FetchTicket<Q>, result: Result<Page<T>, ApiError>) -> FetchOutcome {
        let mut inner = self.inner.lock();
        if ticket.generation != inner.generation {
            tracing::warn!(
                stale = ticket.generation,
                latest = inner.generation,
                "discarding superseded response"
            );
            return FetchOutcome::Superseded;
        }
        inner.state.set_loading(false);
        match result {
            Ok(page) => {
                tracing::debug!(
                    generation = ticket.generation,
                    page = page.number,
                    items = page.content.len(),
                    "page applied"
                );
                inner
                    .state
                    .replace_page(page.content, page.total_pages, page.number);
                // Keep the descriptor aligned with the page the server returned.
                inner.query.set_page(page.number);
                FetchOutcome::Applied
            }
            Err(e) => {
                tracing::warn!(generation = ticket.generation, error = %e, "fetch failed");
                inner.state.set_error(Some(e));
                FetchOutcome::Failed
            }
        }
    }
}
