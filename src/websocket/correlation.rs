//! Correlation table for requests that share the monitor channel.
//!
//! A request starts life as a [`PendingRequest`] in an ordered list, keyed
//! only by its content. When the monitor announces an id for equal content,
//! the earliest such entry moves into the waiter map under that id. A
//! `Finished` update for the id resolves it. Closing the table rejects
//! everything still outstanding.

use std::collections::{HashMap, VecDeque};

use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::models::{TaskBlueprint, TxReply};
use crate::{Result, SweeperError};

/// Completion handle for one logical request.
pub type Reply = oneshot::Sender<Result<serde_json::Value>>;

/// Local handle for a request, used to withdraw it if submission fails.
pub type Ticket = u64;

/// Content a request is matched on. Values are kept in raw JSON form so
/// equality is structural, independent of key order inside objects.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestKey {
    pub fiber_type: String,
    pub function_key: String,
    pub init_values: Vec<serde_json::Value>,
}

impl From<&TaskBlueprint> for RequestKey {
    fn from(bp: &TaskBlueprint) -> Self {
        Self {
            fiber_type: bp.fiber_type.clone(),
            function_key: bp.function_key.clone(),
            init_values: bp.init_values.iter().map(|v| v.to_raw()).collect(),
        }
    }
}

/// A submitted request whose id has not been announced yet.
#[derive(Debug)]
pub struct PendingRequest {
    ticket: Ticket,
    key: RequestKey,
    reply: Reply,
}

/// A request that has been given an id and awaits its terminal update.
#[derive(Debug)]
pub struct Waiter {
    ticket: Ticket,
    reply: Reply,
}

/// Pending list plus waiter map. Owned by a single task; never shared.
#[derive(Debug, Default)]
pub struct CorrelationTable {
    pending: VecDeque<PendingRequest>,
    waiters: HashMap<u64, Waiter>,
}

impl CorrelationTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a request to the end of the pending list.
    pub fn register(&mut self, ticket: Ticket, key: RequestKey, reply: Reply) {
        self.pending.push_back(PendingRequest { ticket, key, reply });
    }

    /// Drops the request with `ticket`, wherever it currently is.
    ///
    /// Used when the out-of-band submission failed; the caller has already
    /// been told, so the reply handle is discarded without sending.
    pub fn withdraw(&mut self, ticket: Ticket) -> bool {
        if let Some(pos) = self.pending.iter().position(|p| p.ticket == ticket) {
            self.pending.remove(pos);
            return true;
        }
        let id = self
            .waiters
            .iter()
            .find(|(_, w)| w.ticket == ticket)
            .map(|(id, _)| *id);
        match id {
            Some(id) => self.waiters.remove(&id).is_some(),
            None => false,
        }
    }

    /// Handles an identity assignment. Returns `true` if it was ours.
    ///
    /// The first pending entry with equal content wins. An id that is
    /// already being waited on is never claimed twice.
    pub fn assign(&mut self, id: u64, key: &RequestKey) -> bool {
        if self.waiters.contains_key(&id) {
            debug!(id, "Ignoring repeated identity assignment");
            return false;
        }
        let Some(pos) = self.pending.iter().position(|p| &p.key == key) else {
            trace!(id, function_key = %key.function_key, "No pending request for assignment");
            return false;
        };
        let Some(pending) = self.pending.remove(pos) else {
            return false;
        };
        self.waiters.insert(
            id,
            Waiter {
                ticket: pending.ticket,
                reply: pending.reply,
            },
        );
        true
    }

    /// Handles a status update. Returns `true` if it resolved a waiter.
    pub fn update(&mut self, reply: TxReply) -> bool {
        let id = reply.meta.id;
        if !self.waiters.contains_key(&id) {
            trace!(id, "Update for unclaimed id");
            return false;
        }
        if !reply.meta.status.is_terminal() {
            trace!(id, status = ?reply.meta.status, "Non-terminal update");
            return false;
        }
        let Some(waiter) = self.waiters.remove(&id) else {
            return false;
        };
        // The caller may have stopped listening; that is not our concern.
        let _ = waiter.reply.send(Ok(reply.result));
        true
    }

    /// Rejects every outstanding request with [`SweeperError::ChannelClosed`]
    /// and empties both collections. Returns how many were rejected.
    pub fn close(&mut self) -> usize {
        let mut rejected = 0;
        for pending in self.pending.drain(..) {
            let _ = pending.reply.send(Err(SweeperError::ChannelClosed));
            rejected += 1;
        }
        for (_, waiter) in self.waiters.drain() {
            let _ = waiter.reply.send(Err(SweeperError::ChannelClosed));
            rejected += 1;
        }
        rejected
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn waiter_len(&self) -> usize {
        self.waiters.len()
    }

    #[must_use]
    pub fn is_waiting_on(&self, id: u64) -> bool {
        self.waiters.contains_key(&id)
    }
}
