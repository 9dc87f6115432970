//! Monitor channel models.
//!
//! The monitor broadcasts every request lifecycle event to every listener:
//! `NewRequest` when the gateway assigns an id to a submitted blueprint,
//! and `TxUpdate` each time that request changes status.

use serde::{Deserialize, Serialize};

use super::TxReply;

/// Lifecycle status of a request. Only [`TxStatus::Finished`] is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum TxStatus {
    Created,
    Pending,
    Finished,
    /// Any status this client does not act on.
    #[serde(other)]
    Other,
}

impl TxStatus {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TxStatus::Finished)
    }
}

/// Request id and status attached to every update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    pub id: u64,
    pub status: TxStatus,
}

/// One frame from the monitor channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MonitorEvent {
    /// Identity assignment: the gateway gave `id` to a blueprint with this
    /// content. Not addressed to anyone in particular.
    NewRequest {
        id: u64,
        fiber_type: String,
        function_key: String,
        #[serde(default)]
        init_values: Vec<serde_json::Value>,
    },
    /// Status change for an already identified request.
    TxUpdate(TxReply),
}
