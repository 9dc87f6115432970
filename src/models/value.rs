//! Tagged values exchanged with the engine.
//!
//! The engine encodes every argument and result as an externally tagged
//! union, e.g. `{"U64": 5}` or `{"BookSnapshot": {"bids": [], "asks": []}}`.
//! Replies are carried through the transport layers as raw JSON and only
//! decoded here, so an unfamiliar tag fails the caller's decode step and
//! nothing else.

use serde::{Deserialize, Serialize};

use super::book::BookSnapshot;
use super::trade::Trade;
use crate::{Result, SweeperError};

/// One engine value, one variant per observed tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    U64(u64),
    OptionU64(Option<u64>),
    BookSnapshot(BookSnapshot),
    ArrayTrade(Vec<Trade>),
}

impl Value {
    /// Decodes a raw `result` field.
    ///
    /// # Errors
    ///
    /// Returns [`SweeperError::UnexpectedResult`] if the JSON is not one of
    /// the known tagged shapes.
    pub fn from_raw(raw: &serde_json::Value) -> Result<Self> {
        Value::deserialize(raw).map_err(|_| SweeperError::UnexpectedResult {
            expected: "tagged value",
            found: describe(raw),
        })
    }

    /// Short name of the tag, used in logs and errors.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Value::U64(_) => "U64",
            Value::OptionU64(_) => "OptionU64",
            Value::BookSnapshot(_) => "BookSnapshot",
            Value::ArrayTrade(_) => "ArrayTrade",
        }
    }

    /// Raw JSON encoding of this value, as it appears on the wire.
    #[must_use]
    pub fn to_raw(&self) -> serde_json::Value {
        // Every variant is plain data; serializing into a `Value` cannot fail.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Unwraps a `U64` result.
    ///
    /// # Errors
    ///
    /// Returns [`SweeperError::UnexpectedResult`] for any other variant.
    pub fn into_u64(self) -> Result<u64> {
        match self {
            Value::U64(v) => Ok(v),
            other => Err(mismatch("U64", &other)),
        }
    }

    /// Unwraps an `OptionU64` result.
    ///
    /// # Errors
    ///
    /// Returns [`SweeperError::UnexpectedResult`] for any other variant.
    pub fn into_option_u64(self) -> Result<Option<u64>> {
        match self {
            Value::OptionU64(v) => Ok(v),
            other => Err(mismatch("OptionU64", &other)),
        }
    }

    /// Unwraps a `BookSnapshot` result.
    ///
    /// # Errors
    ///
    /// Returns [`SweeperError::UnexpectedResult`] for any other variant.
    pub fn into_snapshot(self) -> Result<BookSnapshot> {
        match self {
            Value::BookSnapshot(v) => Ok(v),
            other => Err(mismatch("BookSnapshot", &other)),
        }
    }

    /// Unwraps an `ArrayTrade` result.
    ///
    /// # Errors
    ///
    /// Returns [`SweeperError::UnexpectedResult`] for any other variant.
    pub fn into_trades(self) -> Result<Vec<Trade>> {
        match self {
            Value::ArrayTrade(v) => Ok(v),
            other => Err(mismatch("ArrayTrade", &other)),
        }
    }
}

fn mismatch(expected: &'static str, found: &Value) -> SweeperError {
    SweeperError::UnexpectedResult {
        expected,
        found: found.tag().to_string(),
    }
}

/// Names the outer shape of a raw value without dumping the whole payload.
fn describe(raw: &serde_json::Value) -> String {
    match raw {
        serde_json::Value::Object(map) => match map.keys().next() {
            Some(key) if map.len() == 1 => format!("tag {key}"),
            _ => format!("object with {} keys", map.len()),
        },
        serde_json::Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}
