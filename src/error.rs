//! Crate-level error types.
//!
//! [`SweeperError`] unifies every error source (configuration, WebSocket,
//! HTTP submission, JSON) behind a single enum so callers can match on the
//! variant they care about while still using the `?` operator for easy
//! propagation.

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SweeperError>;

/// Top-level error type returned by all public APIs.
#[derive(Debug, thiserror::Error)]
pub enum SweeperError {
    /// An environment variable held a value that could not be used.
    #[error("configuration error: {0}")]
    Config(String),

    /// A WebSocket operation (connect, send, receive) failed.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// The one-way submission request could not be delivered.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The submission endpoint answered with a non-success status.
    #[error("submission rejected with status {status}")]
    SubmissionRejected { status: u16 },

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The channel carrying the reply went away before a terminal status.
    #[error("channel closed")]
    ChannelClosed,

    /// A reply decoded fine but carried a different result shape.
    #[error("unexpected result: expected {expected}, found {found}")]
    UnexpectedResult {
        expected: &'static str,
        found: String,
    },
}
