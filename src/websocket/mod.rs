//! Async WebSocket clients for the order-book gateway.
//!
//! This module is organized by channel style:
//! - [`rpc`] - one short-lived channel per request
//! - [`dispatch`] - many requests multiplexed over the shared monitor
//! - [`correlation`] - the table that pairs monitor events with callers

pub mod correlation;
pub mod dispatch;
pub mod rpc;

use serde::de::DeserializeOwned;
use tokio::net::TcpStream;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{info, trace};

use crate::Result;

pub use dispatch::Dispatcher;
pub use rpc::{DirectClient, OrderBookApi, call};

/// A full-duplex gateway WebSocket.
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Path of the shared notification channel.
pub const MONITOR_PATH: &str = "/monitor";

/// Path prefix of the per-request order-book endpoints.
pub const ORDER_BOOK_PATH: &str = "/ws/order_book";

/// Establishes a WebSocket connection to the given URL.
///
/// # Errors
///
/// Returns a [`SweeperError`](crate::SweeperError) if the connection or TLS handshake fails.
pub async fn connect(url: &str) -> Result<WsStream> {
    let (ws_stream, _) = connect_async(url).await?;
    info!(url, "WebSocket handshake completed");

    Ok(ws_stream)
}

/// Connects to the monitor channel under the WebSocket base `ws_base`.
///
/// # Errors
///
/// Returns a [`SweeperError`](crate::SweeperError) if the connection fails.
pub async fn connect_monitor(ws_base: &str) -> Result<WsStream> {
    connect(&monitor_url(ws_base)).await
}

/// `{ws_base}/monitor`
#[must_use]
pub fn monitor_url(ws_base: &str) -> String {
    format!("{}{MONITOR_PATH}", ws_base.trim_end_matches('/'))
}

/// `{ws_base}/ws/order_book/{function_key}`
#[must_use]
pub fn order_book_url(ws_base: &str, function_key: &str) -> String {
    format!(
        "{}{ORDER_BOOK_PATH}/{function_key}",
        ws_base.trim_end_matches('/')
    )
}

/// Decodes one inbound frame, or `None` if it is not the expected shape.
///
/// Gateways interleave unrelated frames (error strings, other event
/// kinds); those are dropped here and never reach the caller.
pub(crate) fn parse_frame<T: DeserializeOwned>(bytes: &[u8]) -> Option<T> {
    match serde_json::from_slice(bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            trace!("Discarding frame: {e}");
            None
        }
    }
}
