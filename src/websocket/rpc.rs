//! One-shot request/reply over a dedicated WebSocket.
//!
//! Every [`call`] opens its own channel, sends one payload, and waits for
//! the first `Finished` reply on that same channel. No retries and no
//! timeout: the loops driving these calls retry whole cycles instead.

use std::future::Future;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio_tungstenite::connect_async;
use tracing::{debug, info, trace};
use tungstenite::Message;

use super::{WsStream, order_book_url, parse_frame};
use crate::ids::OrderIdAllocator;
use crate::models::{
    BookSnapshot, CancelRequest, DepthRequest, EmptyRequest, Order, OrderOutcome, Side, TxReply,
    Value,
};
use crate::{Result, SweeperError};

/// Sends `payload` to `url` and resolves with the `result` of the first
/// `Finished` reply.
///
/// Frames that do not decode as a reply are skipped. The channel is closed
/// before returning, on success and on error alike.
///
/// # Errors
///
/// Returns [`SweeperError::WebSocket`] on connect/send/receive failure and
/// [`SweeperError::ChannelClosed`] if the channel ends without a
/// `Finished` reply.
pub async fn call<P: Serialize + ?Sized>(url: &str, payload: &P) -> Result<serde_json::Value> {
    let json = serde_json::to_string(payload)?;
    let (mut ws, _) = connect_async(url).await?;
    trace!(url, "Direct channel open");

    let outcome = exchange(&mut ws, json).await;

    if let Err(e) = ws.close(None).await {
        trace!(url, "Close after call: {e}");
    }
    outcome
}

async fn exchange(ws: &mut WsStream, json: String) -> Result<serde_json::Value> {
    ws.send(Message::Text(json.into())).await?;

    while let Some(msg) = ws.next().await {
        let reply = match msg? {
            Message::Text(text) => parse_frame::<TxReply>(text.as_bytes()),
            Message::Binary(bytes) => parse_frame::<TxReply>(&bytes),
            Message::Close(_) => break,
            _ => None,
        };
        if let Some(reply) = reply
            && reply.meta.status.is_terminal()
        {
            return Ok(reply.result);
        }
    }

    Err(SweeperError::ChannelClosed)
}

/// The order-book operations the drain loop needs.
pub trait OrderBookApi {
    /// Top `n` levels of each side.
    fn top_n_depth(&self, n: u64) -> impl Future<Output = Result<BookSnapshot>> + Send;

    /// Places a limit order and returns the trades it produced.
    fn place(
        &self,
        side: Side,
        price: u64,
        qty: u64,
    ) -> impl Future<Output = Result<OrderOutcome>> + Send;
}

/// Order-book client that uses one direct channel per operation.
#[derive(Debug, Clone)]
pub struct DirectClient {
    ws_base: String,
    ids: Arc<OrderIdAllocator>,
}

impl DirectClient {
    /// Creates a client for the gateway at WebSocket base `ws_base`,
    /// allocating order ids from `ids`.
    #[must_use]
    pub fn new(ws_base: impl Into<String>, ids: Arc<OrderIdAllocator>) -> Self {
        Self {
            ws_base: ws_base.into(),
            ids,
        }
    }

    async fn invoke<P: Serialize + ?Sized>(
        &self,
        function_key: &str,
        payload: &P,
    ) -> Result<Value> {
        let raw = call(&order_book_url(&self.ws_base, function_key), payload).await?;
        Value::from_raw(&raw)
    }

    /// Best bid price, if any bids rest.
    ///
    /// # Errors
    ///
    /// See [`call`]; also [`SweeperError::UnexpectedResult`].
    pub async fn best_bid(&self) -> Result<Option<u64>> {
        self.invoke("best_bid", &EmptyRequest::default())
            .await?
            .into_option_u64()
    }

    /// Best ask price, if any asks rest.
    ///
    /// # Errors
    ///
    /// See [`call`]; also [`SweeperError::UnexpectedResult`].
    pub async fn best_ask(&self) -> Result<Option<u64>> {
        self.invoke("best_ask", &EmptyRequest::default())
            .await?
            .into_option_u64()
    }

    /// Cancels a resting order. Returns `true` if something was removed.
    ///
    /// # Errors
    ///
    /// See [`call`]; also [`SweeperError::UnexpectedResult`].
    pub async fn cancel(&self, id: u64) -> Result<bool> {
        let removed = self
            .invoke("cancel", &CancelRequest { id })
            .await?
            .into_u64()?;
        info!(id, removed, "Cancel processed");
        Ok(removed == 1)
    }
}

impl OrderBookApi for DirectClient {
    async fn top_n_depth(&self, n: u64) -> Result<BookSnapshot> {
        self.invoke("top_n_depth", &DepthRequest { n })
            .await?
            .into_snapshot()
    }

    async fn place(&self, side: Side, price: u64, qty: u64) -> Result<OrderOutcome> {
        let order = Order {
            id: self.ids.allocate(),
            side,
            price,
            qty,
        };
        let trades = self
            .invoke(side.function_key(), &order.request())
            .await?
            .into_trades()?;
        debug!(
            id = order.id,
            ?side,
            price,
            qty,
            trades = trades.len(),
            "Order placed"
        );
        Ok(OrderOutcome { order, trades })
    }
}
