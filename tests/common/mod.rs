//! Shared test utilities: an in-memory matching engine, an order-book API
//! backed by it, a stub gateway serving it over WebSockets, and an in-process
//! monitor channel.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, Stream, StreamExt};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_hdr_async;
use tungstenite::Message;
use tungstenite::handshake::server::{ErrorResponse, Request, Response};

use sweeper::models::{BookSnapshot, Order, OrderOutcome, PriceLevel, Side, TaskBlueprint, Trade};
use sweeper::submit::Submitter;
use sweeper::websocket::OrderBookApi;
use sweeper::{Result, SweeperError};

/// Price-time priority book that fills aggressively priced orders in full
/// against every level they cross.
#[derive(Debug, Default)]
pub struct MatchingBook {
    bids: BTreeMap<u64, VecDeque<(u64, u64)>>,
    asks: BTreeMap<u64, VecDeque<(u64, u64)>>,
}

impl MatchingBook {
    pub fn with_levels(bids: &[(u64, u64)], asks: &[(u64, u64)]) -> Self {
        let mut book = Self::default();
        let mut id = 1;
        for &(price, qty) in bids {
            book.bids.entry(price).or_default().push_back((id, qty));
            id += 1;
        }
        for &(price, qty) in asks {
            book.asks.entry(price).or_default().push_back((id, qty));
            id += 1;
        }
        book
    }

    pub fn add(&mut self, side: Side, id: u64, price: u64, qty: u64) -> Vec<Trade> {
        let mut remaining = qty;
        let mut trades = Vec::new();
        loop {
            if remaining == 0 {
                break;
            }
            let best = match side {
                Side::Buy => self.asks.keys().next().copied().filter(|p| *p <= price),
                Side::Sell => self.bids.keys().next_back().copied().filter(|p| *p >= price),
            };
            let Some(level_price) = best else {
                break;
            };
            let resting = match side {
                Side::Buy => &mut self.asks,
                Side::Sell => &mut self.bids,
            };
            let queue = resting.get_mut(&level_price).expect("level exists");
            while remaining > 0 {
                let Some(front) = queue.front_mut() else {
                    break;
                };
                let fill = front.1.min(remaining);
                trades.push(Trade {
                    price: level_price,
                    qty: fill,
                    taker_id: id,
                    maker_id: front.0,
                });
                front.1 -= fill;
                remaining -= fill;
                if front.1 == 0 {
                    queue.pop_front();
                }
            }
            if queue.is_empty() {
                resting.remove(&level_price);
            }
        }
        if remaining > 0 {
            let own = match side {
                Side::Buy => &mut self.bids,
                Side::Sell => &mut self.asks,
            };
            own.entry(price).or_default().push_back((id, remaining));
        }
        trades
    }

    pub fn depth(&self, n: u64) -> BookSnapshot {
        let n = n as usize;
        let level = |(price, queue): (&u64, &VecDeque<(u64, u64)>)| PriceLevel {
            price: *price,
            qty: queue.iter().map(|(_, q)| q).sum(),
        };
        BookSnapshot {
            bids: self.bids.iter().rev().take(n).map(level).collect(),
            asks: self.asks.iter().take(n).map(level).collect(),
        }
    }

    pub fn best_bid(&self) -> Option<u64> {
        self.bids.keys().next_back().copied()
    }

    pub fn best_ask(&self) -> Option<u64> {
        self.asks.keys().next().copied()
    }

    pub fn cancel(&mut self, id: u64) -> bool {
        for side in [&mut self.bids, &mut self.asks] {
            let mut emptied = None;
            let mut found = false;
            for (price, queue) in side.iter_mut() {
                if let Some(pos) = queue.iter().position(|(oid, _)| *oid == id) {
                    queue.remove(pos);
                    found = true;
                    if queue.is_empty() {
                        emptied = Some(*price);
                    }
                    break;
                }
            }
            if let Some(price) = emptied {
                side.remove(&price);
            }
            if found {
                return true;
            }
        }
        false
    }
}

/// One operation seen by [`RecordingBook`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookCall {
    Depth(BookSnapshot),
    Place(Order),
}

/// [`OrderBookApi`] over a [`MatchingBook`] that records every call and can
/// be told to fail upcoming depth reads.
pub struct RecordingBook {
    book: Mutex<MatchingBook>,
    next_id: AtomicU64,
    calls: Mutex<Vec<BookCall>>,
    failing_depth_reads: AtomicU64,
}

impl RecordingBook {
    pub fn new(book: MatchingBook) -> Self {
        Self {
            book: Mutex::new(book),
            next_id: AtomicU64::new(1000),
            calls: Mutex::new(Vec::new()),
            failing_depth_reads: AtomicU64::new(0),
        }
    }

    pub fn fail_next_depth_reads(&self, count: u64) {
        self.failing_depth_reads.store(count, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<BookCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn snapshot(&self) -> BookSnapshot {
        self.book.lock().unwrap().depth(u64::MAX)
    }

    pub fn add_resting(&self, side: Side, price: u64, qty: u64) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.book.lock().unwrap().add(side, id, price, qty);
    }
}

impl OrderBookApi for RecordingBook {
    async fn top_n_depth(&self, n: u64) -> Result<BookSnapshot> {
        let failing = self.failing_depth_reads.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_depth_reads.store(failing - 1, Ordering::SeqCst);
            return Err(SweeperError::ChannelClosed);
        }
        let snapshot = self.book.lock().unwrap().depth(n);
        self.calls
            .lock()
            .unwrap()
            .push(BookCall::Depth(snapshot.clone()));
        Ok(snapshot)
    }

    async fn place(&self, side: Side, price: u64, qty: u64) -> Result<OrderOutcome> {
        let order = Order {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            side,
            price,
            qty,
        };
        let trades = self.book.lock().unwrap().add(side, order.id, price, qty);
        self.calls.lock().unwrap().push(BookCall::Place(order));
        Ok(OrderOutcome { order, trades })
    }
}

/// Builds a direct-channel reply frame.
pub fn reply_frame(id: u64, status: &str, result: serde_json::Value) -> Message {
    let body = json!({"meta": {"id": id, "status": {"type": status}}, "result": result});
    Message::Text(body.to_string().into())
}

/// What a scripted direct endpoint received.
#[derive(Debug, Clone)]
pub struct Received {
    pub path: String,
    pub payload: serde_json::Value,
}

/// Starts a WebSocket server on an ephemeral port. For each connection it
/// reads one message, reports it, and writes whatever `script` returns,
/// then closes. Returns the `ws://` base URL.
pub async fn serve_scripted<F>(script: F) -> (String, mpsc::UnboundedReceiver<Received>)
where
    F: Fn(&Received) -> Vec<Message> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    let script = Arc::new(script);

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let tx = tx.clone();
            let script = script.clone();
            tokio::spawn(async move {
                let mut path = String::new();
                let callback = |req: &Request,
                                resp: Response|
                 -> std::result::Result<Response, ErrorResponse> {
                    path = req.uri().path().to_string();
                    Ok(resp)
                };
                let Ok(mut ws) = accept_hdr_async(stream, callback).await else {
                    return;
                };
                let payload = match ws.next().await {
                    Some(Ok(Message::Text(text))) => {
                        serde_json::from_str(text.as_str()).unwrap_or(serde_json::Value::Null)
                    }
                    _ => return,
                };
                let received = Received { path, payload };
                let frames = script(&received);
                let _ = tx.send(received);
                for frame in frames {
                    if ws.send(frame).await.is_err() {
                        return;
                    }
                }
                let _ = ws.close(None).await;
                // Drain until the client acknowledges the close.
                while let Some(Ok(_)) = ws.next().await {}
            });
        }
    });

    (format!("ws://{addr}"), rx)
}

/// Stub gateway that serves the order-book endpoints from a shared
/// [`MatchingBook`], answering each request with `Pending` then `Finished`.
pub async fn serve_matching_book(book: Arc<Mutex<MatchingBook>>) -> String {
    let next_request = Arc::new(AtomicU64::new(1));
    let (url, _rx) = serve_scripted(move |received| {
        let request_id = next_request.fetch_add(1, Ordering::SeqCst);
        let p = &received.payload;
        let field = |name: &str| p[name].as_u64().unwrap_or(0);
        let mut book = book.lock().unwrap();
        let result = match received.path.rsplit('/').next().unwrap_or("") {
            "add_buy" => {
                let trades = book.add(Side::Buy, field("id"), field("price"), field("qty"));
                json!({ "ArrayTrade": trades })
            }
            "add_sell" => {
                let trades = book.add(Side::Sell, field("id"), field("price"), field("qty"));
                json!({ "ArrayTrade": trades })
            }
            "top_n_depth" => json!({"BookSnapshot": book.depth(field("n"))}),
            "best_bid" => json!({"OptionU64": book.best_bid()}),
            "best_ask" => json!({"OptionU64": book.best_ask()}),
            "cancel" => json!({"U64": u64::from(book.cancel(field("id")))}),
            other => return vec![Message::Text(format!("error: unknown endpoint {other}").into())],
        };
        vec![
            reply_frame(request_id, "Created", serde_json::Value::Null),
            reply_frame(request_id, "Finished", result),
        ]
    })
    .await;
    url
}

/// Monitor frames as the dispatcher consumes them.
pub type MonitorItem = std::result::Result<Message, tungstenite::Error>;

/// Sender side of an in-process monitor channel.
pub type MonitorTx = mpsc::UnboundedSender<MonitorItem>;

/// An in-process stand-in for the monitor WebSocket.
pub fn monitor_channel() -> (
    MonitorTx,
    impl Stream<Item = MonitorItem> + Unpin + Send + 'static,
) {
    let (tx, rx) = mpsc::unbounded_channel::<MonitorItem>();
    let stream = futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    });
    (tx, Box::pin(stream))
}

pub fn new_request_frame(id: u64, blueprint: &TaskBlueprint) -> MonitorItem {
    let body = json!({
        "NewRequest": {
            "id": id,
            "fiber_type": blueprint.fiber_type,
            "function_key": blueprint.function_key,
            "init_values": blueprint.init_values,
        }
    });
    Ok(Message::Text(body.to_string().into()))
}

pub fn update_frame(id: u64, status: &str, result: serde_json::Value) -> MonitorItem {
    let body = json!({
        "TxUpdate": {"meta": {"id": id, "status": {"type": status}}, "result": result}
    });
    Ok(Message::Text(body.to_string().into()))
}

/// [`Submitter`] that hands blueprints to the test instead of the network.
///
/// The first `holds` submissions never complete, as if the POST hung. The
/// next `rejections` submissions fail with status 503. When
/// `announce` is set, the matching identity assignment is written onto the
/// monitor *before* the submission returns, with ids counting up from the
/// shared counter.
#[derive(Clone)]
pub struct FakeSubmitter {
    pub submitted: mpsc::UnboundedSender<TaskBlueprint>,
    pub holds: Arc<AtomicU64>,
    pub rejections: Arc<AtomicU64>,
    pub announce: Option<(MonitorTx, Arc<AtomicU64>)>,
}

impl FakeSubmitter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TaskBlueprint>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                submitted: tx,
                holds: Arc::new(AtomicU64::new(0)),
                rejections: Arc::new(AtomicU64::new(0)),
                announce: None,
            },
            rx,
        )
    }
}

impl Submitter for FakeSubmitter {
    async fn submit(&self, blueprint: &TaskBlueprint) -> Result<()> {
        let holds = self.holds.load(Ordering::SeqCst);
        if holds > 0 {
            self.holds.store(holds - 1, Ordering::SeqCst);
            std::future::pending::<()>().await;
        }
        let remaining = self.rejections.load(Ordering::SeqCst);
        if remaining > 0 {
            self.rejections.store(remaining - 1, Ordering::SeqCst);
            return Err(SweeperError::SubmissionRejected { status: 503 });
        }
        if let Some((monitor, ids)) = &self.announce {
            let id = ids.fetch_add(1, Ordering::SeqCst);
            let _ = monitor.send(new_request_frame(id, blueprint));
            // Let the dispatcher see the announcement before we return.
            tokio::task::yield_now().await;
        }
        let _ = self.submitted.send(blueprint.clone());
        Ok(())
    }
}
