//! Wire models for the order-book gateway.
//!
//! Contains the order request payloads sent over direct channels, the task
//! blueprint posted to the submission endpoint, and the shared reply
//! envelope (`meta` + `result`) used by both direct channels and the
//! monitor.

pub mod book;
pub mod monitor;
pub mod trade;
pub mod value;

use serde::{Deserialize, Serialize};

pub use book::{BookSnapshot, PriceLevel};
pub use monitor::{Meta, MonitorEvent, TxStatus};
pub use trade::Trade;
pub use value::Value;

/// Fiber type that owns every order-book function on the engine.
pub const ORDER_BOOK_FIBER: &str = "order_book";

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Name of the engine function that places an order on this side.
    #[must_use]
    pub fn function_key(&self) -> &'static str {
        match self {
            Side::Buy => "add_buy",
            Side::Sell => "add_sell",
        }
    }
}

/// A limit order created by this client. Never mutated after submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    pub id: u64,
    pub side: Side,
    pub price: u64,
    pub qty: u64,
}

impl Order {
    /// Payload sent on the `add_buy` / `add_sell` direct channel.
    #[must_use]
    pub fn request(&self) -> AddOrderRequest {
        AddOrderRequest {
            id: self.id,
            price: self.price,
            qty: self.qty,
        }
    }
}

/// An order together with the trades its submission produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderOutcome {
    pub order: Order,
    pub trades: Vec<Trade>,
}

impl OrderOutcome {
    /// Total quantity filled across all trades.
    #[must_use]
    pub fn filled_qty(&self) -> u64 {
        self.trades.iter().map(|t| t.qty).fold(0, u64::saturating_add)
    }
}

/// Payload for `add_buy` / `add_sell`.
#[derive(Debug, Clone, Serialize)]
pub struct AddOrderRequest {
    pub id: u64,
    pub price: u64,
    pub qty: u64,
}

/// Payload for `top_n_depth`.
#[derive(Debug, Clone, Serialize)]
pub struct DepthRequest {
    pub n: u64,
}

/// Payload for `cancel`.
#[derive(Debug, Clone, Serialize)]
pub struct CancelRequest {
    pub id: u64,
}

/// Payload for endpoints that take no arguments (`best_bid`, `best_ask`).
#[derive(Debug, Clone, Default, Serialize)]
pub struct EmptyRequest {}

/// Body of `POST /new_request`: which fiber function to run, with which
/// arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskBlueprint {
    pub fiber_type: String,
    pub function_key: String,
    pub init_values: Vec<Value>,
}

impl TaskBlueprint {
    /// Builds a blueprint for a function on the order-book fiber.
    #[must_use]
    pub fn order_book(function_key: &str, init_values: Vec<Value>) -> Self {
        Self {
            fiber_type: ORDER_BOOK_FIBER.to_string(),
            function_key: function_key.to_string(),
            init_values,
        }
    }
}

/// Reply frame written on a direct channel, and the body of a monitor
/// `TxUpdate` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxReply {
    pub meta: Meta,
    #[serde(default)]
    pub result: serde_json::Value,
}
