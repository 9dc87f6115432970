//! Trade models.

use serde::{Deserialize, Serialize};

/// A single fill produced by the engine when an order matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub price: u64,
    pub qty: u64,
    /// Id of the incoming order that crossed the book.
    #[serde(alias = "taker_id")]
    pub taker_id: u64,
    /// Id of the resting order it matched against.
    #[serde(alias = "maker_id")]
    pub maker_id: u64,
}

/// Renders trades as `qty@price(taker:_,maker:_), ...`, or `-` when empty.
#[must_use]
pub fn format_trades(trades: &[Trade]) -> String {
    if trades.is_empty() {
        return "-".to_string();
    }
    trades
        .iter()
        .map(|t| {
            format!(
                "{}@{}(taker:{},maker:{})",
                t.qty, t.price, t.taker_id, t.maker_id
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}
