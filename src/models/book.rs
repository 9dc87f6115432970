//! Order book depth models.

use serde::{Deserialize, Serialize};

/// Aggregated resting quantity at one price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: u64,
    pub qty: u64,
}

/// Point-in-time top-of-book depth.
///
/// Bids are ordered best (highest) first, asks best (lowest) first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSnapshot {
    #[serde(default)]
    pub bids: Vec<PriceLevel>,
    #[serde(default)]
    pub asks: Vec<PriceLevel>,
}

impl BookSnapshot {
    /// Total resting quantity across all visible bid levels.
    #[must_use]
    pub fn bid_qty(&self) -> u64 {
        total_qty(&self.bids)
    }

    /// Total resting quantity across all visible ask levels.
    #[must_use]
    pub fn ask_qty(&self) -> u64 {
        total_qty(&self.asks)
    }

    /// Highest bid price, taken from the head of the bid side.
    #[must_use]
    pub fn best_bid(&self) -> Option<u64> {
        self.bids.first().map(|l| l.price)
    }

    /// Lowest ask price, taken from the head of the ask side.
    #[must_use]
    pub fn best_ask(&self) -> Option<u64> {
        self.asks.first().map(|l| l.price)
    }

    /// Highest price among the visible asks (the deepest level).
    #[must_use]
    pub fn max_ask(&self) -> Option<u64> {
        self.asks.iter().map(|l| l.price).max()
    }

    /// `true` when neither side has any level.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

/// Saturates instead of overflowing on absurd quantities.
fn total_qty(levels: &[PriceLevel]) -> u64 {
    levels.iter().map(|l| l.qty).fold(0, u64::saturating_add)
}

/// Renders levels as `price@qty, ...`, or `-` when there are none.
#[must_use]
pub fn format_levels(levels: &[PriceLevel]) -> String {
    if levels.is_empty() {
        return "-".to_string();
    }
    levels
        .iter()
        .map(|l| format!("{}@{}", l.price, l.qty))
        .collect::<Vec<_>>()
        .join(", ")
}
