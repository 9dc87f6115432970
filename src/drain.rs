//! Book draining loop.
//!
//! Each cycle sweeps every visible ask with one aggressive buy, re-reads
//! the book, then sweeps every visible bid with one aggressive sell. Once
//! a cycle ends with an empty book the loop backs off for a random while
//! before looking again.
//!
//! Cycles are self-contained: nothing but the order-id counter (inside the
//! [`OrderBookApi`] implementation) survives from one cycle to the next,
//! so a failed cycle is simply logged and the next one starts fresh.

use std::time::Duration;

use rand::Rng;
use tracing::{error, info};

use crate::Result;
use crate::config::DrainConfig;
use crate::models::book::format_levels;
use crate::models::{BookSnapshot, OrderOutcome, Side};
use crate::websocket::OrderBookApi;

/// How a cycle left the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The closing snapshot had no levels on either side.
    Drained,
    /// Liquidity was still visible at the end of the cycle.
    Remaining,
}

/// What one cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub buy: Option<OrderOutcome>,
    pub sell: Option<OrderOutcome>,
    pub outcome: CycleOutcome,
}

/// Price and size of the buy that sweeps every ask in `snapshot`.
///
/// Priced at the deepest visible ask so it crosses every level that may
/// still exist when the engine processes it.
#[must_use]
pub fn sweep_asks(snapshot: &BookSnapshot) -> Option<(u64, u64)> {
    let qty = snapshot.ask_qty();
    if qty == 0 {
        return None;
    }
    snapshot.max_ask().map(|price| (price, qty))
}

/// Price and size of the sell that sweeps every bid in `snapshot`.
///
/// Priced at the best bid: a sell at or below it matches every bid level
/// at or above that price.
#[must_use]
pub fn sweep_bids(snapshot: &BookSnapshot) -> Option<(u64, u64)> {
    let qty = snapshot.bid_qty();
    if qty == 0 {
        return None;
    }
    snapshot.best_bid().map(|price| (price, qty))
}

/// Uniform random duration in `[min, max]` at millisecond resolution.
#[must_use]
pub fn random_backoff(min: Duration, max: Duration) -> Duration {
    let lo = min.as_millis() as u64;
    let hi = (max.as_millis() as u64).max(lo);
    Duration::from_millis(rand::thread_rng().gen_range(lo..=hi))
}

/// How long to wait before the next cycle: a random backoff once the book
/// is drained, the fixed period otherwise (including after a failure).
#[must_use]
pub fn pause_after(config: &DrainConfig, cycle: &Result<CycleReport>) -> Duration {
    match cycle {
        Ok(report) if report.outcome == CycleOutcome::Drained => {
            random_backoff(config.empty_wait_min, config.empty_wait_max)
        }
        _ => config.period,
    }
}

/// Drives an [`OrderBookApi`] until its book is empty, forever.
pub struct Drainer<B> {
    book: B,
    config: DrainConfig,
    tick: u64,
}

impl<B: OrderBookApi> Drainer<B> {
    #[must_use]
    pub fn new(book: B, config: DrainConfig) -> Self {
        Self {
            book,
            config,
            tick: 0,
        }
    }

    /// Runs one sweep: snapshot, buy, fresh snapshot, sell, closing
    /// snapshot.
    ///
    /// # Errors
    ///
    /// Returns the first error from the underlying book operations. The
    /// cycle stops at that point; nothing needs undoing.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        self.tick += 1;
        let levels = self.config.levels;

        let snapshot = self.book.top_n_depth(levels).await?;
        info!(
            tick = self.tick,
            asks = %format_levels(&snapshot.asks),
            bids = %format_levels(&snapshot.bids),
            "Book snapshot"
        );

        let mut buy = None;
        if let Some((price, qty)) = sweep_asks(&snapshot) {
            let outcome = self.book.place(Side::Buy, price, qty).await?;
            info!(
                qty,
                price,
                trades = outcome.trades.len(),
                filled = outcome.filled_qty(),
                "Swept asks"
            );
            buy = Some(outcome);
        }

        // The pre-buy snapshot is stale now; pricing a sell from it could
        // cross our own buy.
        let snapshot = self.book.top_n_depth(levels).await?;
        let mut sell = None;
        if let Some((price, qty)) = sweep_bids(&snapshot) {
            let outcome = self.book.place(Side::Sell, price, qty).await?;
            info!(
                qty,
                price,
                trades = outcome.trades.len(),
                filled = outcome.filled_qty(),
                "Swept bids"
            );
            sell = Some(outcome);
        }

        let closing = self.book.top_n_depth(levels).await?;
        let outcome = if closing.is_empty() {
            CycleOutcome::Drained
        } else {
            CycleOutcome::Remaining
        };

        Ok(CycleReport { buy, sell, outcome })
    }

    /// Runs cycles forever. Errors are logged and never end the loop.
    pub async fn run(mut self) {
        loop {
            let cycle = self.run_cycle().await;
            let pause = pause_after(&self.config, &cycle);
            match cycle {
                Ok(report) if report.outcome == CycleOutcome::Drained => {
                    info!(wait_ms = pause.as_millis() as u64, "Book is empty, backing off");
                }
                Ok(_) => {}
                Err(e) => error!(tick = self.tick, "Drain cycle failed: {e}"),
            }
            tokio::time::sleep(pause).await;
        }
    }

    /// Number of cycles started so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.tick
    }

    /// The book this drainer works against.
    #[must_use]
    pub fn book(&self) -> &B {
        &self.book
    }
}
