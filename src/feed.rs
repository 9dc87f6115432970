//! Random liquidity feeder.
//!
//! Places a batch of buys just under and a batch of sells just over a base
//! price every period, so there is always something in the book for the
//! drain and poll loops to look at.

use futures_util::future::try_join_all;
use rand::Rng;
use tracing::{error, info};

use crate::Result;
use crate::config::FeedConfig;
use crate::models::trade::format_trades;
use crate::models::{OrderOutcome, Side};
use crate::websocket::OrderBookApi;

/// An order the feeder intends to place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedOrder {
    pub side: Side,
    pub price: u64,
    pub qty: u64,
}

/// Draws one tick's worth of orders: `batch` buys priced in
/// `[base - spread, base]` followed by `batch` sells in `[base, base + spread]`.
pub fn plan_orders<R: Rng>(config: &FeedConfig, rng: &mut R) -> Vec<PlannedOrder> {
    let mut draw = |side: Side| {
        let offset = rng.gen_range(0..=config.price_spread);
        let price = match side {
            Side::Buy => config.base_price.saturating_sub(offset),
            Side::Sell => config.base_price.saturating_add(offset),
        };
        PlannedOrder {
            side,
            price,
            qty: rng.gen_range(config.qty_min..=config.qty_max),
        }
    };

    let mut orders = Vec::with_capacity(config.batch * 2);
    for _ in 0..config.batch {
        orders.push(draw(Side::Buy));
    }
    for _ in 0..config.batch {
        orders.push(draw(Side::Sell));
    }
    orders
}

/// Keeps adding random resting orders to the book.
pub struct Feeder<B> {
    book: B,
    config: FeedConfig,
    tick: u64,
}

impl<B: OrderBookApi> Feeder<B> {
    #[must_use]
    pub fn new(book: B, config: FeedConfig) -> Self {
        Self {
            book,
            config,
            tick: 0,
        }
    }

    /// Places one tick's orders concurrently.
    ///
    /// # Errors
    ///
    /// Returns the first placement failure; other placements of the same
    /// tick may still have reached the engine.
    pub async fn feed_once(&mut self) -> Result<Vec<OrderOutcome>> {
        self.tick += 1;
        let planned = plan_orders(&self.config, &mut rand::thread_rng());

        let outcomes =
            try_join_all(planned.iter().map(|o| self.book.place(o.side, o.price, o.qty))).await?;

        let trades: usize = outcomes.iter().map(|o| o.trades.len()).sum();
        info!(tick = self.tick, orders = outcomes.len(), trades, "Placed orders");
        for outcome in &outcomes {
            info!(
                id = outcome.order.id,
                side = ?outcome.order.side,
                price = outcome.order.price,
                qty = outcome.order.qty,
                trades = %format_trades(&outcome.trades),
                "Order result"
            );
        }
        Ok(outcomes)
    }

    /// Feeds forever at the configured period. Failures are logged.
    pub async fn run(mut self) {
        loop {
            if let Err(e) = self.feed_once().await {
                error!(tick = self.tick, "Feed tick failed: {e}");
            }
            tokio::time::sleep(self.config.period).await;
        }
    }
}
