//! Monitor polling loop.
//!
//! Every period issues `best_bid`, `best_ask` and `top_n_depth` together
//! through one [`Dispatcher`] and logs the joined view. The three replies
//! complete in any order; the view is only reported once all are in.

use tracing::{error, info};

use crate::Result;
use crate::config::PollConfig;
use crate::models::BookSnapshot;
use crate::models::book::format_levels;
use crate::submit::Submitter;
use crate::websocket::Dispatcher;

/// Top of book as seen by one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookView {
    pub best_bid: Option<u64>,
    pub best_ask: Option<u64>,
    pub depth: BookSnapshot,
}

/// Periodically queries the book through the shared monitor channel.
pub struct Poller<S> {
    dispatcher: Dispatcher<S>,
    config: PollConfig,
    tick: u64,
}

impl<S: Submitter> Poller<S> {
    #[must_use]
    pub fn new(dispatcher: Dispatcher<S>, config: PollConfig) -> Self {
        Self {
            dispatcher,
            config,
            tick: 0,
        }
    }

    /// Issues the three queries concurrently and waits for all of them.
    ///
    /// # Errors
    ///
    /// Returns the first failure among the three requests.
    pub async fn poll_once(&mut self) -> Result<BookView> {
        self.tick += 1;
        let (best_bid, best_ask, depth) = tokio::try_join!(
            self.dispatcher.best_bid(),
            self.dispatcher.best_ask(),
            self.dispatcher.top_n_depth(self.config.depth_levels),
        )?;

        let view = BookView {
            best_bid,
            best_ask,
            depth,
        };
        info!(
            tick = self.tick,
            best_bid = ?view.best_bid,
            best_ask = ?view.best_ask,
            bids = %format_levels(&view.depth.bids),
            asks = %format_levels(&view.depth.asks),
            "Polled book"
        );
        Ok(view)
    }

    /// Polls forever at the configured period. Failures are logged.
    pub async fn run(mut self) {
        loop {
            if let Err(e) = self.poll_once().await {
                error!(tick = self.tick, "Poll cycle failed: {e}");
            }
            tokio::time::sleep(self.config.period).await;
        }
    }
}
