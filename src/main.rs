use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use sweeper::SweeperError;
use sweeper::config::fetch_config;
use sweeper::drain::Drainer;
use sweeper::feed::Feeder;
use sweeper::ids::OrderIdAllocator;
use sweeper::poll::Poller;
use sweeper::submit::HttpSubmitter;
use sweeper::websocket::{DirectClient, Dispatcher, connect_monitor};

/// Exercises an order-book gateway. Settings come from the environment.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Sweep the book with aggressive orders until it is empty.
    Drain,
    /// Query best bid/ask and depth over the shared monitor channel.
    Poll,
    /// Keep placing random orders around a base price.
    Feed,
}

#[tokio::main]
async fn main() -> Result<(), SweeperError> {
    // Initialize tracing subscriber for logging output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let app_config = fetch_config()?;
    let ws_base = app_config.gateway.ws_url();
    info!(gateway = %app_config.gateway.http_url, ws = %ws_base, "Starting");

    match cli.mode {
        Mode::Drain => {
            let config = app_config.drain;
            info!(
                levels = config.levels,
                period_ms = config.period.as_millis() as u64,
                empty_wait_min_ms = config.empty_wait_min.as_millis() as u64,
                empty_wait_max_ms = config.empty_wait_max.as_millis() as u64,
                "Draining book"
            );
            let ids = Arc::new(OrderIdAllocator::new(config.start_order_id));
            Drainer::new(DirectClient::new(ws_base, ids), config).run().await;
        }
        Mode::Poll => {
            let config = app_config.poll;
            let monitor = connect_monitor(&ws_base).await?;
            let submitter = HttpSubmitter::new(&app_config.gateway.http_url);
            let (dispatcher, _task) = Dispatcher::spawn(monitor, submitter);
            info!(
                depth = config.depth_levels,
                period_ms = config.period.as_millis() as u64,
                "Polling over monitor"
            );
            Poller::new(dispatcher, config).run().await;
        }
        Mode::Feed => {
            let config = app_config.feed;
            info!(
                batch = config.batch,
                base_price = config.base_price,
                spread = config.price_spread,
                qty_min = config.qty_min,
                qty_max = config.qty_max,
                "Feeding book"
            );
            let ids = Arc::new(OrderIdAllocator::new(config.start_order_id));
            Feeder::new(DirectClient::new(ws_base, ids), config).run().await;
        }
    }

    Ok(())
}
