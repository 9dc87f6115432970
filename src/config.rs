//! Application configuration loaded from environment variables.
//!
//! Every value has a default, so an empty environment yields a working
//! configuration pointed at `http://localhost:5000`:
//!
//! - `GATEWAY_URL` - HTTP base of the gateway; WebSocket URLs are derived
//!   from it
//! - `PERIOD_MS`, `N_LEVELS`, `EMPTY_WAIT_MIN_MS`, `EMPTY_WAIT_MAX_MS`,
//!   `START_ORDER_ID` - drain loop
//! - `DEPTH_LEVELS` - poll loop
//! - `BATCH`, `BASE_PRICE`, `PRICE_SPREAD`, `QTY_MIN`, `QTY_MAX` - feed loop

use std::str::FromStr;
use std::time::Duration;

use crate::SweeperError;

/// Default gateway HTTP endpoint.
const DEFAULT_GATEWAY_URL: &str = "http://localhost:5000";

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    pub drain: DrainConfig,
    pub poll: PollConfig,
    pub feed: FeedConfig,
}

/// Where the gateway lives.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub http_url: String,
}

impl GatewayConfig {
    /// Base URL for WebSocket endpoints (`http` → `ws`, `https` → `wss`).
    #[must_use]
    pub fn ws_url(&self) -> String {
        ws_base(&self.http_url)
    }
}

/// Settings for the book-draining loop.
#[derive(Debug, Clone)]
pub struct DrainConfig {
    pub period: Duration,
    pub levels: u64,
    pub empty_wait_min: Duration,
    pub empty_wait_max: Duration,
    pub start_order_id: u64,
}

/// Settings for the monitor polling loop.
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub period: Duration,
    pub depth_levels: u64,
}

/// Settings for the random liquidity feeder.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub period: Duration,
    pub batch: usize,
    pub base_price: u64,
    pub price_spread: u64,
    pub qty_min: u64,
    pub qty_max: u64,
    pub start_order_id: u64,
}

/// Loads the application configuration from environment variables.
///
/// # Errors
///
/// Returns [`SweeperError::Config`] if a variable is not a valid number,
/// if a `[min, max]` pair is inverted, or if the feeder's spread would
/// push buy prices below zero.
pub fn fetch_config() -> crate::Result<AppConfig> {
    let http_url =
        non_empty_var("GATEWAY_URL").unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string());

    let empty_wait_min = millis_var("EMPTY_WAIT_MIN_MS", 5000)?;
    let empty_wait_max = millis_var("EMPTY_WAIT_MAX_MS", 7000)?;
    if empty_wait_min > empty_wait_max {
        return Err(SweeperError::Config(
            "EMPTY_WAIT_MIN_MS must not exceed EMPTY_WAIT_MAX_MS".to_string(),
        ));
    }

    let drain = DrainConfig {
        period: millis_var("PERIOD_MS", 500)?,
        levels: parsed_var("N_LEVELS", 100)?,
        empty_wait_min,
        empty_wait_max,
        start_order_id: parsed_var("START_ORDER_ID", 1_000_000)?,
    };

    let poll = PollConfig {
        period: millis_var("PERIOD_MS", 1000)?,
        depth_levels: parsed_var("DEPTH_LEVELS", 5)?,
    };

    let qty_min = parsed_var("QTY_MIN", 1)?;
    let qty_max = parsed_var("QTY_MAX", 5)?;
    if qty_min > qty_max {
        return Err(SweeperError::Config(
            "QTY_MIN must not exceed QTY_MAX".to_string(),
        ));
    }
    let base_price = parsed_var("BASE_PRICE", 1000)?;
    let price_spread = parsed_var("PRICE_SPREAD", 20)?;
    if price_spread > base_price {
        return Err(SweeperError::Config(
            "PRICE_SPREAD must not exceed BASE_PRICE".to_string(),
        ));
    }

    let feed = FeedConfig {
        period: millis_var("PERIOD_MS", 1000)?,
        batch: parsed_var("BATCH", 1)?,
        base_price,
        price_spread,
        qty_min,
        qty_max,
        start_order_id: parsed_var("START_ORDER_ID", 1)?,
    };

    Ok(AppConfig {
        gateway: GatewayConfig { http_url },
        drain,
        poll,
        feed,
    })
}

/// Rewrites an HTTP(S) base URL into its WebSocket counterpart.
#[must_use]
pub fn ws_base(http_url: &str) -> String {
    if let Some(rest) = http_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = http_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        http_url.to_string()
    }
}

/// Returns the value of an environment variable if it exists and is non-empty.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

/// Parses an environment variable, falling back to `default` when unset.
fn parsed_var<T: FromStr>(name: &str, default: T) -> crate::Result<T> {
    match non_empty_var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| SweeperError::Config(format!("{name} is not a valid number: {raw}"))),
        None => Ok(default),
    }
}

fn millis_var(name: &str, default_ms: u64) -> crate::Result<Duration> {
    parsed_var(name, default_ms).map(Duration::from_millis)
}
