//! Client orchestration for a remote order-matching gateway.
//!
//! Provides typed wire models, one-shot direct-channel calls, a dispatcher
//! that multiplexes many requests over the shared monitor channel, and the
//! long-running loops built on top of them (book draining, polling, and
//! random liquidity feeding).

pub mod config;
pub mod drain;
pub mod error;
pub mod feed;
pub mod ids;
pub mod models;
pub mod poll;
pub mod submit;
pub mod websocket;

pub use error::{Result, SweeperError};
