//! # Market Sim
//!
//! A single-process simulated stock market. Autonomous traders submit limit orders to a
//! shared market task, which broadcasts every accepted order to all connected traders,
//! matches it with price-time priority, and broadcasts the resulting fills. Each trader
//! keeps its own view of the book and reacts to what it sees with new orders.
//!
//! ## Entry points
//!
//! - [`market::spawn_market`] starts the market and returns a [`market::MarketHandle`].
//! - [`traders::spawn_trader`] connects a [`traders::Trader`] and runs it on its own task.
//! - [`simulate::run_simulation`] wires a whole population together.

pub mod config;
pub mod errors;
pub mod events;
pub mod market;
pub mod matching;
pub mod orderbook;
pub mod orders;
pub mod registry;
pub mod simulate;
pub mod trade;
pub mod traders;
pub mod utils;

pub use errors::{EventError, MarketError};
pub use events::MarketEvent;
pub use market::{MarketHandle, spawn_market};
pub use matching::{EngineStats, MatchingEngine};
pub use orderbook::{NO_QUOTE, OrderBook};
pub use orders::{Order, OrderId, Side, TraderId};
pub use registry::{ConnectionInfo, TraderRegistry};
pub use trade::Fill;
pub use traders::{Holdings, MarketMaker, MarketMakerConfig, Trader, ValueTrader, spawn_trader};
