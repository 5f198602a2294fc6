//! Simulation bootstrap: one market, a population of traders, and a noisy background flow.
//!
//! ## Components
//!
//! - [`run_simulation`] spawns the market task, connects `cfg.value_traders` value traders
//!   and `cfg.market_makers` market makers, starts the background flow, and waits for
//!   `cfg.run_secs` to elapse or the cancellation token to fire (e.g. on Ctrl-C).
//! - Value traders are endowed by drawing a reference price `p ~ U(60, 140)` and starting
//!   with `2000 − 10p` cash and 10 shares. Market makers start flat.
//! - The background flow is owned by [`NOISE_TRADER`], which is never registered and so
//!   never hears about fills. On each arrival it:
//!   1. waits an `Exp(λ = cfg.flow_rate_hz)` delay,
//!   2. drifts its local mid price by `N(0, cfg.noise_sigma)`,
//!   3. draws a size `Exp1 * cfg.mean_qty` (at least 1),
//!   4. posts a limit buy at `mid − 1` or a limit sell at `mid + 1` with equal odds.
//!
//! ## Why these choices?
//! - **Exponential arrivals** model Poisson order flow.
//! - **Gaussian drift** keeps the flow wandering around the traders' fair value so that
//!   some of it is priced favorably and draws reactions.

use std::time::Duration;

use anyhow::Context;
use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Exp, Exp1, Normal};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    config::SimConfig,
    market::{MarketHandle, spawn_market},
    matching::EngineStats,
    orders::{Order, Side, TraderId},
    traders::{Holdings, MarketMaker, MarketMakerConfig, ValueTrader, spawn_trader},
};

/// Owner of the background flow.
pub const NOISE_TRADER: TraderId = TraderId(0);

const SPREAD: f64 = 1.0;
const STARTING_STOCK: i64 = 10;

/// Outcome of a finished run.
#[derive(Debug)]
pub struct SimReport {
    pub engine: EngineStats,
    pub traders: Vec<Holdings>,
    pub background_orders: u64,
}

impl SimReport {
    pub fn log_summary(&self) {
        for h in &self.traders {
            info!(
                trader = %h.trader,
                cash = h.cash,
                stock = h.stock,
                outstanding = h.outstanding,
                "final holdings"
            );
        }
        info!(
            accepted = self.engine.orders_accepted,
            rejected = self.engine.orders_rejected,
            fills = self.engine.fills,
            volume = self.engine.volume,
            background = self.background_orders,
            "--- done ---"
        );
    }
}

/// Draws a value trader's starting `(cash, stock)`.
pub fn endowment<R: Rng>(rng: &mut R) -> (f64, i64) {
    let price = rng.random_range(60.0..140.0);
    (2000.0 - price * STARTING_STOCK as f64, STARTING_STOCK)
}

fn round_to_cents(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

/// Posts background limit orders until `cancel` fires or the market closes.
///
/// Returns how many orders were submitted.
pub async fn run_background_flow(
    cfg: SimConfig,
    market: MarketHandle,
    mut rng: StdRng,
    cancel: CancellationToken,
) -> anyhow::Result<u64> {
    let arrivals = Exp::new(cfg.flow_rate_hz).context("flow_rate_hz must be > 0")?;
    let drift = Normal::new(0.0, cfg.noise_sigma).context("noise_sigma must be >= 0")?;

    let mut mid = cfg.mean;
    let mut sent = 0u64;
    loop {
        let wait = arrivals.sample(&mut rng);
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sleep(Duration::from_secs_f64(wait)) => {
                mid = (mid + drift.sample(&mut rng)).max(SPREAD);
                let raw: f64 = Exp1.sample(&mut rng);
                let quantity = ((raw * cfg.mean_qty).round() as u64).max(1);
                let (side, price) = if rng.random_bool(0.5) {
                    (Side::Buy, mid - SPREAD)
                } else {
                    (Side::Sell, mid + SPREAD)
                };
                let order = Order::new(NOISE_TRADER, side, quantity, round_to_cents(price));
                debug!("background {:?} {} @ {}", side, quantity, order.price);
                if market.submit(order).is_err() {
                    break;
                }
                sent += 1;
            }
        }
    }
    Ok(sent)
}

/// Runs a whole simulation and reports the final state of every participant.
pub async fn run_simulation(cfg: SimConfig, cancel: CancellationToken) -> anyhow::Result<SimReport> {
    let mut rng = match cfg.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let (market, market_task) = spawn_market(cancel.clone());

    let mut traders = Vec::new();
    let mut next_id = 1;
    for _ in 0..cfg.value_traders {
        let (cash, stock) = endowment(&mut rng);
        let trader = ValueTrader::new(TraderId(next_id), cfg.mean, cash, stock, market.clone());
        traders.push(spawn_trader(trader, &market, cancel.clone())?);
        next_id += 1;
    }
    let mm_config = MarketMakerConfig {
        quote_interval: cfg.quote_interval(),
        ..Default::default()
    };
    for _ in 0..cfg.market_makers {
        let maker = MarketMaker::new(TraderId(next_id), cfg.mean, market.clone(), mm_config.clone());
        traders.push(spawn_trader(maker, &market, cancel.clone())?);
        next_id += 1;
    }
    info!(
        "started {} value traders and {} market makers",
        cfg.value_traders, cfg.market_makers
    );

    let flow_rng = StdRng::seed_from_u64(rng.random());
    let flow = tokio::spawn(run_background_flow(
        cfg.clone(),
        market.clone(),
        flow_rng,
        cancel.clone(),
    ));

    match cfg.run_secs {
        Some(secs) => {
            tokio::select! {
                _ = sleep(Duration::from_secs(secs)) => cancel.cancel(),
                _ = cancel.cancelled() => {}
            }
        }
        None => cancel.cancelled().await,
    }

    let background_orders = flow.await??;
    let mut holdings = Vec::with_capacity(traders.len());
    for trader in traders {
        holdings.push(trader.await?);
    }
    drop(market);
    let engine = market_task.await?;

    Ok(SimReport {
        engine,
        traders: holdings,
        background_orders,
    })
}
