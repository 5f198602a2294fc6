use std::time::Duration;

use tracing::info;

use crate::{
    market::MarketHandle,
    orders::{Order, OrderId, Side, TraderId},
    trade::Fill,
};

use super::{Account, Holdings, Trader};

const HALF_SPREAD: f64 = 20.0;
const QUOTE_SIZE: u64 = 1;

#[derive(Debug, Clone)]
pub struct MarketMakerConfig {
    /// Quote both sides after this long without any event. `None` keeps the maker purely reactive.
    pub quote_interval: Option<Duration>,
    /// Distance of each quote from `mean`.
    pub half_spread: f64,
    pub quote_size: u64,
}

impl Default for MarketMakerConfig {
    fn default() -> Self {
        Self {
            quote_interval: None,
            half_spread: HALF_SPREAD,
            quote_size: QUOTE_SIZE,
        }
    }
}

/// Takes favorably priced orders like any other trader, and provides liquidity when the
/// market goes quiet. It keeps no book view and never re-enters after a fill.
#[derive(Debug)]
pub struct MarketMaker {
    account: Account,
    config: MarketMakerConfig,
    quotes: Vec<OrderId>,
}

impl MarketMaker {
    pub fn new(id: TraderId, mean: f64, market: MarketHandle, config: MarketMakerConfig) -> Self {
        Self {
            account: Account::new(id, mean, 0.0, 0, market),
            config,
            quotes: Vec::new(),
        }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Quotes both sides around `mean`, unless an earlier quote is still resting.
    pub fn quote(&mut self) {
        if self.quotes.iter().any(|id| self.account.is_outstanding(*id)) {
            return;
        }
        let mean = self.account.mean();
        let size = self.config.quote_size;
        let ask = mean + self.config.half_spread;
        let bid = (mean - self.config.half_spread).max(0.0);
        info!("{} quoting {} @ {} / {}", self.account.id(), size, bid, ask);

        let sell = self.account.place(Side::Sell, size, ask);
        let buy = self.account.place(Side::Buy, size, bid);
        self.quotes = vec![sell.id, buy.id];
    }
}

impl Trader for MarketMaker {
    fn id(&self) -> TraderId {
        self.account.id()
    }

    fn holdings(&self) -> Holdings {
        self.account.holdings()
    }

    fn on_new_order(&mut self, order: &Order) {
        self.account.react(order);
    }

    fn on_filled_order(&mut self, fill: &Fill) {
        if self.account.settle(fill).is_some() {
            self.account.log_update();
        }
    }

    fn idle_interval(&self) -> Option<Duration> {
        self.config.quote_interval
    }

    fn on_idle(&mut self) {
        self.quote();
    }
}
