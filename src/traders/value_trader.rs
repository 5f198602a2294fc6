//! A trader driven by a fixed belief about the stock's fair value.
//!
//! It takes any order priced favorably against its `mean`, and after each of its own
//! fills it tries to re-enter the position near the top of its book.

use tracing::info;

use crate::{
    market::MarketHandle,
    orderbook::{NO_QUOTE, OrderBook},
    orders::{Order, Side, TraderId},
    trade::Fill,
};

use super::{Account, Holdings, Trader};

/// Rebuy price used when the book shows no bid.
pub const DEFAULT_REBUY_PRICE: f64 = 99.99;
/// Resell price used when the book shows no ask.
pub const DEFAULT_RESELL_PRICE: f64 = 100.01;
/// How far inside the best quote a re-entry order is priced.
pub const PRICE_STEP: f64 = 1.0;

#[derive(Debug)]
pub struct ValueTrader {
    account: Account,
    book: OrderBook,
}

impl ValueTrader {
    pub fn new(id: TraderId, mean: f64, cash: f64, stock: i64, market: MarketHandle) -> Self {
        Self {
            account: Account::new(id, mean, cash, stock, market),
            book: OrderBook::new(),
        }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    /// Places an order on this trader's own initiative.
    pub fn place_order(&mut self, side: Side, quantity: u64, price: f64) -> Order {
        self.account.place(side, quantity, price)
    }

    /// One step above the best bid, or [`DEFAULT_REBUY_PRICE`] with no bid in the book.
    pub fn rebuy_price(&self) -> f64 {
        let bid = self.book.best_bid();
        if bid == NO_QUOTE {
            DEFAULT_REBUY_PRICE
        } else {
            bid + PRICE_STEP
        }
    }

    /// One step below the best ask, or [`DEFAULT_RESELL_PRICE`] with no ask in the book.
    pub fn resell_price(&self) -> f64 {
        let ask = self.book.best_ask();
        if ask == NO_QUOTE {
            DEFAULT_RESELL_PRICE
        } else {
            ask - PRICE_STEP
        }
    }

    fn rebuy(&mut self, quantity: u64) {
        let price = self.rebuy_price();
        if price < self.account.mean() {
            info!("{} rebuying stock at {}", self.account.id(), price);
            self.account.place(Side::Buy, quantity, price);
        } else {
            info!("{} won't rebuy stock at {}", self.account.id(), price);
        }
    }

    fn resell(&mut self, quantity: u64) {
        let price = self.resell_price();
        if price > self.account.mean() {
            info!("{} reselling stock at {}", self.account.id(), price);
            self.account.place(Side::Sell, quantity, price);
        } else {
            info!("{} won't resell stock at {}", self.account.id(), price);
        }
    }
}

impl Trader for ValueTrader {
    fn id(&self) -> TraderId {
        self.account.id()
    }

    fn holdings(&self) -> Holdings {
        self.account.holdings()
    }

    fn on_new_order(&mut self, order: &Order) {
        self.book.insert(order);
        self.account.react(order);
    }

    fn on_filled_order(&mut self, fill: &Fill) {
        self.book.apply_fill(&fill.sell, fill.quantity);
        self.book.apply_fill(&fill.buy, fill.quantity);

        match self.account.settle(fill) {
            Some(Side::Sell) => self.rebuy(fill.quantity),
            Some(Side::Buy) => self.resell(fill.quantity),
            None => return,
        }
        self.account.log_update();
    }
}
