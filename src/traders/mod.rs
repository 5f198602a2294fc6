//! Trader agents.
//!
//! Every trader runs as its own task (see [`run_trader`]) and owns its private state
//! outright: cash, stock, the `Outstanding` ledger and, for strategies that keep one,
//! an [`OrderBook`](crate::orderbook::OrderBook) view. Nothing else mutates it; the only
//! way in is the event inbox and the only way out is [`MarketHandle::submit`].

use std::{collections::HashMap, time::Duration};

use serde::Serialize;
use tokio::{
    sync::mpsc::{UnboundedReceiver, unbounded_channel},
    task::JoinHandle,
    time::timeout,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    errors::MarketError,
    events::MarketEvent,
    market::MarketHandle,
    orders::{Order, OrderId, Side, TraderId},
    trade::Fill,
};

pub mod market_maker;
pub mod value_trader;

pub use market_maker::{MarketMaker, MarketMakerConfig};
pub use value_trader::ValueTrader;

/// Point-in-time snapshot of a trader's position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Holdings {
    pub trader: TraderId,
    pub cash: f64,
    pub stock: i64,
    pub mean: f64,
    pub outstanding: usize,
}

/// The side of a counter-order worth placing against `observed`, if any.
///
/// A sell priced below `mean` is worth buying; a buy priced above `mean` is worth selling into.
pub fn counter_side(mean: f64, observed: &Order) -> Option<Side> {
    let favorable = match observed.side {
        Side::Sell => observed.price < mean,
        Side::Buy => observed.price > mean,
    };
    favorable.then(|| observed.side.opposite())
}

/// Cash, stock, fair-value belief and the ledger of orders a trader has resting.
///
/// Cash and stock are debited as soon as an order is placed, to reflect the pending
/// commitment; neither is floored at zero.
#[derive(Debug)]
pub struct Account {
    id: TraderId,
    cash: f64,
    stock: i64,
    mean: f64,
    outstanding: HashMap<OrderId, Order>,
    market: MarketHandle,
}

impl Account {
    pub fn new(id: TraderId, mean: f64, cash: f64, stock: i64, market: MarketHandle) -> Self {
        Self {
            id,
            cash,
            stock,
            mean,
            outstanding: HashMap::new(),
            market,
        }
    }

    pub fn id(&self) -> TraderId {
        self.id
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn stock(&self) -> i64 {
        self.stock
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Open orders keyed by id, each carrying its unfilled quantity.
    pub fn outstanding(&self) -> &HashMap<OrderId, Order> {
        &self.outstanding
    }

    pub fn is_outstanding(&self, id: OrderId) -> bool {
        self.outstanding.contains_key(&id)
    }

    /// Builds, commits and submits a new order owned by this account.
    pub fn place(&mut self, side: Side, quantity: u64, price: f64) -> Order {
        let order = Order::new(self.id, side, quantity, price);
        match side {
            Side::Buy => self.cash -= order.notional(),
            Side::Sell => self.stock -= quantity as i64,
        }
        self.outstanding.insert(order.id, order.clone());
        if let Err(e) = self.market.submit(order.clone()) {
            warn!("{} could not submit {}: {}", self.id, order.id, e);
        }
        order
    }

    /// Places the counter-order to `observed` if it is priced favorably against `mean`.
    pub fn react(&mut self, observed: &Order) -> Option<Order> {
        let side = counter_side(self.mean, observed)?;
        debug!(
            "{} taking the other side of {} at {}",
            self.id, observed.id, observed.price
        );
        Some(self.place(side, observed.quantity, observed.price))
    }

    /// Settles the leg of `fill` this account owns, checking the sell leg first.
    ///
    /// Sell leg: cash is credited with the fill value. Buy leg: stock is credited with the
    /// fill quantity. The order's remaining quantity shrinks by the fill and it leaves
    /// `Outstanding` once nothing is left. Returns the side settled.
    pub fn settle(&mut self, fill: &Fill) -> Option<Side> {
        let side = if self.outstanding.contains_key(&fill.sell.id) {
            self.cash += fill.value();
            Side::Sell
        } else if self.outstanding.contains_key(&fill.buy.id) {
            self.stock += fill.quantity as i64;
            Side::Buy
        } else {
            return None;
        };
        let id = match side {
            Side::Sell => fill.sell.id,
            Side::Buy => fill.buy.id,
        };
        if let Some(open) = self.outstanding.get_mut(&id) {
            open.quantity = open.quantity.saturating_sub(fill.quantity);
            if open.quantity == 0 {
                self.outstanding.remove(&id);
            }
        }
        Some(side)
    }

    pub fn holdings(&self) -> Holdings {
        Holdings {
            trader: self.id,
            cash: self.cash,
            stock: self.stock,
            mean: self.mean,
            outstanding: self.outstanding.len(),
        }
    }

    fn log_update(&self) {
        info!(
            trader = %self.id,
            cash = self.cash,
            stock = self.stock,
            "trader update"
        );
    }
}

/// The contract every trading strategy implements: receive events, emit orders.
pub trait Trader: Send {
    fn id(&self) -> TraderId;

    fn holdings(&self) -> Holdings;

    fn on_new_order(&mut self, order: &Order);

    fn on_filled_order(&mut self, fill: &Fill);

    /// Cancellations are accepted and discarded.
    fn on_cancelled_order(&mut self, _order: &Order) {}

    /// How long to wait for an event before [`Trader::on_idle`] runs. `None` waits forever.
    fn idle_interval(&self) -> Option<Duration> {
        None
    }

    fn on_idle(&mut self) {}

    fn handle_event(&mut self, event: &MarketEvent) {
        match event {
            MarketEvent::NewOrder(order) => self.on_new_order(order),
            MarketEvent::CancelledOrder(order) => self.on_cancelled_order(order),
            MarketEvent::FilledOrder(fill) => self.on_filled_order(fill),
        }
    }
}

enum Next {
    Event(MarketEvent),
    Idle,
    Closed,
}

async fn next_event(inbox: &mut UnboundedReceiver<MarketEvent>, idle: Option<Duration>) -> Next {
    let event = match idle {
        Some(wait) => match timeout(wait, inbox.recv()).await {
            Ok(event) => event,
            Err(_) => return Next::Idle,
        },
        None => inbox.recv().await,
    };
    event.map_or(Next::Closed, Next::Event)
}

/// Runs `trader` until `cancel` fires or its inbox closes, handling one event at a time.
///
/// Returns the trader's final holdings.
pub async fn run_trader<T: Trader>(
    mut trader: T,
    mut inbox: UnboundedReceiver<MarketEvent>,
    cancel: CancellationToken,
) -> Holdings {
    loop {
        let idle = trader.idle_interval();
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            next = next_event(&mut inbox, idle) => next,
        };
        match next {
            Next::Event(event) => trader.handle_event(&event),
            Next::Idle => trader.on_idle(),
            Next::Closed => {
                debug!("{} inbox closed", trader.id());
                break;
            }
        }
    }
    trader.holdings()
}

/// Connects `trader` to the market and spawns its task.
pub fn spawn_trader<T: Trader + 'static>(
    trader: T,
    market: &MarketHandle,
    cancel: CancellationToken,
) -> Result<JoinHandle<Holdings>, MarketError> {
    let (tx, rx) = unbounded_channel();
    market.connect(trader.id(), tx)?;
    Ok(tokio::spawn(run_trader(trader, rx, cancel)))
}
