use crate::{
    errors::MarketError,
    orders::{Order, OrderId, Side},
    trade::Fill,
};
use std::{
    cmp::Ordering,
    collections::{BTreeMap, VecDeque},
};
use tracing::{debug, info};

/// Exact price used as a level key. Ordered with [`f64::total_cmp`], so two prices share a
/// level only when they are the same number.
#[derive(Debug, Clone, Copy)]
struct Level(f64);

impl PartialEq for Level {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Level {}

impl PartialOrd for Level {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Level {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Running totals kept by the engine.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct EngineStats {
    pub orders_accepted: u64,
    pub orders_rejected: u64,
    pub orders_cancelled: u64,
    pub fills: u64,
    pub volume: u64,
}

/// The authoritative market.
///
/// Resting orders live in two [`BTreeMap`]s keyed by exact price:
/// - `bids` (buy orders), walked **in reverse** so the highest bid matches first
/// - `asks` (sell orders), walked **forwards** so the lowest ask matches first
///
/// Each level holds a FIFO [`VecDeque`], which gives price-time priority.
#[derive(Debug, Default)]
pub struct MatchingEngine {
    bids: BTreeMap<Level, VecDeque<Order>>,
    asks: BTreeMap<Level, VecDeque<Order>>,
    stats: EngineStats,
}

/// Matches an **incoming limit order** against the opposite side of the book,
/// producing one [`Fill`] per resting order it trades with.
///
/// # Parameters
/// - `incoming`: the taker; its quantity is decremented in place.
/// - `book_side`: `asks` for an incoming buy, `bids` for an incoming sell.
///
/// # Notes
/// - The best level is taken from the front (asks) or the back (bids) of the map, and
///   matching stops once its price no longer crosses the taker's limit.
/// - The fill quantity is `min(incoming.quantity, resting.quantity)` and is removed from
///   both orders, so every fill conserves quantity on both legs.
/// - Fills execute at the resting order's price.
fn match_incoming_side(
    incoming: &mut Order,
    book_side: &mut BTreeMap<Level, VecDeque<Order>>,
) -> Vec<Fill> {
    let mut fills = Vec::new();

    while incoming.quantity > 0 {
        let best = match incoming.side {
            Side::Buy => book_side.first_entry(),
            Side::Sell => book_side.last_entry(),
        };
        let Some(mut level) = best else { break };
        let level_price = level.key().0;
        let crosses = match incoming.side {
            Side::Buy => level_price <= incoming.price,
            Side::Sell => level_price >= incoming.price,
        };
        if !crosses {
            break;
        }

        let orders_at_level = level.get_mut();
        while let Some(resting) = orders_at_level.front_mut() {
            let fill_qty = incoming.quantity.min(resting.quantity);

            let (sell, buy) = match incoming.side {
                Side::Buy => (resting.clone(), incoming.clone()),
                Side::Sell => (incoming.clone(), resting.clone()),
            };
            fills.push(Fill {
                sell,
                buy,
                quantity: fill_qty,
                price: resting.price,
            });

            incoming.quantity -= fill_qty;
            resting.quantity -= fill_qty;

            if resting.quantity == 0 {
                orders_at_level.pop_front();
            }
            if incoming.quantity == 0 {
                break;
            }
        }
        if orders_at_level.is_empty() {
            level.remove();
        }
    }
    fills
}

impl MatchingEngine {
    /// Creates an engine with no resting orders.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects orders that may never rest: zero quantity, or a negative / non-finite price.
    /// Rejections are counted in [`EngineStats::orders_rejected`].
    pub fn check(&mut self, order: &Order) -> Result<(), MarketError> {
        let reason = if order.quantity == 0 {
            "quantity must be positive"
        } else if !order.price.is_finite() || order.price < 0.0 {
            "price must be a non-negative number"
        } else {
            return Ok(());
        };
        self.stats.orders_rejected += 1;
        Err(MarketError::Rejected {
            id: order.id,
            reason,
        })
    }

    /// Runs an incoming limit order against the book and rests any remainder.
    ///
    /// Returns the fills in execution order (best price first, then time priority).
    pub fn match_order(&mut self, mut incoming: Order) -> Result<Vec<Fill>, MarketError> {
        self.check(&incoming)?;
        self.stats.orders_accepted += 1;
        debug!("matching incoming order: {:?}", incoming);

        let fills = match incoming.side {
            Side::Buy => match_incoming_side(&mut incoming, &mut self.asks),
            Side::Sell => match_incoming_side(&mut incoming, &mut self.bids),
        };

        for fill in &fills {
            self.stats.fills += 1;
            self.stats.volume += fill.quantity;
            info!(
                sell = %fill.sell.id,
                buy = %fill.buy.id,
                quantity = fill.quantity,
                price = fill.price,
                "fill"
            );
        }

        if incoming.quantity > 0 {
            self.rest(incoming);
        }
        Ok(fills)
    }

    fn rest(&mut self, order: Order) {
        let book_side = match order.side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        book_side
            .entry(Level(order.price + 0.0)) // folds -0.0 into 0.0
            .or_default()
            .push_back(order);
    }

    /// Removes a resting order, returning it if it was found.
    pub fn cancel_order(&mut self, order_id: OrderId) -> Option<Order> {
        for book_side in [&mut self.bids, &mut self.asks] {
            let mut found = None;
            for (&level, queue) in book_side.iter_mut() {
                if let Some(pos) = queue.iter().position(|o| o.id == order_id) {
                    found = queue.remove(pos).map(|o| (level, o));
                    break;
                }
            }
            if let Some((level, order)) = found {
                if book_side.get(&level).is_some_and(VecDeque::is_empty) {
                    book_side.remove(&level);
                }
                self.stats.orders_cancelled += 1;
                return Some(order);
            }
        }
        None
    }

    /// Highest resting buy price, if any.
    pub fn best_bid(&self) -> Option<f64> {
        self.bids
            .values()
            .next_back()
            .and_then(|q| q.front())
            .map(|o| o.price)
    }

    /// Lowest resting sell price, if any.
    pub fn best_ask(&self) -> Option<f64> {
        self.asks.values().next().and_then(|q| q.front()).map(|o| o.price)
    }

    /// Total resting quantity on one side.
    pub fn depth(&self, side: Side) -> u64 {
        let book_side = match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        book_side.values().flatten().map(|o| o.quantity).sum()
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::TraderId;

    fn limit(id: u32, side: Side, price: f64, quantity: u64) -> Order {
        Order::new(TraderId(id), side, quantity, price)
    }

    /// A buy that sweeps two ask levels partially fills the second.
    #[test]
    fn test_partial_fill_across_levels() {
        let mut engine = MatchingEngine::new();
        let first = limit(1, Side::Sell, 101.0, 5);
        let second = limit(2, Side::Sell, 102.0, 3);
        engine.match_order(first.clone()).unwrap();
        engine.match_order(second.clone()).unwrap();

        let fills = engine.match_order(limit(3, Side::Buy, 102.0, 6)).unwrap();

        assert_eq!(fills.len(), 2);
        assert_eq!(fills[0].sell.id, first.id);
        assert_eq!(fills[0].quantity, 5);
        assert_eq!(fills[0].price, 101.0);
        assert_eq!(fills[1].sell.id, second.id);
        assert_eq!(fills[1].quantity, 1);
        assert_eq!(fills[1].price, 102.0);
        assert_eq!(engine.depth(Side::Sell), 2);
        assert_eq!(engine.depth(Side::Buy), 0);
    }

    /// A sell larger than the best bid rests its remainder.
    #[test]
    fn test_limit_sell_partial_match_and_remainder() {
        let mut engine = MatchingEngine::new();
        engine.match_order(limit(1, Side::Buy, 100.0, 4)).unwrap();

        let fills = engine.match_order(limit(2, Side::Sell, 99.0, 10)).unwrap();

        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].quantity, 4);
        assert_eq!(fills[0].price, 100.0);
        assert_eq!(engine.best_bid(), None);
        assert_eq!(engine.best_ask(), Some(99.0));
        assert_eq!(engine.depth(Side::Sell), 6);
    }

    #[test]
    fn test_non_crossing_order_rests() {
        let mut engine = MatchingEngine::new();
        engine.match_order(limit(1, Side::Sell, 105.0, 5)).unwrap();

        let fills = engine.match_order(limit(2, Side::Buy, 104.99, 5)).unwrap();

        assert!(fills.is_empty());
        assert_eq!(engine.best_bid(), Some(104.99));
        assert_eq!(engine.best_ask(), Some(105.0));
    }

    /// Tests that FIFO order is respected for multiple orders at the same price.
    #[test]
    fn test_queue_fairness_fifo_fill_order() {
        let mut engine = MatchingEngine::new();
        let a = limit(1, Side::Sell, 100.0, 4);
        let b = limit(2, Side::Sell, 100.0, 6);
        engine.match_order(a.clone()).unwrap();
        engine.match_order(b.clone()).unwrap();

        let fills = engine.match_order(limit(3, Side::Buy, 100.0, 9)).unwrap();

        assert_eq!(fills.len(), 2);
        assert_eq!(fills[0].sell.id, a.id);
        assert_eq!(fills[0].quantity, 4);
        assert_eq!(fills[1].sell.id, b.id);
        assert_eq!(fills[1].quantity, 5);
        assert_eq!(engine.depth(Side::Sell), 1);
    }

    /// Fill price sits between the resting price and the taker's limit.
    #[test]
    fn test_fill_price_is_resting_price() {
        let mut engine = MatchingEngine::new();
        engine.match_order(limit(1, Side::Buy, 100.0, 5)).unwrap();

        let fills = engine.match_order(limit(2, Side::Sell, 90.0, 5)).unwrap();

        assert_eq!(fills[0].price, 100.0);
        assert!(fills[0].price >= 90.0 && fills[0].price <= 100.0);
    }

    /// Fill snapshots carry each leg's quantity as it was before the fill.
    #[test]
    fn test_fill_snapshots_pre_fill_quantities() {
        let mut engine = MatchingEngine::new();
        engine.match_order(limit(1, Side::Sell, 95.0, 5)).unwrap();

        let fills = engine.match_order(limit(2, Side::Buy, 95.0, 3)).unwrap();

        assert_eq!(fills[0].sell.quantity, 5);
        assert_eq!(fills[0].buy.quantity, 3);
        assert_eq!(fills[0].quantity, 3);
    }

    #[test]
    fn test_rejects_invalid_orders() {
        let mut engine = MatchingEngine::new();

        let zero = engine.match_order(limit(1, Side::Buy, 100.0, 0));
        let negative = engine.match_order(limit(1, Side::Buy, -1.0, 1));
        let nan = engine.match_order(limit(1, Side::Sell, f64::NAN, 1));

        assert!(matches!(zero, Err(MarketError::Rejected { .. })));
        assert!(matches!(negative, Err(MarketError::Rejected { .. })));
        assert!(matches!(nan, Err(MarketError::Rejected { .. })));
        assert_eq!(engine.stats().orders_rejected, 3);
        assert_eq!(engine.stats().orders_accepted, 0);
    }

    #[test]
    fn test_cancel_existing_order() {
        let mut engine = MatchingEngine::new();
        let order = limit(1, Side::Buy, 101.0, 10);
        engine.match_order(order.clone()).unwrap();

        let cancelled = engine.cancel_order(order.id);

        assert_eq!(cancelled.map(|o| o.id), Some(order.id));
        assert_eq!(engine.best_bid(), None);
        assert_eq!(engine.stats().orders_cancelled, 1);
    }

    #[test]
    fn test_cancel_nonexistent_order() {
        let mut engine = MatchingEngine::new();
        engine.match_order(limit(1, Side::Sell, 99.0, 5)).unwrap();

        assert!(engine.cancel_order(OrderId(999)).is_none());
        assert_eq!(engine.depth(Side::Sell), 5);
    }

    /// An ask a fraction of a cent above the buyer's limit must not trade.
    #[test]
    fn test_sub_cent_ask_above_limit_rests() {
        let mut engine = MatchingEngine::new();
        engine.match_order(limit(1, Side::Sell, 100.004, 1)).unwrap();

        let fills = engine.match_order(limit(2, Side::Buy, 100.0, 1)).unwrap();

        assert!(fills.is_empty());
        assert_eq!(engine.best_bid(), Some(100.0));
        assert_eq!(engine.best_ask(), Some(100.004));
    }

    /// Prices a fraction of a cent apart are separate levels; the better one matches first.
    #[test]
    fn test_sub_cent_price_priority() {
        let mut engine = MatchingEngine::new();
        let worse = limit(1, Side::Sell, 100.004, 1);
        let better = limit(2, Side::Sell, 100.0, 1);
        engine.match_order(worse.clone()).unwrap();
        engine.match_order(better.clone()).unwrap();
        assert_eq!(engine.best_ask(), Some(100.0));

        let fills = engine.match_order(limit(3, Side::Buy, 101.0, 1)).unwrap();

        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].sell.id, better.id);
        assert_eq!(fills[0].price, 100.0);
        assert_eq!(engine.best_ask(), Some(100.004));
    }

    #[test]
    fn test_sub_cent_bid_priority() {
        let mut engine = MatchingEngine::new();
        engine.match_order(limit(1, Side::Buy, 99.995, 2)).unwrap();
        engine.match_order(limit(2, Side::Buy, 99.999, 2)).unwrap();

        let fills = engine.match_order(limit(3, Side::Sell, 99.996, 3)).unwrap();

        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].price, 99.999);
        assert_eq!(fills[0].quantity, 2);
        assert_eq!(engine.best_bid(), Some(99.995));
        assert_eq!(engine.best_ask(), Some(99.996));
    }

    #[test]
    fn test_stats_track_volume() {
        let mut engine = MatchingEngine::new();
        engine.match_order(limit(1, Side::Sell, 100.0, 5)).unwrap();
        engine.match_order(limit(2, Side::Buy, 100.0, 3)).unwrap();

        let stats = engine.stats();
        assert_eq!(stats.orders_accepted, 2);
        assert_eq!(stats.fills, 1);
        assert_eq!(stats.volume, 3);
    }
}
