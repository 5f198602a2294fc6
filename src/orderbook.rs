use crate::orders::{Order, OrderId, Side};
use tracing::debug;

/// Price returned by [`OrderBook::best_bid`] / [`OrderBook::best_ask`] when that side is empty.
pub const NO_QUOTE: f64 = -1.0;

/// A trader's private view of the market.
///
/// The book is a read-only projection rebuilt solely from broadcast events: the
/// trader inserts every order it observes and applies every fill it is told about.
/// It is never consulted by the matching engine.
///
/// Two sequences are kept:
/// - `sells` sorted **ascending** by price (best ask first)
/// - `buys` sorted **descending** by price (best bid first)
///
/// Equal prices keep insertion order, so the earlier order wins priority.
#[derive(Debug, Default, Clone)]
pub struct OrderBook {
    sells: Vec<Order>,
    buys: Vec<Order>,
}

impl OrderBook {
    /// Creates a new, empty [`OrderBook`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a **copy** of `order` into the side it belongs to, then restores that side's
    /// ordering with a stable sort.
    ///
    /// The book owns its snapshot: later changes to the caller's order never leak in.
    /// Duplicate ids are accepted as-is.
    pub fn insert(&mut self, order: &Order) {
        match order.side {
            Side::Sell => {
                self.sells.push(order.clone());
                // `sort_by` is stable, which preserves time priority at equal prices
                self.sells.sort_by(|a, b| a.price.total_cmp(&b.price));
            }
            Side::Buy => {
                self.buys.push(order.clone());
                self.buys.sort_by(|a, b| b.price.total_cmp(&a.price));
            }
        }
    }

    /// Applies a fill of `quantity` to the entry with `order`'s id, on `order`'s side.
    ///
    /// The entry is removed once its quantity reaches zero. A fill for an order the
    /// book has never seen is a silent no-op.
    pub fn apply_fill(&mut self, order: &Order, quantity: u64) {
        let side = match order.side {
            Side::Sell => &mut self.sells,
            Side::Buy => &mut self.buys,
        };
        let Some(pos) = side.iter().position(|o| o.id == order.id) else {
            debug!("fill for unknown order {} ignored", order.id);
            return;
        };
        let entry = &mut side[pos];
        entry.quantity = entry.quantity.saturating_sub(quantity);
        if entry.quantity == 0 {
            side.remove(pos);
        }
    }

    /// Highest buy price, or [`NO_QUOTE`] when there are no buys.
    pub fn best_bid(&self) -> f64 {
        self.buys.first().map_or(NO_QUOTE, |o| o.price)
    }

    /// Lowest sell price, or [`NO_QUOTE`] when there are no sells.
    pub fn best_ask(&self) -> f64 {
        self.sells.first().map_or(NO_QUOTE, |o| o.price)
    }

    pub fn sells(&self) -> &[Order] {
        &self.sells
    }

    pub fn buys(&self) -> &[Order] {
        &self.buys
    }

    /// Looks up an entry by id on either side.
    pub fn get(&self, id: OrderId) -> Option<&Order> {
        self.sells.iter().chain(self.buys.iter()).find(|o| o.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.sells.is_empty() && self.buys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::TraderId;

    fn sample_order(side: Side, price: f64, quantity: u64) -> Order {
        Order::new(TraderId(1), side, quantity, price)
    }

    /// Sells come out lowest first, buys highest first.
    #[test]
    fn test_insert_keeps_sides_sorted() {
        let mut book = OrderBook::new();
        book.insert(&sample_order(Side::Sell, 102.0, 1));
        book.insert(&sample_order(Side::Sell, 99.5, 1));
        book.insert(&sample_order(Side::Sell, 101.0, 1));
        book.insert(&sample_order(Side::Buy, 97.0, 1));
        book.insert(&sample_order(Side::Buy, 98.5, 1));

        let asks: Vec<f64> = book.sells().iter().map(|o| o.price).collect();
        let bids: Vec<f64> = book.buys().iter().map(|o| o.price).collect();
        assert_eq!(asks, vec![99.5, 101.0, 102.0]);
        assert_eq!(bids, vec![98.5, 97.0]);
        assert_eq!(book.best_ask(), 99.5);
        assert_eq!(book.best_bid(), 98.5);
    }

    /// Tests that FIFO order is respected for multiple orders at the same price.
    #[test]
    fn test_equal_prices_keep_insertion_order() {
        let mut book = OrderBook::new();
        let first = sample_order(Side::Buy, 100.0, 4);
        let second = sample_order(Side::Buy, 100.0, 6);
        book.insert(&first);
        book.insert(&second);
        book.insert(&sample_order(Side::Buy, 101.0, 1));

        assert_eq!(book.buys()[1].id, first.id);
        assert_eq!(book.buys()[2].id, second.id);
    }

    #[test]
    fn test_empty_book_returns_sentinel() {
        let book = OrderBook::new();
        assert_eq!(book.best_bid(), NO_QUOTE);
        assert_eq!(book.best_ask(), NO_QUOTE);
        assert!(book.is_empty());
    }

    #[test]
    fn test_partial_fill_reduces_quantity() {
        let mut book = OrderBook::new();
        let sell = sample_order(Side::Sell, 100.0, 5);
        book.insert(&sell);

        book.apply_fill(&sell, 3);

        assert_eq!(book.get(sell.id).unwrap().quantity, 2);
    }

    #[test]
    fn test_full_fill_removes_entry() {
        let mut book = OrderBook::new();
        let buy = sample_order(Side::Buy, 100.0, 5);
        book.insert(&buy);

        book.apply_fill(&buy, 5);

        assert!(book.get(buy.id).is_none());
        assert_eq!(book.best_bid(), NO_QUOTE);
    }

    #[test]
    fn test_fill_for_unknown_order_is_noop() {
        let mut book = OrderBook::new();
        let resting = sample_order(Side::Sell, 100.0, 5);
        book.insert(&resting);

        book.apply_fill(&sample_order(Side::Sell, 100.0, 5), 5);

        assert_eq!(book.sells().len(), 1);
        assert_eq!(book.sells()[0].quantity, 5);
    }

    /// The book keeps its own copy; mutating the original afterwards changes nothing.
    #[test]
    fn test_insert_stores_independent_copy() {
        let mut book = OrderBook::new();
        let mut order = sample_order(Side::Sell, 100.0, 5);
        book.insert(&order);

        order.quantity = 1;
        order.price = 1.0;

        assert_eq!(book.sells()[0].quantity, 5);
        assert_eq!(book.best_ask(), 100.0);
    }
}
