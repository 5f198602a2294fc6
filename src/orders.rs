use std::{fmt, time::SystemTime};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which side of the market an order is on.
///
/// A trader's book lists buys from the highest price down and sells from the lowest
/// price up, so the most aggressive quote on each side comes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,  // Bid
    Sell, // Ask
}

impl Side {
    /// The side a counter-order has to be on to trade against this one.
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Unique order identifier, drawn once from a v4 uuid and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub u128);

impl OrderId {
    pub fn generate() -> Self {
        OrderId(Uuid::new_v4().as_u128())
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// Identity of the trader that owns an order. Identity only: it never grants
/// access to the trader's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TraderId(pub u32);

impl fmt::Display for TraderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trader-{}", self.0)
    }
}

/// A limit order submitted by a trader.
///
/// - `quantity` is strictly positive while the order rests; only fills decrement it
/// - `timestamp` records creation time; priority among equal prices comes from arrival order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub side: Side,
    pub price: f64,
    pub quantity: u64,
    pub timestamp: SystemTime,
    pub owner: TraderId,
}

impl Order {
    /// Creates a fresh order with a newly generated id, stamped now.
    pub fn new(owner: TraderId, side: Side, quantity: u64, price: f64) -> Self {
        Self {
            id: OrderId::generate(),
            side,
            price,
            quantity,
            timestamp: SystemTime::now(),
            owner,
        }
    }

    pub fn is_sell(&self) -> bool {
        self.side == Side::Sell
    }

    /// Notional value of the order (`quantity × price`).
    pub fn notional(&self) -> f64 {
        self.quantity as f64 * self.price
    }
}
