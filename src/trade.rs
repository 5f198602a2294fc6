use serde::{Deserialize, Serialize};

use crate::orders::Order;

/// A fill pairs one sell order with one buy order.
///
/// # Terminology
/// - **Maker**: the order that was already resting in the engine's book.
/// - **Taker**: the incoming order that crossed it.
///
/// # Behavior
/// - The fill always executes at the **maker's price**, which lies between the
///   resting price and the taker's limit.
/// - `sell` and `buy` are snapshots of both legs taken *before* the fill was applied,
///   so receivers see the quantity each leg had when it traded.
/// - One taker can produce several fills across price levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub sell: Order,
    pub buy: Order,
    pub quantity: u64,
    pub price: f64,
}

impl Fill {
    /// Cash that changes hands (`quantity × price`).
    pub fn value(&self) -> f64 {
        self.quantity as f64 * self.price
    }
}
