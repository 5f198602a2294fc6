//! Events the market broadcasts to every connected trader.

use serde::{Deserialize, Serialize};

use crate::{errors::EventError, orders::Order, trade::Fill};

pub const NEW_ORDER: &str = "newOrder";
pub const CANCELLED_ORDER: &str = "cancelledOrder";
pub const FILLED_ORDER: &str = "filledOrder";

/// Tagged union delivered to each trader's inbox.
///
/// Serialized adjacently tagged, e.g. `{"type":"newOrder","payload":{...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum MarketEvent {
    NewOrder(Order),
    CancelledOrder(Order),
    FilledOrder(Fill),
}

impl MarketEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            MarketEvent::NewOrder(_) => NEW_ORDER,
            MarketEvent::CancelledOrder(_) => CANCELLED_ORDER,
            MarketEvent::FilledOrder(_) => FILLED_ORDER,
        }
    }

    /// Decodes an event received as a `(type, json payload)` pair.
    pub fn decode(kind: &str, payload: &str) -> Result<Self, EventError> {
        let malformed = |source| EventError::Malformed {
            kind: kind.to_string(),
            source,
        };
        match kind {
            NEW_ORDER => serde_json::from_str(payload)
                .map(MarketEvent::NewOrder)
                .map_err(malformed),
            CANCELLED_ORDER => serde_json::from_str(payload)
                .map(MarketEvent::CancelledOrder)
                .map_err(malformed),
            FILLED_ORDER => serde_json::from_str(payload)
                .map(MarketEvent::FilledOrder)
                .map_err(malformed),
            other => Err(EventError::UnknownType(other.to_string())),
        }
    }
}
