//! Connected traders and fan-out delivery of market events.

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::{
    errors::EventError,
    events::MarketEvent,
    orders::TraderId,
};

/// A trader's inbox: the market pushes events, the trader's task drains them in order.
pub type Inbox = UnboundedSender<MarketEvent>;

/// Registration message sent by a trader when it joins (`open == true`) or leaves.
#[derive(Debug)]
pub struct ConnectionInfo {
    pub trader: TraderId,
    pub inbox: Option<Inbox>,
    pub open: bool,
}

impl ConnectionInfo {
    pub fn open(trader: TraderId, inbox: Inbox) -> Self {
        Self {
            trader,
            inbox: Some(inbox),
            open: true,
        }
    }

    pub fn close(trader: TraderId) -> Self {
        Self {
            trader,
            inbox: None,
            open: false,
        }
    }
}

/// The set of connected traders.
///
/// Owned by the market task, which is the only writer; see [`crate::market`].
#[derive(Debug, Default)]
pub struct TraderRegistry {
    traders: Vec<(TraderId, Inbox)>,
}

impl TraderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a registration message. Re-registering replaces the previous inbox.
    pub fn connect(&mut self, info: ConnectionInfo) {
        match (info.open, info.inbox) {
            (true, Some(inbox)) => {
                if let Some(slot) = self.traders.iter_mut().find(|(id, _)| *id == info.trader) {
                    slot.1 = inbox;
                } else {
                    self.traders.push((info.trader, inbox));
                }
                info!("{} connected", info.trader);
            }
            (true, None) => warn!("{} tried to connect without an inbox", info.trader),
            (false, _) => self.disconnect(info.trader),
        }
    }

    pub fn disconnect(&mut self, trader: TraderId) {
        let before = self.traders.len();
        self.traders.retain(|(id, _)| *id != trader);
        if self.traders.len() < before {
            info!("{} disconnected", trader);
        }
    }

    /// Delivers `event` to every connected trader exactly once.
    ///
    /// Traders whose inbox has been dropped are pruned. Returns how many inboxes received it.
    pub fn dispatch(&mut self, event: &MarketEvent) -> usize {
        let mut delivered = 0;
        self.traders.retain(|(id, inbox)| match inbox.send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(_) => {
                debug!("{} inbox closed, dropping registration", id);
                false
            }
        });
        delivered
    }

    /// Decodes an externally supplied event and dispatches it.
    ///
    /// Unrecognized or malformed events are reported and skipped; no trader sees them.
    pub fn dispatch_raw(&mut self, kind: &str, payload: &str) -> Result<usize, EventError> {
        match MarketEvent::decode(kind, payload) {
            Ok(event) => Ok(self.dispatch(&event)),
            Err(e) => {
                warn!("didn't respond to event: {}", e);
                Err(e)
            }
        }
    }

    pub fn contains(&self, trader: TraderId) -> bool {
        self.traders.iter().any(|(id, _)| *id == trader)
    }

    pub fn len(&self) -> usize {
        self.traders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traders.is_empty()
    }
}
