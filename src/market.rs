//! The market task: the single owner of the [`MatchingEngine`] and the [`TraderRegistry`].
//!
//! Every other component talks to it through a cloneable [`MarketHandle`]. Submissions
//! are non-blocking sends into unbounded channels; the task applies them one at a time,
//! which serializes all writers of the book and the connection set.
//!
//! For each accepted order the task broadcasts `NewOrder` first and then every resulting
//! `FilledOrder`, so each trader sees an order before any fill that involves it.

use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    errors::MarketError,
    events::MarketEvent,
    matching::{EngineStats, MatchingEngine},
    orders::{Order, OrderId, TraderId},
    registry::{ConnectionInfo, Inbox, TraderRegistry},
};

/// Requests accepted on the order intake channel.
#[derive(Debug)]
pub enum Command {
    Place(Order),
    Cancel(OrderId),
}

/// Cheap, cloneable entry point into a running market.
#[derive(Debug, Clone)]
pub struct MarketHandle {
    commands: UnboundedSender<Command>,
    connections: UnboundedSender<ConnectionInfo>,
}

impl MarketHandle {
    /// Hands `order` to the market without waiting for it to be processed.
    pub fn submit(&self, order: Order) -> Result<(), MarketError> {
        self.commands
            .send(Command::Place(order))
            .map_err(|_| MarketError::Closed)
    }

    pub fn cancel(&self, id: OrderId) -> Result<(), MarketError> {
        self.commands
            .send(Command::Cancel(id))
            .map_err(|_| MarketError::Closed)
    }

    pub fn connect(&self, trader: TraderId, inbox: Inbox) -> Result<(), MarketError> {
        self.connections
            .send(ConnectionInfo::open(trader, inbox))
            .map_err(|_| MarketError::Closed)
    }

    pub fn disconnect(&self, trader: TraderId) -> Result<(), MarketError> {
        self.connections
            .send(ConnectionInfo::close(trader))
            .map_err(|_| MarketError::Closed)
    }

    /// A handle whose receiving ends belong to the caller instead of a market task.
    /// Lets a component be driven in isolation and have its submissions inspected.
    pub fn detached() -> (
        Self,
        UnboundedReceiver<Command>,
        UnboundedReceiver<ConnectionInfo>,
    ) {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (connections, connection_rx) = mpsc::unbounded_channel();
        (
            Self {
                commands,
                connections,
            },
            command_rx,
            connection_rx,
        )
    }
}

/// Engine + registry, driven by [`run_market`].
#[derive(Debug, Default)]
pub struct Market {
    engine: MatchingEngine,
    registry: TraderRegistry,
}

impl Market {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&mut self, info: ConnectionInfo) {
        self.registry.connect(info);
    }

    /// Validates, broadcasts and matches one order, then broadcasts its fills.
    pub fn place(&mut self, order: Order) {
        if let Err(e) = self.engine.check(&order) {
            warn!("{}", e);
            return;
        }
        self.registry.dispatch(&MarketEvent::NewOrder(order.clone()));
        match self.engine.match_order(order) {
            Ok(fills) => {
                for fill in fills {
                    self.registry.dispatch(&MarketEvent::FilledOrder(fill));
                }
            }
            Err(e) => warn!("{}", e),
        }
    }

    pub fn cancel(&mut self, id: OrderId) {
        match self.engine.cancel_order(id) {
            Some(order) => {
                self.registry.dispatch(&MarketEvent::CancelledOrder(order));
            }
            None => info!("cancel for {} ignored: not resting", id),
        }
    }

    pub fn engine(&self) -> &MatchingEngine {
        &self.engine
    }

    pub fn registry(&self) -> &TraderRegistry {
        &self.registry
    }
}

/// Drives `market` until `cancel` fires or every [`MarketHandle`] has been dropped.
///
/// Pending connection messages are always drained before the next command, so a trader
/// that connected before submitting receives the broadcast of its own order.
pub async fn run_market(
    mut market: Market,
    mut commands: UnboundedReceiver<Command>,
    mut connections: UnboundedReceiver<ConnectionInfo>,
    cancel: CancellationToken,
) -> EngineStats {
    let mut connections_open = true;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("market received shutdown");
                break;
            }
            conn = connections.recv(), if connections_open => match conn {
                Some(conn) => market.connect(conn),
                None => connections_open = false,
            },
            command = commands.recv() => match command {
                Some(Command::Place(order)) => market.place(order),
                Some(Command::Cancel(id)) => market.cancel(id),
                None => {
                    info!("all market handles dropped");
                    break;
                }
            },
        }
    }
    let stats = market.engine().stats();
    info!(?stats, "market stopped");
    stats
}

/// Spawns a market task and returns a handle to it.
pub fn spawn_market(cancel: CancellationToken) -> (MarketHandle, JoinHandle<EngineStats>) {
    let (handle, commands, connections) = MarketHandle::detached();
    let task = tokio::spawn(run_market(Market::new(), commands, connections, cancel));
    (handle, task)
}
