use thiserror::Error;

use crate::orders::OrderId;

#[derive(Error, Debug)]
pub enum MarketError {
    #[error("market is closed")]
    Closed,
    #[error("order {id} rejected: {reason}")]
    Rejected { id: OrderId, reason: &'static str },
}

/// Errors decoding an event arriving from outside the process.
#[derive(Error, Debug)]
pub enum EventError {
    #[error("unrecognized event type `{0}`")]
    UnknownType(String),
    #[error("malformed `{kind}` payload: {source}")]
    Malformed {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}
