use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::BusError;

/// Header carrying the aggregate instance id. Required on every message.
pub const HEADER_AGGREGATE_ID: &str = "aggregate-id";
/// Header carrying the aggregate type. Required on every message.
pub const HEADER_AGGREGATE_TYPE: &str = "aggregate-type";
/// Header carrying the event type. Required on every message.
pub const HEADER_EVENT_TYPE: &str = "event-type";

/// Upper bound on a single publish, derived from the caller context.
pub const PUBLISH_TIMEOUT: Duration = Duration::from_secs(10);

/// Arguments for publishing one committed event.
#[derive(Debug, Clone)]
pub struct PublishArgs {
    pub aggregate_id: String,
    pub aggregate_type: String,
    pub event_type: String,
    pub value: Vec<u8>,
}

/// Publishing side of the event bus.
///
/// Implementations attach the three required headers and key the message
/// by `aggregate_id` so events of one aggregate stay ordered.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, args: PublishArgs) -> Result<(), BusError>;
}

/// A message as observed by the reader side of the bus.
#[derive(Debug, Clone)]
pub struct BusMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub headers: HashMap<String, Vec<u8>>,
    pub payload: Vec<u8>,
}

impl BusMessage {
    /// Returns the UTF-8 value of a required header.
    pub fn header_str(&self, name: &'static str) -> Result<&str, BusError> {
        let value = self
            .headers
            .get(name)
            .ok_or(BusError::MissingHeader(name))?;
        std::str::from_utf8(value).map_err(|_| BusError::InvalidHeader(name))
    }
}

/// Reading side of the bus: fetch the next message for this consumer
/// group, commit it once it has been handled.
#[async_trait]
pub trait Reader: Send {
    async fn fetch(&mut self) -> Result<BusMessage, BusError>;
    async fn commit(&mut self, msg: &BusMessage) -> Result<(), BusError>;
}
