//! At-least-once consumer runtime.
//!
//! The loop fetches a message, parses the required routing headers,
//! invokes the consumer, and commits the offset only after the consumer
//! succeeds. Any failure leaves the message uncommitted so it is
//! redelivered after the retry delay.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::bus::{
    BusMessage, HEADER_AGGREGATE_ID, HEADER_AGGREGATE_TYPE, HEADER_EVENT_TYPE, Reader,
};
use crate::error::BusError;

/// Default delay before retrying a failed iteration.
pub const CONSUMER_RETRY_DELAY: Duration = Duration::from_secs(5);

/// A fully parsed message handed to a consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumeArgs {
    pub aggregate_id: String,
    pub aggregate_type: String,
    pub event_type: String,
    pub data: Vec<u8>,
}

/// Error type returned by consumer handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A consumer of events from the bus.
///
/// Handlers must be idempotent: a message may be delivered more than once
/// if the process crashes between handling and commit.
#[async_trait]
pub trait EventConsumer: Send + Sync {
    /// Stable consumer name, also used as the consumer-group id.
    fn name(&self) -> &'static str;

    /// Handles one event.
    async fn consume(&self, args: ConsumeArgs) -> Result<(), HandlerError>;
}

/// Options for [`run_consumer`].
#[derive(Debug, Clone)]
pub struct ConsumerOptions {
    pub retry_delay: Duration,
}

impl Default for ConsumerOptions {
    fn default() -> Self {
        Self {
            retry_delay: CONSUMER_RETRY_DELAY,
        }
    }
}

fn parse_consume_args(msg: &BusMessage) -> Result<ConsumeArgs, BusError> {
    Ok(ConsumeArgs {
        aggregate_id: msg.header_str(HEADER_AGGREGATE_ID)?.to_string(),
        aggregate_type: msg.header_str(HEADER_AGGREGATE_TYPE)?.to_string(),
        event_type: msg.header_str(HEADER_EVENT_TYPE)?.to_string(),
        data: msg.payload.clone(),
    })
}

/// Reads a single message from the reader and passes it to the consumer.
/// The offset is committed only after the consumer returns `Ok`.
async fn run_consumer_once<R, C>(reader: &mut R, consumer: &C) -> Result<(), BusError>
where
    R: Reader,
    C: EventConsumer + ?Sized,
{
    let msg = reader.fetch().await?;
    let args = parse_consume_args(&msg)?;

    tracing::debug!(
        consumer = consumer.name(),
        event_type = %args.event_type,
        aggregate_id = %args.aggregate_id,
        "received event"
    );

    consumer
        .consume(args)
        .await
        .map_err(|err| BusError::Consume {
            consumer: consumer.name(),
            message: err.to_string(),
        })?;

    reader.commit(&msg).await?;
    metrics::counter!("events_consumed_total", "consumer" => consumer.name()).increment(1);

    Ok(())
}

/// Runs a consumer in a loop until the token is cancelled.
///
/// Failed iterations are logged and retried after `opts.retry_delay`.
/// Returns [`BusError::Cancelled`] when the token fires.
pub async fn run_consumer<R, C>(
    shutdown: CancellationToken,
    mut reader: R,
    consumer: &C,
    opts: ConsumerOptions,
) -> Result<(), BusError>
where
    R: Reader,
    C: EventConsumer + ?Sized,
{
    tracing::info!(consumer = consumer.name(), "starting consumer");

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Err(BusError::Cancelled),
            result = run_consumer_once(&mut reader, consumer) => {
                if let Err(err) = result {
                    tracing::error!(
                        consumer = consumer.name(),
                        error = %err,
                        "consumer iteration failed"
                    );
                    tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => return Err(BusError::Cancelled),
                        _ = tokio::time::sleep(opts.retry_delay) => {}
                    }
                }
            }
        }
    }
}
