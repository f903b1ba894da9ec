//! Kafka-backed bus and reader.
//!
//! Messages are keyed by aggregate id so all events of one aggregate land
//! on the same partition and replay in order. Offsets are committed
//! explicitly; auto-commit is disabled so the consumer runtime controls
//! the at-least-once window.

use std::collections::HashMap;

use async_trait::async_trait;
use rdkafka::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::{Header, Headers, Message, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::{Offset, TopicPartitionList};

use crate::bus::{
    BusMessage, EventBus, HEADER_AGGREGATE_ID, HEADER_AGGREGATE_TYPE, HEADER_EVENT_TYPE,
    PUBLISH_TIMEOUT, PublishArgs, Reader,
};
use crate::error::BusError;

/// Kafka event bus (publishing side).
#[derive(Clone)]
pub struct KafkaEventBus {
    producer: FutureProducer,
    topic: String,
}

impl KafkaEventBus {
    /// Connects a producer to the given brokers and topic.
    pub fn connect(brokers: &str, topic: impl Into<String>) -> Result<Self, BusError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("acks", "all")
            .create()
            .map_err(|e| BusError::Connection(e.to_string()))?;

        Ok(Self {
            producer,
            topic: topic.into(),
        })
    }
}

#[async_trait]
impl EventBus for KafkaEventBus {
    async fn publish(&self, args: PublishArgs) -> Result<(), BusError> {
        let headers = OwnedHeaders::new()
            .insert(Header {
                key: HEADER_EVENT_TYPE,
                value: Some(args.event_type.as_bytes()),
            })
            .insert(Header {
                key: HEADER_AGGREGATE_ID,
                value: Some(args.aggregate_id.as_bytes()),
            })
            .insert(Header {
                key: HEADER_AGGREGATE_TYPE,
                value: Some(args.aggregate_type.as_bytes()),
            });

        let record = FutureRecord::to(&self.topic)
            .key(args.aggregate_id.as_str())
            .payload(args.value.as_slice())
            .headers(headers);

        let delivery = tokio::time::timeout(PUBLISH_TIMEOUT, self.producer.send(record, PUBLISH_TIMEOUT))
            .await
            .map_err(|_| BusError::PublishTimeout(PUBLISH_TIMEOUT))?;

        delivery.map_err(|(err, _)| BusError::Publish(err.to_string()))?;
        Ok(())
    }
}

/// Kafka reader for one consumer group.
pub struct KafkaReader {
    consumer: StreamConsumer,
}

impl KafkaReader {
    /// Connects a consumer with the given group id and subscribes to the
    /// topic. Each consumer group tracks its offsets independently.
    pub fn connect(brokers: &str, group_id: &str, topic: &str) -> Result<Self, BusError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .create()
            .map_err(|e| BusError::Connection(e.to_string()))?;

        consumer
            .subscribe(&[topic])
            .map_err(|e| BusError::Connection(e.to_string()))?;

        Ok(Self { consumer })
    }
}

#[async_trait]
impl Reader for KafkaReader {
    async fn fetch(&mut self) -> Result<BusMessage, BusError> {
        let msg = self
            .consumer
            .recv()
            .await
            .map_err(|e| BusError::Fetch(e.to_string()))?;

        let mut headers = HashMap::new();
        if let Some(borrowed) = msg.headers() {
            for header in borrowed.iter() {
                if let Some(value) = header.value {
                    headers.insert(header.key.to_string(), value.to_vec());
                }
            }
        }

        Ok(BusMessage {
            topic: msg.topic().to_string(),
            partition: msg.partition(),
            offset: msg.offset(),
            headers,
            payload: msg.payload().map(<[u8]>::to_vec).unwrap_or_default(),
        })
    }

    async fn commit(&mut self, msg: &BusMessage) -> Result<(), BusError> {
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(&msg.topic, msg.partition, Offset::Offset(msg.offset + 1))
            .map_err(|e| BusError::Commit(e.to_string()))?;

        self.consumer
            .commit(&tpl, CommitMode::Async)
            .map_err(|e| BusError::Commit(e.to_string()))
    }
}
