use chrono::{DateTime, Utc};

/// Identifier assigned to an event by the store.
///
/// Monotonically increasing and unique per store, so replaying a single
/// aggregate in ascending event id matches sequence-number order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(i64);

impl EventId {
    /// Creates an event ID from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for EventId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<EventId> for i64 {
    fn from(id: EventId) -> Self {
        id.0
    }
}

/// Per-aggregate ordinal of an event, assigned by the writer.
///
/// Starts at 0 for the first event of an aggregate. The store enforces
/// uniqueness of `(aggregate, sequence_number)` so two concurrent writers
/// observing the same history cannot both commit the same ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SequenceNumber(i64);

impl SequenceNumber {
    /// Creates a sequence number from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the sequence number of the first event (0).
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the next sequence number.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for SequenceNumber {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<SequenceNumber> for i64 {
    fn from(seq: SequenceNumber) -> Self {
        seq.0
    }
}

/// Arguments for persisting a single event.
#[derive(Debug, Clone)]
pub struct PersistEventArgs {
    pub sequence_number: SequenceNumber,
    pub aggregate_id: String,
    pub aggregate_type: String,
    pub event_type: String,
    pub data: Vec<u8>,
}

/// An immutable record in the event store.
///
/// The payload is opaque to the store; only the domain layer decodes it.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub event_id: EventId,
    pub sequence_number: SequenceNumber,
    pub aggregate_id: String,
    pub aggregate_type: String,
    pub event_type: String,
    pub data: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

/// Serializes the composite aggregate key into the denormalized column
/// form, `"{aggregate_type}:{aggregate_id}"`.
pub(crate) fn serialize_aggregate_id(aggregate_id: &str, aggregate_type: &str) -> String {
    format!("{aggregate_type}:{aggregate_id}")
}

/// Splits a serialized aggregate key back into `(aggregate_id,
/// aggregate_type)`. A key without a separator is returned unchanged with
/// an empty type.
pub(crate) fn deserialize_aggregate_id(key: &str) -> (String, String) {
    match key.split_once(':') {
        Some((aggregate_type, aggregate_id)) => {
            (aggregate_id.to_string(), aggregate_type.to_string())
        }
        None => (key.to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_number_starts_at_zero() {
        assert_eq!(SequenceNumber::initial().as_i64(), 0);
        assert_eq!(SequenceNumber::initial().next().as_i64(), 1);
    }

    #[test]
    fn sequence_number_ordering() {
        let s1 = SequenceNumber::new(1);
        let s2 = SequenceNumber::new(2);
        assert!(s1 < s2);
        assert_eq!(s1.next(), s2);
    }

    #[test]
    fn aggregate_key_roundtrip() {
        let key = serialize_aggregate_id("order-123", "order");
        assert_eq!(key, "order:order-123");

        let (aggregate_id, aggregate_type) = deserialize_aggregate_id(&key);
        assert_eq!(aggregate_id, "order-123");
        assert_eq!(aggregate_type, "order");
    }

    #[test]
    fn aggregate_key_without_separator() {
        let (aggregate_id, aggregate_type) = deserialize_aggregate_id("bare");
        assert_eq!(aggregate_id, "bare");
        assert_eq!(aggregate_type, "");
    }
}
