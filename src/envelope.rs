//! Envelope - the immutable delivery unit wrapping a payload with
//! routing metadata.

use std::time::SystemTime;

/// A published payload plus the metadata the bus needs to route it.
///
/// Envelopes are created once per publish call and never mutated after
/// construction. Fan-out clones one copy per subscription; an item on a
/// work queue is owned by exactly one worker at a time.
#[derive(Clone, Debug)]
pub struct Envelope {
    /// Monotonic sequence number assigned at publish time.
    pub sequence: u64,
    /// Topic the payload was published under (e.g. "order.created").
    pub topic: String,
    /// Serialized payload (typically bitcode binary).
    pub payload: Vec<u8>,
    /// Optional metadata (headers, correlation IDs, etc.)
    pub metadata: Option<Vec<(String, String)>>,
    /// Wall-clock time the envelope was created.
    pub enqueued_at: SystemTime,
}

impl Envelope {
    /// Create a new envelope with the given sequence, topic and payload.
    pub fn new(sequence: u64, topic: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            sequence,
            topic: topic.into(),
            payload,
            metadata: None,
            enqueued_at: SystemTime::now(),
        }
    }

    /// Create an envelope with a bitcode-serialized payload.
    pub fn encode<T: serde::Serialize>(
        sequence: u64,
        topic: impl Into<String>,
        payload: &T,
    ) -> Result<Self, bitcode::Error> {
        let bytes = bitcode::serialize(payload)?;
        Ok(Self::new(sequence, topic, bytes))
    }

    /// Decode the payload from bitcode binary format.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, bitcode::Error> {
        bitcode::deserialize(&self.payload)
    }

    /// Create an envelope with a string payload.
    pub fn with_string_payload(
        sequence: u64,
        topic: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self::new(sequence, topic, payload.into().into_bytes())
    }

    /// Add metadata to the envelope.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata
            .get_or_insert_with(Vec::new)
            .push((key.into(), value.into()));
        self
    }

    /// Get the payload as a string (if valid UTF-8).
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_construction() {
        let envelope = Envelope::new(1, "order.created", b"{}".to_vec());
        assert_eq!(envelope.sequence, 1);
        assert_eq!(envelope.topic, "order.created");
        assert_eq!(envelope.payload_str(), Some("{}"));
        assert!(envelope.metadata.is_none());
    }

    #[test]
    fn envelope_with_metadata() {
        let envelope = Envelope::new(1, "order.created", b"{}".to_vec())
            .with_metadata("correlation-id", "abc-123")
            .with_metadata("source", "order-service");

        let meta = envelope.metadata.unwrap();
        assert_eq!(meta.len(), 2);
        assert_eq!(meta[0], ("correlation-id".to_string(), "abc-123".to_string()));
    }

    #[test]
    fn envelope_typed_payload() {
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Workload {
            duration_ms: u64,
        }

        let envelope =
            Envelope::encode(7, "work.item", &Workload { duration_ms: 250 }).unwrap();
        assert_eq!(envelope.sequence, 7);

        let decoded: Workload = envelope.decode().unwrap();
        assert_eq!(decoded, Workload { duration_ms: 250 });
    }
}
