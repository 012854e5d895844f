//! WireMessage - publisher output
//!
//! Layout of every message on a publish endpoint:
//!
//! ```text
//! ┌──────────────┬──────────────────────────┬────────────────────────┐
//! │ topic bytes  │ frame_index (8 bytes LE) │ encoded payload bytes  │
//! └──────────────┴──────────────────────────┴────────────────────────┘
//! ```
//!
//! Subscribers filter on the topic prefix, read the fixed 8-byte index that
//! immediately follows it and hand the remainder to their decoder.

use bytes::{BufMut, Bytes, BytesMut};

use crate::ContractError;

/// Width of the frame index field
pub const INDEX_LEN: usize = 8;

/// Decoded view of one published message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireMessage {
    /// Topic the message was published under
    pub topic: Bytes,

    /// Device frame index
    pub frame_index: u64,

    /// Encoded frame payload
    pub payload: Bytes,
}

impl WireMessage {
    /// Total message length for a topic and payload
    pub fn encoded_len(topic_len: usize, payload_len: usize) -> usize {
        topic_len + INDEX_LEN + payload_len
    }

    /// Build `topic ‖ LE64(frame_index) ‖ payload` in a single allocation
    pub fn encode(topic: &[u8], frame_index: u64, payload: &[u8]) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::encoded_len(topic.len(), payload.len()));
        buf.put_slice(topic);
        buf.put_u64_le(frame_index);
        buf.put_slice(payload);
        buf.freeze()
    }

    /// Parse a message published under `topic`
    ///
    /// Slices share the input buffer, no payload copy is made.
    ///
    /// # Errors
    /// - `TopicMismatch` if the message does not start with `topic`
    /// - `MalformedMessage` if the index field is truncated
    pub fn parse(message: Bytes, topic: &[u8]) -> Result<Self, ContractError> {
        if !Self::matches_topic(&message, topic) {
            return Err(ContractError::TopicMismatch {
                expected: String::from_utf8_lossy(topic).into_owned(),
            });
        }

        let header_len = topic.len() + INDEX_LEN;
        if message.len() < header_len {
            return Err(ContractError::MalformedMessage {
                expected_min: header_len,
                actual: message.len(),
            });
        }

        let mut idx = [0u8; INDEX_LEN];
        idx.copy_from_slice(&message[topic.len()..header_len]);

        Ok(Self {
            topic: message.slice(..topic.len()),
            frame_index: u64::from_le_bytes(idx),
            payload: message.slice(header_len..),
        })
    }

    /// Subscriber-side prefix filter
    pub fn matches_topic(message: &[u8], topic: &[u8]) -> bool {
        message.starts_with(topic)
    }

    /// Re-encode this message
    pub fn to_bytes(&self) -> Bytes {
        Self::encode(&self.topic, self.frame_index, &self.payload)
    }
}
