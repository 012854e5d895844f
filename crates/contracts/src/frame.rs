//! Frame - FrameSource output
//!
//! A single encoded video frame as delivered by the capture device.

/// Encoded frame borrowed for the duration of one callback.
///
/// The payload is a borrow, so a consumer cannot keep it past the call that
/// delivered it; copy it into a [`crate::WireMessage`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    /// Device-assigned sequence number (opaque 64-bit counter)
    pub index: u64,

    /// Encoded payload, may be empty
    pub payload: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Create a frame view
    pub fn new(index: u64, payload: &'a [u8]) -> Self {
        Self { index, payload }
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}
