//! Frame filters - deterministic drop instrumentation
//!
//! A filter is a pure predicate over the frame index. It keeps no memory
//! between frames, so whether a given index is dropped depends only on the
//! index and the configured constant.

use std::num::NonZeroU64;

/// Decides whether a frame is withheld from every socket
pub trait FrameFilter: Send {
    /// `true` if the frame must not be published
    fn should_drop(&self, frame_index: u64) -> bool;
}

/// Publish every frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeepAll;

impl FrameFilter for KeepAll {
    fn should_drop(&self, _frame_index: u64) -> bool {
        false
    }
}

/// Drop every frame whose index is a multiple of the divisor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropEveryNth {
    divisor: NonZeroU64,
}

impl DropEveryNth {
    /// `None` for a divisor of 0 (filter disabled)
    pub fn new(divisor: u64) -> Option<Self> {
        NonZeroU64::new(divisor).map(|divisor| Self { divisor })
    }

    pub fn divisor(&self) -> u64 {
        self.divisor.get()
    }
}

impl FrameFilter for DropEveryNth {
    fn should_drop(&self, frame_index: u64) -> bool {
        frame_index % self.divisor == 0
    }
}

/// Filter for a configured divisor, `KeepAll` when it is 0
pub fn drop_every_nth(divisor: u64) -> Box<dyn FrameFilter> {
    match DropEveryNth::new(divisor) {
        Some(filter) => Box::new(filter),
        None => Box::new(KeepAll),
    }
}
