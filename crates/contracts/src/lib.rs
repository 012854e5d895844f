//! # Contracts
//!
//! Frozen interface contracts shared by every broadcaster crate.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Frame Model
//! - `frame_index` is assigned by the capture device and treated as an opaque `u64`
//! - payloads arrive already encoded and are never inspected here
//! - frames are borrowed for the duration of one callback, never retained

mod blueprint;
mod error;
mod frame;
mod frame_source;
mod wire;

pub use blueprint::*;
pub use error::*;
pub use frame::Frame;
pub use frame_source::{AnnotationTarget, FrameCallback, FrameSource};
pub use wire::{WireMessage, INDEX_LEN};
