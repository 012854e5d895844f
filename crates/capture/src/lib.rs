//! # Capture
//!
//! Frame sources feeding the publisher.
//!
//! Responsibilities:
//! - Provide `FrameSource` implementations
//! - Own the capture thread and its lifecycle (start / stop)
//! - Apply annotation text to the next produced frame
//!
//! Camera hardware is driven outside this workspace; `SyntheticCamera`
//! produces encoded-looking test frames at the configured rate so the whole
//! pipeline can run and be tested without a device.

pub mod synthetic;

pub use contracts::{AnnotationTarget, CameraSettings, FrameSource};
pub use synthetic::SyntheticCamera;
