//! Frame annotation - overlay text for the next frame
//!
//! The frame number is burned in by the device itself; the annotator only
//! adds host and wall-clock information.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use contracts::AnnotationTarget;

/// Wall-clock source
pub type Clock = Box<dyn Fn() -> DateTime<Utc> + Send>;

/// Produces overlay text for upcoming frames
pub trait Annotator: Send {
    /// Called once per delivered frame, before the drop decision
    fn annotate(&mut self, frame_index: u64);
}

/// Stamps `"<hostname> <UTC time> <frame index>"` into the next frame
pub struct MetadataAnnotator {
    hostname: String,
    target: Arc<dyn AnnotationTarget>,
    clock: Clock,
}

impl MetadataAnnotator {
    pub fn new(hostname: impl Into<String>, target: Arc<dyn AnnotationTarget>) -> Self {
        Self {
            hostname: hostname.into(),
            target,
            clock: Box::new(Utc::now),
        }
    }

    /// Replace the wall clock (tests)
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Overlay text, microsecond precision, index zero-padded to 10 digits
    pub fn format_text(hostname: &str, time: DateTime<Utc>, frame_index: u64) -> String {
        format!(
            "{} {} {:0>10}",
            hostname,
            time.format("%Y-%m-%d %H:%M:%S%.6f"),
            frame_index
        )
    }
}

impl Annotator for MetadataAnnotator {
    fn annotate(&mut self, frame_index: u64) {
        let text = Self::format_text(&self.hostname, (self.clock)(), frame_index);
        self.target.set_annotation(text);
    }
}
