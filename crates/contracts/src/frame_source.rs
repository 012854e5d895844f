//! FrameSource trait - capture device abstraction
//!
//! Decouples the publisher from concrete capture hardware. Real cameras and
//! the synthetic test source implement the same interface.

use std::sync::Arc;

use crate::{ContractError, Frame};

/// Frame delivery callback
///
/// Invoked synchronously once per completed frame from the source's single
/// delivery path, so `FnMut` is enough: there is never a second caller.
pub type FrameCallback = Box<dyn FnMut(Frame<'_>) + Send>;

/// Side channel for stamping overlay text into upcoming frames
///
/// Fire-and-forget: the source applies the text to the *next* frame it
/// produces. Not required for correctness of the publish path.
pub trait AnnotationTarget: Send + Sync {
    /// Replace the pending annotation text
    fn set_annotation(&self, text: String);
}

/// Capture source trait
///
/// # Example
///
/// ```ignore
/// let mut source: Box<dyn FrameSource> = build_source();
/// source.start(publisher.into_callback())?;
/// // ... block until interrupted ...
/// source.stop();
/// ```
pub trait FrameSource: Send {
    /// Source name (used for logging)
    fn name(&self) -> &str;

    /// Begin delivering frames to `callback`
    ///
    /// # Errors
    /// `SourceAlreadyRunning` if called while the source is running.
    fn start(&mut self, callback: FrameCallback) -> Result<(), ContractError>;

    /// Stop delivering frames
    ///
    /// Must not return until the delivery path has finished its last
    /// callback; sockets owned by the callback are released afterwards.
    fn stop(&mut self);

    /// Whether frames are currently being delivered
    fn is_running(&self) -> bool;

    /// Annotation side channel, if the source supports overlays
    fn annotation_target(&self) -> Option<Arc<dyn AnnotationTarget>> {
        None
    }
}
