//! Synthetic camera
//!
//! Implements `FrameSource`, generates test-pattern frames at the configured
//! rate on a background thread. Frames go through the same callback path a
//! hardware encoder would use.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use contracts::{
    AnnotationTarget, CameraSettings, ContractError, Frame, FrameCallback, FrameSource,
};
use tracing::{debug, error, trace};

/// Annotation text waiting for the next frame
#[derive(Debug, Default)]
struct PendingAnnotation {
    text: Mutex<Option<String>>,
}

impl PendingAnnotation {
    fn take(&self) -> Option<String> {
        self.text
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl AnnotationTarget for PendingAnnotation {
    fn set_annotation(&self, text: String) {
        *self.text.lock().unwrap_or_else(PoisonError::into_inner) = Some(text);
    }
}

/// Synthetic camera
///
/// Each payload is a one-line ASCII header followed by `payload_size` bytes
/// of a rolling pattern:
///
/// ```text
/// SYNTH 640x480 rot=0 vflip=0 hflip=0 idx=42 ann=<text>\n<pattern...>
/// ```
pub struct SyntheticCamera {
    name: String,
    settings: CameraSettings,
    start_index: u64,
    max_frames: Option<u64>,
    running: Arc<AtomicBool>,
    annotation: Arc<PendingAnnotation>,
    worker: Option<JoinHandle<()>>,
}

impl SyntheticCamera {
    /// Create a synthetic camera
    pub fn new(name: impl Into<String>, settings: CameraSettings) -> Self {
        Self {
            name: name.into(),
            settings,
            start_index: 0,
            max_frames: None,
            running: Arc::new(AtomicBool::new(false)),
            annotation: Arc::new(PendingAnnotation::default()),
            worker: None,
        }
    }

    /// Create a synthetic camera with default settings
    pub fn with_defaults(name: impl Into<String>) -> Self {
        Self::new(name, CameraSettings::default())
    }

    /// Index assigned to the first frame
    pub fn with_start_index(mut self, index: u64) -> Self {
        self.start_index = index;
        self
    }

    /// Stop by itself after producing `max_frames` frames
    pub fn with_max_frames(mut self, max_frames: u64) -> Self {
        self.max_frames = Some(max_frames);
        self
    }

    /// Render one frame into `buf`
    fn render_frame(
        settings: &CameraSettings,
        index: u64,
        annotation: Option<&str>,
        buf: &mut Vec<u8>,
    ) {
        buf.clear();
        let header = format!(
            "SYNTH {}x{} rot={} vflip={} hflip={} idx={} ann={}\n",
            settings.frame_width,
            settings.frame_height,
            settings.rotation,
            u8::from(settings.vflip),
            u8::from(settings.hflip),
            index,
            annotation.unwrap_or_default(),
        );
        buf.extend_from_slice(header.as_bytes());
        buf.extend((0..settings.payload_size).map(|i| (index as u8).wrapping_add(i as u8)));
    }

    fn frame_interval(&self) -> Result<Duration, ContractError> {
        let framerate = self.settings.framerate;
        if !(framerate.is_finite() && framerate > 0.0) {
            return Err(ContractError::source_start(
                &self.name,
                format!("framerate must be > 0, got {framerate}"),
            ));
        }
        Ok(Duration::from_secs_f64(1.0 / framerate))
    }

    fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.thread().unpark();
            if worker.join().is_err() {
                error!(source = %self.name, "capture thread panicked");
            }
        }
    }
}

/// Capture thread state
struct CaptureLoop {
    name: String,
    settings: CameraSettings,
    interval: Duration,
    start_index: u64,
    max_frames: Option<u64>,
    running: Arc<AtomicBool>,
    annotation: Arc<PendingAnnotation>,
}

impl CaptureLoop {
    fn run(self, mut callback: FrameCallback) {
        let mut buf = Vec::with_capacity(self.settings.payload_size + 128);
        let mut index = self.start_index;
        let mut produced: u64 = 0;
        let mut deadline = Instant::now();

        debug!(
            source = %self.name,
            framerate = self.settings.framerate,
            start_index = self.start_index,
            "synthetic camera started"
        );

        while self.running.load(Ordering::Acquire) && !self.limit_reached(produced) {
            let annotation = self.annotation.take();
            SyntheticCamera::render_frame(&self.settings, index, annotation.as_deref(), &mut buf);

            callback(Frame::new(index, &buf));

            trace!(
                source = %self.name,
                frame_index = index,
                bytes = buf.len(),
                "frame delivered"
            );

            index = index.wrapping_add(1);
            produced += 1;
            if self.limit_reached(produced) {
                break;
            }

            // A late frame does not cause a burst of catch-up frames
            deadline = (deadline + self.interval).max(Instant::now());
            self.wait_until(deadline);
        }

        self.running.store(false, Ordering::Release);
        debug!(source = %self.name, frames = produced, "synthetic camera stopped");
    }

    fn limit_reached(&self, produced: u64) -> bool {
        self.max_frames.is_some_and(|max| produced >= max)
    }

    /// Sleep until `deadline`, waking early on stop
    fn wait_until(&self, deadline: Instant) {
        while self.running.load(Ordering::Acquire) {
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            thread::park_timeout(deadline - now);
        }
    }
}

impl FrameSource for SyntheticCamera {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&mut self, callback: FrameCallback) -> Result<(), ContractError> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(ContractError::SourceAlreadyRunning {
                source_name: self.name.clone(),
            });
        }

        // Reap a worker that stopped by itself (max_frames reached)
        self.join_worker();

        let interval = match self.frame_interval() {
            Ok(interval) => interval,
            Err(e) => {
                self.running.store(false, Ordering::Release);
                return Err(e);
            }
        };

        let capture = CaptureLoop {
            name: self.name.clone(),
            settings: self.settings,
            interval,
            start_index: self.start_index,
            max_frames: self.max_frames,
            running: Arc::clone(&self.running),
            annotation: Arc::clone(&self.annotation),
        };

        let spawned = thread::Builder::new()
            .name(format!("capture-{}", self.name))
            .spawn(move || capture.run(callback));

        match spawned {
            Ok(worker) => {
                self.worker = Some(worker);
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::Release);
                Err(ContractError::source_start(&self.name, e.to_string()))
            }
        }
    }

    /// Signal the capture thread and join it
    ///
    /// Must not be called from inside the frame callback.
    fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        self.join_worker();
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn annotation_target(&self) -> Option<Arc<dyn AnnotationTarget>> {
        Some(self.annotation.clone())
    }
}

impl Drop for SyntheticCamera {
    fn drop(&mut self) {
        self.stop();
    }
}
