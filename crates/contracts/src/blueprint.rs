//! BroadcasterBlueprint - Config Loader output
//!
//! Describes the complete broadcaster setup: publish endpoints, camera
//! settings handed to the source, and debug instrumentation.
//!
//! Field aliases accept legacy key names (`zmq_topic_video`,
//! `zmq_output_port`, ...) inside their section. The sections themselves
//! are always required as tables.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete broadcaster blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcasterBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Publish endpoint settings
    pub publisher: PublisherConfig,

    /// Camera settings
    #[serde(default)]
    pub camera: CameraConfig,

    /// Test instrumentation
    #[serde(default)]
    pub debug: DebugConfig,
}

/// Publish endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Topic prefixed to every message
    #[serde(alias = "zmq_topic_video")]
    pub topic: String,

    /// First port of the endpoint range
    #[serde(alias = "zmq_output_port")]
    pub base_port: u16,

    /// Number of endpoints, each receiving an identical copy of every message
    #[serde(default = "default_duplication", alias = "camera_stream_duplication")]
    pub duplication: usize,

    /// Interface to bind on
    #[serde(default = "default_bind_host")]
    pub bind_host: IpAddr,

    /// How many messages a subscriber may lag behind before it skips ahead
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_duplication() -> usize {
    1
}

fn default_bind_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_queue_capacity() -> usize {
    64
}

impl PublisherConfig {
    /// Ports of every endpoint in the group, in fan-out order
    ///
    /// Ports past 65535 are omitted; validation rejects such configs.
    pub fn endpoint_ports(&self) -> Vec<u16> {
        (0..self.duplication)
            .map_while(|i| {
                u16::try_from(i)
                    .ok()
                    .and_then(|offset| self.base_port.checked_add(offset))
            })
            .collect()
    }
}

/// Camera settings
///
/// Handed to the frame source as-is. Sources apply what they support.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Capture rate (Hz), must be > 0
    #[serde(default = "default_framerate", alias = "camera_framerate")]
    pub framerate: f64,

    /// Frame width in pixels
    #[serde(default = "default_frame_width")]
    pub frame_width: u32,

    /// Frame height in pixels
    #[serde(default = "default_frame_height")]
    pub frame_height: u32,

    /// Sensor rotation in degrees (0, 90, 180, 270)
    #[serde(default, alias = "camera_rotation")]
    pub rotation: u16,

    /// Hostnames whose camera is mounted vertically flipped
    #[serde(default, alias = "camera_vflip")]
    pub vflip: Vec<String>,

    /// Hostnames whose camera is mounted horizontally flipped
    #[serde(default, alias = "camera_hflip")]
    pub hflip: Vec<String>,

    /// Stamp hostname and capture time into each frame
    #[serde(default, alias = "camera_annotate_metadata")]
    pub annotate_metadata: bool,

    /// Test-pattern bytes per frame (synthetic source only)
    #[serde(default = "default_payload_size")]
    pub payload_size: usize,
}

fn default_framerate() -> f64 {
    30.0
}

fn default_frame_width() -> u32 {
    640
}

fn default_frame_height() -> u32 {
    480
}

fn default_payload_size() -> usize {
    4096
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            framerate: default_framerate(),
            frame_width: default_frame_width(),
            frame_height: default_frame_height(),
            rotation: 0,
            vflip: Vec::new(),
            hflip: Vec::new(),
            annotate_metadata: false,
            payload_size: default_payload_size(),
        }
    }
}

impl CameraConfig {
    /// Resolve host-dependent settings (flip lists) for `hostname`
    pub fn settings_for_host(&self, hostname: &str) -> CameraSettings {
        CameraSettings {
            framerate: self.framerate,
            frame_width: self.frame_width,
            frame_height: self.frame_height,
            rotation: self.rotation,
            vflip: self.vflip.iter().any(|h| h == hostname),
            hflip: self.hflip.iter().any(|h| h == hostname),
            payload_size: self.payload_size,
        }
    }
}

/// Camera settings resolved for one host
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSettings {
    pub framerate: f64,
    pub frame_width: u32,
    pub frame_height: u32,
    pub rotation: u16,
    pub vflip: bool,
    pub hflip: bool,
    pub payload_size: usize,
}

impl Default for CameraSettings {
    fn default() -> Self {
        CameraConfig::default().settings_for_host("")
    }
}

/// Test instrumentation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebugConfig {
    /// Drop every frame whose index is a multiple of this value (0 disables)
    #[serde(default, alias = "debug_drop_nth_frame")]
    pub drop_nth_frame: u64,
}
