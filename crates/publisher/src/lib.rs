//! # Publisher
//!
//! Frame publication: turns frames delivered by a capture device into
//! `topic ‖ LE64(frame_index) ‖ payload` messages and writes each one to a
//! fixed group of publish endpoints.
//!
//! ## Core Types
//! - `FramePublisher`: per-frame callback (annotate, filter, encode, fan out)
//! - `SocketGroup`: ordered set of N identical endpoints
//! - `TcpPubSocket`: non-blocking TCP publish endpoint
//! - `Subscriber`: reference client for one endpoint

mod annotate;
mod error;
mod filter;
mod metrics;
mod publisher;
mod socket;
mod subscriber;
mod tcp;

pub use annotate::{Annotator, Clock, MetadataAnnotator};
pub use error::PublisherError;
pub use filter::{drop_every_nth, DropEveryNth, FrameFilter, KeepAll};
pub use metrics::{MetricsSnapshot, PublisherMetrics};
pub use publisher::{FrameOutcome, FramePublisher, FramePublisherBuilder};
pub use socket::{FanOutReport, PubSocket, SocketGroup};
pub use subscriber::{Subscriber, DEFAULT_MAX_MESSAGE_LEN};
pub use tcp::{SocketGroupConfig, SubscriberProbe, TcpPubSocket, MAX_MESSAGE_LEN};
