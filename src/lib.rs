//! Presence Monitor
//!
//! Watches a live RTSP camera stream, runs an object detector on every frame
//! and decides whether a person is inside a fixed rectangular region of
//! interest (ROI). The decision is drawn onto the frame and a status line is
//! logged every `status.interval` processed frames.
//!
//! # Module Structure
//!
//! - `config`: layered configuration (file, environment, validation)
//! - `ingest`: frame sources (RTSP via GStreamer or FFmpeg, synthetic `stub://`)
//! - `detect`: detector backends and YOLO output decoding
//! - `presence`: ROI overlap decision and status throttling
//! - `overlay` / `display`: annotation and the optional preview window
//! - `monitor`: the frame loop

pub mod config;
#[cfg(any(feature = "backend-opencv", feature = "display-opencv"))]
mod cv;
pub mod detect;
pub mod display;
pub mod frame;
pub mod ingest;
pub mod monitor;
pub mod overlay;
pub mod presence;
pub mod roi;
pub mod ui;

pub use config::{ConfigError, MonitorConfig};
pub use detect::{load_detector, BackendKind, Detection, Detector, ModelAssets};
pub use frame::Frame;
pub use ingest::{FrameSource, RtspConfig, RtspSource};
pub use monitor::{ExitReason, PresenceMonitor, SessionReport, ShutdownFlag};
pub use presence::{evaluate, ClassFilter, PresenceState, PresenceStatus, StatusLogger, StatusMode};
pub use roi::Rect;
