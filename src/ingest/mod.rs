//! Frame sources.
//!
//! A source is opened once, read until it reports end-of-stream or fails, and
//! closed. Failures are terminal: the monitor never reconnects.
//!
//! - RTSP streams through GStreamer (feature: rtsp-gstreamer)
//! - RTSP streams through FFmpeg (feature: rtsp-ffmpeg)
//! - Synthetic `stub://` source (testing and dry runs)

pub mod rtsp;
#[cfg(feature = "rtsp-ffmpeg")]
pub(crate) mod rtsp_ffmpeg;

use anyhow::Result;

use crate::frame::Frame;

pub use rtsp::{RtspConfig, RtspSource};

/// Statistics for a frame source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceStats {
    pub frames_captured: u64,
    /// False once the source is closed or has stopped delivering frames.
    pub healthy: bool,
    /// URL with any credentials removed.
    pub url: String,
}

pub trait FrameSource {
    /// Next frame, or `None` once the stream has ended.
    fn read(&mut self) -> Result<Option<Frame>>;

    /// Release the underlying stream. Calling it more than once is harmless.
    fn close(&mut self);

    fn stats(&self) -> SourceStats;
}

/// Strip `user:password@` from a URL before it is logged.
pub fn redact_url(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.to_string();
    };
    let rest = &url[scheme_end + 3..];
    let authority_end = rest.find('/').unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at) => format!("{}***@{}", &url[..scheme_end + 3], &rest[at + 1..]),
        None => url.to_string(),
    }
}
