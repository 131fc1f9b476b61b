//! RTSP frame source.
//!
//! `RtspSource` decodes camera streams into RGB24 `Frame`s. `stub://` URLs are
//! served by a synthetic generator so the whole pipeline can run without a
//! camera. Real URLs need the `rtsp-gstreamer` or `rtsp-ffmpeg` feature.

use anyhow::Result;
#[cfg(feature = "rtsp-gstreamer")]
use anyhow::Context;
#[cfg(feature = "rtsp-gstreamer")]
use std::time::{Duration, Instant};

use super::{redact_url, FrameSource, SourceStats};
use crate::frame::Frame;
#[cfg(feature = "rtsp-ffmpeg")]
use super::rtsp_ffmpeg::FfmpegRtspSource;

/// Configuration for an RTSP source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RtspConfig {
    /// RTSP URL (e.g., "rtsp://192.168.1.100:554/stream")
    pub url: String,
    /// Expected frame rate; only used to size read timeouts.
    pub target_fps: u32,
    /// Frame width for synthetic frames.
    pub width: u32,
    /// Frame height for synthetic frames.
    pub height: u32,
    /// Report end-of-stream after this many frames.
    pub frame_limit: Option<u64>,
}

impl Default for RtspConfig {
    fn default() -> Self {
        Self {
            url: "rtsp://localhost:554/stream".to_string(),
            target_fps: 10,
            width: 640,
            height: 480,
            frame_limit: None,
        }
    }
}

/// RTSP frame source.
pub struct RtspSource {
    backend: RtspBackend,
    frame_limit: Option<u64>,
    frames_read: u64,
    closed: bool,
}

enum RtspBackend {
    Synthetic(SyntheticRtspSource),
    #[cfg(feature = "rtsp-gstreamer")]
    Gstreamer(GstreamerRtspSource),
    #[cfg(feature = "rtsp-ffmpeg")]
    Ffmpeg(FfmpegRtspSource),
}

impl RtspSource {
    /// Open and connect to the stream. Fails if the stream cannot be opened.
    pub fn open(config: RtspConfig) -> Result<Self> {
        let frame_limit = config.frame_limit;
        let backend = if config.url.starts_with("stub://") {
            RtspBackend::Synthetic(SyntheticRtspSource::new(config))
        } else {
            Self::network_backend(config)?
        };
        let mut source = Self {
            backend,
            frame_limit,
            frames_read: 0,
            closed: false,
        };
        source.connect()?;
        Ok(source)
    }

    /// GStreamer wins when both decoders are compiled in.
    #[cfg(feature = "rtsp-gstreamer")]
    fn network_backend(config: RtspConfig) -> Result<RtspBackend> {
        Ok(RtspBackend::Gstreamer(GstreamerRtspSource::new(config)?))
    }

    #[cfg(all(feature = "rtsp-ffmpeg", not(feature = "rtsp-gstreamer")))]
    fn network_backend(config: RtspConfig) -> Result<RtspBackend> {
        Ok(RtspBackend::Ffmpeg(FfmpegRtspSource::new(config)?))
    }

    #[cfg(not(any(feature = "rtsp-gstreamer", feature = "rtsp-ffmpeg")))]
    fn network_backend(config: RtspConfig) -> Result<RtspBackend> {
        anyhow::bail!(
            "cannot open {}: RTSP requires the rtsp-gstreamer or rtsp-ffmpeg feature",
            redact_url(&config.url)
        )
    }

    fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            RtspBackend::Synthetic(source) => source.connect(),
            #[cfg(feature = "rtsp-gstreamer")]
            RtspBackend::Gstreamer(source) => source.connect(),
            #[cfg(feature = "rtsp-ffmpeg")]
            RtspBackend::Ffmpeg(source) => source.connect(),
        }
    }

    /// Check if the source is healthy.
    pub fn is_healthy(&self) -> bool {
        if self.closed {
            return false;
        }
        match &self.backend {
            RtspBackend::Synthetic(_) => true,
            #[cfg(feature = "rtsp-gstreamer")]
            RtspBackend::Gstreamer(source) => source.is_healthy(),
            #[cfg(feature = "rtsp-ffmpeg")]
            RtspBackend::Ffmpeg(source) => source.is_healthy(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl FrameSource for RtspSource {
    fn read(&mut self) -> Result<Option<Frame>> {
        if self.closed {
            anyhow::bail!("RTSP source is closed");
        }
        if self.frame_limit.is_some_and(|limit| self.frames_read >= limit) {
            return Ok(None);
        }
        let sequence = self.frames_read + 1;
        let frame = match &mut self.backend {
            RtspBackend::Synthetic(source) => source.next_frame(sequence)?,
            #[cfg(feature = "rtsp-gstreamer")]
            RtspBackend::Gstreamer(source) => source.next_frame(sequence)?,
            #[cfg(feature = "rtsp-ffmpeg")]
            RtspBackend::Ffmpeg(source) => source.next_frame(sequence)?,
        };
        if frame.is_some() {
            self.frames_read = sequence;
        }
        Ok(frame)
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        match &mut self.backend {
            RtspBackend::Synthetic(_) => {}
            #[cfg(feature = "rtsp-gstreamer")]
            RtspBackend::Gstreamer(source) => source.close(),
            #[cfg(feature = "rtsp-ffmpeg")]
            RtspBackend::Ffmpeg(_) => {}
        }
        let stats = self.stats();
        log::info!(
            "RtspSource: released {} after {} frames",
            stats.url,
            stats.frames_captured
        );
    }

    fn stats(&self) -> SourceStats {
        let url = match &self.backend {
            RtspBackend::Synthetic(source) => &source.config.url,
            #[cfg(feature = "rtsp-gstreamer")]
            RtspBackend::Gstreamer(source) => &source.config.url,
            #[cfg(feature = "rtsp-ffmpeg")]
            RtspBackend::Ffmpeg(source) => source.url(),
        };
        SourceStats {
            frames_captured: self.frames_read,
            healthy: self.is_healthy(),
            url: redact_url(url),
        }
    }
}

impl Drop for RtspSource {
    fn drop(&mut self) {
        self.close();
    }
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests
// ----------------------------------------------------------------------------

struct SyntheticRtspSource {
    config: RtspConfig,
}

impl SyntheticRtspSource {
    fn new(config: RtspConfig) -> Self {
        Self { config }
    }

    /// Synthetic sources are always "connected".
    fn connect(&mut self) -> Result<()> {
        log::info!("RtspSource: connected to {} (synthetic)", self.config.url);
        Ok(())
    }

    fn next_frame(&mut self, sequence: u64) -> Result<Option<Frame>> {
        let pixels = self.generate_synthetic_pixels(sequence);
        Frame::from_rgb(pixels, self.config.width, self.config.height, sequence).map(Some)
    }

    /// Diagonal gradient that shifts by one step per frame.
    fn generate_synthetic_pixels(&self, sequence: u64) -> Vec<u8> {
        let pixel_count = (self.config.width * self.config.height * 3) as usize;
        (0..pixel_count)
            .map(|i| ((i as u64 + sequence) % 256) as u8)
            .collect()
    }
}

// ----------------------------------------------------------------------------
// Production RTSP source using GStreamer
// ----------------------------------------------------------------------------

#[cfg(feature = "rtsp-gstreamer")]
struct GstreamerRtspSource {
    config: RtspConfig,
    pipeline: gstreamer::Pipeline,
    appsink: gstreamer_app::AppSink,
    last_frame_at: Option<Instant>,
    connected_at: Option<Instant>,
    last_error: Option<String>,
}

#[cfg(feature = "rtsp-gstreamer")]
impl GstreamerRtspSource {
    /// Pipeline: rtspsrc ! decodebin ! videoconvert ! appsink (RGB).
    fn new(config: RtspConfig) -> Result<Self> {
        use gstreamer::prelude::*;

        gstreamer::init().context("initialize gstreamer")?;

        let pipeline_description = format!(
            "rtspsrc location={} latency=0 ! decodebin ! videoconvert ! video/x-raw,format=RGB ! \
             appsink name=appsink sync=false max-buffers=1 drop=true",
            config.url
        );
        let pipeline = gstreamer::parse::launch(&pipeline_description)
            .context("build RTSP pipeline")?
            .downcast::<gstreamer::Pipeline>()
            .map_err(|_| anyhow::anyhow!("RTSP pipeline is not a Pipeline"))?;

        let appsink = pipeline
            .by_name("appsink")
            .context("appsink element missing from pipeline")?
            .downcast::<gstreamer_app::AppSink>()
            .map_err(|_| anyhow::anyhow!("appsink element has unexpected type"))?;

        let caps = gstreamer::Caps::builder("video/x-raw")
            .field("format", "RGB")
            .build();
        appsink.set_caps(Some(&caps));
        appsink.set_max_buffers(1);
        appsink.set_drop(true);
        appsink.set_sync(false);

        Ok(Self {
            config,
            pipeline,
            appsink,
            last_frame_at: None,
            connected_at: None,
            last_error: None,
        })
    }

    fn connect(&mut self) -> Result<()> {
        use gstreamer::prelude::*;

        self.pipeline
            .set_state(gstreamer::State::Playing)
            .with_context(|| format!("open stream {}", redact_url(&self.config.url)))?;
        self.connected_at = Some(Instant::now());
        log::info!("RtspSource: connected to {}", redact_url(&self.config.url));
        Ok(())
    }

    fn next_frame(&mut self, sequence: u64) -> Result<Option<Frame>> {
        self.poll_bus();
        if let Some(err) = &self.last_error {
            anyhow::bail!("{}", err);
        }

        let timeout = self.frame_timeout();
        let Some(sample) = self
            .appsink
            .try_pull_sample(gstreamer::ClockTime::from_mseconds(timeout.as_millis() as u64))
        else {
            if self.appsink.is_eos() {
                return Ok(None);
            }
            anyhow::bail!("RTSP stream stalled");
        };

        let (pixels, width, height) = sample_to_pixels(&sample)?;
        self.last_frame_at = Some(Instant::now());
        Frame::from_rgb(pixels, width, height, sequence).map(Some)
    }

    fn close(&mut self) {
        use gstreamer::prelude::*;

        if let Err(err) = self.pipeline.set_state(gstreamer::State::Null) {
            log::warn!("RtspSource: failed to stop pipeline: {}", err);
        }
    }

    fn is_healthy(&self) -> bool {
        if self.last_error.is_some() {
            return false;
        }
        let Some(connected_at) = self.connected_at else {
            return false;
        };
        let Some(last_frame_at) = self.last_frame_at else {
            return connected_at.elapsed() <= Duration::from_secs(5);
        };
        last_frame_at.elapsed() <= self.health_grace()
    }

    fn frame_timeout(&self) -> Duration {
        let base_ms = if self.config.target_fps == 0 {
            500
        } else {
            (1000 / self.config.target_fps).saturating_mul(4)
        };
        Duration::from_millis(base_ms.max(500) as u64)
    }

    fn health_grace(&self) -> Duration {
        let base_ms = if self.config.target_fps == 0 {
            2_000
        } else {
            (1000 / self.config.target_fps).saturating_mul(6)
        };
        Duration::from_millis(base_ms.max(2_000) as u64)
    }

    fn poll_bus(&mut self) {
        use gstreamer::prelude::*;

        let Some(bus) = self.pipeline.bus() else {
            return;
        };
        while let Some(message) = bus.timed_pop(gstreamer::ClockTime::ZERO) {
            use gstreamer::MessageView;
            match message.view() {
                MessageView::Error(err) => {
                    self.last_error = Some(format!(
                        "gstreamer error from {:?}: {}",
                        err.src().map(|s| s.path_string()),
                        err.error()
                    ));
                }
                MessageView::Eos(..) => {
                    log::info!("RtspSource: end of stream");
                }
                _ => {}
            }
        }
    }
}

#[cfg(feature = "rtsp-gstreamer")]
fn sample_to_pixels(sample: &gstreamer::Sample) -> Result<(Vec<u8>, u32, u32)> {
    let buffer = sample.buffer().context("RTSP sample missing buffer")?;
    let caps = sample.caps().context("RTSP sample missing caps")?;
    let info =
        gstreamer_video::VideoInfo::from_caps(caps).context("parse RTSP caps as video info")?;

    let width = info.width();
    let height = info.height();
    let row_bytes = (width as usize) * 3;
    let stride = info.stride()[0] as usize;

    let map = buffer.map_readable().context("map RTSP buffer")?;
    let data = map.as_slice();

    if stride == row_bytes {
        return Ok((data[..row_bytes * height as usize].to_vec(), width, height));
    }

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let end = start + row_bytes;
        pixels.extend_from_slice(
            data.get(start..end)
                .context("RTSP buffer row is out of bounds")?,
        );
    }

    Ok((pixels, width, height))
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_config() -> RtspConfig {
        RtspConfig {
            url: "stub://test".to_string(),
            target_fps: 10,
            width: 64,
            height: 48,
            frame_limit: None,
        }
    }

    #[test]
    fn rtsp_source_produces_frames() -> Result<()> {
        let mut source = RtspSource::open(stub_config())?;

        let frame = source.read()?.expect("frame");
        assert_eq!(frame.width, 64);
        assert_eq!(frame.height, 48);
        assert_eq!(frame.sequence, 1);
        assert_eq!(source.read()?.expect("frame").sequence, 2);
        assert_eq!(source.stats().frames_captured, 2);
        assert!(source.stats().healthy);

        Ok(())
    }

    #[test]
    fn frame_limit_ends_stream() -> Result<()> {
        let mut source = RtspSource::open(RtspConfig {
            frame_limit: Some(3),
            ..stub_config()
        })?;
        for _ in 0..3 {
            assert!(source.read()?.is_some());
        }
        assert!(source.read()?.is_none());
        assert!(source.read()?.is_none());
        Ok(())
    }

    #[test]
    fn close_is_idempotent_and_stops_reads() -> Result<()> {
        let mut source = RtspSource::open(stub_config())?;
        assert!(source.is_healthy());
        source.close();
        source.close();
        assert!(source.is_closed());
        assert!(!source.is_healthy());
        assert!(!source.stats().healthy);
        assert!(source.read().is_err());
        Ok(())
    }

    #[cfg(not(any(feature = "rtsp-gstreamer", feature = "rtsp-ffmpeg")))]
    #[test]
    fn real_urls_need_a_decoder_feature() {
        let err = RtspSource::open(RtspConfig {
            url: "rtsp://user:pw@10.0.0.2/stream".to_string(),
            ..stub_config()
        })
        .err()
        .expect("no decoder compiled in");
        let message = err.to_string();
        assert!(message.contains("rtsp-gstreamer"));
        assert!(!message.contains("pw"));
    }
}
