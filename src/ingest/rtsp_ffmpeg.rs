//! RTSP decoding through FFmpeg.

use anyhow::{Context, Result};
use ffmpeg_next as ffmpeg;
use std::time::{Duration, Instant};

use super::redact_url;
use super::rtsp::RtspConfig;
use crate::frame::Frame;

pub(crate) struct FfmpegRtspSource {
    config: RtspConfig,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    last_frame_at: Option<Instant>,
    connected_at: Option<Instant>,
    last_error: Option<String>,
    /// Set once the demuxer is exhausted and the decoder has been told so.
    draining: bool,
}

impl FfmpegRtspSource {
    pub(crate) fn new(config: RtspConfig) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        ffmpeg::format::network::init();

        let mut options = ffmpeg::Dictionary::new();
        options.set("rtsp_transport", "tcp");
        let input = ffmpeg::format::input_with_dictionary(&config.url, options)
            .with_context(|| format!("failed to open stream {}", redact_url(&config.url)))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow::anyhow!("stream has no video track"))?;
        let stream_index = input_stream.index();
        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .context("load video decoder parameters")?;
        let decoder = context
            .decoder()
            .video()
            .context("open ffmpeg video decoder")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        Ok(Self {
            config,
            input,
            stream_index,
            decoder,
            scaler,
            last_frame_at: None,
            connected_at: None,
            last_error: None,
            draining: false,
        })
    }

    pub(crate) fn connect(&mut self) -> Result<()> {
        self.connected_at = Some(Instant::now());
        log::info!(
            "RtspSource: connected to {} (ffmpeg)",
            redact_url(&self.config.url)
        );
        Ok(())
    }

    pub(crate) fn url(&self) -> &str {
        &self.config.url
    }

    /// `Ok(None)` once the demuxer runs out of packets and every frame still
    /// buffered in the decoder has been returned.
    pub(crate) fn next_frame(&mut self, sequence: u64) -> Result<Option<Frame>> {
        loop {
            if let Some(frame) = self.receive_frame(sequence)? {
                return Ok(Some(frame));
            }
            if self.draining {
                log::info!("RtspSource: end of stream");
                return Ok(None);
            }

            let stream_index = self.stream_index;
            let packet = self
                .input
                .packets()
                .find(|(stream, _)| stream.index() == stream_index)
                .map(|(_, packet)| packet);
            let sent = match packet {
                Some(packet) => self.decoder.send_packet(&packet),
                None => {
                    self.draining = true;
                    self.decoder.send_eof()
                }
            };
            if let Err(err) = sent {
                self.last_error = Some(err.to_string());
                return Err(err).context("send packet to ffmpeg decoder");
            }
        }
    }

    /// Next decoded frame, if the decoder has one ready.
    fn receive_frame(&mut self, sequence: u64) -> Result<Option<Frame>> {
        let mut decoded = ffmpeg::frame::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }
        let mut rgb_frame = ffmpeg::frame::Video::empty();
        self.scaler
            .run(&decoded, &mut rgb_frame)
            .context("scale frame to RGB")?;
        let (pixels, width, height) = frame_to_pixels(&rgb_frame)?;
        self.last_frame_at = Some(Instant::now());
        Frame::from_rgb(pixels, width, height, sequence).map(Some)
    }

    pub(crate) fn is_healthy(&self) -> bool {
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

    fn health_grace(&self) -> Duration {
        let base_ms = if self.config.target_fps == 0 {
            2_000
        } else {
            (1000 / self.config.target_fps).saturating_mul(6)
        };
        Duration::from_millis(base_ms.max(2_000) as u64)
    }
}

fn frame_to_pixels(frame: &ffmpeg::frame::Video) -> Result<(Vec<u8>, u32, u32)> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let end = start + row_bytes;
        pixels.extend_from_slice(
            data.get(start..end)
                .context("ffmpeg frame row is out of bounds")?,
        );
    }

    Ok((pixels, width, height))
}
