//! The frame loop: read → infer → evaluate → annotate → display.
//!
//! Single-threaded and blocking. Every failure ends the loop; nothing is
//! retried. The source and the display are closed on every exit path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::config::MonitorConfig;
use crate::detect::{Detection, Detector};
use crate::display::{Display, KeyAction};
use crate::ingest::{FrameSource, RtspSource};
use crate::overlay;
use crate::presence::{
    evaluate, evaluate_matches, filter_is_reachable, ClassFilter, PresenceState, StatusLogger,
};
use crate::roi::Rect;
use crate::ui::Ui;

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Cooperative stop request, checked once per loop iteration.
#[derive(Clone, Debug, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Route Ctrl-C to this flag. Can only be installed once per process.
    pub fn install_ctrlc_handler(&self) -> Result<()> {
        let flag = self.clone();
        ctrlc::set_handler(move || {
            log::info!("shutdown signal received, stopping after the current frame");
            flag.request();
        })
        .context("error setting Ctrl-C handler")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExitReason {
    /// Quit key or Ctrl-C.
    UserQuit,
    EndOfStream,
    OpenFailed(String),
    ReadFailed(String),
    InferenceFailed(String),
    DisplayFailed(String),
}

impl ExitReason {
    /// True for the stream/inference/display failures that cut a run short.
    pub fn is_failure(&self) -> bool {
        !matches!(self, ExitReason::UserQuit | ExitReason::EndOfStream)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionReport {
    pub frames_processed: u64,
    /// Frames on which a person was inside the ROI.
    pub frames_with_person: u64,
    pub exit: ExitReason,
}

/// Per-run presence evaluation: fixed ROI and filters plus the frame counter.
pub struct PresenceMonitor {
    roi: Rect,
    class_filter: ClassFilter,
    confidence_threshold: f32,
    state: PresenceState,
    status: StatusLogger,
    frames_with_person: u64,
}

impl PresenceMonitor {
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            roi: config.roi,
            class_filter: config.detection.class_filter.clone(),
            confidence_threshold: config.detection.confidence_threshold,
            state: PresenceState::new(),
            status: StatusLogger::new(config.status.interval, config.status.mode),
            frames_with_person: 0,
        }
    }

    /// Evaluate one frame's detections, advance the counter and emit a status
    /// line when one is due.
    pub fn process(&mut self, detections: &[Detection]) -> bool {
        let present = evaluate(
            detections,
            &self.roi,
            &self.class_filter,
            self.confidence_threshold,
        );
        self.state.record(present);
        if present {
            self.frames_with_person += 1;
        }
        self.status.report(&self.state);
        present
    }

    pub fn state(&self) -> PresenceState {
        self.state
    }

    pub fn roi(&self) -> &Rect {
        &self.roi
    }

    fn report(&self, exit: ExitReason) -> SessionReport {
        SessionReport {
            frames_processed: self.state.frame_count,
            frames_with_person: self.frames_with_person,
            exit,
        }
    }
}

/// Open the configured stream and run until it ends, fails or is stopped.
///
/// Stream failures are logged and reported in the returned `SessionReport`;
/// they are not errors of this function.
pub fn run(
    config: &MonitorConfig,
    ui: &Ui,
    detector: &mut dyn Detector,
    display: &mut dyn Display,
    shutdown: &ShutdownFlag,
) -> SessionReport {
    let mut monitor = PresenceMonitor::new(config);
    if let Some(vocabulary) = detector.vocabulary() {
        if !filter_is_reachable(&monitor.class_filter, vocabulary) {
            log::warn!(
                "class filter '{}' is not in the model's {} class names; the ROI will always report missing",
                monitor.class_filter,
                vocabulary.len()
            );
        }
    }
    let opened = {
        let _stage = ui.stage("open stream");
        RtspSource::open(config.rtsp.clone())
    };
    let mut source = match opened {
        Ok(source) => source,
        Err(err) => {
            log::error!("Error opening video stream: {:#}", err);
            display.close();
            return monitor.report(ExitReason::OpenFailed(format!("{:#}", err)));
        }
    };
    run_loop(&mut monitor, &mut source, detector, display, shutdown)
}

/// Drive an already opened source. Closes `source` and `display` before
/// returning.
pub fn run_loop<S, D, V>(
    monitor: &mut PresenceMonitor,
    source: &mut S,
    detector: &mut D,
    display: &mut V,
    shutdown: &ShutdownFlag,
) -> SessionReport
where
    S: FrameSource + ?Sized,
    D: Detector + ?Sized,
    V: Display + ?Sized,
{
    let mut last_health_log = Instant::now();

    let exit = loop {
        if shutdown.is_requested() {
            break ExitReason::UserQuit;
        }

        let frame = match source.read() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                log::info!("video stream ended");
                break ExitReason::EndOfStream;
            }
            Err(err) => {
                log::error!("Error reading frame from video stream: {:#}", err);
                break ExitReason::ReadFailed(format!("{:#}", err));
            }
        };

        let detections = match detector.infer(&frame) {
            Ok(detections) => detections,
            Err(err) => {
                log::error!("inference failed on frame {}: {:#}", frame.sequence, err);
                break ExitReason::InferenceFailed(format!("{:#}", err));
            }
        };

        let present = monitor.process(&detections);

        if display.wants_frames() {
            let matches = evaluate_matches(
                &detections,
                &monitor.class_filter,
                monitor.confidence_threshold,
            );
            let shown = overlay::annotate(frame, &monitor.roi, matches, present)
                .and_then(|annotated| display.show(&annotated));
            match shown {
                Ok(KeyAction::Continue) => {}
                Ok(KeyAction::Quit) => {
                    log::info!("quit key pressed");
                    shutdown.request();
                    break ExitReason::UserQuit;
                }
                Err(err) => {
                    log::error!("display failed: {:#}", err);
                    break ExitReason::DisplayFailed(format!("{:#}", err));
                }
            }
        }

        if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
            let stats = source.stats();
            if stats.healthy {
                log::debug!(
                    "stream {} frames={} processed={}",
                    stats.url,
                    stats.frames_captured,
                    monitor.state.frame_count
                );
            } else {
                log::warn!(
                    "stream {} unhealthy (frames={}, processed={})",
                    stats.url,
                    stats.frames_captured,
                    monitor.state.frame_count
                );
            }
            last_health_log = Instant::now();
        }
    };

    source.close();
    display.close();

    let report = monitor.report(exit);
    log::info!(
        "session finished: {} frames processed, person in ROI on {}, exit={:?}",
        report.frames_processed,
        report.frames_with_person,
        report.exit
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_flag_is_shared_between_clones() {
        let flag = ShutdownFlag::new();
        let clone = flag.clone();
        assert!(!flag.is_requested());
        clone.request();
        assert!(flag.is_requested());
    }

    #[test]
    fn failure_classification() {
        assert!(!ExitReason::UserQuit.is_failure());
        assert!(!ExitReason::EndOfStream.is_failure());
        assert!(ExitReason::ReadFailed("eof".into()).is_failure());
        assert!(ExitReason::OpenFailed("refused".into()).is_failure());
    }
}
