//! presence_monitor - report whether a person is inside a fixed ROI of an
//! RTSP camera stream.
//!
//! Configuration comes from `MONITOR_CONFIG` / `--config`, then the
//! environment (`RTSP_URL`, `ROI_X1`..`ROI_Y2`, ...), then the flags below.
//! Configuration and model load failures exit non-zero before the stream is
//! opened. Stream failures end the run normally.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use presence_monitor::config::CONFIG_PATH_ENV;
use presence_monitor::display::open_display;
use presence_monitor::ui::{Ui, UiMode};
use presence_monitor::{
    load_detector, monitor, BackendKind, Detector, MonitorConfig, ShutdownFlag,
};

#[derive(Parser, Debug)]
#[command(
    name = "presence_monitor",
    about = "Detect a person inside a fixed region of an RTSP camera stream"
)]
struct Args {
    /// JSON or TOML config file
    #[arg(long, value_name = "PATH", env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    /// Detector backend (overrides DETECTOR_BACKEND)
    #[arg(long, value_enum)]
    backend: Option<BackendKind>,

    /// Run without a preview window
    #[arg(long)]
    headless: bool,

    /// Stop after this many frames
    #[arg(long, value_name = "N")]
    frame_limit: Option<u64>,

    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, value_enum, default_value = "auto", value_name = "MODE")]
    ui: UiMode,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let ui = Ui::new(args.ui, std::io::stderr().is_terminal());

    let mut cfg = MonitorConfig::load_from(args.config.as_deref())?;
    if let Some(backend) = args.backend {
        cfg.detection.backend = backend;
    }
    if args.headless {
        cfg.display.enabled = false;
    }
    if let Some(limit) = args.frame_limit {
        cfg.rtsp.frame_limit = Some(limit);
    }
    cfg.validate()?;

    log::info!(
        "monitoring ROI {} for '{}' (confidence > {}), backend={}",
        cfg.roi,
        cfg.detection.class_filter,
        cfg.detection.confidence_threshold,
        cfg.detection.backend
    );

    let mut detector = {
        let _stage = ui.stage("load model");
        load_detector(cfg.detection.backend, &cfg.model)
            .with_context(|| format!("loading {} detector", cfg.detection.backend))?
    };
    log::info!("detector ready: {}", detector.name());

    let shutdown = ShutdownFlag::new();
    shutdown.install_ctrlc_handler()?;

    let mut display = match open_display(&cfg.display) {
        Ok(display) => display,
        Err(err) => {
            log::error!("could not open display window: {:#}", err);
            return Ok(());
        }
    };
    let report = monitor::run(
        &cfg,
        &ui,
        detector.as_mut(),
        display.as_mut(),
        &shutdown,
    );

    if report.exit.is_failure() {
        log::warn!("run ended early after {} frames", report.frames_processed);
    }
    Ok(())
}
