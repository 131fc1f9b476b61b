use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use super::backend::{Detector, ModelAssets};
use super::backends::{DisabledBackend, StubBackend};

/// Detector backends selectable at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Darknet model through OpenCV DNN.
    #[value(name = "opencv")]
    #[serde(rename = "opencv")]
    OpenCv,
    /// ONNX model through tract.
    Tract,
    /// Synthetic detections, no model files.
    Stub,
    /// No inference.
    None,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::OpenCv => "opencv",
            BackendKind::Tract => "tract",
            BackendKind::Stub => "stub",
            BackendKind::None => "none",
        }
    }

    /// Whether this build was compiled with support for the backend.
    pub fn is_available(&self) -> bool {
        match self {
            BackendKind::OpenCv => cfg!(feature = "backend-opencv"),
            BackendKind::Tract => cfg!(feature = "backend-tract"),
            BackendKind::Stub | BackendKind::None => true,
        }
    }

    pub fn available() -> Vec<BackendKind> {
        [
            BackendKind::OpenCv,
            BackendKind::Tract,
            BackendKind::Stub,
            BackendKind::None,
        ]
        .into_iter()
        .filter(BackendKind::is_available)
        .collect()
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for BackendKind {
    /// The Darknet model when OpenCV is compiled in, then tract. A build with
    /// neither runs without inference.
    fn default() -> Self {
        if cfg!(feature = "backend-opencv") {
            BackendKind::OpenCv
        } else if cfg!(feature = "backend-tract") {
            BackendKind::Tract
        } else {
            BackendKind::None
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "opencv" => Ok(BackendKind::OpenCv),
            "tract" => Ok(BackendKind::Tract),
            "stub" => Ok(BackendKind::Stub),
            "none" => Ok(BackendKind::None),
            other => Err(format!("unknown detector backend '{other}'")),
        }
    }
}

/// Run the one-time initialization of the selected backend.
pub fn load_detector(kind: BackendKind, assets: &ModelAssets) -> Result<Box<dyn Detector>> {
    if !kind.is_available() {
        let compiled: Vec<&str> = BackendKind::available()
            .iter()
            .map(BackendKind::as_str)
            .collect();
        return Err(anyhow!(
            "detector backend '{}' is not compiled in (available: {})",
            kind,
            compiled.join(", ")
        ));
    }

    let detector: Box<dyn Detector> = match kind {
        #[cfg(feature = "backend-opencv")]
        BackendKind::OpenCv => Box::new(super::backends::DarknetBackend::initialize(assets)?),
        #[cfg(feature = "backend-tract")]
        BackendKind::Tract => Box::new(super::backends::TractBackend::initialize(assets)?),
        BackendKind::Stub => Box::new(StubBackend::initialize(assets)?),
        BackendKind::None => Box::new(DisabledBackend::initialize(assets)?),
        #[allow(unreachable_patterns)]
        other => return Err(anyhow!("detector backend '{}' is not compiled in", other)),
    };
    log::info!("detector backend '{}' initialized", detector.name());
    Ok(detector)
}
