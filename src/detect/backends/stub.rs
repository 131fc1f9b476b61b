use anyhow::Result;

use crate::detect::backend::{Detector, ModelAssets};
use crate::detect::result::Detection;
use crate::frame::Frame;
use crate::roi::Rect;

/// Horizontal step of the synthetic walker per frame, in pixels.
const WALKER_STEP: u32 = 8;

/// Stub backend for tests and dry runs. Needs no model files.
///
/// By default it reports a single "person" walking left to right across the
/// frame, so presence flips as the box enters and leaves the ROI. A fixed
/// per-frame script can be supplied instead; it repeats once exhausted.
pub struct StubBackend {
    script: Option<Vec<Vec<Detection>>>,
    calls: u64,
}

impl StubBackend {
    pub fn new() -> Self {
        Self {
            script: None,
            calls: 0,
        }
    }

    pub fn scripted(script: Vec<Vec<Detection>>) -> Self {
        Self {
            script: Some(script),
            calls: 0,
        }
    }

    /// Number of `infer` calls so far.
    pub fn calls(&self) -> u64 {
        self.calls
    }

    fn walker(&self, frame: &Frame) -> Vec<Detection> {
        let box_w = (frame.width / 6).max(1);
        let box_h = (frame.height / 2).max(1);
        let span = frame.width + box_w;
        let offset = ((self.calls - 1) * WALKER_STEP as u64 % span as u64) as i32;
        let x1 = offset - box_w as i32;
        let y1 = (frame.height / 4) as i32;
        vec![Detection::new(
            "person",
            0.9,
            Rect::new(x1, y1, x1 + box_w as i32, y1 + box_h as i32),
        )]
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn initialize(_assets: &ModelAssets) -> Result<Self> {
        log::info!("stub detector ready (synthetic walker)");
        Ok(Self::new())
    }

    fn infer(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        self.calls += 1;
        match &self.script {
            Some(script) if !script.is_empty() => {
                let idx = ((self.calls - 1) % script.len() as u64) as usize;
                Ok(script[idx].clone())
            }
            Some(_) => Ok(Vec::new()),
            None => Ok(self.walker(frame)),
        }
    }
}
