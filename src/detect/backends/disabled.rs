use anyhow::Result;

use crate::detect::backend::{Detector, ModelAssets};
use crate::detect::result::Detection;
use crate::frame::Frame;

/// Inference turned off: the stream is only displayed and presence is always
/// reported missing.
#[derive(Default)]
pub struct DisabledBackend;

impl Detector for DisabledBackend {
    fn name(&self) -> &'static str {
        "none"
    }

    fn initialize(_assets: &ModelAssets) -> Result<Self> {
        log::warn!("inference disabled; the ROI will always report missing");
        Ok(Self)
    }

    fn infer(&mut self, _frame: &Frame) -> Result<Vec<Detection>> {
        Ok(Vec::new())
    }
}
