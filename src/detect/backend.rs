use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

use crate::detect::classes::ClassVocabulary;
use crate::detect::result::Detection;
use crate::frame::Frame;

pub const DEFAULT_WEIGHTS_PATH: &str = "yolov4-tiny.weights";
pub const DEFAULT_NETWORK_CONFIG_PATH: &str = "yolov4-tiny.cfg";
pub const DEFAULT_CLASSES_PATH: &str = "coco.names";
pub const DEFAULT_INPUT_SIZE: u32 = 416;

/// Files a detector loads once at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelAssets {
    pub weights: PathBuf,
    /// Darknet `.cfg`. Unused by ONNX backends.
    pub network_config: PathBuf,
    /// Newline-delimited class names, indexed by model class id.
    pub classes: PathBuf,
    /// Square network input edge in pixels.
    pub input_size: u32,
}

impl Default for ModelAssets {
    fn default() -> Self {
        Self {
            weights: PathBuf::from(DEFAULT_WEIGHTS_PATH),
            network_config: PathBuf::from(DEFAULT_NETWORK_CONFIG_PATH),
            classes: PathBuf::from(DEFAULT_CLASSES_PATH),
            input_size: DEFAULT_INPUT_SIZE,
        }
    }
}

impl ModelAssets {
    /// Fails with a readable message before handing a missing path to a backend.
    pub fn require_file(path: &Path, what: &str) -> Result<()> {
        if path.is_file() {
            Ok(())
        } else {
            Err(anyhow!("{} not found at {}", what, path.display()))
        }
    }
}

/// Object detector.
///
/// Loading happens once in `initialize`; `infer` is called for every frame and
/// must not reload model state.
pub trait Detector {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Load model, weights and class vocabulary.
    fn initialize(assets: &ModelAssets) -> Result<Self>
    where
        Self: Sized;

    /// Run the model over one frame. Boxes are in frame pixel coordinates.
    fn infer(&mut self, frame: &Frame) -> Result<Vec<Detection>>;

    /// Class names the model can emit, when it loads a vocabulary file.
    fn vocabulary(&self) -> Option<&ClassVocabulary> {
        None
    }
}
