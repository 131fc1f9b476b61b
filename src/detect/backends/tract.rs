#![cfg(feature = "backend-tract")]

use anyhow::{anyhow, Context, Result};
use image::{imageops, RgbImage};
use tract_onnx::prelude::*;

use crate::detect::backend::{Detector, ModelAssets};
use crate::detect::classes::ClassVocabulary;
use crate::detect::result::Detection;
use crate::detect::yolo;
use crate::frame::Frame;

/// Tract-based backend for an ONNX export of the detector.
///
/// `ModelAssets::weights` points at the `.onnx` file. The model must emit YOLO
/// rows shaped `[1, N, 5 + classes]` (or `[N, 5 + classes]`).
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    input_size: u32,
    vocabulary: ClassVocabulary,
}

impl TractBackend {
    fn build_input(&self, frame: &Frame) -> Result<Tensor> {
        let image = RgbImage::from_raw(frame.width, frame.height, frame.pixels().to_vec())
            .ok_or_else(|| anyhow!("frame buffer does not match its dimensions"))?;
        let resized = imageops::resize(
            &image,
            self.input_size,
            self.input_size,
            imageops::FilterType::Triangle,
        );

        let size = self.input_size as usize;
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, size, size), |(_, c, y, x)| {
            resized.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
        });
        Ok(input.into_tensor())
    }
}

impl Detector for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn initialize(assets: &ModelAssets) -> Result<Self> {
        ModelAssets::require_file(&assets.weights, "ONNX model")?;
        let vocabulary = ClassVocabulary::load(&assets.classes)?;
        let size = assets.input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(&assets.weights)
            .with_context(|| {
                format!("failed to load ONNX model from {}", assets.weights.display())
            })?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, size, size)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        log::info!("loaded ONNX model {}", assets.weights.display());

        Ok(Self {
            model,
            input_size: assets.input_size,
            vocabulary,
        })
    }

    fn infer(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let rows = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let row_len = *rows
            .shape()
            .last()
            .ok_or_else(|| anyhow!("model output is a scalar"))?;
        let data: Vec<f32> = rows.iter().copied().collect();
        yolo::decode_rows(&data, row_len, &self.vocabulary, frame.width, frame.height)
    }

    fn vocabulary(&self) -> Option<&ClassVocabulary> {
        Some(&self.vocabulary)
    }
}
