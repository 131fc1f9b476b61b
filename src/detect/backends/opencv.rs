#![cfg(feature = "backend-opencv")]

use anyhow::{anyhow, Context, Result};
use opencv::core::{Mat, Scalar, Size, Vector, CV_32F};
use opencv::dnn;
use opencv::prelude::*;
use std::path::Path;

use crate::detect::backend::{Detector, ModelAssets};
use crate::detect::classes::ClassVocabulary;
use crate::detect::result::Detection;
use crate::detect::yolo;
use crate::frame::Frame;

/// Darknet (YOLOv4-tiny `.cfg` + `.weights`) inference through OpenCV DNN.
pub struct DarknetBackend {
    net: dnn::Net,
    output_names: Vector<String>,
    vocabulary: ClassVocabulary,
    input_size: i32,
}

impl Detector for DarknetBackend {
    fn name(&self) -> &'static str {
        "opencv"
    }

    fn initialize(assets: &ModelAssets) -> Result<Self> {
        ModelAssets::require_file(&assets.network_config, "network config")?;
        ModelAssets::require_file(&assets.weights, "model weights")?;
        let vocabulary = ClassVocabulary::load(&assets.classes)?;

        let mut net = dnn::read_net_from_darknet(
            path_str(&assets.network_config)?,
            path_str(&assets.weights)?,
        )
        .with_context(|| {
            format!(
                "failed to load darknet model {} / {}",
                assets.network_config.display(),
                assets.weights.display()
            )
        })?;
        net.set_preferable_backend(dnn::DNN_BACKEND_DEFAULT)?;
        net.set_preferable_target(dnn::DNN_TARGET_CPU)?;
        let output_names = net
            .get_unconnected_out_layers_names()
            .context("query darknet output layers")?;

        log::info!(
            "loaded darknet model {} ({} output layers)",
            assets.weights.display(),
            output_names.len()
        );

        Ok(Self {
            net,
            output_names,
            vocabulary,
            input_size: assets.input_size as i32,
        })
    }

    fn infer(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let image = crate::cv::rgb_mat(frame)?;
        // Frame is already RGB, so no channel swap.
        let blob = dnn::blob_from_image(
            &image,
            1.0 / 255.0,
            Size::new(self.input_size, self.input_size),
            Scalar::default(),
            false,
            false,
            CV_32F,
        )?;
        self.net.set_input(&blob, "", 1.0, Scalar::default())?;

        let mut outputs: Vector<Mat> = Vector::new();
        self.net
            .forward(&mut outputs, &self.output_names)
            .context("darknet forward pass failed")?;

        let mut detections = Vec::new();
        for output in outputs {
            let data = output.data_typed::<f32>()?;
            let row_len = output.cols() as usize;
            detections.extend(yolo::decode_rows(
                data,
                row_len,
                &self.vocabulary,
                frame.width,
                frame.height,
            )?);
        }
        Ok(detections)
    }

    fn vocabulary(&self) -> Option<&ClassVocabulary> {
        Some(&self.vocabulary)
    }
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| anyhow!("path {} is not valid UTF-8", path.display()))
}
