#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;
use crate::detect::vocabulary::Vocabulary;
use crate::detect::yolo::{decode_yolov8, rgb_to_planar_input, DecodeParams};
use crate::frame::Frame;

/// Tract-based backend for YOLOv8 ONNX exports.
///
/// Loads a local model file once and runs it on every frame. Frames are
/// resized to the model input; boxes are mapped back to frame pixels.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>,
    vocabulary: Vocabulary,
    input_width: u32,
    input_height: u32,
    confidence_threshold: f32,
    iou_threshold: f32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        input_width: u32,
        input_height: u32,
        vocabulary: Vocabulary,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, input_height as usize, input_width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            vocabulary,
            input_width,
            input_height,
            confidence_threshold: 0.25,
            iou_threshold: 0.7,
        })
    }

    /// Override the default confidence and NMS IoU thresholds.
    pub fn with_thresholds(mut self, confidence: f32, iou: f32) -> Self {
        self.confidence_threshold = confidence;
        self.iou_threshold = iou;
        self
    }

    fn build_input(&self, frame: &Frame) -> Result<Tensor> {
        let planar = rgb_to_planar_input(
            frame.pixels(),
            frame.width,
            frame.height,
            self.input_width,
            self.input_height,
        )?;
        let input = tract_ndarray::Array4::from_shape_vec(
            (1, 3, self.input_height as usize, self.input_width as usize),
            planar,
        )
        .context("failed to shape model input")?;
        Ok(input.into_tensor())
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let shape = view.shape().to_vec();
        let values: Vec<f32> = view.iter().copied().collect();

        decode_yolov8(
            &values,
            &shape,
            &self.vocabulary,
            &DecodeParams {
                confidence_threshold: self.confidence_threshold,
                iou_threshold: self.iou_threshold,
                input_width: self.input_width,
                input_height: self.input_height,
                frame_width: frame.width,
                frame_height: frame.height,
            },
        )
    }

    fn warm_up(&mut self) -> Result<()> {
        let blank = Frame::filled(self.input_width, self.input_height, [114, 114, 114], 0)?;
        let dets = self.detect(&blank).context("model warm-up inference failed")?;
        log::debug!("TractBackend: warm-up produced {} detections", dets.len());
        Ok(())
    }
}
