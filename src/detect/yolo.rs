//! YOLOv8 pre- and post-processing, independent of the inference runtime.
//!
//! The stock YOLOv8 detection head emits a `[1, 4 + classes, anchors]` tensor
//! (some exports transpose it to `[1, anchors, 4 + classes]`). Each anchor
//! carries `cx, cy, w, h` in model-input pixels followed by one score per
//! class; there is no separate objectness score.

use anyhow::{anyhow, Result};

use crate::detect::result::{BoundingBox, Detection};
use crate::detect::vocabulary::Vocabulary;
use crate::frame::RGB_CHANNELS;

/// Thresholds and geometry needed to map model output back onto a frame.
#[derive(Clone, Copy, Debug)]
pub struct DecodeParams {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub input_width: u32,
    pub input_height: u32,
    pub frame_width: u32,
    pub frame_height: u32,
}

impl DecodeParams {
    fn scale_x(&self) -> f32 {
        self.frame_width as f32 / self.input_width as f32
    }

    fn scale_y(&self) -> f32 {
        self.frame_height as f32 / self.input_height as f32
    }
}

/// Resize an RGB24 frame to the model input with nearest-neighbour sampling and
/// lay it out as normalized planar `[3, h, w]` floats.
pub fn rgb_to_planar_input(
    pixels: &[u8],
    width: u32,
    height: u32,
    input_width: u32,
    input_height: u32,
) -> Result<Vec<f32>> {
    let expected = crate::frame::expected_len(width, height)?;
    if pixels.len() != expected {
        return Err(anyhow!(
            "expected {} RGB bytes, received {}",
            expected,
            pixels.len()
        ));
    }
    if input_width == 0 || input_height == 0 {
        return Err(anyhow!("model input size must be non-zero"));
    }

    let (w, h) = (width as usize, height as usize);
    let (iw, ih) = (input_width as usize, input_height as usize);
    let plane = iw * ih;
    let mut out = vec![0f32; plane * RGB_CHANNELS];
    for y in 0..ih {
        let src_y = (y * h / ih).min(h - 1);
        for x in 0..iw {
            let src_x = (x * w / iw).min(w - 1);
            let src = (src_y * w + src_x) * RGB_CHANNELS;
            for channel in 0..RGB_CHANNELS {
                out[channel * plane + y * iw + x] = pixels[src + channel] as f32 / 255.0;
            }
        }
    }
    Ok(out)
}

/// Decode raw head output into frame-space detections, then apply per-class
/// non-maximum suppression.
pub fn decode_yolov8(
    output: &[f32],
    shape: &[usize],
    vocabulary: &Vocabulary,
    params: &DecodeParams,
) -> Result<Vec<Detection>> {
    let attrs = 4 + vocabulary.len();
    let (anchors, channels_first) = match shape {
        [1, a, n] if *a == attrs => (*n, true),
        [1, n, a] if *a == attrs => (*n, false),
        _ => {
            return Err(anyhow!(
                "unexpected detection head shape {:?} for {} classes",
                shape,
                vocabulary.len()
            ))
        }
    };
    if output.len() != attrs * anchors {
        return Err(anyhow!(
            "detection head holds {} values, shape {:?} needs {}",
            output.len(),
            shape,
            attrs * anchors
        ));
    }

    let value = |attr: usize, anchor: usize| -> f32 {
        if channels_first {
            output[attr * anchors + anchor]
        } else {
            output[anchor * attrs + attr]
        }
    };

    let (sx, sy) = (params.scale_x(), params.scale_y());
    let mut candidates = Vec::new();
    for anchor in 0..anchors {
        let mut best_class = 0usize;
        let mut best_score = f32::NEG_INFINITY;
        for class in 0..vocabulary.len() {
            let score = value(4 + class, anchor);
            if score > best_score {
                best_score = score;
                best_class = class;
            }
        }
        if !best_score.is_finite() || best_score < params.confidence_threshold {
            continue;
        }
        let Some(label) = vocabulary.label(best_class) else {
            continue;
        };

        let (cx, cy) = (value(0, anchor), value(1, anchor));
        let (bw, bh) = (value(2, anchor), value(3, anchor));
        let bbox = BoundingBox::new(
            (cx - bw / 2.0) * sx,
            (cy - bh / 2.0) * sy,
            (cx + bw / 2.0) * sx,
            (cy + bh / 2.0) * sy,
        )
        .clamped(params.frame_width, params.frame_height);
        candidates.push(Detection::new(bbox, label, best_score.min(1.0)));
    }

    Ok(non_max_suppression(candidates, params.iou_threshold))
}

/// Greedy per-label NMS. Output is sorted by descending confidence.
pub fn non_max_suppression(mut candidates: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let mut kept: Vec<Detection> = Vec::with_capacity(candidates.len());
    for cand in candidates {
        let suppressed = kept
            .iter()
            .any(|k| k.label == cand.label && k.bbox.iou(&cand.bbox) > iou_threshold);
        if !suppressed {
            kept.push(cand);
        }
    }
    kept
}
