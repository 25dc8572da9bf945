use crate::classifier::{ClassifierError, ClassifierResult, Detection, ObjectClassifier};
use crate::config::Thresholds;
use crate::detector::{planar_input, try_load_session};
use crate::types::{Frame, Rect};
use anyhow::Result;
use image::imageops::FilterType;
use ort::session::Session;
use std::path::Path;

const INPUT: u32 = 640;
const NMS_IOU: f32 = 0.45;

/// YOLO detector gated to a single class (mobile phone).
///
/// Expects the ultralytics export layout `[1, 4 + classes, anchors]`
/// with center-format boxes in input pixels.
pub struct YoloPhoneDetector {
    session: Option<Session>,
    class_index: usize,
    min_confidence: f32,
}

impl YoloPhoneDetector {
    pub fn new(model_path: &Path, thresholds: &Thresholds) -> Result<Self> {
        Ok(Self {
            session: try_load_session(model_path, "Phone Detector")?,
            class_index: thresholds.phone_class,
            min_confidence: thresholds.phone_confidence,
        })
    }
}

impl ObjectClassifier for YoloPhoneDetector {
    fn name(&self) -> String {
        "Phone Detection (YOLO)".to_string()
    }

    fn detect(&mut self, frame: &Frame) -> ClassifierResult<Vec<Detection>> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| ClassifierError::ModelUnavailable("phone detection".into()))?;

        let resized = image::imageops::resize(frame, INPUT, INPUT, FilterType::Triangle);
        let input_data = planar_input(&resized, |_, p| p as f32 / 255.0);
        let input = ort::value::Tensor::from_array((vec![1, 3, INPUT as usize, INPUT as usize], input_data))?;
        let outputs = session.run(ort::inputs![input])?;
        let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;
        let dims: Vec<i64> = shape.iter().copied().collect();

        if dims.len() != 3 || dims[1] < 5 {
            return Err(ClassifierError::BadOutput(format!("unexpected YOLO output shape {:?}", dims)));
        }
        let rows = dims[1] as usize;
        let anchors = dims[2] as usize;
        if data.len() < rows * anchors {
            return Err(ClassifierError::BadOutput(format!(
                "{} values for shape {:?}",
                data.len(),
                dims
            )));
        }
        if self.class_index + 4 >= rows {
            return Err(ClassifierError::BadOutput(format!(
                "class {} not in a {}-class model",
                self.class_index,
                rows - 4
            )));
        }

        let raw = decode(data, rows, anchors, self.class_index, self.min_confidence);
        let sx = frame.width() as f32 / INPUT as f32;
        let sy = frame.height() as f32 / INPUT as f32;
        Ok(non_max_suppression(raw)
            .into_iter()
            .map(|d| Detection {
                rect: Rect::new(d.rect.x * sx, d.rect.y * sy, d.rect.width * sx, d.rect.height * sy),
                confidence: d.confidence,
            })
            .collect())
    }
}

/// Keeps anchors whose score for `class_index` reaches `min_confidence`
/// and whose best class is that one.
fn decode(data: &[f32], rows: usize, anchors: usize, class_index: usize, min_confidence: f32) -> Vec<Detection> {
    let at = |row: usize, i: usize| data[row * anchors + i];
    let mut out = Vec::new();

    for i in 0..anchors {
        let (best_class, best_score) = (4..rows)
            .map(|r| (r - 4, at(r, i)))
            .fold((0, f32::NEG_INFINITY), |acc, c| if c.1 > acc.1 { c } else { acc });
        if best_class != class_index || best_score < min_confidence {
            continue;
        }
        let (cx, cy, w, h) = (at(0, i), at(1, i), at(2, i), at(3, i));
        out.push(Detection {
            rect: Rect::new(cx - w / 2.0, cy - h / 2.0, w, h),
            confidence: best_score,
        });
    }
    out
}

fn iou(a: &Rect, b: &Rect) -> f32 {
    let x0 = a.x.max(b.x);
    let y0 = a.y.max(b.y);
    let x1 = (a.x + a.width).min(b.x + b.width);
    let y1 = (a.y + a.height).min(b.y + b.height);
    let inter = (x1 - x0).max(0.0) * (y1 - y0).max(0.0);
    let union = a.width * a.height + b.width * b.height - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

fn non_max_suppression(mut dets: Vec<Detection>) -> Vec<Detection> {
    dets.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let mut kept: Vec<Detection> = Vec::new();
    for d in dets {
        if kept.iter().all(|k| iou(&k.rect, &d.rect) < NMS_IOU) {
            kept.push(d);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    // rows: cx, cy, w, h, class0, class1 ; 3 anchors
    fn output() -> Vec<f32> {
        vec![
            100.0, 300.0, 102.0, // cx
            100.0, 300.0, 101.0, // cy
            40.0, 20.0, 40.0, // w
            80.0, 20.0, 80.0, // h
            0.92, 0.95, 0.85, // phone
            0.01, 0.10, 0.02, // other
        ]
    }

    #[test]
    fn decode_applies_class_and_confidence_gate() {
        let d = decode(&output(), 6, 3, 0, 0.8);
        assert_eq!(d.len(), 3);
        assert_eq!(d[0].rect, Rect::new(80.0, 60.0, 40.0, 80.0));

        let d = decode(&output(), 6, 3, 0, 0.9);
        assert_eq!(d.len(), 2);

        // Nothing is class 1 with enough confidence
        assert!(decode(&output(), 6, 3, 1, 0.8).is_empty());
    }

    #[test]
    fn below_threshold_is_not_a_phone() {
        let mut o = output();
        o[12] = 0.79;
        o[13] = 0.5;
        o[14] = 0.3;
        assert!(decode(&o, 6, 3, 0, 0.8).is_empty());
    }

    #[test]
    fn overlapping_boxes_collapse() {
        let d = non_max_suppression(decode(&output(), 6, 3, 0, 0.8));
        assert_eq!(d.len(), 2);
        assert!((d[0].confidence - 0.95).abs() < 1e-6);
        assert!((d[1].confidence - 0.92).abs() < 1e-6);
    }

    #[test]
    fn iou_of_disjoint_and_identical() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(iou(&a, &Rect::new(20.0, 20.0, 5.0, 5.0)), 0.0);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
    }
}
