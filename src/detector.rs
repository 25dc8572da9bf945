use crate::classifier::{ClassifierError, ClassifierResult};
use crate::types::{Frame, Rect};
use anyhow::{Context, Result};
use image::imageops::FilterType;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::cell::RefCell;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::rc::Rc;

const INPUT_W: u32 = 320;
const INPUT_H: u32 = 240;

/// Builds an ONNX session with the execution providers every model here shares.
pub fn load_session(model_path: &Path) -> Result<Session> {
    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(4)?
        .with_execution_providers([
            ort::execution_providers::CoreMLExecutionProvider::default().build(),
            ort::execution_providers::CPUExecutionProvider::default().build(),
        ])?
        .commit_from_file(model_path)
        .with_context(|| format!("Failed to load model {}", model_path.display()))?;
    Ok(session)
}

/// Loads a session if the model file exists. A missing file is reported and yields `None`.
pub fn try_load_session(model_path: &Path, what: &str) -> Result<Option<Session>> {
    if model_path.exists() {
        tracing::info!("Loading {} from {}", what, model_path.display());
        Ok(Some(load_session(model_path)?))
    } else {
        tracing::warn!("{} model not found at {}; its signal will read as Error", what, model_path.display());
        Ok(None)
    }
}

/// Planar (NCHW) float layout of an RGB image, one normalizer per channel.
pub fn planar_input(img: &Frame, norm: impl Fn(usize, u8) -> f32) -> Vec<f32> {
    let (w, h) = img.dimensions();
    let mut data = Vec::with_capacity(3 * (w * h) as usize);
    for c in 0..3 {
        for y in 0..h {
            for x in 0..w {
                data.push(norm(c, img.get_pixel(x, y)[c]));
            }
        }
    }
    data
}

/// One face detector used by every classifier that needs a face box.
pub type SharedFaceDetector = Rc<RefCell<FaceDetector>>;

/// UltraFace detector; finds the most confident face in a frame.
///
/// The outcome for the last frame seen is kept, so the gaze and head pose
/// classifiers running on the same frame pay for one inference.
pub struct FaceDetector {
    session: Option<Session>,
    anchors: Vec<(f32, f32, f32, f32)>, // cx, cy, w, h
    last: Option<(u64, Option<Rect>)>,
}

impl FaceDetector {
    pub fn new(model_path: &Path) -> Result<Self> {
        Ok(Self {
            session: try_load_session(model_path, "Face Detector")?,
            anchors: generate_anchors(INPUT_W as usize, INPUT_H as usize),
            last: None,
        })
    }

    pub fn shared(model_path: &Path) -> Result<SharedFaceDetector> {
        Ok(Rc::new(RefCell::new(Self::new(model_path)?)))
    }

    pub fn detect(&mut self, frame: &Frame) -> ClassifierResult<Rect> {
        let key = fingerprint(frame);
        if let Some((k, face)) = self.last {
            if k == key {
                return face.ok_or(ClassifierError::NoFace);
            }
        }

        let face = self.run_model(frame)?;
        self.last = Some((key, face));
        face.ok_or(ClassifierError::NoFace)
    }

    fn run_model(&mut self, frame: &Frame) -> ClassifierResult<Option<Rect>> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| ClassifierError::ModelUnavailable("face detection".into()))?;

        let resized = image::imageops::resize(frame, INPUT_W, INPUT_H, FilterType::Triangle);
        // (pixel - 127) / 128
        let input_data = planar_input(&resized, |_, p| (p as f32 - 127.0) / 128.0);

        let input_tensor = Tensor::from_array((vec![1, 3, INPUT_H as usize, INPUT_W as usize], input_data))?;
        let outputs = session.run(ort::inputs![input_tensor])?;

        let (_, scores) = outputs["scores"].try_extract_tensor::<f32>()?;
        let (_, boxes) = outputs["boxes"].try_extract_tensor::<f32>()?;

        if scores.len() < self.anchors.len() * 2 || boxes.len() < self.anchors.len() * 4 {
            return Err(ClassifierError::BadOutput(format!(
                "{} scores / {} boxes for {} anchors",
                scores.len(),
                boxes.len(),
                self.anchors.len()
            )));
        }

        // Scale back to the camera frame
        let sx = frame.width() as f32 / INPUT_W as f32;
        let sy = frame.height() as f32 / INPUT_H as f32;
        Ok(best_face(&self.anchors, scores, boxes, 0.7)
            .map(|r| Rect::new(r.x * sx, r.y * sy, r.width * sx, r.height * sy)))
    }
}

/// Content hash of a frame; equal frames give equal detections.
fn fingerprint(frame: &Frame) -> u64 {
    let mut hasher = DefaultHasher::new();
    frame.dimensions().hash(&mut hasher);
    frame.as_raw().hash(&mut hasher);
    hasher.finish()
}

fn best_face(anchors: &[(f32, f32, f32, f32)], scores: &[f32], boxes: &[f32], threshold: f32) -> Option<Rect> {
    let center_variance = 0.1;
    let size_variance = 0.2;

    let mut best_score = 0.0;
    let mut best_rect = None;

    for (i, &(ax, ay, aw, ah)) in anchors.iter().enumerate() {
        let score = scores[i * 2 + 1];
        if score <= threshold || score <= best_score {
            continue;
        }
        let cx = boxes[i * 4] * center_variance * aw + ax;
        let cy = boxes[i * 4 + 1] * center_variance * ah + ay;
        let w = (boxes[i * 4 + 2] * size_variance).exp() * aw;
        let h = (boxes[i * 4 + 3] * size_variance).exp() * ah;

        best_score = score;
        best_rect = Some(Rect::new(
            (cx - w / 2.0) * INPUT_W as f32,
            (cy - h / 2.0) * INPUT_H as f32,
            w * INPUT_W as f32,
            h * INPUT_H as f32,
        ));
    }
    best_rect
}

fn generate_anchors(width: usize, height: usize) -> Vec<(f32, f32, f32, f32)> {
    let shrinkage_list = [8, 16, 32, 64];
    let min_boxes: [&[f32]; 4] = [&[10.0, 16.0, 24.0], &[32.0, 48.0], &[64.0, 96.0], &[128.0, 192.0, 256.0]];
    let w = width as f32;
    let h = height as f32;

    let mut anchors = Vec::new();
    for (i, &shrinkage) in shrinkage_list.iter().enumerate() {
        let s = shrinkage as f32;
        let feature_h = (h / s).ceil() as usize;
        let feature_w = (w / s).ceil() as usize;

        for v in 0..feature_h {
            for u in 0..feature_w {
                let cx = (u as f32 * s + s / 2.0) / w;
                let cy = (v as f32 * s + s / 2.0) / h;
                for &min_box in min_boxes[i] {
                    anchors.push((cx, cy, min_box / w, min_box / h));
                }
            }
        }
    }
    anchors
}

/// Pads a face box into a square crop clipped to the frame.
pub fn square_crop(rect: &Rect, pad_ratio: f32, frame_w: u32, frame_h: u32) -> Rect {
    let size = rect.width.max(rect.height) * (1.0 + pad_ratio);
    let cx = rect.x + rect.width / 2.0;
    let cy = rect.y + rect.height / 2.0;

    let x = (cx - size / 2.0).max(0.0);
    let y = (cy - size / 2.0).max(0.0);
    let w = size.min(frame_w as f32 - x).max(1.0);
    let h = size.min(frame_h as f32 - y).max(1.0);
    Rect::new(x, y, w, h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ultraface_anchor_count() {
        assert_eq!(generate_anchors(320, 240).len(), 4420);
    }

    #[test]
    fn best_face_picks_highest_score_above_threshold() {
        let anchors = vec![(0.5, 0.5, 0.1, 0.1), (0.25, 0.25, 0.2, 0.2)];
        let scores = vec![0.1, 0.75, 0.05, 0.95];
        let boxes = vec![0.0; 8];
        let r = best_face(&anchors, &scores, &boxes, 0.7).unwrap();
        assert!((r.width - 0.2 * 320.0).abs() < 1e-3);
        assert!((r.x - (0.25 - 0.1) * 320.0).abs() < 1e-3);

        assert!(best_face(&anchors, &[0.0, 0.5, 0.0, 0.6], &boxes, 0.7).is_none());
    }

    #[test]
    fn square_crop_stays_in_frame() {
        let r = square_crop(&Rect::new(600.0, 400.0, 80.0, 100.0), 0.2, 640, 480);
        assert!(r.x + r.width <= 640.0);
        assert!(r.y + r.height <= 480.0);
        assert!(r.x >= 0.0 && r.y >= 0.0);
    }

    #[test]
    fn planar_input_orders_channels() {
        let mut img = Frame::new(2, 1);
        img.put_pixel(0, 0, image::Rgb([1, 2, 3]));
        img.put_pixel(1, 0, image::Rgb([4, 5, 6]));
        let v = planar_input(&img, |_, p| p as f32);
        assert_eq!(v, vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn repeated_frame_reuses_last_detection() {
        let mut det = FaceDetector::new(Path::new("does/not/exist.onnx")).unwrap();
        let mut frame = Frame::new(8, 8);
        let face = Rect::new(1.0, 1.0, 4.0, 4.0);
        det.last = Some((fingerprint(&frame), Some(face)));

        // Served from the last result, no session needed
        assert_eq!(det.detect(&frame).unwrap(), face);

        det.last = Some((fingerprint(&frame), None));
        assert!(matches!(det.detect(&frame), Err(ClassifierError::NoFace)));

        // A different frame goes back to the model
        frame.put_pixel(0, 0, image::Rgb([9, 9, 9]));
        assert!(matches!(det.detect(&frame), Err(ClassifierError::ModelUnavailable(_))));
    }

    #[test]
    fn missing_model_reports_unavailable() {
        let mut det = FaceDetector::new(Path::new("does/not/exist.onnx")).unwrap();
        let frame = Frame::new(8, 8);
        assert!(matches!(det.detect(&frame), Err(ClassifierError::ModelUnavailable(_))));
    }
}
