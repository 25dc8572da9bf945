use crate::classifier::{ClassifierError, ClassifierResult, HeadPoseClassifier};
use crate::config::Thresholds;
use crate::detector::{planar_input, square_crop, try_load_session, SharedFaceDetector};
use crate::types::{Frame, HeadAngles, HeadDirection};
use anyhow::Result;
use image::imageops::FilterType;
use ort::session::Session;
use std::path::Path;

const INPUT: u32 = 224;

/// WHENet head pose regression over the detected face.
pub struct WhenetHeadPose {
    session: Option<Session>,
    detector: SharedFaceDetector,
    yaw_limit: f32,
    pitch_limit: f32,
}

impl WhenetHeadPose {
    pub fn new(model_path: &Path, detector: SharedFaceDetector, thresholds: &Thresholds) -> Result<Self> {
        Ok(Self {
            session: try_load_session(model_path, "Head Pose")?,
            detector,
            yaw_limit: thresholds.head_yaw_deg,
            pitch_limit: thresholds.head_pitch_deg,
        })
    }
}

impl HeadPoseClassifier for WhenetHeadPose {
    fn name(&self) -> String {
        "Head Pose (WHENet)".to_string()
    }

    fn estimate(&mut self, frame: &Frame) -> ClassifierResult<HeadAngles> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| ClassifierError::ModelUnavailable("head pose".into()))?;

        let face = self.detector.borrow_mut().detect(frame)?;
        let roi = square_crop(&face, 0.2, frame.width(), frame.height());
        let crop = image::imageops::crop_imm(frame, roi.x as u32, roi.y as u32, roi.width as u32, roi.height as u32)
            .to_image();
        let resized = image::imageops::resize(&crop, INPUT, INPUT, FilterType::Triangle);

        // ImageNet normalization
        let mean = [0.485, 0.456, 0.406];
        let std = [0.229, 0.224, 0.225];
        let input_data = planar_input(&resized, |c, p| (p as f32 / 255.0 - mean[c]) / std[c]);

        let input = ort::value::Tensor::from_array((vec![1, 3, INPUT as usize, INPUT as usize], input_data))?;
        let outputs = session.run(ort::inputs![input])?;

        // Output order: yaw, roll, pitch
        let (_, yaw_logits) = outputs[0].try_extract_tensor::<f32>()?;
        let (_, roll_logits) = outputs[1].try_extract_tensor::<f32>()?;
        let (_, pitch_logits) = outputs[2].try_extract_tensor::<f32>()?;

        // Yaw: 120 bins, -180..180 step 3. Pitch/roll: 66 bins, -99..99 step 3.
        let yaw = expectation(&softmax(yaw_logits), -180.0, 3.0);
        let pitch = expectation(&softmax(pitch_logits), -99.0, 3.0);
        let roll = expectation(&softmax(roll_logits), -99.0, 3.0);

        Ok(HeadAngles::new(pitch, yaw, roll))
    }

    fn classify(&mut self, frame: &Frame, baseline: &HeadAngles) -> ClassifierResult<HeadDirection> {
        let angles = self.estimate(frame)?;
        Ok(head_direction(&angles.relative_to(baseline), self.yaw_limit, self.pitch_limit))
    }
}

/// Thresholds a baseline-relative pose into a direction. Negative yaw is head left.
/// Yaw is checked first since sideways turns are the common case.
pub fn head_direction(delta: &HeadAngles, yaw_limit: f32, pitch_limit: f32) -> HeadDirection {
    if delta.yaw < -yaw_limit {
        HeadDirection::Left
    } else if delta.yaw > yaw_limit {
        HeadDirection::Right
    } else if delta.pitch > pitch_limit {
        HeadDirection::Up
    } else if delta.pitch < -pitch_limit {
        HeadDirection::Down
    } else {
        HeadDirection::AtScreen
    }
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max_logit = logits.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max_logit).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|&x| x / sum).collect()
}

fn expectation(probs: &[f32], range_min: f32, step: f32) -> f32 {
    probs
        .iter()
        .enumerate()
        .map(|(i, &p)| p * (range_min + i as f32 * step))
        .sum()
}
