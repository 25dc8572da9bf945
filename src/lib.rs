//! Webcam proctoring: flags looking away, turning the head and phones in view,
//! writing a CSV event log and PNG snapshots.

pub mod calibration;
pub mod classifier;
pub mod config;
pub mod debounce;
pub mod detector;
pub mod evaluator;
pub mod event_log;
pub mod face_mesh;
pub mod font;
pub mod gaze;
pub mod head_pose;
pub mod phone;
pub mod presenter;
pub mod session;
pub mod types;
pub mod warning;

use anyhow::Result;
use classifier::Classifiers;
use config::AppConfig;

/// Builds the ONNX-backed classifiers named in the config.
/// Missing model files leave that classifier permanently reading "Error".
pub fn build_classifiers(config: &AppConfig) -> Result<Classifiers> {
    let models = &config.models;
    // Gaze and head pose share one face detector, so a frame is searched once
    let faces = detector::FaceDetector::shared(&models.face_detection)?;
    Ok(Classifiers {
        gaze: Box::new(gaze::PupilGaze::new(&models.face_mesh, faces.clone(), &config.thresholds)?),
        head: Box::new(head_pose::WhenetHeadPose::new(&models.head_pose, faces, &config.thresholds)?),
        phone: Box::new(phone::YoloPhoneDetector::new(&models.phone, &config.thresholds)?),
    })
}
