use crate::types::{Frame, GazeDirection, HeadAngles, HeadDirection, Rect};
use thiserror::Error;

/// Why a collaborator could not produce a label for this frame.
///
/// Every variant is recoverable: the caller degrades to a neutral reading
/// and tries again on the next frame.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("model not loaded: {0}")]
    ModelUnavailable(String),
    #[error("no face found")]
    NoFace,
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("unexpected model output: {0}")]
    BadOutput(String),
}

impl From<ort::Error> for ClassifierError {
    fn from(e: ort::Error) -> Self {
        ClassifierError::Inference(e.to_string())
    }
}

pub type ClassifierResult<T> = Result<T, ClassifierError>;

pub trait GazeClassifier {
    fn name(&self) -> String;
    fn classify(&mut self, frame: &Frame) -> ClassifierResult<GazeDirection>;
}

pub trait HeadPoseClassifier {
    fn name(&self) -> String;
    /// Raw head angles, used while no baseline exists yet.
    fn estimate(&mut self, frame: &Frame) -> ClassifierResult<HeadAngles>;
    /// Head direction relative to a calibrated neutral pose.
    fn classify(&mut self, frame: &Frame, baseline: &HeadAngles) -> ClassifierResult<HeadDirection>;
}

/// One detected instance of the target object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub rect: Rect,
    pub confidence: f32,
}

pub trait ObjectClassifier {
    fn name(&self) -> String;
    /// Detections of the target object that pass the confidence gate.
    fn detect(&mut self, frame: &Frame) -> ClassifierResult<Vec<Detection>>;
}

/// The three collaborators a session consults on every frame.
pub struct Classifiers {
    pub gaze: Box<dyn GazeClassifier>,
    pub head: Box<dyn HeadPoseClassifier>,
    pub phone: Box<dyn ObjectClassifier>,
}
