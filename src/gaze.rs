use crate::classifier::{ClassifierError, ClassifierResult, GazeClassifier};
use crate::config::Thresholds;
use crate::detector::SharedFaceDetector;
use crate::face_mesh::FaceMesh;
use crate::types::{Frame, GazeDirection, Landmarks, Rect};
use anyhow::Result;
use std::path::Path;

// Mesh indices: outer corner, inner corner, upper lid, lower lid
const LEFT_EYE: [usize; 4] = [33, 133, 159, 145];
const RIGHT_EYE: [usize; 4] = [263, 362, 386, 374];

// Lids sit close together; keep a usable search band
const MIN_EYE_HEIGHT: f32 = 6.0;

// =========================================================================
// Pupil Gaze: face mesh eye boxes + darkest-blob pupil centroid
// Directions are from the subject's point of view: on an unmirrored
// camera a glance to the subject's left moves the pupil to image right.
// =========================================================================
pub struct PupilGaze {
    mesh: FaceMesh,
    horizontal: f32,
    vertical: f32,
}

impl PupilGaze {
    pub fn new(mesh_path: &Path, detector: SharedFaceDetector, thresholds: &Thresholds) -> Result<Self> {
        Ok(Self {
            mesh: FaceMesh::new(mesh_path, detector)?,
            horizontal: thresholds.gaze_horizontal,
            vertical: thresholds.gaze_vertical,
        })
    }
}

impl GazeClassifier for PupilGaze {
    fn name(&self) -> String {
        "Pupil Gaze (Face Mesh + Dark Blob)".to_string()
    }

    fn classify(&mut self, frame: &Frame) -> ClassifierResult<GazeDirection> {
        let landmarks = self.mesh.landmarks(frame)?;

        let offsets: Vec<(f32, f32)> = [LEFT_EYE, RIGHT_EYE]
            .iter()
            .filter_map(|eye| {
                let b = eye_box(&landmarks, eye)?;
                pupil_offset(frame, &b)
            })
            .collect();

        if offsets.is_empty() {
            return Err(ClassifierError::BadOutput("no usable eye region".into()));
        }

        let n = offsets.len() as f32;
        let dx = offsets.iter().map(|o| o.0).sum::<f32>() / n;
        let dy = offsets.iter().map(|o| o.1).sum::<f32>() / n;
        Ok(gaze_direction(dx, dy, self.horizontal, self.vertical))
    }
}

/// Axis-aligned box spanning an eye's corners and lids.
fn eye_box(landmarks: &Landmarks, eye: &[usize; 4]) -> Option<Rect> {
    let outer = landmarks.points.get(eye[0])?;
    let inner = landmarks.points.get(eye[1])?;
    let upper = landmarks.points.get(eye[2])?;
    let lower = landmarks.points.get(eye[3])?;

    let x0 = outer.x.min(inner.x);
    let x1 = outer.x.max(inner.x);
    let cy = (upper.y + lower.y) / 2.0;
    let h = (lower.y - upper.y).abs().max(MIN_EYE_HEIGHT);
    if x1 - x0 < 2.0 {
        return None;
    }
    Some(Rect::new(x0, cy - h / 2.0, x1 - x0, h))
}

/// Pupil position inside an eye box, normalized to -1..1 on each axis
/// (0,0 is the box center, +x is image right, +y is image down).
pub fn pupil_offset(frame: &Frame, eye: &Rect) -> Option<(f32, f32)> {
    let x0 = eye.x.max(0.0) as u32;
    let y0 = eye.y.max(0.0) as u32;
    let x1 = ((eye.x + eye.width) as u32).min(frame.width());
    let y1 = ((eye.y + eye.height) as u32).min(frame.height());
    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    let luma = |x: u32, y: u32| {
        let p = frame.get_pixel(x, y);
        (0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32) as u8
    };

    // Pass 1: darkest value
    let mut min_val = u8::MAX;
    for y in y0..y1 {
        for x in x0..x1 {
            min_val = min_val.min(luma(x, y));
        }
    }
    let threshold = min_val.saturating_add(30);

    // Pass 2: darkness-weighted centroid of pixels near the minimum
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut weight = 0.0;
    for y in y0..y1 {
        for x in x0..x1 {
            let l = luma(x, y);
            if l <= threshold {
                let w = (threshold - l) as f32 + 1.0;
                sum_x += x as f32 * w;
                sum_y += y as f32 * w;
                weight += w;
            }
        }
    }
    if weight == 0.0 {
        return None;
    }

    let half_w = eye.width / 2.0;
    let half_h = eye.height / 2.0;
    let dx = (sum_x / weight - (eye.x + half_w)) / half_w;
    let dy = (sum_y / weight - (eye.y + half_h)) / half_h;
    Some((dx.clamp(-1.0, 1.0), dy.clamp(-1.0, 1.0)))
}

/// Horizontal glances win over vertical ones.
pub fn gaze_direction(dx: f32, dy: f32, horizontal: f32, vertical: f32) -> GazeDirection {
    if dx > horizontal {
        GazeDirection::Left
    } else if dx < -horizontal {
        GazeDirection::Right
    } else if dy < -vertical {
        GazeDirection::Up
    } else if dy > vertical {
        GazeDirection::Down
    } else {
        GazeDirection::Center
    }
}
