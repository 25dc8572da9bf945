use crate::classifier::{ClassifierError, ClassifierResult};
use crate::detector::{try_load_session, SharedFaceDetector};
use crate::types::{Frame, Landmarks, Point3D, Rect};
use anyhow::Result;
use image::imageops::FilterType;
use ort::session::Session;
use std::path::Path;

const MESH_INPUT: u32 = 192;
const MESH_POINTS: usize = 468;

/// 468-point face mesh, run on the detected face ROI.
pub struct FaceMesh {
    session: Option<Session>,
    detector: SharedFaceDetector,
}

impl FaceMesh {
    pub fn new(mesh_path: &Path, detector: SharedFaceDetector) -> Result<Self> {
        Ok(Self {
            session: try_load_session(mesh_path, "Face Mesh")?,
            detector,
        })
    }

    /// Landmarks in full-frame pixel coordinates.
    pub fn landmarks(&mut self, frame: &Frame) -> ClassifierResult<Landmarks> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| ClassifierError::ModelUnavailable("face mesh".into()))?;

        let face = self.detector.borrow_mut().detect(frame)?;
        let roi = padded_roi(&face, frame.width(), frame.height());
        let crop = image::imageops::crop_imm(frame, roi.x as u32, roi.y as u32, roi.width as u32, roi.height as u32)
            .to_image();

        let resized = image::imageops::resize(&crop, MESH_INPUT, MESH_INPUT, FilterType::Triangle);
        // NHWC, [-1, 1]
        let mut input_data = Vec::with_capacity((MESH_INPUT * MESH_INPUT * 3) as usize);
        for pixel in resized.pixels() {
            for c in 0..3 {
                input_data.push(pixel[c] as f32 / 127.5 - 1.0);
            }
        }

        let shape = vec![1, MESH_INPUT as usize, MESH_INPUT as usize, 3];
        let input = ort::value::Tensor::from_array((shape, input_data))?;
        let outputs = session.run(ort::inputs![input])?;
        let (_, raw) = outputs[0].try_extract_tensor::<f32>()?;

        project_mesh(raw, &roi).ok_or_else(|| {
            ClassifierError::BadOutput(format!("mesh output has {} values, need {}", raw.len(), MESH_POINTS * 3))
        })
    }
}

/// Expands the face box by a quarter for mesh context, clipped to the frame.
fn padded_roi(rect: &Rect, frame_w: u32, frame_h: u32) -> Rect {
    let pad_w = rect.width * 0.25;
    let pad_h = rect.height * 0.25;
    let x = (rect.x - pad_w / 2.0).max(0.0);
    let y = (rect.y - pad_h / 2.0).max(0.0);
    let w = (rect.width + pad_w).min(frame_w as f32 - x).max(1.0);
    let h = (rect.height + pad_h).min(frame_h as f32 - y).max(1.0);
    Rect::new(x, y, w, h)
}

/// Maps mesh-local (0..192) coordinates back through the crop into the frame.
fn project_mesh(raw: &[f32], roi: &Rect) -> Option<Landmarks> {
    if raw.len() < MESH_POINTS * 3 {
        return None;
    }
    let sx = roi.width / MESH_INPUT as f32;
    let sy = roi.height / MESH_INPUT as f32;
    let points = raw
        .chunks_exact(3)
        .take(MESH_POINTS)
        .map(|p| Point3D {
            x: roi.x + p[0] * sx,
            y: roi.y + p[1] * sy,
            z: p[2],
        })
        .collect();
    Some(Landmarks { points })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_points_land_in_frame_space() {
        let mut raw = vec![0.0; MESH_POINTS * 3];
        raw[3] = 192.0;
        raw[4] = 96.0;
        let roi = Rect::new(100.0, 50.0, 96.0, 96.0);
        let lm = project_mesh(&raw, &roi).unwrap();
        assert_eq!(lm.points.len(), MESH_POINTS);
        assert_eq!((lm.points[0].x, lm.points[0].y), (100.0, 50.0));
        assert_eq!((lm.points[1].x, lm.points[1].y), (196.0, 98.0));
    }

    #[test]
    fn short_output_is_rejected() {
        assert!(project_mesh(&[0.0; 30], &Rect::new(0.0, 0.0, 1.0, 1.0)).is_none());
    }

    #[test]
    fn roi_is_clipped() {
        let r = padded_roi(&Rect::new(0.0, 0.0, 100.0, 100.0), 110, 110);
        assert_eq!((r.x, r.y), (0.0, 0.0));
        assert_eq!((r.width, r.height), (110.0, 110.0));
    }
}
