use image::{ImageBuffer, Rgb};
use std::fmt;

/// A single RGB camera frame
pub type Frame = ImageBuffer<Rgb<u8>, Vec<u8>>;

/// Represents a single 3D point
#[derive(Debug, Clone, Copy, Default)]
pub struct Point3D {
    pub x: f32,
    pub y: f32,
    #[allow(dead_code)]
    pub z: f32,
}

/// Represents the result of a face mesh inference
#[derive(Debug, Clone, Default)]
pub struct Landmarks {
    pub points: Vec<Point3D>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }
}

/// Head orientation in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HeadAngles {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

impl HeadAngles {
    pub const ZERO: HeadAngles = HeadAngles { pitch: 0.0, yaw: 0.0, roll: 0.0 };

    pub fn new(pitch: f32, yaw: f32, roll: f32) -> Self {
        Self { pitch, yaw, roll }
    }

    pub fn relative_to(&self, baseline: &HeadAngles) -> HeadAngles {
        HeadAngles {
            pitch: self.pitch - baseline.pitch,
            yaw: self.yaw - baseline.yaw,
            roll: self.roll - baseline.roll,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GazeDirection {
    Center,
    Left,
    Right,
    Up,
    Down,
}

impl GazeDirection {
    pub fn label(&self) -> &'static str {
        match self {
            GazeDirection::Center => "Looking Center",
            GazeDirection::Left => "Looking Left",
            GazeDirection::Right => "Looking Right",
            GazeDirection::Up => "Looking Up",
            GazeDirection::Down => "Looking Down",
        }
    }
}

impl fmt::Display for GazeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeadDirection {
    AtScreen,
    Left,
    Right,
    Up,
    Down,
}

impl HeadDirection {
    pub fn label(&self) -> &'static str {
        match self {
            HeadDirection::AtScreen => "Looking at Screen",
            HeadDirection::Left => "Looking Left",
            HeadDirection::Right => "Looking Right",
            HeadDirection::Up => "Looking Up",
            HeadDirection::Down => "Looking Down",
        }
    }
}

impl fmt::Display for HeadDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of one classifier call: a label, or a failed read.
///
/// A failed read displays as "Error" and is never treated as adverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reading<L> {
    Label(L),
    Failed,
}

impl<L: fmt::Display> fmt::Display for Reading<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Label(l) => l.fmt(f),
            Reading::Failed => f.write_str("Error"),
        }
    }
}

/// The three per-frame signals. Nothing here survives into the next frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionLabels {
    pub gaze: Reading<GazeDirection>,
    pub head: Reading<HeadDirection>,
    pub phone: bool,
}

impl Default for DetectionLabels {
    fn default() -> Self {
        Self {
            gaze: Reading::Label(GazeDirection::Center),
            head: Reading::Label(HeadDirection::AtScreen),
            phone: false,
        }
    }
}

/// The signal types tracked independently by the debouncers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Head,
    Gaze,
    Phone,
}

impl SignalKind {
    pub const ALL: [SignalKind; 3] = [SignalKind::Head, SignalKind::Gaze, SignalKind::Phone];
}
