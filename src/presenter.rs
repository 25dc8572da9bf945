use crate::classifier::Detection;
use crate::font;
use crate::types::{DetectionLabels, Frame, Rect};
use anyhow::{Context, Result};
use image::Rgb;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Duration;

pub const WARNING_TEXT: &str = "Warning: Cheating Detected!";
pub const CHEATING_TEXT: &str = "Cheating Detected!";
pub const CALIBRATING_TEXT: &str = "Calibrating... Keep your head straight";

const RED: Rgb<u8> = Rgb([255, 0, 0]);
const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
const CYAN: Rgb<u8> = Rgb([0, 255, 255]);
const TEXT_SCALE: u32 = 3;

/// Blends `color` over a rectangle: `alpha * color + (1 - alpha) * pixel`.
pub fn blend_rect(frame: &mut Frame, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgb<u8>, alpha: f32) {
    let x1 = x1.min(frame.width());
    let y1 = y1.min(frame.height());
    for y in y0..y1 {
        for x in x0..x1 {
            let p = frame.get_pixel_mut(x, y);
            for c in 0..3 {
                p[c] = (alpha * color[c] as f32 + (1.0 - alpha) * p[c] as f32).round() as u8;
            }
        }
    }
}

pub fn draw_rect_outline(frame: &mut Frame, rect: &Rect, color: Rgb<u8>, thickness: u32) {
    let (w, h) = frame.dimensions();
    let x0 = rect.x.max(0.0) as u32;
    let y0 = rect.y.max(0.0) as u32;
    let x1 = ((rect.x + rect.width).max(0.0) as u32).min(w.saturating_sub(1));
    let y1 = ((rect.y + rect.height).max(0.0) as u32).min(h.saturating_sub(1));
    if x0 > x1 || y0 > y1 {
        return;
    }
    for t in 0..thickness {
        for x in x0..=x1 {
            for y in [y0.saturating_add(t).min(y1), y1.saturating_sub(t).max(y0)] {
                frame.put_pixel(x, y, color);
            }
        }
        for y in y0..=y1 {
            for x in [x0.saturating_add(t).min(x1), x1.saturating_sub(t).max(x0)] {
                frame.put_pixel(x, y, color);
            }
        }
    }
}

/// Per-frame status lines, drawn in place onto the frame.
pub fn annotate_labels(frame: &mut Frame, labels: &DetectionLabels, calibrating: bool) {
    let line = font::line_height(2);
    font::draw_text(frame, 20, 20, &format!("Gaze Direction: {}", labels.gaze), GREEN, 2);
    if calibrating {
        font::draw_text(frame, 50, 200, CALIBRATING_TEXT, CYAN, 2);
    } else {
        font::draw_text(frame, 20, 20 + line, &format!("Head Direction: {}", labels.head), GREEN, 2);
    }
    let phone = if labels.phone { "True" } else { "False" };
    font::draw_text(frame, 20, 20 + 2 * line, &format!("Mobile Detected: {}", phone), GREEN, 2);
}

pub fn annotate_detections(frame: &mut Frame, detections: &[Detection]) {
    for d in detections {
        draw_rect_outline(frame, &d.rect, GREEN, 3);
        let label = format!("Mobile ({:.2})", d.confidence);
        let y = (d.rect.y as u32).saturating_sub(font::line_height(2));
        // Keep the label inside the frame when the box touches the right edge
        let max_x = frame.width().saturating_sub(font::text_width(&label, 2));
        let x = (d.rect.x.max(0.0) as u32).min(max_x);
        font::draw_text(frame, x, y, &label, GREEN, 2);
    }
}

/// The warning screen: a dimmed band across the top with red text.
/// Returns a copy so the annotated frame stays clean for snapshots.
pub fn render_warning(frame: &Frame) -> Frame {
    let mut out = frame.clone();
    let width = out.width();
    blend_rect(&mut out, 30, 30, width.saturating_sub(30), 130, Rgb([0, 0, 0]), 0.7);
    font::draw_text(&mut out, 50, 55, WARNING_TEXT, RED, TEXT_SCALE);
    font::draw_text(&mut out, 50, 95, CHEATING_TEXT, RED, TEXT_SCALE);
    out
}

/// Alert tone: a bundled wav if present, else a synthesized beep.
/// The audio device is opened on first use.
pub struct AlertSound {
    asset: PathBuf,
    output: Option<(OutputStream, OutputStreamHandle)>,
}

impl AlertSound {
    pub const TONE_HZ: f32 = 1000.0;
    pub const TONE_MS: u64 = 500;

    pub fn new(asset: impl Into<PathBuf>) -> Self {
        Self {
            asset: asset.into(),
            output: None,
        }
    }

    /// Blocks until the sound has finished.
    pub fn play(&mut self) -> Result<()> {
        if self.output.is_none() {
            self.output = Some(OutputStream::try_default().context("No audio output device")?);
        }
        let Some((_, handle)) = self.output.as_ref() else {
            return Ok(());
        };
        let sink = Sink::try_new(handle)?;

        if self.asset.exists() {
            let file = File::open(&self.asset).with_context(|| format!("Failed to open {}", self.asset.display()))?;
            sink.append(Decoder::new(BufReader::new(file))?);
        } else {
            let tone = rodio::source::SineWave::new(Self::TONE_HZ)
                .take_duration(Duration::from_millis(Self::TONE_MS))
                .amplify(0.25);
            sink.append(tone);
        }
        sink.sleep_until_end();
        Ok(())
    }
}

/// Shows the warning and sounds the alert while the window is presenting.
pub struct WarningPresenter {
    sound: AlertSound,
}

impl WarningPresenter {
    pub fn new(sound: AlertSound) -> Self {
        Self { sound }
    }

    /// Returns the frame to display. Sound problems are reported and otherwise ignored.
    pub fn present(&mut self, frame: &Frame) -> Frame {
        let warning = render_warning(frame);
        if let Err(e) = self.sound.play() {
            tracing::warn!("Sound error: {:#}", e);
        }
        warning
    }
}
