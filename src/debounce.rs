use crate::evaluator::signal_adverse;
use crate::types::{DetectionLabels, Frame, SignalKind};
use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeDelta};
use std::fs;
use std::path::{Path, PathBuf};

/// Tracks how long one adverse condition has held without interruption.
///
/// `started_at` is set only while the condition has been true on every
/// frame since that instant. Firing clears it, so the next firing needs
/// another full window: this retriggers, it does not latch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebounceTimer {
    started_at: Option<DateTime<Local>>,
}

impl DebounceTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started_at(&self) -> Option<DateTime<Local>> {
        self.started_at
    }

    /// Returns true on the frame the condition completes `threshold` of continuous time.
    pub fn update(&mut self, adverse: bool, now: DateTime<Local>, threshold: TimeDelta) -> bool {
        if !adverse {
            self.started_at = None;
            return false;
        }
        match self.started_at {
            None => {
                self.started_at = Some(now);
                false
            }
            Some(start) if now - start >= threshold => {
                self.started_at = None;
                true
            }
            Some(_) => false,
        }
    }
}

/// A snapshot the session should write for this frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRequest {
    pub kind: SignalKind,
    pub file_name: String,
}

/// `{signal}_{label}_{unix}.png`; the phone case has no label.
pub fn snapshot_file_name(kind: SignalKind, labels: &DetectionLabels, now: DateTime<Local>) -> String {
    let ts = now.timestamp();
    match kind {
        SignalKind::Head => format!("head_{}_{}.png", labels.head, ts),
        SignalKind::Gaze => format!("eye_{}_{}.png", labels.gaze, ts),
        SignalKind::Phone => format!("mobile_detected_{}.png", ts),
    }
}

/// One debounce timer per signal, all sharing the same threshold.
#[derive(Debug, Clone)]
pub struct SnapshotDebouncer {
    head: DebounceTimer,
    gaze: DebounceTimer,
    phone: DebounceTimer,
    threshold: TimeDelta,
}

impl SnapshotDebouncer {
    pub fn new(threshold: TimeDelta) -> Self {
        Self {
            head: DebounceTimer::new(),
            gaze: DebounceTimer::new(),
            phone: DebounceTimer::new(),
            threshold,
        }
    }

    pub fn timer(&self, kind: SignalKind) -> &DebounceTimer {
        match kind {
            SignalKind::Head => &self.head,
            SignalKind::Gaze => &self.gaze,
            SignalKind::Phone => &self.phone,
        }
    }

    fn timer_mut(&mut self, kind: SignalKind) -> &mut DebounceTimer {
        match kind {
            SignalKind::Head => &mut self.head,
            SignalKind::Gaze => &mut self.gaze,
            SignalKind::Phone => &mut self.phone,
        }
    }

    pub fn update(&mut self, labels: &DetectionLabels, now: DateTime<Local>) -> Vec<SnapshotRequest> {
        let threshold = self.threshold;
        SignalKind::ALL
            .into_iter()
            .filter(|&kind| self.timer_mut(kind).update(signal_adverse(labels, kind), now, threshold))
            .map(|kind| SnapshotRequest {
                kind,
                file_name: snapshot_file_name(kind, labels, now),
            })
            .collect()
    }
}

/// Directory of PNG snapshots.
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn save(&self, request: &SnapshotRequest, frame: &Frame) -> Result<PathBuf> {
        let path = self.dir.join(&request.file_name);
        frame
            .save(&path)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        tracing::info!("Saved {:?} snapshot {}", request.kind, path.display());
        Ok(path)
    }
}
