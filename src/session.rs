use crate::calibration::Calibration;
use crate::classifier::Classifiers;
use crate::config::Timing;
use crate::debounce::{SnapshotDebouncer, SnapshotStore};
use crate::evaluator::{cheating_detected, gaze_adverse, head_adverse};
use crate::event_log::{CsvEventLog, EventKind, LogRecord};
use crate::presenter::{annotate_detections, annotate_labels};
use crate::types::{DetectionLabels, Frame, HeadDirection, Reading};
use crate::warning::{WarningState, WarningStep};
use anyhow::Result;
use chrono::{DateTime, Local};
use std::path::PathBuf;

/// Everything that carries over from one frame to the next.
///
/// Built once at session start; the calibration window is measured from
/// `started_at`.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub calibration: Calibration,
    pub debouncer: SnapshotDebouncer,
    pub warning: WarningState,
}

impl SessionContext {
    pub fn new(started_at: DateTime<Local>, timing: &Timing) -> Self {
        Self {
            calibration: Calibration::start(started_at, timing.calibration()),
            debouncer: SnapshotDebouncer::new(timing.debounce()),
            warning: WarningState::new(timing.warning()),
        }
    }
}

/// What happened on one frame.
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub labels: DetectionLabels,
    pub calibrating: bool,
    pub cheating: bool,
    pub warning: WarningStep,
    pub records_written: usize,
    pub snapshots: Vec<PathBuf>,
}

/// The CSV rows written on a presenting frame: one per adverse signal.
pub fn warning_records(labels: &DetectionLabels, now: DateTime<Local>) -> Vec<LogRecord> {
    let mut records = Vec::new();
    if head_adverse(&labels.head) {
        records.push(LogRecord::new(now, EventKind::HeadMisalignment, labels.head.to_string()));
    }
    if gaze_adverse(&labels.gaze) {
        records.push(LogRecord::new(now, EventKind::EyeMovement, labels.gaze.to_string()));
    }
    if labels.phone {
        records.push(LogRecord::new(now, EventKind::MobileDetection, "Phone Detected"));
    }
    records
}

/// Runs the classifiers over each frame and acts on the result.
pub struct Monitor {
    classifiers: Classifiers,
    event_log: CsvEventLog,
    snapshots: SnapshotStore,
}

impl Monitor {
    pub fn new(classifiers: Classifiers, event_log: CsvEventLog, snapshots: SnapshotStore) -> Self {
        tracing::info!(
            "Classifiers: {} | {} | {}",
            classifiers.gaze.name(),
            classifiers.head.name(),
            classifiers.phone.name()
        );
        Self {
            classifiers,
            event_log,
            snapshots,
        }
    }

    /// One frame of the proctoring loop.
    ///
    /// Classifier failures degrade to neutral readings here and snapshot
    /// failures are logged. The only error returned is a failed CSV append.
    pub fn process_frame(
        &mut self,
        ctx: &mut SessionContext,
        frame: &mut Frame,
        now: DateTime<Local>,
    ) -> Result<FrameReport> {
        // 1. Gaze
        let gaze = match self.classifiers.gaze.classify(frame) {
            Ok(d) => Reading::Label(d),
            Err(e) => {
                tracing::warn!("Eye error: {}", e);
                Reading::Failed
            }
        };

        // 2. Head pose (calibration first)
        let (head, calibrating) = self.head_reading(ctx, frame, now);

        // 3. Phone
        let (phone, detections) = match self.classifiers.phone.detect(frame) {
            Ok(dets) => (!dets.is_empty(), dets),
            Err(e) => {
                tracing::warn!("Mobile error: {}", e);
                (false, Vec::new())
            }
        };

        let labels = DetectionLabels { gaze, head, phone };
        annotate_labels(frame, &labels, calibrating);
        annotate_detections(frame, &detections);

        // 4. Warning window
        let cheating = cheating_detected(&labels);
        let warning = ctx.warning.update(cheating, now);
        let mut records_written = 0;
        if warning == WarningStep::Presenting {
            // Writes every adverse signal on every presenting frame, so a
            // five second window produces one row per frame per signal.
            // Looks unintended but is the observed behavior; left as is.
            for record in warning_records(&labels, now) {
                self.event_log.append(&record)?;
                records_written += 1;
            }
        }

        // 5. Debounced snapshots of the annotated frame
        let mut snapshots = Vec::new();
        for request in ctx.debouncer.update(&labels, now) {
            // A failed snapshot is reported and skipped; the session keeps running
            match self.snapshots.save(&request, frame) {
                Ok(path) => snapshots.push(path),
                Err(e) => tracing::warn!("Snapshot error: {:#}", e),
            }
        }

        Ok(FrameReport {
            labels,
            calibrating,
            cheating,
            warning,
            records_written,
            snapshots,
        })
    }

    fn head_reading(
        &mut self,
        ctx: &mut SessionContext,
        frame: &Frame,
        now: DateTime<Local>,
    ) -> (Reading<HeadDirection>, bool) {
        let neutral = Reading::Label(HeadDirection::AtScreen);
        match &mut ctx.calibration {
            Calibration::Running(stage) if stage.is_running(now) => {
                let reading = self.classifiers.head.estimate(frame);
                if let Err(e) = &reading {
                    tracing::debug!("Calibration read skipped: {}", e);
                }
                stage.observe(reading);
                (neutral, true)
            }
            Calibration::Running(stage) => {
                // The frame that closes the window does no head classification
                let baseline = stage.clone().finish();
                tracing::info!(
                    "Calibration done: pitch {:.1}, yaw {:.1}, roll {:.1}",
                    baseline.pitch,
                    baseline.yaw,
                    baseline.roll
                );
                ctx.calibration = Calibration::Done(baseline);
                (neutral, true)
            }
            Calibration::Done(baseline) => {
                let baseline = *baseline;
                match self.classifiers.head.classify(frame, &baseline) {
                    Ok(d) => (Reading::Label(d), false),
                    Err(e) => {
                        tracing::warn!("Head error: {}", e);
                        (Reading::Failed, false)
                    }
                }
            }
        }
    }
}
