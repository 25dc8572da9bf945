use chrono::{DateTime, Local, TimeDelta, TimeZone};
use proctor_eyes::classifier::{
    ClassifierError, ClassifierResult, Classifiers, Detection, GazeClassifier, HeadPoseClassifier, ObjectClassifier,
};
use proctor_eyes::config::Timing;
use proctor_eyes::debounce::SnapshotStore;
use proctor_eyes::event_log::CsvEventLog;
use proctor_eyes::session::{FrameReport, Monitor, SessionContext};
use proctor_eyes::types::{Frame, GazeDirection, HeadAngles, HeadDirection, Rect};
use std::cell::Cell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;
use tempfile::TempDir;

/// What the scripted classifiers answer on the next frame. `None` means the call fails.
pub struct Script {
    pub gaze: Cell<Option<GazeDirection>>,
    pub head: Cell<Option<HeadDirection>>,
    pub angles: Cell<Option<HeadAngles>>,
    pub phone: Cell<Option<bool>>,
    pub baseline_seen: Cell<Option<HeadAngles>>,
    pub estimate_calls: Cell<usize>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            gaze: Cell::new(Some(GazeDirection::Center)),
            head: Cell::new(Some(HeadDirection::AtScreen)),
            angles: Cell::new(None),
            phone: Cell::new(Some(false)),
            baseline_seen: Cell::new(None),
            estimate_calls: Cell::new(0),
        }
    }
}

struct ScriptedGaze(Rc<Script>);
struct ScriptedHead(Rc<Script>);
struct ScriptedPhone(Rc<Script>);

impl GazeClassifier for ScriptedGaze {
    fn name(&self) -> String {
        "scripted gaze".into()
    }

    fn classify(&mut self, _frame: &Frame) -> ClassifierResult<GazeDirection> {
        self.0.gaze.get().ok_or(ClassifierError::NoFace)
    }
}

impl HeadPoseClassifier for ScriptedHead {
    fn name(&self) -> String {
        "scripted head".into()
    }

    fn estimate(&mut self, _frame: &Frame) -> ClassifierResult<HeadAngles> {
        self.0.estimate_calls.set(self.0.estimate_calls.get() + 1);
        self.0
            .angles
            .get()
            .ok_or_else(|| ClassifierError::ModelUnavailable("head pose".into()))
    }

    fn classify(&mut self, _frame: &Frame, baseline: &HeadAngles) -> ClassifierResult<HeadDirection> {
        self.0.baseline_seen.set(Some(*baseline));
        self.0.head.get().ok_or(ClassifierError::NoFace)
    }
}

impl ObjectClassifier for ScriptedPhone {
    fn name(&self) -> String {
        "scripted phone".into()
    }

    fn detect(&mut self, _frame: &Frame) -> ClassifierResult<Vec<Detection>> {
        match self.0.phone.get() {
            Some(true) => Ok(vec![Detection {
                rect: Rect::new(4.0, 4.0, 10.0, 20.0),
                confidence: 0.93,
            }]),
            Some(false) => Ok(Vec::new()),
            None => Err(ClassifierError::Inference("scripted failure".into())),
        }
    }
}

pub struct Harness {
    pub dir: TempDir,
    pub script: Rc<Script>,
    pub ctx: SessionContext,
    monitor: Monitor,
    t0: DateTime<Local>,
}

impl Harness {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let script = Rc::new(Script::default());
        let classifiers = Classifiers {
            gaze: Box::new(ScriptedGaze(script.clone())),
            head: Box::new(ScriptedHead(script.clone())),
            phone: Box::new(ScriptedPhone(script.clone())),
        };
        let event_log = CsvEventLog::open(dir.path().join("cheating_log.csv")).expect("open log");
        let snapshots = SnapshotStore::new(dir.path().join("log")).expect("create log dir");
        let t0 = Local.timestamp_opt(1_700_000_000, 0).unwrap();

        Self {
            ctx: SessionContext::new(t0, &Timing::default()),
            monitor: Monitor::new(classifiers, event_log, snapshots),
            script,
            dir,
            t0,
        }
    }

    pub fn at(&self, ms: i64) -> DateTime<Local> {
        self.t0 + TimeDelta::milliseconds(ms)
    }

    pub fn try_frame(&mut self, ms: i64) -> anyhow::Result<FrameReport> {
        let mut frame = Frame::new(64, 48);
        let now = self.at(ms);
        self.monitor.process_frame(&mut self.ctx, &mut frame, now)
    }

    pub fn frame(&mut self, ms: i64) -> FrameReport {
        self.try_frame(ms).expect("frame processed")
    }

    /// Runs frames every 100 ms over `[from, to]`.
    pub fn run(&mut self, from_ms: i64, to_ms: i64) -> Vec<FrameReport> {
        (from_ms..=to_ms).step_by(100).map(|ms| self.frame(ms)).collect()
    }

    /// Runs through the five second calibration window and the frame that closes it.
    pub fn calibrate(&mut self) -> Vec<FrameReport> {
        self.run(0, 5100)
    }

    pub fn snapshots_with_prefix(&self, prefix: &str) -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = fs::read_dir(self.dir.path().join("log"))
            .expect("read log dir")
            .map(|e| e.expect("dir entry").path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(prefix))
            })
            .collect();
        found.sort();
        found
    }

    pub fn csv_lines(&self) -> Vec<String> {
        fs::read_to_string(self.dir.path().join("cheating_log.csv"))
            .expect("read csv")
            .lines()
            .map(str::to_string)
            .collect()
    }
}
