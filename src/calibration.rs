use crate::types::HeadAngles;
use chrono::{DateTime, Local, TimeDelta};

/// Head pose warm-up: collects a neutral reading for a fixed window
/// starting at session start.
#[derive(Debug, Clone)]
pub struct CalibrationStage {
    started_at: DateTime<Local>,
    window: TimeDelta,
    last_reading: Option<HeadAngles>,
}

impl CalibrationStage {
    pub fn new(started_at: DateTime<Local>, window: TimeDelta) -> Self {
        Self {
            started_at,
            window,
            last_reading: None,
        }
    }

    /// True while `now` is still inside the window (the boundary instant included).
    pub fn is_running(&self, now: DateTime<Local>) -> bool {
        now - self.started_at <= self.window
    }

    /// Feeds one classifier outcome. Failed reads are dropped; the latest success wins.
    pub fn observe<E>(&mut self, reading: Result<HeadAngles, E>) {
        if let Ok(angles) = reading {
            self.last_reading = Some(angles);
        }
    }

    pub fn last_reading(&self) -> Option<HeadAngles> {
        self.last_reading
    }

    /// Closes the window. Without any successful read the baseline is all zeros.
    pub fn finish(self) -> HeadAngles {
        match self.last_reading {
            Some(angles) => angles,
            None => {
                tracing::info!("Using default calibration.");
                HeadAngles::ZERO
            }
        }
    }
}

/// Calibration progress held by a session.
#[derive(Debug, Clone)]
pub enum Calibration {
    Running(CalibrationStage),
    Done(HeadAngles),
}

impl Calibration {
    pub fn start(now: DateTime<Local>, window: TimeDelta) -> Self {
        Calibration::Running(CalibrationStage::new(now, window))
    }

    pub fn baseline(&self) -> Option<&HeadAngles> {
        match self {
            Calibration::Running(_) => None,
            Calibration::Done(b) => Some(b),
        }
    }
}
