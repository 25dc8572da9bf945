use chrono::{DateTime, Local, TimeDelta};

/// What the warning window did on one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningStep {
    /// Not cheating, or the window just closed. Show the normal frame.
    Idle,
    /// First cheating frame: the window is stamped but nothing is presented yet.
    Armed,
    /// Inside the window: present the alert and write the log records.
    Presenting,
    /// The window ran out on this frame; it re-arms on the next cheating frame.
    Expired,
}

impl WarningStep {
    /// The normal frame is suppressed both while presenting and on the arming frame.
    pub fn suppresses_display(&self) -> bool {
        matches!(self, WarningStep::Armed | WarningStep::Presenting)
    }
}

/// Time-boxed warning window driven by the overall cheating signal.
#[derive(Debug, Clone, PartialEq)]
pub struct WarningState {
    active: bool,
    activated_at: Option<DateTime<Local>>,
    duration: TimeDelta,
}

impl WarningState {
    pub fn new(duration: TimeDelta) -> Self {
        Self {
            active: false,
            activated_at: None,
            duration,
        }
    }

    /// Active only while inside the window; expiry needs no further update call.
    pub fn is_active(&self, now: DateTime<Local>) -> bool {
        match self.activated_at {
            Some(at) if self.active => now - at < self.duration,
            _ => false,
        }
    }

    pub fn activated_at(&self) -> Option<DateTime<Local>> {
        self.activated_at
    }

    /// Advances the window by one frame.
    ///
    /// The rising edge only arms the window, so presentation starts one frame
    /// late; that frame shows nothing at all. Kept as observed rather than
    /// collapsed into the arming frame.
    pub fn update(&mut self, cheating: bool, now: DateTime<Local>) -> WarningStep {
        if !cheating {
            self.active = false;
            return WarningStep::Idle;
        }
        if !self.active {
            self.active = true;
            self.activated_at = Some(now);
            return WarningStep::Armed;
        }
        if self.is_active(now) {
            WarningStep::Presenting
        } else {
            // Deactivates even if cheating continues; the next frame re-arms
            self.active = false;
            WarningStep::Expired
        }
    }
}
