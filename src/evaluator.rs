use crate::types::{DetectionLabels, GazeDirection, HeadDirection, Reading, SignalKind};

/// A head label is adverse when it is a real reading that is not "Looking at Screen".
pub fn head_adverse(head: &Reading<HeadDirection>) -> bool {
    matches!(head, Reading::Label(d) if *d != HeadDirection::AtScreen)
}

/// A gaze label is adverse when it is a real reading that is not "Looking Center".
pub fn gaze_adverse(gaze: &Reading<GazeDirection>) -> bool {
    matches!(gaze, Reading::Label(d) if *d != GazeDirection::Center)
}

pub fn signal_adverse(labels: &DetectionLabels, kind: SignalKind) -> bool {
    match kind {
        SignalKind::Head => head_adverse(&labels.head),
        SignalKind::Gaze => gaze_adverse(&labels.gaze),
        SignalKind::Phone => labels.phone,
    }
}

/// Failed reads never count: a classifier error is neither an alert nor an all-clear.
pub fn cheating_detected(labels: &DetectionLabels) -> bool {
    head_adverse(&labels.head) || gaze_adverse(&labels.gaze) || labels.phone
}
