mod common;

use common::Harness;
use proctor_eyes::types::{GazeDirection, HeadAngles, HeadDirection, Reading};
use proctor_eyes::warning::WarningStep;

#[test]
fn calibration_keeps_head_neutral_and_falls_back_to_zero() {
    let mut h = Harness::new();
    h.script.head.set(Some(HeadDirection::Left));

    let reports = h.calibrate();
    assert!(reports.iter().all(|r| r.calibrating));
    assert!(reports.iter().all(|r| r.labels.head == Reading::Label(HeadDirection::AtScreen)));
    assert!(reports.iter().all(|r| !r.cheating));

    // One estimate per frame up to and including the 5 s boundary, none on the closing frame
    assert_eq!(h.script.estimate_calls.get(), 51);
    assert_eq!(h.ctx.calibration.baseline(), Some(&HeadAngles::ZERO));

    let next = h.frame(5200);
    assert!(!next.calibrating);
    assert_eq!(next.labels.head, Reading::Label(HeadDirection::Left));
    assert_eq!(h.script.baseline_seen.get(), Some(HeadAngles::ZERO));
}

#[test]
fn calibration_uses_last_successful_reading() {
    let mut h = Harness::new();
    h.script.angles.set(Some(HeadAngles::new(2.0, -1.0, 0.5)));
    h.run(0, 3000);
    h.script.angles.set(Some(HeadAngles::new(4.0, -3.0, 1.0)));
    h.run(3100, 4000);
    h.script.angles.set(None);
    h.run(4100, 5100);

    assert_eq!(h.ctx.calibration.baseline(), Some(&HeadAngles::new(4.0, -3.0, 1.0)));
    h.frame(5200);
    assert_eq!(h.script.baseline_seen.get(), Some(HeadAngles::new(4.0, -3.0, 1.0)));
}

#[test]
fn sustained_head_turn_saves_one_snapshot() {
    let mut h = Harness::new();
    h.calibrate();
    h.run(5200, 5900);

    h.script.head.set(Some(HeadDirection::Left));
    let turned = h.run(6000, 9500);
    h.script.head.set(Some(HeadDirection::AtScreen));
    let back = h.run(9600, 12000);

    let heads = h.snapshots_with_prefix("head_Looking Left_");
    assert_eq!(heads.len(), 1);
    assert!(heads[0].ends_with("head_Looking Left_1700000009.png"));
    assert!(h.snapshots_with_prefix("eye_").is_empty());
    assert!(h.snapshots_with_prefix("mobile_detected_").is_empty());

    let fired: Vec<_> = turned.iter().filter(|r| !r.snapshots.is_empty()).collect();
    assert_eq!(fired.len(), 1);
    assert!(back.iter().all(|r| r.snapshots.is_empty() && r.warning == WarningStep::Idle));
}

#[test]
fn flickering_phone_never_saves_a_snapshot() {
    let mut h = Harness::new();
    h.calibrate();

    for (i, ms) in (6000..16000).step_by(100).enumerate() {
        h.script.phone.set(Some(i % 2 == 0));
        let report = h.frame(ms);
        let expected = if i % 2 == 0 { WarningStep::Armed } else { WarningStep::Idle };
        assert_eq!(report.warning, expected, "frame at {} ms", ms);
    }

    assert!(h.snapshots_with_prefix("mobile_detected_").is_empty());
    // Never presented, so only the header is on disk
    assert_eq!(h.csv_lines().len(), 1);
}

#[test]
fn warning_window_arms_presents_and_expires() {
    let mut h = Harness::new();
    h.calibrate();
    h.script.phone.set(Some(true));

    let reports = h.run(6000, 11200);
    let steps: Vec<WarningStep> = reports.iter().map(|r| r.warning).collect();

    assert_eq!(steps[0], WarningStep::Armed);
    assert_eq!(reports[0].records_written, 0);
    assert!(steps[1..=49].iter().all(|s| *s == WarningStep::Presenting));
    assert_eq!(steps[50], WarningStep::Expired);
    assert_eq!(steps[51], WarningStep::Armed);
    assert_eq!(steps[52], WarningStep::Presenting);

    // One row per presenting frame: 49 in the first window, 1 in the second
    let lines = h.csv_lines();
    assert_eq!(lines[0], "Timestamp,Type,Details");
    assert_eq!(lines.len(), 1 + 50);
    assert!(lines[1..].iter().all(|l| l.ends_with(",Mobile Detection,Phone Detected")));
    assert!(lines[1].starts_with(&h.at(6100).format("%Y-%m-%d %H:%M:%S").to_string()));

    // The phone debouncer runs independently of the warning window
    let phones = h.snapshots_with_prefix("mobile_detected_");
    assert_eq!(phones.len(), 1);
    assert!(phones[0].ends_with("mobile_detected_1700000009.png"));
}

#[test]
fn classifier_failures_are_neutral() {
    let mut h = Harness::new();
    h.calibrate();

    h.script.gaze.set(None);
    h.script.head.set(None);
    h.script.phone.set(None);
    let reports = h.run(6000, 12000);

    for r in &reports {
        assert_eq!(r.labels.gaze, Reading::Failed);
        assert_eq!(r.labels.head, Reading::Failed);
        assert!(!r.labels.phone);
        assert!(!r.cheating);
        assert_eq!(r.warning, WarningStep::Idle);
        assert!(r.snapshots.is_empty());
    }
    assert_eq!(h.csv_lines().len(), 1);
}

#[test]
fn failed_reads_break_a_debounce_streak() {
    let mut h = Harness::new();
    h.calibrate();

    h.script.gaze.set(Some(GazeDirection::Right));
    h.run(6000, 8000);
    h.script.gaze.set(None);
    h.frame(8100);
    h.script.gaze.set(Some(GazeDirection::Right));
    h.run(8200, 10000);

    assert!(h.snapshots_with_prefix("eye_").is_empty());

    h.run(10100, 11200);
    let eyes = h.snapshots_with_prefix("eye_Looking Right_");
    assert_eq!(eyes.len(), 1);
    assert!(eyes[0].ends_with("eye_Looking Right_1700000011.png"));
}

#[test]
fn unwritable_snapshot_does_not_stop_the_session() {
    let mut h = Harness::new();
    h.calibrate();

    // A directory where the snapshot file should go makes the PNG write fail
    std::fs::create_dir(h.dir.path().join("log").join("head_Looking Left_1700000009.png")).unwrap();

    h.script.head.set(Some(HeadDirection::Left));
    h.run(6000, 8900);
    let fired = h.try_frame(9000);
    let report = fired.expect("a failed snapshot is not fatal");
    assert!(report.snapshots.is_empty());
    assert_eq!(report.warning, WarningStep::Presenting);

    // The timer restarted and the next window writes normally
    h.run(9100, 12100);
    // The blocking directory plus the snapshot from the second window
    let heads = h.snapshots_with_prefix("head_Looking Left_");
    assert_eq!(heads.len(), 2);
    assert!(heads[0].is_dir());
    assert!(heads[1].ends_with("head_Looking Left_1700000012.png"));
}
