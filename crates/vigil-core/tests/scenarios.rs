//! End-to-end decision scenarios driven through the public engine API with a
//! scripted recognizer.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use image::{Rgb, RgbImage};
use std::convert::Infallible;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc;
use std::time::Duration;
use vigil_core::{
    run, AlertEvent, AlertKey, DecisionConfig, DetectionSession, FaceEmbedding, FaceLocation, FaceRecognizer, Frame,
    FrameSource, KnownFace, NoSnapshots, Orchestrator, RunOptions, RunOutcome, SourceError,
};

const WIDTH: u32 = 320;
const HEIGHT: u32 = 240;

/// Returns a fixed list of faces per `locate` call, cycling the last entry.
struct ScriptedRecognizer {
    script: Vec<Vec<(FaceLocation, FaceEmbedding)>>,
    calls: usize,
    current: Vec<(FaceLocation, FaceEmbedding)>,
}

impl ScriptedRecognizer {
    fn new(script: Vec<Vec<(FaceLocation, FaceEmbedding)>>) -> Self {
        Self {
            script,
            calls: 0,
            current: Vec::new(),
        }
    }
}

impl FaceRecognizer for ScriptedRecognizer {
    type Error = Infallible;

    fn locate(&mut self, _frame: &Frame) -> Result<Vec<FaceLocation>, Infallible> {
        let idx = self.calls.min(self.script.len().saturating_sub(1));
        self.calls += 1;
        self.current = self.script.get(idx).cloned().unwrap_or_default();
        Ok(self.current.iter().map(|(loc, _)| *loc).collect())
    }

    fn embed(&mut self, _frame: &Frame, location: &FaceLocation) -> Result<FaceEmbedding, Infallible> {
        let found = self.current.iter().find(|(loc, _)| loc == location);
        Ok(found.map(|(_, e)| e.clone()).unwrap_or_else(|| FaceEmbedding::new(vec![9.0, 9.0, 9.0])))
    }
}

fn left_face() -> FaceLocation {
    FaceLocation::new(40, 100, 100, 40)
}

fn right_face() -> FaceLocation {
    FaceLocation::new(40, 260, 100, 200)
}

fn alice() -> FaceEmbedding {
    FaceEmbedding::new(vec![1.0, 0.0, 0.0])
}

fn stranger() -> FaceEmbedding {
    FaceEmbedding::new(vec![0.0, 0.0, 5.0])
}

fn gallery() -> Vec<KnownFace> {
    vec![KnownFace {
        label: "alice".into(),
        embedding: alice(),
    }]
}

fn checker(x: u32, y: u32) -> Rgb<u8> {
    let v = if (x / 3 + y / 3) % 2 == 0 { 30 } else { 220 };
    Rgb([v, v, v])
}

/// Dark frame with a high-contrast texture inside each box.
fn frame_with_patches(patches: &[FaceLocation], sequence: u64) -> Frame {
    let image = RgbImage::from_fn(WIDTH, HEIGHT, |x, y| {
        let (x_i, y_i) = (x as i32, y as i32);
        let inside = patches
            .iter()
            .any(|p| x_i >= p.left && x_i < p.right && y_i >= p.top && y_i < p.bottom);
        if inside {
            checker(x, y)
        } else {
            Rgb([15, 15, 15])
        }
    });
    Frame::new(image, sequence)
}

fn at(hour: u32, second: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 14)
        .unwrap()
        .and_hms_opt(hour, 0, second)
        .unwrap()
}

fn engine(
    script: Vec<Vec<(FaceLocation, FaceEmbedding)>>,
) -> (Orchestrator<ScriptedRecognizer>, mpsc::Receiver<AlertEvent>) {
    let (tx, rx) = mpsc::channel();
    let orchestrator = Orchestrator::new(
        DecisionConfig::default(),
        ScriptedRecognizer::new(script),
        gallery(),
        Box::new(NoSnapshots),
        Box::new(tx),
    );
    (orchestrator, rx)
}

#[test]
fn test_known_person_fires_once_per_session() {
    let (mut orchestrator, rx) = engine(vec![vec![(left_face(), alice())]]);
    let mut session = DetectionSession::new(at(14, 0));
    let frame = frame_with_patches(&[left_face()], 0);

    let first = orchestrator.process_frame(&mut session, &frame, at(14, 0)).unwrap();
    let event = first.expect("known person alert");
    assert_eq!(event.key, AlertKey::KnownPerson);
    assert_eq!(event.message, "Welcome back, alice!");
    assert_eq!(event.timestamp, at(14, 0));

    let second = orchestrator.process_frame(&mut session, &frame, at(14, 1)).unwrap();
    assert!(second.is_none());

    let delivered: Vec<_> = rx.try_iter().collect();
    assert_eq!(delivered, vec![event]);
    assert_eq!(session.frames_processed(), 2);
}

#[test]
fn test_known_with_unknown_is_guest_only() {
    let (mut orchestrator, rx) = engine(vec![vec![(left_face(), alice()), (right_face(), stranger())]]);
    let mut session = DetectionSession::new(at(23, 0));
    let frame = frame_with_patches(&[left_face(), right_face()], 0);

    for second in [0, 3, 6, 9] {
        orchestrator.process_frame(&mut session, &frame, at(23, second)).unwrap();
    }

    let keys: Vec<_> = rx.try_iter().map(|e| e.key).collect();
    assert_eq!(keys, vec![AlertKey::GuestWithKnown]);
    assert!(!session.has_fired(AlertKey::KnownPerson));
    assert!(!session.has_fired(AlertKey::HighThreat));
    assert!(!session.has_fired(AlertKey::NormalThreat));
}

fn unknown_for_six_seconds(hour: u32) -> Vec<AlertKey> {
    let (mut orchestrator, rx) = engine(vec![vec![(left_face(), stranger())]]);
    let mut session = DetectionSession::new(at(hour, 0));
    let frame = frame_with_patches(&[left_face()], 0);

    for second in [0, 2, 4] {
        let alert = orchestrator.process_frame(&mut session, &frame, at(hour, second)).unwrap();
        assert!(alert.is_none(), "fired inside the dwell window");
    }
    orchestrator.process_frame(&mut session, &frame, at(hour, 6)).unwrap();
    rx.try_iter().map(|e| e.key).collect()
}

#[test]
fn test_unknown_dwell_at_night_is_high_threat() {
    assert_eq!(unknown_for_six_seconds(23), vec![AlertKey::HighThreat]);
}

#[test]
fn test_unknown_dwell_in_daytime_is_normal_threat() {
    assert_eq!(unknown_for_six_seconds(14), vec![AlertKey::NormalThreat]);
}

#[test]
fn test_unknown_dwell_resets_when_face_leaves() {
    let face = vec![(left_face(), stranger())];
    let (mut orchestrator, rx) = engine(vec![face.clone(), face.clone(), vec![], face.clone(), face]);
    let mut session = DetectionSession::new(at(23, 0));
    let frame = frame_with_patches(&[left_face()], 0);

    // Unknown at 0s and 4s, gone at 5s, back at 6s and 10s.
    for second in [0, 4, 5, 6, 10] {
        orchestrator.process_frame(&mut session, &frame, at(23, second)).unwrap();
    }
    assert_eq!(session.unknown_since(), Some(at(23, 6)));
    assert!(rx.try_iter().all(|e| e.key != AlertKey::HighThreat));

    orchestrator.process_frame(&mut session, &frame, at(23, 12)).unwrap();
    assert!(session.has_fired(AlertKey::HighThreat));
}

#[test]
fn test_unusable_face_keeps_unknown_dwell() {
    let unknown = vec![(left_face(), stranger())];
    let (mut orchestrator, rx) = engine(vec![unknown.clone(), unknown.clone(), unknown]);
    let mut session = DetectionSession::new(at(23, 0));
    let textured = frame_with_patches(&[left_face()], 0);
    // Same box over a flat area: located, then rejected by the quality gate.
    let blurred = frame_with_patches(&[], 1);

    orchestrator.process_frame(&mut session, &textured, at(23, 0)).unwrap();
    orchestrator.process_frame(&mut session, &blurred, at(23, 4)).unwrap();
    assert_eq!(session.unknown_since(), Some(at(23, 0)));

    orchestrator.process_frame(&mut session, &textured, at(23, 6)).unwrap();
    assert_eq!(rx.try_iter().map(|e| e.key).collect::<Vec<_>>(), vec![AlertKey::HighThreat]);
}

fn motion_events(second_frame: Frame) -> Vec<AlertEvent> {
    let (mut orchestrator, rx) = engine(vec![vec![]]);
    let mut session = DetectionSession::new(at(2, 0));
    let empty = frame_with_patches(&[], 0);

    let seeded = orchestrator.process_frame(&mut session, &empty, at(2, 0)).unwrap();
    assert!(seeded.is_none());
    orchestrator.process_frame(&mut session, &second_frame, at(2, 1)).unwrap();
    rx.try_iter().collect()
}

/// Plain frame with an optional untextured square.
fn flat_frame(background: u8, square: Option<(FaceLocation, u8)>, sequence: u64) -> Frame {
    let image = RgbImage::from_fn(WIDTH, HEIGHT, |x, y| match square {
        Some((p, v)) if (x as i32) >= p.left && (x as i32) < p.right && (y as i32) >= p.top && (y as i32) < p.bottom => {
            Rgb([v, v, v])
        }
        _ => Rgb([background, background, background]),
    });
    Frame::new(image, sequence)
}

#[test]
fn test_motion_without_face_fires_motion_alert() {
    // A flat 24×24 object carries no body-like edges; motion alone decides.
    let square = FaceLocation::new(100, 172, 124, 148);
    for (background, foreground) in [(128, 30), (15, 200), (128, 200), (200, 60)] {
        let (mut orchestrator, rx) = engine(vec![vec![]]);
        let mut session = DetectionSession::new(at(2, 0));
        let empty = flat_frame(background, None, 0);
        let moved = flat_frame(background, Some((square, foreground)), 1);

        assert!(orchestrator.process_frame(&mut session, &empty, at(2, 0)).unwrap().is_none());
        orchestrator.process_frame(&mut session, &moved, at(2, 1)).unwrap();

        let events: Vec<AlertEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 1, "bg={background} fg={foreground}");
        assert_eq!(events[0].key, AlertKey::MotionDetected);
        assert_eq!(events[0].message, "Motion detected but no face visible. Possible threat!");
    }
}

#[test]
fn test_textured_motion_fires_motion_alert() {
    let patch = FaceLocation::new(80, 200, 160, 120);
    let events = motion_events(frame_with_patches(&[patch], 1));
    assert_eq!(events.iter().map(|e| e.key).collect::<Vec<_>>(), vec![AlertKey::MotionDetected]);
}

#[test]
fn test_negligible_motion_fires_nothing() {
    let speck = FaceLocation::new(120, 162, 122, 160);
    assert!(motion_events(frame_with_patches(&[speck], 1)).is_empty());
}

struct FrameList {
    frames: std::vec::IntoIter<Frame>,
}

impl FrameSource for FrameList {
    fn read(&mut self) -> Result<Frame, SourceError> {
        self.frames.next().ok_or(SourceError::EndOfStream)
    }
}

fn fixed_clock() -> NaiveDateTime {
    at(12, 0)
}

#[test]
fn test_run_drains_source_then_reports_end_of_stream() {
    let (mut orchestrator, rx) = engine(vec![vec![(left_face(), alice())]]);
    let mut session = DetectionSession::new(fixed_clock());
    let mut source = FrameList {
        frames: (0..3).map(|i| frame_with_patches(&[left_face()], i)).collect::<Vec<_>>().into_iter(),
    };
    let options = RunOptions {
        frame_interval: Duration::ZERO,
        clock: fixed_clock,
    };
    let control = AtomicBool::new(true);

    let mut cycles = 0;
    let outcome = run(&mut source, &mut orchestrator, &mut session, &control, &options, |_| cycles += 1).unwrap();

    assert_eq!(outcome, RunOutcome::EndOfStream);
    assert_eq!(cycles, 3);
    assert_eq!(session.frames_processed(), 3);
    assert_eq!(rx.try_iter().count(), 1);
}

#[test]
fn test_run_stops_when_control_inactive() {
    let (mut orchestrator, _rx) = engine(vec![vec![]]);
    let mut session = DetectionSession::new(fixed_clock());
    let mut source = FrameList {
        frames: vec![frame_with_patches(&[], 0)].into_iter(),
    };
    let control = AtomicBool::new(false);

    let outcome = run(
        &mut source,
        &mut orchestrator,
        &mut session,
        &control,
        &RunOptions::default(),
        |_| {},
    )
    .unwrap();
    assert_eq!(outcome, RunOutcome::Stopped);
    assert_eq!(session.frames_processed(), 0);
}

#[test]
fn test_dwell_config_is_respected() {
    let (tx, rx) = mpsc::channel();
    let config = DecisionConfig {
        unknown_dwell: TimeDelta::seconds(1),
        ..DecisionConfig::default()
    };
    let mut orchestrator = Orchestrator::new(
        config,
        ScriptedRecognizer::new(vec![vec![(left_face(), stranger())]]),
        gallery(),
        Box::new(NoSnapshots),
        Box::new(tx),
    );
    let mut session = DetectionSession::new(at(14, 0));
    let frame = frame_with_patches(&[left_face()], 0);
    orchestrator.process_frame(&mut session, &frame, at(14, 0)).unwrap();
    orchestrator.process_frame(&mut session, &frame, at(14, 2)).unwrap();
    assert_eq!(rx.try_iter().map(|e| e.key).collect::<Vec<_>>(), vec![AlertKey::NormalThreat]);
}
