//! Per-frame decision pipeline.
//!
//! Quality-gates each located face, matches survivors against the gallery
//! under an adaptive tolerance, classifies the face set and, when no face is
//! located at all, falls back to motion detection. The human-shape verdict on
//! the moving region is logged but never gates the motion alert. Every
//! successful dedup check produces exactly one [`AlertEvent`].

use crate::frame::Frame;
use crate::interfaces::{AlertDispatcher, FaceRecognizer, SnapshotRequester};
use crate::motion::{MotionConfig, MotionDetector};
use crate::quality::check_face_quality;
use crate::session::DetectionSession;
use crate::shape::verify_human_shape;
use crate::tolerance::adaptive_tolerance;
use crate::types::{AlertEvent, AlertKey, EuclideanMatcher, KnownFace, Matcher, RecognitionMatch};
use chrono::{NaiveDateTime, TimeDelta, Timelike};
use thiserror::Error;

const GUEST_MESSAGE: &str = "No threat, it is probably your guest";
const HIGH_THREAT_MESSAGE: &str = "Very high threat detected";
const NORMAL_THREAT_MESSAGE: &str = "Normal threat detected";
const MOTION_MESSAGE: &str = "Motion detected but no face visible. Possible threat!";

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("recognizer failed: {0}")]
    Recognizer(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Decision tunables.
#[derive(Debug, Clone)]
pub struct DecisionConfig {
    /// Unknown presence must last longer than this before a threat alert.
    pub unknown_dwell: TimeDelta,
    /// First hour (inclusive) of the night window.
    pub night_start_hour: u32,
    /// Hour (exclusive) at which the night window ends.
    pub night_end_hour: u32,
    pub motion: MotionConfig,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            unknown_dwell: TimeDelta::seconds(5),
            night_start_hour: 21,
            night_end_hour: 6,
            motion: MotionConfig::default(),
        }
    }
}

impl DecisionConfig {
    /// Whether `hour` falls in the night window, which may wrap midnight.
    pub fn is_night(&self, hour: u32) -> bool {
        if self.night_start_hour > self.night_end_hour {
            hour >= self.night_start_hour || hour < self.night_end_hour
        } else {
            hour >= self.night_start_hour && hour < self.night_end_hour
        }
    }
}

/// Classification of the faces seen in one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    /// The recognizer located nothing.
    NoFaces,
    /// Known and unknown faces together.
    Guest,
    /// Exactly one face, and it is known.
    Known(String),
    /// At least one unknown face.
    Unknown,
    /// Faces located but none usable, or several known faces only.
    Unclassified,
}

/// Classify recognition results. `located` counts faces before quality gating.
pub fn classify(located: usize, matches: &[RecognitionMatch]) -> Presence {
    if located == 0 {
        return Presence::NoFaces;
    }
    let known: Vec<&str> = matches.iter().filter_map(|m| m.label()).collect();
    let unknown = matches.len() - known.len();

    if !known.is_empty() && unknown > 0 && matches.len() >= 2 {
        Presence::Guest
    } else if unknown == 0 && known.len() == 1 {
        Presence::Known(known[0].to_string())
    } else if unknown > 0 {
        Presence::Unknown
    } else {
        Presence::Unclassified
    }
}

/// Runs the decision pipeline one frame at a time.
pub struct Orchestrator<R> {
    config: DecisionConfig,
    recognizer: R,
    gallery: Vec<KnownFace>,
    matcher: Box<dyn Matcher + Send>,
    motion: MotionDetector,
    snapshots: Box<dyn SnapshotRequester + Send>,
    dispatcher: Box<dyn AlertDispatcher + Send>,
}

impl<R: FaceRecognizer> Orchestrator<R> {
    pub fn new(
        config: DecisionConfig,
        recognizer: R,
        gallery: Vec<KnownFace>,
        snapshots: Box<dyn SnapshotRequester + Send>,
        dispatcher: Box<dyn AlertDispatcher + Send>,
    ) -> Self {
        let motion = MotionDetector::new(config.motion.clone());
        Self {
            config,
            recognizer,
            gallery,
            matcher: Box::new(EuclideanMatcher),
            motion,
            snapshots,
            dispatcher,
        }
    }

    /// Replace the default Euclidean matcher.
    pub fn with_matcher(mut self, matcher: Box<dyn Matcher + Send>) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn gallery_len(&self) -> usize {
        self.gallery.len()
    }

    /// Process one frame observed at wall-clock time `now`.
    ///
    /// Returns the alert dispatched for this frame, if any.
    pub fn process_frame(
        &mut self,
        session: &mut DetectionSession,
        frame: &Frame,
        now: NaiveDateTime,
    ) -> Result<Option<AlertEvent>, EngineError> {
        session.count_frame();

        let locations = self
            .recognizer
            .locate(frame)
            .map_err(|e| EngineError::Recognizer(Box::new(e)))?;

        let mut matches = Vec::with_capacity(locations.len());
        for location in &locations {
            if !check_face_quality(location, frame).accepted {
                continue;
            }
            let tolerance = adaptive_tolerance(location, frame);
            let embedding = self
                .recognizer
                .embed(frame, location)
                .map_err(|e| EngineError::Recognizer(Box::new(e)))?;
            let result = self.matcher.compare(&embedding, &self.gallery, tolerance);
            tracing::debug!(?location, tolerance, ?result, "face classified");
            matches.push(result);
        }

        let presence = classify(locations.len(), &matches);
        tracing::trace!(
            frame = frame.sequence,
            located = locations.len(),
            usable = matches.len(),
            ?presence,
            "frame classified"
        );

        let alert = match presence {
            Presence::Guest => self.fire(session, frame, now, AlertKey::GuestWithKnown, GUEST_MESSAGE.to_string()),
            Presence::Known(name) => {
                session.clear_unknown();
                self.fire(session, frame, now, AlertKey::KnownPerson, format!("Welcome back, {name}!"))
            }
            Presence::Unknown => self.handle_unknown(session, frame, now),
            Presence::NoFaces => {
                session.clear_unknown();
                self.handle_no_faces(session, frame, now)
            }
            // Unusable faces neither start nor reset the unknown dwell.
            Presence::Unclassified => None,
        };

        Ok(alert)
    }

    fn handle_unknown(&mut self, session: &mut DetectionSession, frame: &Frame, now: NaiveDateTime) -> Option<AlertEvent> {
        let elapsed = session.observe_unknown(now);
        if elapsed <= self.config.unknown_dwell {
            tracing::trace!(elapsed_ms = elapsed.num_milliseconds(), "unknown presence within dwell");
            return None;
        }

        if self.config.is_night(now.hour()) {
            self.fire(session, frame, now, AlertKey::HighThreat, HIGH_THREAT_MESSAGE.to_string())
        } else {
            self.fire(session, frame, now, AlertKey::NormalThreat, NORMAL_THREAT_MESSAGE.to_string())
        }
    }

    fn handle_no_faces(&mut self, session: &mut DetectionSession, frame: &Frame, now: NaiveDateTime) -> Option<AlertEvent> {
        let (verdict, gray) = self.motion.detect(frame, session.motion_previous.as_ref());
        session.motion_previous = Some(gray);

        if !verdict.detected {
            return None;
        }

        if let Some(region) = verdict.largest_region {
            let (shape, state) = verify_human_shape(&region, frame, session.shape_previous.take());
            session.shape_previous = state;
            tracing::debug!(fraction = verdict.fraction, human = shape.is_human, ?region, "motion region shape");
        }

        self.fire(session, frame, now, AlertKey::MotionDetected, MOTION_MESSAGE.to_string())
    }

    fn fire(
        &mut self,
        session: &mut DetectionSession,
        frame: &Frame,
        now: NaiveDateTime,
        key: AlertKey,
        message: String,
    ) -> Option<AlertEvent> {
        if !session.try_fire(key) {
            return None;
        }

        let snapshot = self.snapshots.capture(frame, key.snapshot_label());
        let event = AlertEvent {
            key,
            message,
            snapshot,
            timestamp: now,
        };
        tracing::info!(key = %key, snapshot = ?event.snapshot, "alert fired");
        self.dispatcher.dispatch(event.clone());
        Some(event)
    }
}
