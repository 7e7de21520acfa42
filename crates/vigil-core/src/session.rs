//! Per-run detection state.

use crate::dedup::AlertDeduplicator;
use crate::types::AlertKey;
use chrono::{NaiveDateTime, TimeDelta};
use image::GrayImage;
use serde::Serialize;

/// Everything the engine carries from one frame to the next.
///
/// Created when the engine starts and dropped when it stops; nothing here is
/// persisted.
pub struct DetectionSession {
    started_at: NaiveDateTime,
    frames_processed: u64,
    dedup: AlertDeduplicator,
    /// Previous full-frame grayscale for the motion detector.
    pub(crate) motion_previous: Option<GrayImage>,
    /// Previous body-region grayscale for the human shape verifier.
    pub(crate) shape_previous: Option<GrayImage>,
    unknown_since: Option<NaiveDateTime>,
}

/// Serializable view of a session for status reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub started_at: NaiveDateTime,
    pub frames_processed: u64,
    pub fired: Vec<AlertKey>,
    pub unknown_since: Option<NaiveDateTime>,
}

impl DetectionSession {
    pub fn new(started_at: NaiveDateTime) -> Self {
        Self {
            started_at,
            frames_processed: 0,
            dedup: AlertDeduplicator::new(),
            motion_previous: None,
            shape_previous: None,
            unknown_since: None,
        }
    }

    pub fn started_at(&self) -> NaiveDateTime {
        self.started_at
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub(crate) fn count_frame(&mut self) {
        self.frames_processed += 1;
    }

    pub fn try_fire(&mut self, key: AlertKey) -> bool {
        self.dedup.try_fire(key)
    }

    pub fn has_fired(&self, key: AlertKey) -> bool {
        self.dedup.has_fired(key)
    }

    pub fn unknown_since(&self) -> Option<NaiveDateTime> {
        self.unknown_since
    }

    /// Note an unknown face at `now` and return how long unknown presence
    /// has lasted without interruption.
    pub(crate) fn observe_unknown(&mut self, now: NaiveDateTime) -> TimeDelta {
        let since = *self.unknown_since.get_or_insert(now);
        now - since
    }

    /// A processed frame showed no unknown face.
    pub(crate) fn clear_unknown(&mut self) {
        self.unknown_since = None;
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            started_at: self.started_at,
            frames_processed: self.frames_processed,
            fired: self.dedup.fired().collect(),
            unknown_since: self.unknown_since,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap().and_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn test_unknown_presence_accumulates_until_cleared() {
        let mut session = DetectionSession::new(at(12, 0, 0));
        assert_eq!(session.observe_unknown(at(12, 0, 1)), TimeDelta::zero());
        assert_eq!(session.observe_unknown(at(12, 0, 4)), TimeDelta::seconds(3));
        session.clear_unknown();
        assert_eq!(session.unknown_since(), None);
        assert_eq!(session.observe_unknown(at(12, 0, 9)), TimeDelta::zero());
    }

    #[test]
    fn test_summary_lists_fired_keys() {
        let mut session = DetectionSession::new(at(8, 0, 0));
        session.count_frame();
        assert!(session.try_fire(AlertKey::MotionDetected));
        assert!(!session.try_fire(AlertKey::MotionDetected));
        let summary = session.summary();
        assert_eq!(summary.frames_processed, 1);
        assert_eq!(summary.fired, vec![AlertKey::MotionDetected]);
        assert_eq!(summary.started_at, at(8, 0, 0));
    }
}
