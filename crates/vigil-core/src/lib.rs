//! vigil-core — Surveillance decision engine.
//!
//! Gates detected faces by lighting-adaptive texture statistics, matches
//! them under an adaptive tolerance, falls back to motion and human-shape
//! analysis when no face is visible, and emits deduplicated alerts.
//! Face location, embedding, frame capture, snapshot storage and alert
//! delivery are external collaborators reached through [`interfaces`].

pub mod alert_log;
pub mod dedup;
pub mod filters;
pub mod frame;
pub mod gallery;
pub mod interfaces;
pub mod lighting;
pub mod motion;
pub mod orchestrator;
pub mod paths;
pub mod quality;
pub mod runner;
pub mod session;
pub mod shape;
pub mod tolerance;
pub mod types;

pub use frame::Frame;
pub use interfaces::{
    AlertDispatcher, FaceRecognizer, FrameSource, NoSnapshots, RunControl, SnapshotRequester, SourceError,
};
pub use lighting::{select_profile, LightingBucket, LightingProfile};
pub use orchestrator::{DecisionConfig, EngineError, Orchestrator, Presence};
pub use runner::{run, RunOptions, RunOutcome};
pub use session::{DetectionSession, SessionSummary};
pub use types::{AlertEvent, AlertKey, FaceEmbedding, FaceLocation, KnownFace, RecognitionMatch, SnapshotRef};
