//! touch-sentinel: continuous touch-behaviour authentication with a siamese LSTM.
//!
//! Modular structure:
//! - [`session`]: Raw events, sessions, framing to fixed-shape matrices, NDJSON feed
//! - [`pairs`]: Genuine/impostor pair sampling
//! - [`model`]: Shared LSTM encoder, distance head, persisted artifact
//! - [`train`]: Objectives, Adam, training loop with best-checkpoint selection
//! - [`eval`]: ROC/AUC and thresholded accuracy
//! - [`verify`]: Probe vs. enrolled reference scoring
//! - [`storage`]: Reference (enrollment) store
//! - [`risk`]: Similarity → risk tier policy
//! - [`logging`]: Structured JSON logging

pub mod config;
pub mod error;
pub mod eval;
pub mod logging;
pub mod model;
pub mod pairs;
pub mod risk;
pub mod session;
pub mod storage;
pub mod train;
pub mod verify;

pub use config::SentinelConfig;
pub use error::{Error, ErrorKind, Result};
pub use eval::{EvaluationReport, Evaluator, ScoredPair};
pub use logging::StructuredLogger;
pub use model::{Architecture, EmbeddingNetwork};
pub use pairs::{Pair, PairLabel, PairSampler, SelfPairPolicy};
pub use risk::{RiskEngine, RiskLevel};
pub use session::{Event, FramedSession, Session, SessionFramer, SessionKey};
pub use storage::{DirectoryStore, MemoryStore, ReferenceStore};
pub use train::{Objective, Trainer, TrainingReport};
pub use verify::{Verification, Verifier};
