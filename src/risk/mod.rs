//! Caller-side risk policy layered on verification scores.

mod engine;

pub use engine::{RiskAssessment, RiskEngine, RiskLevel};
