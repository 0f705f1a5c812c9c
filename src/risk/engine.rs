//! Maps a verification similarity onto accept/reject and a risk tier using configurable thresholds.

use crate::config::RiskConfig;
use crate::verify::Verification;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Lower similarity means higher risk.
    pub fn from_similarity(similarity: f32, config: &RiskConfig) -> Self {
        if similarity < config.high_below {
            RiskLevel::High
        } else if similarity < config.medium_below {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

/// Risk result for a single verification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub id: String,
    pub identity: String,
    pub similarity: f32,
    pub distance: f32,
    pub level: RiskLevel,
    pub accepted: bool,
    pub ts: i64,
}

pub struct RiskEngine {
    config: RiskConfig,
}

impl RiskEngine {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn assess(&self, identity: &str, verification: &Verification) -> RiskAssessment {
        let level = RiskLevel::from_similarity(verification.similarity, &self.config);
        RiskAssessment {
            id: Uuid::new_v4().to_string(),
            identity: identity.to_string(),
            similarity: verification.similarity,
            distance: verification.distance,
            level,
            accepted: verification.similarity >= self.config.accept_threshold,
            ts: Utc::now().timestamp_millis(),
        }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }
}
