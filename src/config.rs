//! Runtime configuration. One structure, passed into each component at construction.

use crate::error::{Error, Result};
use crate::pairs::SelfPairPolicy;
use crate::train::Objective;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelConfig {
    /// Working directory for checkpoints and enrolled references
    pub data_dir: PathBuf,
    /// Persisted encoder weights
    pub model_path: PathBuf,
    /// One JSON file per enrolled identity
    pub reference_dir: PathBuf,
    pub framing: FramingConfig,
    pub model: ModelConfig,
    pub sampling: SamplingConfig,
    pub training: TrainingConfig,
    pub evaluation: EvaluationConfig,
    /// Similarity → risk bucketing policy
    pub risk: RiskConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FramingConfig {
    /// Rows per framed session (pad or truncate to this)
    pub sequence_length: usize,
    /// Ordered feature columns read from each raw event
    pub feature_columns: Vec<String>,
    pub user_column: String,
    pub session_column: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub lstm_units: usize,
    pub embedding_dim: usize,
    /// Stop the recurrence at the last real row instead of running over padding
    pub mask_padding: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Draws for the training pair set (each draw = one genuine + one impostor)
    pub train_draws: usize,
    pub val_draws: usize,
    pub self_pairs: SelfPairPolicy,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
    pub objective: Objective,
    /// Share of sessions held out for validation
    pub val_fraction: f32,
    /// Global gradient norm clip; `None` disables it
    pub grad_clip: Option<f32>,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub draws: usize,
    /// Point at which accuracy is reported
    pub decision_threshold: f32,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Similarity at or above this is accepted
    pub accept_threshold: f32,
    /// Similarity below this is high risk
    pub high_below: f32,
    /// Similarity below this (and not high) is medium risk
    pub medium_below: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".touch-sentinel"),
            model_path: PathBuf::from(".touch-sentinel/siamese_lstm.json"),
            reference_dir: PathBuf::from(".touch-sentinel/references"),
            framing: FramingConfig::default(),
            model: ModelConfig::default(),
            sampling: SamplingConfig::default(),
            training: TrainingConfig::default(),
            evaluation: EvaluationConfig::default(),
            risk: RiskConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            sequence_length: 50,
            feature_columns: ["X", "Y", "Pressure", "Duration", "Orientation", "Size"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            user_column: "user_id".to_string(),
            session_column: "session_id".to_string(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            lstm_units: 64,
            embedding_dim: 64,
            mask_padding: false,
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            train_draws: 8000,
            val_draws: 2000,
            self_pairs: SelfPairPolicy::Disallow,
            seed: 42,
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 10,
            batch_size: 128,
            learning_rate: 1e-3,
            objective: Objective::default(),
            val_fraction: 0.2,
            grad_clip: None,
            seed: 42,
        }
    }
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            draws: 2500,
            decision_threshold: 0.5,
            seed: 7,
        }
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            accept_threshold: 0.5,
            high_below: 0.4,
            medium_below: 0.65,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl FramingConfig {
    pub fn feature_count(&self) -> usize {
        self.feature_columns.len()
    }
}

impl SentinelConfig {
    /// Load from JSON file if present; otherwise return default.
    /// A file that exists but does not parse is an error, never silently replaced.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        let config: SentinelConfig = serde_json::from_str(&data)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.framing.sequence_length == 0 {
            return Err(Error::Config("framing.sequence_length must be positive".into()));
        }
        if self.framing.feature_columns.is_empty() {
            return Err(Error::Config("framing.feature_columns must not be empty".into()));
        }
        if self.model.lstm_units == 0 || self.model.embedding_dim == 0 {
            return Err(Error::Config(
                "model.lstm_units and model.embedding_dim must be positive".into(),
            ));
        }
        if self.training.epochs == 0 {
            return Err(Error::Config("training.epochs must be positive".into()));
        }
        if self.training.batch_size == 0 {
            return Err(Error::Config("training.batch_size must be positive".into()));
        }
        if !(self.training.learning_rate > 0.0) {
            return Err(Error::Config("training.learning_rate must be positive".into()));
        }
        if !(0.0..1.0).contains(&self.training.val_fraction) {
            return Err(Error::Config("training.val_fraction must be in [0, 1)".into()));
        }
        if let Objective::Contrastive { margin } = self.training.objective {
            if !(margin > 0.0) {
                return Err(Error::Config("contrastive margin must be positive".into()));
            }
        }
        if self.risk.high_below > self.risk.medium_below {
            return Err(Error::Config("risk.high_below must not exceed risk.medium_below".into()));
        }
        Ok(())
    }
}
