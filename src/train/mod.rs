//! Training loop: shuffled minibatches → distance → loss → BPTT → Adam, then a validation pass.
//!
//! Strictly sequential. The trainer owns the only mutable copy of the weights; the best
//! snapshot (lowest validation loss) is restored into the network when `fit` returns.

mod objective;
mod optim;

pub use objective::Objective;
pub use optim::Adam;

use crate::config::TrainingConfig;
use crate::error::{Error, Result};
use crate::eval::{Evaluator, ScoredPair};
use crate::model::{euclidean, save_network, similarity, ArtifactMeta, EmbeddingNetwork, EncoderWeights};
use crate::pairs::Pair;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Decision point for the per-epoch validation accuracy.
const REPORT_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    pub epoch: usize,
    pub train_loss: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub val_loss: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub val_auc: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub val_accuracy: Option<f32>,
    /// This epoch produced the best weights so far
    pub improved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub objective: Objective,
    pub train_pairs: usize,
    pub val_pairs: usize,
    pub epochs: Vec<EpochStats>,
    /// 1-based epoch whose weights were kept
    pub best_epoch: usize,
    pub best_loss: f32,
}

/// Mean validation loss plus the scored pairs for reporting.
pub struct ValidationPass {
    pub loss: f32,
    pub scored: Vec<ScoredPair>,
}

struct Checkpoint {
    path: PathBuf,
    meta: ArtifactMeta,
}

pub struct Trainer {
    config: TrainingConfig,
    network: EmbeddingNetwork,
    optimizer: Adam,
    rng: StdRng,
    checkpoint: Option<Checkpoint>,
}

impl Trainer {
    pub fn new(network: EmbeddingNetwork, config: TrainingConfig) -> Self {
        let optimizer = Adam::new(config.learning_rate, network.weights());
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            network,
            optimizer,
            rng,
            checkpoint: None,
        }
    }

    /// Persist the weights to `path` every time validation loss improves.
    pub fn with_checkpoint(mut self, path: impl Into<PathBuf>, meta: ArtifactMeta) -> Self {
        self.checkpoint = Some(Checkpoint {
            path: path.into(),
            meta,
        });
        self
    }

    pub fn network(&self) -> &EmbeddingNetwork {
        &self.network
    }

    pub fn into_network(self) -> EmbeddingNetwork {
        self.network
    }

    pub fn objective(&self) -> Objective {
        self.config.objective
    }

    /// Run the full epoch budget. Validation pairs drive model selection; when there are none,
    /// training loss is used instead and a warning is logged. An empty budget is a config error.
    pub fn fit(&mut self, train: &[Pair<'_>], val: &[Pair<'_>]) -> Result<TrainingReport> {
        if train.is_empty() {
            return Err(Error::InsufficientPairData {
                requested: 0,
                yielded: 0,
            });
        }
        if val.is_empty() {
            warn!("no validation pairs; selecting on training loss");
        }
        let evaluator = Evaluator::new(REPORT_THRESHOLD);
        let mut epochs = Vec::with_capacity(self.config.epochs);
        let mut best: Option<(usize, f32, EncoderWeights)> = None;

        for epoch in 1..=self.config.epochs {
            let train_loss = self.train_epoch(train)?;
            let (val_loss, val_auc, val_accuracy) = if val.is_empty() {
                (None, None, None)
            } else {
                let pass = self.validate(val)?;
                let report = evaluator.evaluate(&pass.scored);
                (Some(pass.loss), report.auc, Some(report.accuracy))
            };

            let selection_loss = val_loss.unwrap_or(train_loss);
            let improved = best
                .as_ref()
                .map(|(_, l, _)| selection_loss < *l)
                .unwrap_or(true);
            if improved {
                best = Some((epoch, selection_loss, self.network.weights().clone()));
                self.write_checkpoint(epoch)?;
            }

            info!(
                epoch,
                epochs = self.config.epochs,
                train_loss,
                val_loss = ?val_loss,
                val_auc = ?val_auc,
                improved,
                "epoch complete"
            );
            epochs.push(EpochStats {
                epoch,
                train_loss,
                val_loss,
                val_auc,
                val_accuracy,
                improved,
            });
        }

        // Zero epochs leaves nothing to select and nothing checkpointed.
        let (best_epoch, best_loss, weights) = best
            .ok_or_else(|| Error::Config("training.epochs must be positive".into()))?;
        self.network.set_weights(weights);
        Ok(TrainingReport {
            objective: self.config.objective,
            train_pairs: train.len(),
            val_pairs: val.len(),
            epochs,
            best_epoch,
            best_loss,
        })
    }

    /// One pass over `train` in a fresh shuffled order. Returns the mean per-pair loss.
    pub fn train_epoch(&mut self, train: &[Pair<'_>]) -> Result<f32> {
        let mut order: Vec<usize> = (0..train.len()).collect();
        order.shuffle(&mut self.rng);

        let mut total = 0.0f64;
        for (b, batch) in order.chunks(self.config.batch_size).enumerate() {
            let loss = self.train_batch(batch.iter().map(|&i| &train[i]))?;
            total += f64::from(loss) * batch.len() as f64;
            debug!(batch = b, loss, "batch");
        }
        Ok((total / train.len().max(1) as f64) as f32)
    }

    /// Forward both sides through the shared encoder, accumulate gradients of both branches
    /// into one gradient set, take one optimizer step. Returns the mean batch loss.
    fn train_batch<'p, 'a: 'p>(&mut self, batch: impl ExactSizeIterator<Item = &'p Pair<'a>>) -> Result<f32> {
        let n = batch.len().max(1) as f32;
        let objective = self.config.objective;
        let mut grads = EncoderWeights::zeros(self.network.architecture());
        let mut loss = 0.0f32;

        for pair in batch {
            let y = pair.label.target();
            let fa = self.network.forward(pair.left)?;
            let fb = self.network.forward(pair.right)?;
            let d = euclidean(&fa.embedding, &fb.embedding);
            loss += objective.loss(d, y);

            let dl_dd = objective.grad(d, y);
            if d > 0.0 && dl_dd != 0.0 {
                let scale = dl_dd / (d * n);
                let de = (&fa.embedding - &fb.embedding).mapv(|v| v * scale);
                self.network.backward(&fa, &de, &mut grads);
                self.network.backward(&fb, &de.mapv(|v| -v), &mut grads);
            }
        }

        if let Some(max_norm) = self.config.grad_clip {
            let norm = grads.norm_sq().sqrt();
            if norm > max_norm {
                grads.scale(max_norm / norm);
            }
        }
        self.optimizer.step(self.network.weights_mut(), &grads);
        Ok(loss / n)
    }

    /// Loss and similarity scores over `val` with the current weights; no updates.
    pub fn validate(&self, val: &[Pair<'_>]) -> Result<ValidationPass> {
        let objective = self.config.objective;
        let mut total = 0.0f64;
        let mut scored = Vec::with_capacity(val.len());
        for pair in val {
            let d = self.network.distance(pair.left, pair.right)?;
            total += f64::from(objective.loss(d, pair.label.target()));
            scored.push(ScoredPair {
                similarity: similarity(d),
                distance: d,
                label: pair.label,
            });
        }
        Ok(ValidationPass {
            loss: (total / val.len().max(1) as f64) as f32,
            scored,
        })
    }

    fn write_checkpoint(&self, epoch: usize) -> Result<()> {
        if let Some(cp) = &self.checkpoint {
            save_network(&cp.path, &self.network, cp.meta.clone())?;
            info!(epoch, path = %cp.path.display(), "checkpoint saved");
        }
        Ok(())
    }
}
